/// Strip the leading slash Marathon puts on application ids so the id can be used
/// as a registry namespace segment.
pub fn clean_id(id: &str) -> &str {
    id.strip_prefix('/').unwrap_or(id)
}

pub fn app_key(app_id: &str) -> String {
    clean_id(app_id).to_string()
}

pub fn task_key(app_id: &str, task_id: &str) -> String {
    format!("{}/tasks/{}", clean_id(app_id), task_id)
}

/// Join a registry prefix onto a derived key. An empty prefix leaves the key as-is.
pub fn prefixed(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}
