use serde::{Deserialize, Deserializer, Serialize};

use super::keys;

/// Mesos task lifecycle states as Marathon reports them. Anything else is kept
/// verbatim so the dispatcher can reject it by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Staging,
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
    Lost,
    Unknown(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Staging => "TASK_STAGING",
            TaskStatus::Starting => "TASK_STARTING",
            TaskStatus::Running => "TASK_RUNNING",
            TaskStatus::Finished => "TASK_FINISHED",
            TaskStatus::Failed => "TASK_FAILED",
            TaskStatus::Killed => "TASK_KILLED",
            TaskStatus::Lost => "TASK_LOST",
            TaskStatus::Unknown(s) => s,
        }
    }

    /// The task is (or is about to be) running and belongs in the registry.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            TaskStatus::Staging | TaskStatus::Starting | TaskStatus::Running
        )
    }

    /// The task is gone and its record should be removed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Failed | TaskStatus::Killed | TaskStatus::Lost
        )
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Unknown(String::new())
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TASK_STAGING" => TaskStatus::Staging,
            "TASK_STARTING" => TaskStatus::Starting,
            "TASK_RUNNING" => TaskStatus::Running,
            "TASK_FINISHED" => TaskStatus::Finished,
            "TASK_FAILED" => TaskStatus::Failed,
            "TASK_KILLED" => TaskStatus::Killed,
            "TASK_LOST" => TaskStatus::Lost,
            _ => TaskStatus::Unknown(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    #[serde(default)]
    pub alive: bool,
}

/// A Marathon task. The same shape is used for bulk task listings and for
/// `status_update_event` bodies, which name the id field `taskId`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub slave_id: String,
    #[serde(alias = "taskId")]
    pub id: String,
    #[serde(default)]
    pub task_status: TaskStatus,
    pub app_id: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub health_check_results: Vec<HealthCheckResult>,
}

impl Task {
    pub fn key(&self) -> String {
        keys::task_key(&self.app_id, &self.id)
    }

    /// True if any health check reports the task alive.
    pub fn is_healthy(&self) -> bool {
        self.health_check_results.iter().any(|r| r.alive)
    }
}

// Registry consumers template off `healthy`, so it is written alongside the raw
// health check results.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord<'a> {
    reports_health: bool,
    healthy: bool,
    timestamp: &'a str,
    slave_id: &'a str,
    id: &'a str,
    task_status: &'a TaskStatus,
    app_id: &'a str,
    host: &'a str,
    ports: &'a [u16],
    version: &'a str,
    health_check_results: &'a [HealthCheckResult],
}

impl Serialize for Task {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaskRecord {
            reports_health: true,
            healthy: self.is_healthy(),
            timestamp: &self.timestamp,
            slave_id: &self.slave_id,
            id: &self.id,
            task_status: &self.task_status,
            app_id: &self.app_id,
            host: &self.host,
            ports: &self.ports,
            version: &self.version,
            health_check_results: &self.health_check_results,
        }
        .serialize(serializer)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
