use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;
use tracing::Level;

const ENV_PREFIX: &str = "MARATHON_CONSUL_";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub marathon: MarathonConfig,
    pub registry: RegistryConfig,
    pub web: WebConfig,
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarathonConfig {
    pub location: String,
    pub protocol: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_verify: bool,
}

impl Default for MarathonConfig {
    fn default() -> Self {
        Self {
            location: "localhost:8080".to_string(),
            protocol: "http".to_string(),
            username: None,
            password: None,
            ssl_verify: true,
        }
    }
}

/// Where the mirrored state is written. `location = "memory"` keeps it in-process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub location: String,
    pub protocol: String,
    pub token: Option<String>,
    pub prefix: String,
    pub ssl_verify: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            location: "localhost:8500".to_string(),
            protocol: "http".to_string(),
            token: None,
            prefix: "marathon".to_string(),
            ssl_verify: true,
        }
    }
}

impl RegistryConfig {
    pub fn is_memory(&self) -> bool {
        self.location == "memory"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:4000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct LogLevel(pub Level);

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel(Level::INFO)
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse::<Level>()
            .map(LogLevel)
            .map_err(|_| format!("invalid log level '{}'", s))
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment, then flags.
    pub async fn load(args: &[String]) -> Result<Self> {
        let mut config = match config_path(args)? {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.apply_flags(args)?;
        Ok(config)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("MARATHON_LOCATION") {
            self.marathon.location = v;
        }
        if let Some(v) = var("MARATHON_PROTOCOL") {
            self.marathon.protocol = v;
        }
        if let Some(v) = var("MARATHON_USERNAME") {
            self.marathon.username = Some(v);
        }
        if let Some(v) = var("MARATHON_PASSWORD") {
            self.marathon.password = Some(v);
        }
        if let Some(v) = var("MARATHON_SSL_VERIFY") {
            self.marathon.ssl_verify = parse_bool("MARATHON_SSL_VERIFY", &v)?;
        }
        if let Some(v) = var("REGISTRY_LOCATION") {
            self.registry.location = v;
        }
        if let Some(v) = var("REGISTRY_PROTOCOL") {
            self.registry.protocol = v;
        }
        if let Some(v) = var("REGISTRY_TOKEN") {
            self.registry.token = Some(v);
        }
        if let Some(v) = var("REGISTRY_PREFIX") {
            self.registry.prefix = v;
        }
        if let Some(v) = var("REGISTRY_SSL_VERIFY") {
            self.registry.ssl_verify = parse_bool("REGISTRY_SSL_VERIFY", &v)?;
        }
        if let Some(v) = var("LISTEN") {
            self.web.listen = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = LogLevel::try_from(v).map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    pub fn apply_flags(&mut self, args: &[String]) -> Result<()> {
        let mut i = 0;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--marathon-no-verify-ssl" => self.marathon.ssl_verify = false,
                "--registry-no-verify-ssl" => self.registry.ssl_verify = false,
                "--config" => i += 1,
                "--marathon-location" | "--marathon-protocol" | "--marathon-username"
                | "--marathon-password" | "--registry-location" | "--registry-protocol"
                | "--registry-token" | "--registry-prefix" | "--listen" | "--log-level" => {
                    let Some(value) = args.get(i + 1).cloned() else {
                        bail!("{} requires a value", flag);
                    };
                    i += 1;
                    match flag {
                        "--marathon-location" => self.marathon.location = value,
                        "--marathon-protocol" => self.marathon.protocol = value,
                        "--marathon-username" => self.marathon.username = Some(value),
                        "--marathon-password" => self.marathon.password = Some(value),
                        "--registry-location" => self.registry.location = value,
                        "--registry-protocol" => self.registry.protocol = value,
                        "--registry-token" => self.registry.token = Some(value),
                        "--registry-prefix" => self.registry.prefix = value,
                        "--listen" => self.web.listen = value,
                        _ => {
                            self.log_level = LogLevel::try_from(value).map_err(anyhow::Error::msg)?
                        }
                    }
                }
                _ => bail!("unknown argument: {}", flag),
            }
            i += 1;
        }
        Ok(())
    }
}

fn config_path(args: &[String]) -> Result<Option<&str>> {
    match args.iter().position(|a| a == "--config") {
        Some(i) => match args.get(i + 1) {
            Some(path) => Ok(Some(path.as_str())),
            None => bail!("--config requires a value"),
        },
        None => Ok(None),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{ENV_PREFIX}{name} must be a boolean, got '{}'", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.marathon.location, "localhost:8080");
        assert_eq!(config.marathon.protocol, "http");
        assert!(config.marathon.ssl_verify);
        assert_eq!(config.registry.location, "localhost:8500");
        assert_eq!(config.registry.prefix, "marathon");
        assert!(!config.registry.is_memory());
        assert_eq!(config.web.listen, "0.0.0.0:4000");
        assert_eq!(config.log_level, LogLevel(Level::INFO));
    }

    #[test]
    fn flags_override_defaults() {
        let mut config = Config::default();
        config
            .apply_flags(&args(&[
                "--marathon-location",
                "marathon.mesos:8080",
                "--marathon-no-verify-ssl",
                "--registry-prefix",
                "",
                "--listen",
                "127.0.0.1:9000",
                "--log-level",
                "debug",
            ]))
            .unwrap();
        assert_eq!(config.marathon.location, "marathon.mesos:8080");
        assert!(!config.marathon.ssl_verify);
        assert_eq!(config.registry.prefix, "");
        assert_eq!(config.web.listen, "127.0.0.1:9000");
        assert_eq!(config.log_level, LogLevel(Level::DEBUG));
    }

    #[test]
    fn flags_reject_missing_value_and_unknown_flags() {
        let mut config = Config::default();
        assert!(config.apply_flags(&args(&["--listen"])).is_err());
        assert!(config.apply_flags(&args(&["--bogus"])).is_err());
        assert!(config.apply_flags(&args(&["--log-level", "loud"])).is_err());
    }

    #[test]
    fn env_overrides() {
        let env: HashMap<String, String> = [
            ("MARATHON_CONSUL_MARATHON_USERNAME", "admin"),
            ("MARATHON_CONSUL_MARATHON_PASSWORD", "hunter2"),
            ("MARATHON_CONSUL_REGISTRY_LOCATION", "memory"),
            ("MARATHON_CONSUL_REGISTRY_SSL_VERIFY", "false"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = Config::default();
        config.apply_env(|name| env.get(name).cloned()).unwrap();
        assert_eq!(config.marathon.username.as_deref(), Some("admin"));
        assert_eq!(config.marathon.password.as_deref(), Some("hunter2"));
        assert!(config.registry.is_memory());
        assert!(!config.registry.ssl_verify);
    }

    #[test]
    fn env_rejects_bad_bool() {
        let mut config = Config::default();
        let result = config.apply_env(|name| {
            (name == "MARATHON_CONSUL_MARATHON_SSL_VERIFY").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn loads_toml_then_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
log_level = "warn"

[marathon]
location = "marathon.example.org:8443"
protocol = "https"

[registry]
prefix = "services"
"#
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let config = Config::load(&args(&["--config", path.as_str(), "--registry-prefix", "svc"]))
            .await
            .unwrap();
        assert_eq!(config.marathon.location, "marathon.example.org:8443");
        assert_eq!(config.marathon.protocol, "https");
        assert_eq!(config.registry.location, "localhost:8500");
        assert_eq!(config.registry.prefix, "svc");
        assert_eq!(config.log_level, LogLevel(Level::WARN));
    }

    #[tokio::test]
    async fn missing_explicit_config_file_is_an_error() {
        let result = Config::load(&args(&["--config", "/nonexistent/marathon-consul.toml"])).await;
        assert!(result.is_err());
    }
}
