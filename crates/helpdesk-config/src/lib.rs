use std::path::{Path, PathBuf};

use helpdesk_core::{SlaPolicy, StaticAuthenticator, UserSummary};
use serde::{Deserialize, Serialize};

/// Configuration for helpdesk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub sla: SlaConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; an empty list allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Resolution window, in hours, per priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaConfig {
    #[serde(default = "default_critical_hours")]
    pub critical_hours: i64,

    #[serde(default = "default_high_hours")]
    pub high_hours: i64,

    #[serde(default = "default_medium_hours")]
    pub medium_hours: i64,

    #[serde(default = "default_low_hours")]
    pub low_hours: i64,
}

/// A user known to the token authenticator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            sla: SlaConfig::default(),
            users: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            critical_hours: default_critical_hours(),
            high_hours: default_high_hours(),
            medium_hours: default_medium_hours(),
            low_hours: default_low_hours(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_max_connections() -> u32 {
    5
}

/// Longest accepted resolution window: one (leap) year
pub const MAX_SLA_HOURS: i64 = 24 * 366;

fn default_critical_hours() -> i64 {
    1
}

fn default_high_hours() -> i64 {
    4
}

fn default_medium_hours() -> i64 {
    8
}

fn default_low_hours() -> i64 {
    24
}

impl SlaConfig {
    pub fn policy(&self) -> SlaPolicy {
        SlaPolicy::from_hours(
            self.critical_hours,
            self.high_hours,
            self.medium_hours,
            self.low_hours,
        )
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (name, hours) in [
            ("critical_hours", self.critical_hours),
            ("high_hours", self.high_hours),
            ("medium_hours", self.medium_hours),
            ("low_hours", self.low_hours),
        ] {
            if hours <= 0 {
                anyhow::bail!("sla.{} must be positive, got {}", name, hours);
            }
            if hours > MAX_SLA_HOURS {
                anyhow::bail!(
                    "sla.{} must be at most {} hours, got {}",
                    name,
                    MAX_SLA_HOURS,
                    hours
                );
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it is missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.sla.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "helpdesk", "helpdesk") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from("~/.helpdesk/config.toml")
        }
    }

    /// Apply `HELPDESK_DATABASE` and `PORT` overrides from the environment
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        if let Some(path) = lookup("HELPDESK_DATABASE").filter(|p| !p.is_empty()) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{}': {}", port, e))?;
        }
        Ok(self)
    }

    /// Token authenticator over the configured users
    pub fn authenticator(&self) -> StaticAuthenticator {
        self.users
            .iter()
            .fold(StaticAuthenticator::new(), |auth, user| {
                auth.with_user(
                    UserSummary {
                        id: user.id.clone(),
                        name: user.name.clone(),
                        email: user.email.clone(),
                    },
                    user.token.clone(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_core::{Authenticator, Priority};

    fn hours(policy: &SlaPolicy, priority: Priority) -> i64 {
        policy.offset(priority).whole_hours()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.cors_origins, ["http://localhost:3000"]);
        assert_eq!(config.database.max_connections, 5);
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.sla, config.sla);
    }

    #[test]
    fn test_default_sla_policy() {
        let policy = SlaConfig::default().policy();
        assert_eq!(hours(&policy, Priority::Critical), 1);
        assert_eq!(hours(&policy, Priority::High), 4);
        assert_eq!(hours(&policy, Priority::Medium), 8);
        assert_eq!(hours(&policy, Priority::Low), 24);
    }

    #[test]
    fn test_parse_overrides() {
        let toml_str = r#"
log_level = "debug"

[server]
port = 8080
cors_origins = []

[database]
path = "/var/lib/helpdesk/tickets.db"

[sla]
critical_hours = 2
low_hours = 48

[[users]]
id = "u1"
name = "Ada"
email = "ada@example.com"
token = "secret"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/helpdesk/tickets.db"))
        );

        let policy = config.sla.policy();
        assert_eq!(hours(&policy, Priority::Critical), 2);
        assert_eq!(hours(&policy, Priority::High), 4);
        assert_eq!(hours(&policy, Priority::Low), 48);
        assert_eq!(config.users.len(), 1);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 5000);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.sla, config.sla);
    }

    #[test]
    fn test_load_rejects_non_positive_sla() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sla]\nhigh_hours = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("high_hours"));
    }

    #[test]
    fn test_load_rejects_oversized_sla() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sla]\nlow_hours = 100000000\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("low_hours"));

        std::fs::write(&path, format!("[sla]\nlow_hours = {}\n", MAX_SLA_HOURS)).unwrap();
        let config = Config::load_from(&path).unwrap();
        let now = time::macros::datetime!(2024-01-01 00:00 UTC);
        assert!(config.sla.policy().compute_deadline(Priority::Low, now).is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_overrides(|key| match key {
                "HELPDESK_DATABASE" => Some("/tmp/hd.db".to_string()),
                "PORT" => Some("7000".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/hd.db")));
        assert_eq!(config.server.port, 7000);

        let bad = Config::default().with_overrides(|key| (key == "PORT").then(|| "http".to_string()));
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_authenticator_from_users() {
        let mut config = Config::default();
        config.users.push(UserConfig {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            token: "secret".to_string(),
        });

        let auth = config.authenticator();
        assert_eq!(auth.authenticate("secret").await.unwrap().name, "Ada");
        assert!(auth.authenticate("wrong").await.is_err());
    }
}
