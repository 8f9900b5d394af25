//! 统一配置中心
//!
//! 加载顺序：内置默认值 → `APP_CONFIG_FILE` 指定的文件（toml / yaml / json）
//! → `APP_` 前缀的环境变量（`__` 分隔嵌套字段，例如 `APP_SERVER__PORT=9000`）。

use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const ENV_PREFIX: &str = "APP_";
pub const CONFIG_FILE_VAR: &str = "APP_CONFIG_FILE";

/// 全局应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub matching: MatchingConfig,
    #[validate(nested)]
    pub sweep: SweepConfig,
    #[validate(nested)]
    pub timeouts: TimeoutConfig,
    #[validate(nested)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// 仅 postgres 后端使用
    #[serde(default)]
    pub database_url: String,
    #[validate(range(min = 1, max = 200))]
    pub max_connections: u32,
    /// 启动时建立连接的最大尝试次数
    #[validate(range(min = 1, max = 30))]
    pub connect_attempts: u32,
}

/// 配对半径与链接有效期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MatchingConfig {
    #[validate(range(min = 1.0, max = 100000.0))]
    pub radius_meters: f64,
    #[validate(range(min = 1, max = 86400))]
    pub link_ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SweepConfig {
    #[validate(range(min = 1, max = 3600))]
    pub interval_secs: u64,
    /// 每次清扫最多补做释放的链接数
    #[validate(range(min = 1, max = 100000))]
    pub batch_limit: u32,
}

/// 存储调用超时（毫秒）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TimeoutConfig {
    #[validate(range(min = 1))]
    pub point_ms: u64,
    #[validate(range(min = 1))]
    pub scan_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    /// 不设置时使用 bcrypt 默认强度
    #[serde(default)]
    #[validate(range(min = 4, max = 31))]
    pub bcrypt_cost: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: String::new(),
                max_connections: 10,
                connect_attempts: 5,
            },
            matching: MatchingConfig {
                radius_meters: 200.0,
                link_ttl_secs: 30,
            },
            sweep: SweepConfig {
                interval_secs: 5,
                batch_limit: 500,
            },
            timeouts: TimeoutConfig {
                point_ms: 10_000,
                scan_ms: 30_000,
            },
            security: SecurityConfig { bcrypt_cost: None },
        }
    }
}

impl AppConfig {
    /// 按默认值 → 配置文件 → 环境变量的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var(CONFIG_FILE_VAR).ok();
        Self::from_figment(layered(file.as_deref(), ENV_PREFIX))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.check()?;
        Ok(config)
    }

    /// 字段级校验加跨字段约束
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.storage.backend == StorageBackend::Postgres {
            let url = self.storage.database_url.as_str();
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ConfigError::Invalid(
                    "storage.database_url must be a postgres:// url when backend = postgres"
                        .into(),
                ));
            }
        }
        if self.timeouts.scan_ms < self.timeouts.point_ms {
            return Err(ConfigError::Invalid(
                "timeouts.scan_ms must not be shorter than timeouts.point_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn link_ttl(&self) -> Duration {
        Duration::from_secs(self.matching.link_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep.interval_secs)
    }

    pub fn point_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.point_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.scan_ms)
    }

    /// 用于日志输出，数据库凭据被隐去
    pub fn sanitize(&self) -> String {
        let mut redacted = self.clone();
        redacted.storage.database_url = redact_credentials(&self.storage.database_url);
        format!("{redacted:?}")
    }
}

fn layered(file: Option<&str>, env_prefix: &str) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
    if let Some(path) = file {
        figment = if path.ends_with(".yml") || path.ends_with(".yaml") {
            figment.merge(Yaml::file(path))
        } else if path.ends_with(".json") {
            figment.merge(Json::file(path))
        } else {
            figment.merge(Toml::file(path))
        };
    }
    figment.merge(Env::prefixed(env_prefix).split("__"))
}

fn redact_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://[REDACTED]{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_owned(),
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.check().is_ok());
        assert_eq!(config.link_ttl(), Duration::from_secs(30));
        assert_eq!(config.sweep_interval(), Duration::from_secs(5));
        assert_eq!(config.matching.radius_meters, 200.0);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string(
                r#"
                [server]
                port = 9000

                [storage]
                backend = "postgres"
                database_url = "postgres://app:hunter2@db:5432/linkapp"

                [matching]
                radius_meters = 350.0
                "#,
            ),
        );

        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.matching.radius_meters, 350.0);
        assert_eq!(config.sweep.batch_limit, 500);
    }

    #[test]
    fn yaml_and_json_are_accepted() {
        let yaml = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::string("sweep:\n  interval_secs: 2\n"));
        assert_eq!(AppConfig::from_figment(yaml).unwrap().sweep.interval_secs, 2);

        let json = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Json::string(r#"{ "security": { "bcrypt_cost": 12 } }"#));
        assert_eq!(
            AppConfig::from_figment(json).unwrap().security.bcrypt_cost,
            Some(12)
        );
    }

    #[test]
    fn environment_overrides_nested_fields() {
        std::env::set_var("LINKAPP_CFGTEST_SERVER__PORT", "9100");
        std::env::set_var("LINKAPP_CFGTEST_SWEEP__BATCH_LIMIT", "42");

        let config = AppConfig::from_figment(layered(None, "LINKAPP_CFGTEST_")).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.sweep.batch_limit, 42);

        std::env::remove_var("LINKAPP_CFGTEST_SERVER__PORT");
        std::env::remove_var("LINKAPP_CFGTEST_SWEEP__BATCH_LIMIT");
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Postgres;
        assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));

        config.storage.database_url = "postgres://app:pw@db/linkapp".into();
        assert!(config.check().is_ok());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let mut config = AppConfig::default();
        config.security.bcrypt_cost = Some(3);
        assert!(matches!(config.check(), Err(ConfigError::Validation(_))));

        let mut config = AppConfig::default();
        config.sweep.interval_secs = 0;
        assert!(matches!(config.check(), Err(ConfigError::Validation(_))));

        let mut config = AppConfig::default();
        config.timeouts.scan_ms = 500;
        config.timeouts.point_ms = 1_000;
        assert!(matches!(config.check(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn sanitize_hides_database_credentials() {
        let mut config = AppConfig::default();
        config.storage.database_url = "postgres://app:hunter2@db:5432/linkapp".into();

        let text = config.sanitize();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("postgres://[REDACTED]@db:5432/linkapp"));
    }

    #[test]
    fn unknown_backend_is_a_load_error() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string("[storage]\nbackend = \"cassandra\"\n"));
        assert!(matches!(
            AppConfig::from_figment(figment),
            Err(ConfigError::Load(_))
        ));
    }
}
