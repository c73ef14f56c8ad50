//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听与 CORS
//! - JWT认证
//! - Hub 广播
//! - 日志级别
//!
//! 加载优先级：默认值 -> 可选配置文件（APP_CONFIG_FILE）-> 环境变量（APP_*，嵌套字段用 `__` 分隔）

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub jwt: JwtConfig,
    #[serde(default)]
    #[validate(nested)]
    pub hub: HubConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    #[validate(length(min = 1))]
    pub secret: String,
    #[validate(range(min = 1))]
    pub expiration_hours: i64,
}

/// Hub 广播配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HubConfig {
    /// 进程内广播通道容量
    #[validate(range(min = 1))]
    pub broadcast_capacity: usize,
    /// 每个连接写命令队列长度
    #[validate(range(min = 1))]
    pub command_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1000,
            command_buffer: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for AppConfig {
    /// 默认配置是开发环境配置，生产环境必须覆盖 JWT 密钥
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 5000,
                cors_origins: vec!["http://localhost:4200".into()],
            },
            jwt: JwtConfig {
                secret: "dev-secret-key-not-for-production-use-minimum-32-chars".into(),
                expiration_hours: 24 * 7,
            },
            hub: HubConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig.merge(Env::prefixed("APP_").split("__"))
    }

    /// 加载并校验配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: AppConfig = figment.extract().map_err(Box::new)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 生产环境安全检查：JWT密钥至少256位，且不能是明显的开发密钥
    pub fn validate_security(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.jwt.secret.contains("dev-secret")
            || self.jwt.secret.contains("not-for-production")
            || self.jwt.secret.contains("please-change")
        {
            return Err(ConfigError::InvalidJwtSecret(
                "Cannot use development JWT secret in production".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_are_valid_but_not_secure() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let result = config.validate_security();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("development JWT secret"));
    }

    #[test]
    fn test_env_overrides_nested_fields() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_SERVER__PORT", "7000");
            jail.set_env("APP_HUB__BROADCAST_CAPACITY", "64");
            jail.set_env(
                "APP_JWT__SECRET",
                "production-grade-secret-key-with-sufficient-length",
            );

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 7000);
            assert_eq!(config.hub.broadcast_capacity, 64);
            assert_eq!(config.hub.command_buffer, 32);
            assert!(config.validate_security().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_config_file_is_merged_before_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "presence.toml",
                r#"
                [server]
                host = "0.0.0.0"
                port = 6000

                [log]
                level = "debug"
                "#,
            )?;
            jail.set_env("APP_CONFIG_FILE", "presence.toml");
            jail.set_env("APP_SERVER__PORT", "6001");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 6001);
            assert_eq!(config.log.level, "debug");
            assert_eq!(config.bind_address(), "0.0.0.0:6001");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_HUB__BROADCAST_CAPACITY", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Validation(_))));
            Ok(())
        });
    }

    #[test]
    fn test_short_jwt_secret_is_rejected() {
        let mut config = AppConfig::default();
        config.jwt.secret = "short".into();
        assert!(matches!(
            config.validate_security(),
            Err(ConfigError::InvalidJwtSecret(_))
        ));
    }
}
