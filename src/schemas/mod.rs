//! Per-domain configuration records.
//!
//! Each record is plain data: it deserializes from its group's snapshot via
//! serde field names, defaults every field, and checks itself with
//! [`Validate`]. The group each record lives in is derived from its type name
//! (`DatabaseConfig` → `database`).

use thiserror::Error;

pub mod database;
pub mod integrations;
pub mod service;

pub use database::DatabaseConfig;
pub use integrations::{
    AliyunSmsConfig, DifyConfig, EmailConfig, FuiouConfig, NatsConfig, PrtgConfig, RedisConfig,
    WeixinConfig, WorkwxAppConfig, WorkwxWebHookConfig,
};
pub use service::{
    AuthConfig, CasbinConfig, CronJobConfig, HttpConfig, IpWhiteListConfig, MiddleConfig,
    SuperAdminConfig, TaskConfig,
};

crate::impl_config_schema!(
    DatabaseConfig,
    HttpConfig,
    MiddleConfig,
    AuthConfig,
    CasbinConfig,
    SuperAdminConfig,
    TaskConfig,
    RedisConfig,
    NatsConfig,
    EmailConfig,
    AliyunSmsConfig,
    DifyConfig,
    WeixinConfig,
    PrtgConfig,
    FuiouConfig,
);

/// Group names of the built-in schemas, as accepted by the CLI.
pub const BUILTIN_GROUPS: &[&str] = &[
    "database", "http", "middle", "auth", "casbin", "superadmin", "task", "redis", "nats", "email",
    "aliyunsms", "dify", "weixin", "prtg", "fuiou",
];

/// A record that failed its semantic checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be greater than 0")]
    NotPositive(&'static str),

    #[error("{0}")]
    Invalid(String),
}

/// Semantic checks beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

pub(crate) fn require(value: &str, field: &'static str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::Required(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::ConfigSchema;

    #[test]
    fn test_builtin_group_names() {
        assert_eq!(DatabaseConfig::group_name(), "database");
        assert_eq!(HttpConfig::group_name(), "http");
        assert_eq!(AliyunSmsConfig::group_name(), "aliyunsms");
        assert_eq!(SuperAdminConfig::group_name(), "superadmin");
        let derived = [
            DatabaseConfig::group_name(),
            HttpConfig::group_name(),
            MiddleConfig::group_name(),
            AuthConfig::group_name(),
            CasbinConfig::group_name(),
            SuperAdminConfig::group_name(),
            TaskConfig::group_name(),
            RedisConfig::group_name(),
            NatsConfig::group_name(),
            EmailConfig::group_name(),
            AliyunSmsConfig::group_name(),
            DifyConfig::group_name(),
            WeixinConfig::group_name(),
            PrtgConfig::group_name(),
            FuiouConfig::group_name(),
        ];
        assert_eq!(derived.to_vec(), BUILTIN_GROUPS.to_vec());
    }
}
