//! Settings for third-party services: caches, queues, mail, SMS, AI, payments, WeChat Work.

use serde::{Deserialize, Serialize};

use crate::schemas::{require, SchemaError, Validate};

/// Redis connection settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: String,
    pub key_prefix: String,
    pub main_db_id: u32,
}

impl RedisConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for RedisConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.host, "redis host")?;
        if self.port == 0 {
            return Err(SchemaError::NotPositive("redis port"));
        }
        Ok(())
    }
}

/// NATS message queue settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NatsConfig {
    pub address: String,
    pub username: String,
    pub password: String,

    /// Subjects to subscribe on startup.
    pub subscribes: Vec<String>,
}

impl Validate for NatsConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.address, "nats address")
    }
}

/// Outgoing mail settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub use_tls: bool,
    pub tls_insecure_skip_verify: bool,
    pub rate_limit_per_second: f64,
    pub rate_limit_burst: u32,
}

impl Validate for EmailConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.smtp_host, "smtp host")?;
        if self.smtp_port == 0 {
            return Err(SchemaError::NotPositive("smtp port"));
        }
        require(&self.from_address, "from address")?;
        if !self.from_address.contains('@') {
            return Err(SchemaError::Invalid(format!(
                "from address '{}' is not an email address",
                self.from_address
            )));
        }
        if self.rate_limit_per_second < 0.0 {
            return Err(SchemaError::Invalid("rate limit must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Aliyun SMS gateway settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AliyunSmsConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub region_id: String,
    pub sign_name: String,

    /// Request timeout in seconds.
    pub http_timeout: u64,
    pub rate_limit_per_second: f64,
    pub rate_limit_burst: u32,
}

impl Validate for AliyunSmsConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.access_key_id, "sms access key id")?;
        require(&self.access_key_secret, "sms access key secret")?;
        require(&self.sign_name, "sms sign name")
    }
}

/// Dify AI platform settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DifyConfig {
    pub base_url: String,
    pub api_key: String,
    pub cache_period: String,
    pub default_prompt: String,
    pub bot_type: String,
    pub workflow_id: String,
}

impl Validate for DifyConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.base_url, "dify base URL")?;
        url::Url::parse(&self.base_url)
            .map_err(|e| SchemaError::Invalid(format!("dify base URL: {}", e)))?;
        require(&self.api_key, "dify API key")
    }
}

/// PRTG monitoring bridge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrtgConfig {
    #[serde(rename = "mq_subject")]
    pub subject: String,
}

impl Validate for PrtgConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.subject, "prtg subject")
    }
}

/// Fuiou payment settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FuiouConfig {
    pub mchnt_key: String,
}

impl Validate for FuiouConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.mchnt_key, "fuiou merchant key")
    }
}

/// WeChat Work integration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeixinConfig {
    pub enabled: bool,
    pub corp_id: String,
    pub web_hook: WorkwxWebHookConfig,
    pub app: WorkwxAppConfig,
    pub qyapi_host_override: String,
    pub tls_key_log_file: String,
}

impl Validate for WeixinConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        if !self.enabled {
            return Ok(());
        }
        require(&self.corp_id, "weixin corp ID")?;
        self.app.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkwxWebHookConfig {
    pub key: String,

    #[serde(rename = "subject")]
    pub subscribe: String,
}

impl Validate for WorkwxWebHookConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.key, "workwx webhook key")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkwxAppConfig {
    pub address: String,
    pub corp_secret: String,
    pub agent_id: i64,
    pub token: String,
    pub encoding_aes_key: String,

    #[serde(rename = "tx_subject")]
    pub tx_subscribe: String,

    #[serde(rename = "rx_subject")]
    pub rx_subscribe: String,
}

impl Validate for WorkwxAppConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.address, "workwx app address")?;
        require(&self.corp_secret, "workwx app corp secret")?;
        if self.agent_id <= 0 {
            return Err(SchemaError::NotPositive("workwx app agent ID"));
        }
        require(&self.token, "workwx app token")
    }
}
