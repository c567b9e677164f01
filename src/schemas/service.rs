//! Settings for the HTTP surface of a service: listener, middleware, auth,
//! access policy, the bootstrap administrator and scheduled jobs.

use std::collections::HashSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::schemas::{require, SchemaError, Validate};

/// HTTP listener settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,

    /// Route prefix (e.g., "/api").
    pub prefix: String,
}

impl HttpConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Validate for HttpConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.host, "http host")?;
        if self.port == 0 {
            return Err(SchemaError::NotPositive("http port"));
        }
        Ok(())
    }
}

/// Middleware settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddleConfig {
    pub ip_whitelist: IpWhiteListConfig,
}

impl Validate for MiddleConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        self.ip_whitelist.validate()
    }
}

/// Client IP allow-list. Entries are addresses or CIDR blocks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IpWhiteListConfig {
    pub enabled: bool,
    pub white_list: Vec<String>,
}

impl Validate for IpWhiteListConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        if !self.enabled {
            return Ok(());
        }
        if self.white_list.is_empty() {
            return Err(SchemaError::Invalid(
                "IP whitelist is enabled but no IPs are provided".to_string(),
            ));
        }
        for entry in &self.white_list {
            let (addr, bits) = match entry.split_once('/') {
                Some((addr, bits)) => (addr, Some(bits)),
                None => (entry.as_str(), None),
            };
            let ip: IpAddr = addr
                .trim()
                .parse()
                .map_err(|_| SchemaError::Invalid(format!("invalid whitelist entry '{}'", entry)))?;
            if let Some(bits) = bits {
                let max = if ip.is_ipv4() { 32 } else { 128 };
                match bits.trim().parse::<u8>() {
                    Ok(b) if b <= max => {}
                    _ => return Err(SchemaError::Invalid(format!("invalid prefix length in '{}'", entry))),
                }
            }
        }
        Ok(())
    }
}

/// Token authentication settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enable: bool,

    /// Token lifetime, e.g. "24h" or "30m".
    pub token_expired: String,
    pub ignore_path_prefixes: Vec<String>,
    pub jwt_signing_key: String,
    pub issuer: String,

    /// Second-factor modes: captcha, sms, email.
    pub verify_modes: Vec<String>,

    /// Verification code lifetime in minutes.
    pub expire_minutes: u32,
}

impl Validate for AuthConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        if self.enable {
            require(&self.jwt_signing_key, "jwt signing key")?;
        }
        for mode in &self.verify_modes {
            if !matches!(mode.as_str(), "captcha" | "sms" | "email") {
                return Err(SchemaError::Invalid(format!("unknown verify mode '{}'", mode)));
            }
        }
        Ok(())
    }
}

/// Casbin access-policy enforcement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CasbinConfig {
    pub enable: bool,
    pub debug: bool,

    /// Model definition (inline text or a path).
    pub model: String,

    /// Periodically reload policies from storage.
    pub auto_load: bool,

    /// Reload period in seconds.
    #[serde(alias = "auto_load_internal")]
    pub auto_load_interval: u32,

    pub ignore_path_prefixes: Vec<String>,
}

impl Validate for CasbinConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        if !self.enable {
            return Ok(());
        }
        require(&self.model, "casbin model")?;
        if self.auto_load && self.auto_load_interval == 0 {
            return Err(SchemaError::NotPositive("casbin auto load interval"));
        }
        Ok(())
    }
}

/// Administrator account created on first start.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SuperAdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role_id: String,
}

impl Validate for SuperAdminConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.username, "super admin username")?;
        require(&self.password, "super admin password")?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(SchemaError::Invalid(format!("invalid super admin email '{}'", self.email)));
        }
        Ok(())
    }
}

/// Scheduled jobs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskConfig {
    pub jobs: Vec<CronJobConfig>,
}

impl TaskConfig {
    pub fn enabled_jobs(&self) -> impl Iterator<Item = &CronJobConfig> {
        self.jobs.iter().filter(|j| j.enabled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CronJobConfig {
    pub name: String,

    /// Cron expression.
    pub spec: String,

    #[serde(rename = "desc")]
    pub description: String,

    /// Publish job results to the WeChat message queue.
    pub send_wxmq: bool,
    pub enabled: bool,
}

impl Validate for TaskConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            require(&job.name, "job name")?;
            require(&job.spec, "job spec")?;
            if !seen.insert(job.name.as_str()) {
                return Err(SchemaError::Invalid(format!("duplicate job '{}'", job.name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_listen_addr() {
        let http = HttpConfig {
            host: "0.0.0.0".into(),
            port: 8080,
            prefix: "/api".into(),
        };
        assert_eq!(http.listen_addr(), "0.0.0.0:8080");
        assert!(http.validate().is_ok());
        assert!(HttpConfig::default().validate().is_err());
    }

    #[test]
    fn test_whitelist() {
        let mut list = IpWhiteListConfig {
            enabled: true,
            white_list: vec![],
        };
        assert!(list.validate().is_err());

        list.white_list = vec!["10.0.0.1".into(), "192.168.0.0/16".into(), "::1".into()];
        assert!(list.validate().is_ok());

        list.white_list.push("10.0.0.0/33".into());
        assert!(list.validate().is_err());

        let disabled = IpWhiteListConfig::default();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_auth_requires_key_when_enabled() {
        let mut auth = AuthConfig {
            enable: true,
            ..AuthConfig::default()
        };
        assert_eq!(auth.validate(), Err(SchemaError::Required("jwt signing key")));
        auth.jwt_signing_key = "secret".into();
        auth.verify_modes = vec!["sms".into(), "fax".into()];
        assert!(auth.validate().is_err());
    }

    #[test]
    fn test_task_jobs() {
        let yaml = "jobs:\n  - name: report\n    spec: \"0 8 * * *\"\n    desc: daily\n    enabled: true\n  - name: sync\n    spec: \"*/5 * * * *\"\n";
        let tasks: TaskConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tasks.jobs[0].description, "daily");
        assert_eq!(tasks.enabled_jobs().count(), 1);
        assert!(tasks.validate().is_ok());

        let mut dup = tasks.clone();
        dup.jobs[1].name = "report".into();
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_casbin_checks_only_when_enabled() {
        assert!(CasbinConfig::default().validate().is_ok());

        let yaml = "enable: true\nmodel: rbac_model.conf\nauto_load: true\nauto_load_internal: 60\n";
        let casbin: CasbinConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(casbin.auto_load_interval, 60);
        assert!(casbin.validate().is_ok());

        let stalled = CasbinConfig {
            auto_load_interval: 0,
            ..casbin
        };
        assert_eq!(
            stalled.validate(),
            Err(SchemaError::NotPositive("casbin auto load interval"))
        );
    }

    #[test]
    fn test_super_admin() {
        let yaml = "username: root\nemail: root@example.com\npassword: s3cret\nrole_id: \"1\"\n";
        let admin: SuperAdminConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(admin.role_id, "1");
        assert!(admin.validate().is_ok());

        let bad = SuperAdminConfig {
            email: "not-an-address".into(),
            ..admin
        };
        assert!(bad.validate().is_err());
        assert_eq!(
            SuperAdminConfig::default().validate(),
            Err(SchemaError::Required("super admin username"))
        );
    }
}
