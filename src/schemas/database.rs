//! Relational database connection settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schemas::{require, SchemaError, Validate};

/// Database connection settings stored in the `database` group.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Driver name (e.g., "mysql").
    pub engine: String,

    /// Database (schema) name.
    pub name: String,

    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub table_prefix: String,

    /// Extra DSN parameters: "k1=v1&k2=v2" or "k1=v1,k2=v2".
    pub parameters: String,

    /// Connection lifetime in seconds.
    pub max_lifetime: u64,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
}

impl DatabaseConfig {
    /// MySQL-style DSN: `user:pass@tcp(host:port)/name?params`.
    ///
    /// Parameters are sorted by key and form-encoded.
    pub fn dsn(&self) -> String {
        let mut dsn = format!(
            "{}:{}@tcp({}:{})/{}",
            self.username, self.password, self.host, self.port, self.name
        );

        let params = self.parse_parameters();
        if !params.is_empty() {
            let mut encoder = url::form_urlencoded::Serializer::new(String::new());
            for (key, values) in &params {
                for value in values {
                    encoder.append_pair(key, value);
                }
            }
            dsn.push('?');
            dsn.push_str(&encoder.finish());
        }
        dsn
    }

    fn parse_parameters(&self) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if self.parameters.trim().is_empty() {
            return params;
        }

        let separator = if !self.parameters.contains('&') && self.parameters.contains(',') {
            ','
        } else {
            '&'
        };

        for pair in self.parameters.split(separator).map(str::trim) {
            if let Some((key, value)) = pair.split_once('=') {
                params.entry(key.to_string()).or_default().push(value.to_string());
            }
        }
        params
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<(), SchemaError> {
        require(&self.engine, "database engine")?;
        require(&self.host, "database host")?;
        if self.port == 0 {
            return Err(SchemaError::NotPositive("database port"));
        }
        require(&self.name, "database name")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatabaseConfig {
        DatabaseConfig {
            engine: "mysql".into(),
            name: "app".into(),
            host: "db1".into(),
            port: 3306,
            username: "root".into(),
            password: "pw".into(),
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_dsn_without_parameters() {
        assert_eq!(sample().dsn(), "root:pw@tcp(db1:3306)/app");
    }

    #[test]
    fn test_dsn_sorts_and_encodes_parameters() {
        let mut config = sample();
        config.parameters = "parseTime=True&charset=utf8mb4&loc=Asia/Shanghai".into();
        assert_eq!(
            config.dsn(),
            "root:pw@tcp(db1:3306)/app?charset=utf8mb4&loc=Asia%2FShanghai&parseTime=True"
        );
    }

    #[test]
    fn test_dsn_comma_separated() {
        let mut config = sample();
        config.parameters = "loc=Local, charset=utf8,broken".into();
        assert_eq!(config.dsn(), "root:pw@tcp(db1:3306)/app?charset=utf8&loc=Local");
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut config = sample();
        config.port = 0;
        assert_eq!(config.validate(), Err(SchemaError::NotPositive("database port")));

        config = sample();
        config.host.clear();
        assert_eq!(config.validate(), Err(SchemaError::Required("database host")));
    }
}
