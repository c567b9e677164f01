//! Schema type → group name mapping.

use serde::de::DeserializeOwned;

/// Derive a group name from a schema's declared name.
///
/// Lower-cases the name and strips one trailing `"config"`. A name that is
/// nothing but the suffix is kept whole.
pub fn group_name_for(schema_name: &str) -> String {
    let lower = schema_name.to_lowercase();
    match lower.strip_suffix("config") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}

/// A configuration record that lives in its own group.
pub trait ConfigSchema: DeserializeOwned + Send + 'static {
    /// Declared schema name, e.g. `"DatabaseConfig"`.
    const SCHEMA_NAME: &'static str;

    /// Group the schema is stored under.
    fn group_name() -> String {
        group_name_for(Self::SCHEMA_NAME)
    }
}

/// Implement [`ConfigSchema`] using each type's own identifier as its name.
///
/// ```ignore
/// impl_config_schema!(DatabaseConfig, HttpConfig);
/// assert_eq!(DatabaseConfig::group_name(), "database");
/// ```
#[macro_export]
macro_rules! impl_config_schema {
    ($($ty:ident),+ $(,)?) => {
        $(
            impl $crate::dynamic::ConfigSchema for $ty {
                const SCHEMA_NAME: &'static str = stringify!($ty);
            }
        )+
    };
}
