//! Default configuration values loaded from config.defaults.toml.
//!
//! The defaults file is embedded at compile time and is the only place a
//! default value is written down. User files are merged over it key by key,
//! so every section struct can be deserialized without serde defaults.

use crate::CentralConfig;
use once_cell::sync::Lazy;

/// The embedded defaults TOML file (loaded at compile time)
pub const DEFAULTS_TOML: &str = include_str!("../../../config.defaults.toml");

/// Parsed defaults table (parsed once at first use)
static DEFAULTS_TABLE: Lazy<toml::Table> = Lazy::new(|| {
    toml::from_str(DEFAULTS_TOML).expect("config.defaults.toml should be valid TOML")
});

/// Typed defaults (parsed once at first use)
static DEFAULTS: Lazy<CentralConfig> = Lazy::new(|| {
    toml::Value::Table(DEFAULTS_TABLE.clone())
        .try_into()
        .expect("config.defaults.toml should cover every configuration key")
});

/// Raw defaults table, the base every user file is merged over
pub fn table() -> &'static toml::Table {
    &DEFAULTS_TABLE
}

/// Fully typed defaults
pub fn config() -> &'static CentralConfig {
    &DEFAULTS
}

/// Recursively overlay `overlay` onto `base`; scalars and arrays replace.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(inner) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, inner),
                _ => {
                    base.insert(key, toml::Value::Table(inner));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}
