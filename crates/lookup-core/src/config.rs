//! Centralized configuration for lookup plugins.
//!
//! Wire literals shared with peers and the defaults used when a plugin
//! process starts serving.

use std::time::Duration;

/// Literals of the wire protocol. Peers depend on these byte for byte.
pub struct WireConfig;

impl WireConfig {
    /// Key naming the variant of a rich-type envelope.
    pub const TYPE_KEY: &'static str = "__ptype";
    /// Key holding the payload of a rich-type envelope.
    pub const VALUE_KEY: &'static str = "__pvalue";

    pub const BINARY_TAG: &'static str = "Binary";
    pub const SENSITIVE_TAG: &'static str = "Sensitive";
    pub const TIMESTAMP_TAG: &'static str = "Timestamp";

    pub const REDACTED: &'static str = r#"Sensitive("value redacted")"#;

    pub const JSON_CONTENT_TYPE: &'static str = "application/json";
    pub const VALUE_NOT_FOUND: &'static str = "404 value not found";
    pub const ROUTE_NOT_FOUND: &'static str = "404 page not found";

    /// Query parameter carrying the lookup key.
    pub const KEY_PARAM: &'static str = "key";
    /// Query parameter carrying the JSON encoded options map.
    pub const OPTIONS_PARAM: &'static str = "options";
}

/// Defaults for the serving process.
pub struct ServeConfig;

impl ServeConfig {
    pub const PROTOCOL_VERSION: u32 = 1;
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_MIN_PORT: u16 = 10000;
    pub const DEFAULT_MAX_PORT: u16 = 25000;
    pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(3);

    pub const HOST_ENV: &'static str = "LOOKUP_PLUGIN_HOST";
    pub const MIN_PORT_ENV: &'static str = "LOOKUP_PLUGIN_MIN_PORT";
    pub const MAX_PORT_ENV: &'static str = "LOOKUP_PLUGIN_MAX_PORT";
}

/// Read a setting from the environment, falling back to `default` when the
/// variable is unset or unparsable.
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
