use compliance_type::Compliance;
/**
 * Initialize server configuration, using hierarchical configuration
 * https://docs.rs/config/latest/config/
 *
 * 1. First turn.yaml is read
 * 2. Then turn.{environment}.yaml is read
 * 3. Then turn.local.yaml is read (this is normally used for dev and not checked in git)
 * 4. Finally, environment variables prefixed with TURN_ are read
 */
use config::{Config, ConfigError, Environment, File};
use environment_type::EnvironmentType;
use serde::Deserialize;
use std::{collections::HashMap, env};
pub(crate) mod compliance_type;
mod environment_type;
mod loglevel_type;

/// Name of the environment variable selecting the run mode
pub(crate) const ENVIRONMENT_VARIABLE: &str = "TURN_ENVIRONMENT";

/**
 * Represents the configuration settings for the TURN relay.
 *
 * Fields:
 * - `environment`: The environment type (e.g., development, staging, or production).
 * - `udp_bind_address`: The address and port of the listening socket (ip:port format)
 * - `relay_address`: The IP relay sockets are bound to. Defaults to the IP of `udp_bind_address`.
 * - `software_name`: Value of the SOFTWARE attribute in responses.
 * - `realm`: The realm advertised to clients and used to look up credentials.
 * - `allocation_lifetime`: Seconds an allocation lives without activity, advertised in LIFETIME.
 * - `poll_interval_ms`: Upper bound on one readiness poll of the event loop.
 * - `compliance`: The STUN protocol compliance level. By default, RFC5389 is used.
 * - `log_level`: The logging level. By default, logging is inferred from environment type if no other settings are found.
 * - `users`: Username to password map for long-term credentials.
 * - `default_password`: Password accepted for any username missing from `users`.
 */
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Settings {
    pub(crate) environment: EnvironmentType,
    pub(crate) udp_bind_address: String,
    pub(crate) relay_address: Option<String>,
    pub(crate) software_name: String,
    pub(crate) realm: String,
    pub(crate) allocation_lifetime: u32,
    pub(crate) poll_interval_ms: u64,
    #[serde(deserialize_with = "compliance_type::deserialize")]
    pub(crate) compliance: Compliance,
    #[serde(deserialize_with = "loglevel_type::deserialize")]
    pub(crate) log_level: slog::Level,
    #[serde(default)]
    pub(crate) users: HashMap<String, String>,
    pub(crate) default_password: Option<String>,
}

impl Settings {
    pub(crate) fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var(ENVIRONMENT_VARIABLE).unwrap_or_else(|_| "production".into());

        let s = Config::builder()
            // default config file
            .add_source(File::with_name("turn.yaml").required(false))
            // environment-based config file
            .add_source(File::with_name(&format!("turn.{run_mode}.yaml")).required(false))
            // local config file (don't check this into source control)
            .add_source(File::with_name("turn.local.yaml").required(false))
            .add_source(Environment::with_prefix("TURN"))
            .set_default("udp_bind_address", "0.0.0.0:3478")?
            .set_default("compliance", Compliance::RFC5389.as_str())?
            .set_default("log_level", loglevel_type::name_of(loglevel_type::default_for(&run_mode)))?
            .set_default("environment", EnvironmentType::production.as_str())?
            .set_default("software_name", "turn-relay/0.1")?
            .set_default("realm", "turn-relay")?
            .set_default("allocation_lifetime", 300)?
            .set_default("poll_interval_ms", 50)?
            .build()?;

        s.try_deserialize()
    }
}
