/**
 * The run mode of the relay:
 * - `development` (also aliased as 'dev')
 * - `staging` (also aliased as 'stg')
 * - `production` (also aliased as 'prod')
 *
 * Anything else is treated as production.
 */
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub(crate) enum EnvironmentType {
    development,
    staging,
    production,
}

impl EnvironmentType {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "development" | "dev" => EnvironmentType::development,
            "staging" | "stg" => EnvironmentType::staging,
            _ => EnvironmentType::production,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentType::development => "development",
            EnvironmentType::staging => "staging",
            EnvironmentType::production => "production",
        }
    }
}

impl<'de> Deserialize<'de> for EnvironmentType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(EnvironmentType::from_name(&s))
    }
}
