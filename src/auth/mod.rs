/**
 * Long-term credential lookup for TURN clients
 */
use std::collections::HashMap;

use crate::config::Settings;

pub(crate) trait CredentialStore {
    /**
     * Password of `username` within `realm`, or `None` when the client is
     * not known there.
     */
    fn lookup_password(&self, username: &str, realm: &str) -> Option<String>;
}

/**
 * Credentials held in configuration: an explicit user table plus an
 * optional password accepted for every other username.
 */
#[derive(Clone, Debug)]
pub(crate) struct StaticCredentials {
    realm: String,
    users: HashMap<String, String>,
    default_password: Option<String>,
}

impl StaticCredentials {
    pub fn new(realm: &str, users: HashMap<String, String>, default_password: Option<String>) -> Self {
        Self {
            realm: realm.to_string(),
            users,
            default_password,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.realm,
            settings.users.clone(),
            settings.default_password.clone(),
        )
    }
}

impl CredentialStore for StaticCredentials {
    fn lookup_password(&self, username: &str, realm: &str) -> Option<String> {
        if self.realm != realm {
            return None;
        }
        self.users
            .get(username)
            .cloned()
            .or_else(|| self.default_password.clone())
    }
}
