// src/models/account.rs

//! eBay account credentials.

use std::fmt;

/// One set of eBay credentials, as resolved from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    /// Numeric suffix of the variables (`None` for the default account)
    pub suffix: Option<u32>,

    /// Label used in logs and history entries
    pub run_name: String,

    pub app_id: String,

    pub client_secret: String,

    pub dev_id: String,

    /// OAuth user access token (may be empty)
    pub access_token: String,

    pub refresh_token: String,
}

impl AccountCredentials {
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("suffix", &self.suffix)
            .field("run_name", &self.run_name)
            .field("app_id", &self.app_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("dev_id", &self.dev_id)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Mask a secret for display, keeping only whether it is set.
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}
