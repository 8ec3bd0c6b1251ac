// src/config.rs

//! Configuration loading utilities.
//!
//! The TOML file carries everything that is safe to commit; SMTP credentials
//! come from the environment and are resolved once at startup, so a missing
//! password fails the run before any network work happens.

use std::env;

use crate::error::{AppError, Result};

/// Environment variable holding the SMTP password.
pub const PASSWORD_VAR: &str = "SENDER_PASSWORD";

/// Environment variable optionally overriding the SMTP login name.
pub const USERNAME_VAR: &str = "SMTP_USERNAME";

/// SMTP login credentials, sourced from the environment.
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl SmtpCredentials {
    /// Resolve credentials from the environment.
    ///
    /// The login name defaults to the configured sender address unless
    /// `SMTP_USERNAME` is set. A missing or empty `SENDER_PASSWORD` is a
    /// fatal configuration error.
    pub fn from_env(sender: &str) -> Result<Self> {
        let username = env::var(USERNAME_VAR).unwrap_or_else(|_| sender.to_string());
        let password = env::var(PASSWORD_VAR)
            .map_err(|_| AppError::config(format!("{PASSWORD_VAR} is not set")))?;

        if password.trim().is_empty() {
            return Err(AppError::config(format!("{PASSWORD_VAR} is empty")));
        }

        Ok(Self { username, password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process state; keep them in one test so they
    // cannot race each other under the parallel test runner.
    #[test]
    fn test_from_env() {
        unsafe { env::remove_var(PASSWORD_VAR) };
        unsafe { env::remove_var(USERNAME_VAR) };
        assert!(SmtpCredentials::from_env("bot@example.com").is_err());

        unsafe { env::set_var(PASSWORD_VAR, "  ") };
        assert!(SmtpCredentials::from_env("bot@example.com").is_err());

        unsafe { env::set_var(PASSWORD_VAR, "hunter2") };
        let creds = SmtpCredentials::from_env("bot@example.com").unwrap();
        assert_eq!(creds.username, "bot@example.com");
        assert_eq!(creds.password, "hunter2");

        unsafe { env::set_var(USERNAME_VAR, "login@example.com") };
        let creds = SmtpCredentials::from_env("bot@example.com").unwrap();
        assert_eq!(creds.username, "login@example.com");

        unsafe { env::remove_var(PASSWORD_VAR) };
        unsafe { env::remove_var(USERNAME_VAR) };
    }
}
