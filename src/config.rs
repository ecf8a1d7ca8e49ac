// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Values are
//! trimmed and empty strings count as unset.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `DATA_DIR` | Directory holding `support.redb` | `./data` |
//! | `DISCORD_TOKEN` | Bot token for the chat platform | Required |
//! | `DISCORD_API_BASE` | Chat REST base URL | `https://discord.com/api/v10` |
//! | `SUPPORT_CHANNEL_ID` | Parent channel for support threads | Required |
//! | `ADMIN_USER_ID` | Chat user allowed to run operator commands | Required |
//! | `ADMIN_EMAIL` | Address receiving one-time codes | Required |
//! | `BACKUP_KEY` | Passphrase for backup encryption | Required |
//! | `EVENTS_SECRET` | HMAC key for signed chat events | Required |
//! | `MAIL_API_URL` | Mail API endpoint for one-time codes | Optional (codes disabled) |
//! | `MAIL_API_KEY` | Bearer key for the mail API | Required with `MAIL_API_URL` |
//! | `MAIL_FROM` | Sender address for one-time codes | `support-bot@localhost` |
//! | `CUSTOM_USER_AGENT` | User-Agent for chat REST calls | `RelationalSupportBridge/0.1` |
//! | `DISPLAY_UTC_OFFSET_MINUTES` | Offset for times shown on intro cards | `0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use chrono::{FixedOffset, Offset, Utc};

use crate::chat::discord::DEFAULT_API_BASE;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_MAIL_FROM: &str = "support-bot@localhost";
pub const DEFAULT_USER_AGENT: &str = "RelationalSupportBridge/0.1";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "support.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Mail API settings for one-time code delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub discord_token: String,
    pub discord_api_base: String,
    pub support_channel_id: String,
    pub admin_user_id: String,
    pub admin_email: String,
    pub backup_key: String,
    pub events_secret: String,
    pub mail: Option<MailConfig>,
    pub user_agent: String,
    pub display_offset: FixedOffset,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };

        let port = match vars.optional("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let display_offset = match vars.optional("DISPLAY_UTC_OFFSET_MINUTES") {
            Some(raw) => parse_offset(&raw)?,
            None => Utc.fix(),
        };

        let log_format = match vars.optional("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("expected json or pretty, got {other}"),
                })
            }
        };

        let mail = match (vars.optional("MAIL_API_URL"), vars.optional("MAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(MailConfig {
                api_url,
                api_key,
                from: vars.or_default("MAIL_FROM", DEFAULT_MAIL_FROM),
            }),
            (Some(_), None) => return Err(ConfigError::Missing("MAIL_API_KEY")),
            (None, _) => None,
        };

        Ok(Self {
            host: vars.or_default("HOST", DEFAULT_HOST),
            port,
            data_dir: PathBuf::from(vars.or_default("DATA_DIR", DEFAULT_DATA_DIR)),
            discord_token: vars.required("DISCORD_TOKEN")?,
            discord_api_base: vars.or_default("DISCORD_API_BASE", DEFAULT_API_BASE),
            support_channel_id: vars.required("SUPPORT_CHANNEL_ID")?,
            admin_user_id: vars.required("ADMIN_USER_ID")?,
            admin_email: vars.required("ADMIN_EMAIL")?,
            backup_key: vars.required("BACKUP_KEY")?,
            events_secret: vars.required("EVENTS_SECRET")?,
            mail,
            user_agent: vars.or_default("CUSTOM_USER_AGENT", DEFAULT_USER_AGENT),
            display_offset,
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }
}

fn parse_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: "DISPLAY_UTC_OFFSET_MINUTES",
        reason,
    };
    let minutes: i32 = raw.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| invalid(format!("{minutes} minutes is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn required_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DISCORD_TOKEN", "token"),
            ("SUPPORT_CHANNEL_ID", "123"),
            ("ADMIN_USER_ID", "42"),
            ("ADMIN_EMAIL", "admin@example.com"),
            ("BACKUP_KEY", "backup passphrase"),
            ("EVENTS_SECRET", "events secret"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&required_vars()).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database_path(), PathBuf::from("./data/support.redb"));
        assert_eq!(config.discord_api_base, DEFAULT_API_BASE);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.display_offset.local_minus_utc(), 0);
        assert!(config.mail.is_none());
    }

    #[test]
    fn missing_required_value_is_reported() {
        let mut vars = required_vars();
        vars.remove("ADMIN_EMAIL");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("ADMIN_EMAIL"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut vars = required_vars();
        vars.insert("BACKUP_KEY", "   ");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("BACKUP_KEY"));
    }

    #[test]
    fn mail_requires_key_with_url() {
        let mut vars = required_vars();
        vars.insert("MAIL_API_URL", "https://mail.example/send");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("MAIL_API_KEY"));

        vars.insert("MAIL_API_KEY", "key");
        let mail = load(&vars).unwrap().mail.unwrap();
        assert_eq!(mail.from, DEFAULT_MAIL_FROM);
    }

    #[test]
    fn parses_offset_port_and_log_format() {
        let mut vars = required_vars();
        vars.insert("DISPLAY_UTC_OFFSET_MINUTES", "420");
        vars.insert("PORT", "8081");
        vars.insert("LOG_FORMAT", "json");

        let config = load(&vars).unwrap();
        assert_eq!(config.display_offset.local_minus_utc(), 420 * 60);
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_values() {
        let mut vars = required_vars();
        vars.insert("PORT", "http");
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: "PORT", .. })));

        let mut vars = required_vars();
        vars.insert("DISPLAY_UTC_OFFSET_MINUTES", "100000");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "DISPLAY_UTC_OFFSET_MINUTES", .. })
        ));

        let mut vars = required_vars();
        vars.insert("LOG_FORMAT", "xml");
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { name: "LOG_FORMAT", .. })));
    }
}
