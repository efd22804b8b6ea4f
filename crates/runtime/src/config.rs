//! Environment configuration.
//!
//! Every knob has a development default; production refuses to start on any
//! default credential or secret.

use anyhow::{bail, Context, Result};
use shared_types::EmailAddress;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_TOKEN_SECRET: &str = "casetrack-dev-secret-change-in-production";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub admin_email: EmailAddress,
    pub admin_password: String,
    pub token_secret: String,
    /// Inbox that receives client-reply alerts.
    pub staff_inbox: EmailAddress,
    pub log_filter: String,
}

fn var(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    /// Load from the environment.
    pub fn from_env() -> Result<Self> {
        let env = match var("CASETRACK_ENV", "development").as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let bind_addr = var("CASETRACK_BIND_ADDR", "127.0.0.1:3000")
            .parse()
            .context("CASETRACK_BIND_ADDR is not a valid socket address")?;

        let admin_email = EmailAddress::parse(&var(
            "CASETRACK_ADMIN_EMAIL",
            "admin@casetrack.local",
        ))
        .context("CASETRACK_ADMIN_EMAIL is not a valid email address")?;
        let staff_inbox = EmailAddress::parse(&var(
            "CASETRACK_STAFF_INBOX",
            admin_email.as_str(),
        ))
        .context("CASETRACK_STAFF_INBOX is not a valid email address")?;

        let config = Self {
            env,
            bind_addr,
            data_dir: PathBuf::from(var("CASETRACK_DATA_DIR", "data")),
            uploads_dir: PathBuf::from(var("CASETRACK_UPLOADS_DIR", "uploads")),
            admin_email,
            admin_password: var("CASETRACK_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
            token_secret: var("CASETRACK_TOKEN_SECRET", DEFAULT_TOKEN_SECRET),
            staff_inbox,
            log_filter: var("CASETRACK_LOG", "info"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Refuse default credentials outside development.
    pub fn validate(&self) -> Result<()> {
        if self.env != Environment::Production {
            return Ok(());
        }
        let mut errors = Vec::new();
        if self.admin_password == DEFAULT_ADMIN_PASSWORD {
            errors.push("CASETRACK_ADMIN_PASSWORD must be set in production");
        }
        if self.token_secret == DEFAULT_TOKEN_SECRET {
            errors.push("CASETRACK_TOKEN_SECRET must be set in production");
        }
        if !errors.is_empty() {
            bail!("configuration errors: {}", errors.join("; "));
        }
        Ok(())
    }
}
