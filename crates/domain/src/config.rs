//! Environment-driven configuration structures shared by all binaries.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::alerts::Mailbox;
use crate::model::{AddressBook, AddressBookError};

const DEFAULT_ETHERSCAN_API_URL: &str = "https://api.etherscan.io/api";
const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";
const DEFAULT_CYCLE_DEADLINE_SECS: u64 = 60;

/// API-specific configuration (just the HTTP bind) so the HTTP surface
/// does not depend on monitor-only environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_bind_address: String,
}

impl ApiConfig {
    /// Loads only the environment variables required by the API binary.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        Ok(Self {
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }
}

/// Everything one monitoring cycle needs, loaded once at startup.
/// Missing or malformed entries surface as [`ConfigError`] so binaries
/// can report and exit instead of panicking mid-boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    etherscan_api_key: String,
    etherscan_api_url: String,
    sendgrid_api_key: String,
    sendgrid_api_url: String,
    sendgrid_template_id: String,
    start_block: u64,
    lookback_minutes: u64,
    addresses: AddressBook,
    recipients: Vec<Mailbox>,
    sender: Mailbox,
    display_timezone: Option<String>,
    cycle_deadline: Duration,
}

impl WatchConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading
    /// the process variables. The address book is parsed here too, so a
    /// malformed `WATCHED_ADDRESSES` entry is a startup error, never a
    /// per-cycle one.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let etherscan_api_key = get_required_var("ETHERSCAN_API_KEY")?;
        let etherscan_api_url = get_optional_var("ETHERSCAN_API_URL")
            .unwrap_or_else(|| DEFAULT_ETHERSCAN_API_URL.to_string());
        let sendgrid_api_key = get_required_var("SENDGRID_API_KEY")?;
        let sendgrid_api_url = get_optional_var("SENDGRID_API_URL")
            .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string());
        let sendgrid_template_id = get_required_var("SENDGRID_TEMPLATE_ID")?;

        let start_block = parse_number(get_required_var("START_BLOCK")?, "START_BLOCK")?;
        // Stored padded by one minute so a transfer timestamped exactly
        // at the nominal edge still falls inside the window.
        let lookback_minutes =
            parse_number::<u64>(get_required_var("LOOKBACK_MINUTES")?, "LOOKBACK_MINUTES")?
                .saturating_add(1);

        let addresses = AddressBook::from_json(&get_required_var("WATCHED_ADDRESSES")?)?;

        let recipients = parse_recipients(&get_required_var("ALERT_RECIPIENTS")?)?;
        let sender_email = parse_email("ALERT_SENDER_EMAIL", get_required_var("ALERT_SENDER_EMAIL")?)?;
        let sender = match get_optional_var("ALERT_SENDER_NAME") {
            Some(name) => Mailbox::named(sender_email, name),
            None => Mailbox::new(sender_email),
        };

        let display_timezone = get_optional_var("DISPLAY_TIMEZONE");

        let cycle_deadline = match get_optional_var("CYCLE_DEADLINE_SECS") {
            Some(raw) => Duration::from_secs(parse_number(raw, "CYCLE_DEADLINE_SECS")?),
            None => Duration::from_secs(DEFAULT_CYCLE_DEADLINE_SECS),
        };

        Ok(Self {
            etherscan_api_key,
            etherscan_api_url,
            sendgrid_api_key,
            sendgrid_api_url,
            sendgrid_template_id,
            start_block,
            lookback_minutes,
            addresses,
            recipients,
            sender,
            display_timezone,
            cycle_deadline,
        })
    }

    pub fn etherscan_api_key(&self) -> &str {
        &self.etherscan_api_key
    }

    pub fn etherscan_api_url(&self) -> &str {
        &self.etherscan_api_url
    }

    pub fn sendgrid_api_key(&self) -> &str {
        &self.sendgrid_api_key
    }

    pub fn sendgrid_api_url(&self) -> &str {
        &self.sendgrid_api_url
    }

    pub fn sendgrid_template_id(&self) -> &str {
        &self.sendgrid_template_id
    }

    pub fn start_block(&self) -> u64 {
        self.start_block
    }

    /// Lookback in minutes, boundary padding already applied.
    pub fn lookback_minutes(&self) -> u64 {
        self.lookback_minutes
    }

    pub fn addresses(&self) -> &AddressBook {
        &self.addresses
    }

    pub fn recipients(&self) -> &[Mailbox] {
        &self.recipients
    }

    pub fn sender(&self) -> &Mailbox {
        &self.sender
    }

    pub fn display_timezone(&self) -> Option<&str> {
        self.display_timezone.as_deref()
    }

    pub fn cycle_deadline(&self) -> Duration {
        self.cycle_deadline
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_number<T>(raw: String, key: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.parse()
        .map_err(|source| ConfigError::InvalidNumber { key, source })
}

fn parse_recipients(raw: &str) -> Result<Vec<Mailbox>, ConfigError> {
    let mut recipients = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        recipients.push(Mailbox::new(parse_email(
            "ALERT_RECIPIENTS",
            trimmed.to_string(),
        )?));
    }
    if recipients.is_empty() {
        return Err(ConfigError::NoRecipients);
    }
    Ok(recipients)
}

fn parse_email(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.contains('@') {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEmail { key, value })
    }
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("TREASURY_WATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid `WATCHED_ADDRESSES`: {0}")]
    AddressBook(#[from] AddressBookError),
    #[error("`{key}` holds `{value}`, which does not look like an email address")]
    InvalidEmail { key: &'static str, value: String },
    #[error("`ALERT_RECIPIENTS` names no recipients")]
    NoRecipients,
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
