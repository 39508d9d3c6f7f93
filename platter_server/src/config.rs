use std::{env, io::Write};

use chrono::{Duration, FixedOffset, Offset, Utc};
use log::*;
use platter_common::{helpers::parse_boolean_flag, Secret};
use platter_engine::{api::order_flow_api::DEFAULT_CONFIRM_TIMEOUT_MINUTES, OrderFlowSettings};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde_json::json;
use tempfile::NamedTempFile;
use url::Url;

use crate::errors::ServerError;

const DEFAULT_PLATTER_HOST: &str = "127.0.0.1";
const DEFAULT_PLATTER_PORT: u16 = 8480;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_CONFIRMATION_BASE_URL: &str = "http://localhost:3000/orders/confirm";
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Apply pending migrations before accepting requests.
    pub run_migrations: bool,
    /// When set, guest carts and merge tokens are kept in Redis. Otherwise an in-process cache is used, which only
    /// works for single-instance deployments.
    pub redis_url: Option<String>,
    pub auth: AuthConfig,
    /// How long a customer has to confirm a new order before the sweeper escalates it.
    pub order_confirm_timeout: Duration,
    /// The restaurants' UTC offset. Serving windows are checked against local time at this offset.
    pub business_offset: FixedOffset,
    /// The time between timeout sweeps.
    pub sweep_interval: std::time::Duration,
    /// The page that confirmation links point to. The order and restaurant ids are appended as query parameters.
    pub confirmation_base_url: Url,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PLATTER_HOST.to_string(),
            port: DEFAULT_PLATTER_PORT,
            database_url: String::default(),
            run_migrations: true,
            redis_url: None,
            auth: AuthConfig::default(),
            order_confirm_timeout: Duration::minutes(DEFAULT_CONFIRM_TIMEOUT_MINUTES),
            business_offset: Utc.fix(),
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            confirmation_base_url: default_confirmation_url(),
        }
    }
}

fn default_confirmation_url() -> Url {
    Url::parse(DEFAULT_CONFIRMATION_BASE_URL).expect("The default confirmation url is valid")
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PLATTER_HOST").ok().unwrap_or_else(|| DEFAULT_PLATTER_HOST.into());
        let port = env::var("PLATTER_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PLATTER_PORT. {e} Using the default, {DEFAULT_PLATTER_PORT}, \
                         instead."
                    );
                    DEFAULT_PLATTER_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PLATTER_PORT);
        let database_url = env::var("PLATTER_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ PLATTER_DATABASE_URL is not set. Please set it to the URL for the Platter database.");
            String::default()
        });
        let run_migrations = parse_boolean_flag(env::var("PLATTER_RUN_MIGRATIONS").ok(), true);
        let redis_url = env::var("PLATTER_REDIS_URL").ok().filter(|s| !s.trim().is_empty());
        if redis_url.is_none() {
            info!("🪛️ PLATTER_REDIS_URL is not set. Guest carts and merge tokens will be kept in memory.");
        }
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let order_confirm_timeout = configure_confirm_timeout();
        let business_offset = configure_business_offset();
        let sweep_interval = env::var("PLATTER_SWEEP_INTERVAL")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for PLATTER_SWEEP_INTERVAL. {e}"))
                    .ok()
            })
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
        let confirmation_base_url = env::var("PLATTER_CONFIRMATION_BASE_URL")
            .map_err(|_| {
                warn!(
                    "🪛️ PLATTER_CONFIRMATION_BASE_URL is not set. Confirmation links will point to \
                     {DEFAULT_CONFIRMATION_BASE_URL}"
                )
            })
            .and_then(|s| {
                Url::parse(&s).map_err(|e| error!("🪛️ Invalid url in PLATTER_CONFIRMATION_BASE_URL ({s}). {e}"))
            })
            .unwrap_or_else(|_| default_confirmation_url());
        Self {
            host,
            port,
            database_url,
            run_migrations,
            redis_url,
            auth,
            order_confirm_timeout,
            business_offset,
            sweep_interval,
            confirmation_base_url,
        }
    }

    pub fn order_flow_settings(&self) -> OrderFlowSettings {
        OrderFlowSettings { business_offset: self.business_offset, confirm_timeout: self.order_confirm_timeout }
    }
}

fn configure_confirm_timeout() -> Duration {
    env::var("PLATTER_ORDER_CONFIRM_TIMEOUT")
        .map_err(|_| {
            info!(
                "🪛️ PLATTER_ORDER_CONFIRM_TIMEOUT is not set. Using the default value of \
                 {DEFAULT_CONFIRM_TIMEOUT_MINUTES} minutes."
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for PLATTER_ORDER_CONFIRM_TIMEOUT. {e}"))
                .and_then(|m| {
                    if m > 0 {
                        Ok(Duration::minutes(m))
                    } else {
                        warn!("🪛️ PLATTER_ORDER_CONFIRM_TIMEOUT must be positive. Got {m}.");
                        Err(())
                    }
                })
        })
        .unwrap_or_else(|_| Duration::minutes(DEFAULT_CONFIRM_TIMEOUT_MINUTES))
}

fn configure_business_offset() -> FixedOffset {
    match env::var("PLATTER_BUSINESS_UTC_OFFSET") {
        Ok(s) => parse_utc_offset(&s).unwrap_or_else(|| {
            error!("🪛️ {s} is not a valid UTC offset for PLATTER_BUSINESS_UTC_OFFSET. Expected e.g. +07:00. Using UTC.");
            Utc.fix()
        }),
        Err(_) => {
            info!("🪛️ PLATTER_BUSINESS_UTC_OFFSET is not set. Serving windows are checked against UTC.");
            Utc.fix()
        },
    }
}

/// Parses offsets of the form `+07:00`, `-03:30` or `Z`.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") {
        return Some(Utc.fix());
    }
    let sign = match s.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let (hours, minutes) = s[1..].split_once(':').unwrap_or((&s[1..], "0"));
    let hours = hours.parse::<i32>().ok()?;
    let minutes = minutes.parse::<i32>().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC secret used to sign and verify restaurant access tokens and identity merge tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every issued token becomes invalid on restart. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => {
                let key_data = json!({ "jwt_secret": secret }).to_string();
                match writeln!(f, "{key_data}") {
                    Ok(()) => warn!(
                        "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, \
                         you are doing it wrong! Set the PLATTER_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                        p.to_str().unwrap_or("???")
                    ),
                    Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
                }
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Result<Self, ServerError> {
        let secret = secret.into();
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "The JWT secret must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("PLATTER_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [PLATTER_JWT_SECRET]")))?;
        Self::new(secret)
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. It excludes secrets to avoid passing sensitive
/// information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub confirmation_base_url: Url,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { confirmation_base_url: config.confirmation_base_url.clone() }
    }
}
