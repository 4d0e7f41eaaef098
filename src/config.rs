use std::{str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use tracing::warn;

pub const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:8080/v1/graphql";
pub const DEFAULT_WS_ENDPOINT: &str = "ws://localhost:8080/v1/graphql";
// Anyone holding this header owns the backing store. Only fit for local development.
pub const DEFAULT_ADMIN_SECRET: &str = "myadminsecretkey";

/// How an open chat view keeps its messages fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSync {
    Poll,
    Subscribe,
}

impl FromStr for ChatSync {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poll" => Ok(Self::Poll),
            "subscribe" | "subscription" => Ok(Self::Subscribe),
            other => Err(anyhow!("CHAT_SYNC must be `poll` or `subscribe`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_endpoint: String,
    pub ws_endpoint: String,
    pub admin_secret: String,
    pub bind_addr: String,
    pub poll_interval: Duration,
    pub chat_sync: ChatSync,
    pub register_redirect: Duration,
    pub session_inactivity: time::Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_endpoint: DEFAULT_HTTP_ENDPOINT.to_owned(),
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_owned(),
            admin_secret: DEFAULT_ADMIN_SECRET.to_owned(),
            bind_addr: "0.0.0.0:3000".to_owned(),
            poll_interval: Duration::from_secs(5),
            chat_sync: ChatSync::Poll,
            register_redirect: Duration::from_secs(2),
            session_inactivity: time::Duration::minutes(60),
        }
    }
}

impl Config {
    /// Reads the process environment, after merging in a `.env` file if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let http_endpoint = lookup("HASURA_HTTP")
            .or_else(|| lookup("HASURA_ENDPOINT"))
            .unwrap_or(defaults.http_endpoint);
        let ws_endpoint = lookup("HASURA_WS").unwrap_or(defaults.ws_endpoint);
        let admin_secret = match lookup("HASURA_ADMIN_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("HASURA_ADMIN_SECRET not set, falling back to the development secret");
                defaults.admin_secret
            }
        };
        let bind_addr = lookup("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let poll_interval = match lookup("POLL_INTERVAL_SECS") {
            Some(secs) => Duration::from_secs(parse_secs("POLL_INTERVAL_SECS", &secs)?),
            None => defaults.poll_interval,
        };
        if poll_interval.is_zero() {
            return Err(anyhow!("POLL_INTERVAL_SECS must be at least 1"));
        }
        let register_redirect = match lookup("REGISTER_REDIRECT_SECS") {
            Some(secs) => Duration::from_secs(parse_secs("REGISTER_REDIRECT_SECS", &secs)?),
            None => defaults.register_redirect,
        };
        let session_inactivity = match lookup("SESSION_INACTIVITY_MINUTES") {
            Some(mins) => {
                let mins = parse_secs("SESSION_INACTIVITY_MINUTES", &mins)?;
                time::Duration::minutes(i64::try_from(mins)?)
            }
            None => defaults.session_inactivity,
        };
        let chat_sync = match lookup("CHAT_SYNC") {
            Some(mode) => mode.parse()?,
            None => defaults.chat_sync,
        };

        Ok(Self {
            http_endpoint,
            ws_endpoint,
            admin_secret,
            bind_addr,
            poll_interval,
            chat_sync,
            register_redirect,
            session_inactivity,
        })
    }
}

fn parse_secs(key: &str, value: &str) -> anyhow::Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number, got `{value}`"))
}
