//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SUPABASE_URL` (required): Base URL of the remote store, e.g. `https://abc.supabase.co`
/// - `SUPABASE_KEY` (required): API key sent with every store request
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `BALANCE_RETRY_LIMIT` (optional): Retries after a balance write conflict, defaults to 3
/// - `REQUEST_TIMEOUT_SECS` (optional): Timeout for a single store call, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub supabase_url: String,

    pub supabase_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_retry_limit")]
    pub balance_retry_limit: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_retry_limit() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., SUPABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        Self::from_vars(std::env::vars())
    }

    /// Deserialize from an explicit variable list.
    ///
    /// Field names are matched case-insensitively: `SUPABASE_URL` -> `supabase_url`.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }
}
