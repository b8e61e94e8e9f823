use std::time::Duration;

use log::*;
use qpg_common::Secret;

pub const DEFAULT_MP_API_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_MP_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct MercadoConfig {
    pub base_url: String,
    pub access_token: Secret<String>,
    /// Upper bound on any single provider query. Keeps webhook handling responsive when the
    /// provider is slow; a hit is reported as [`crate::MercadoApiError::Timeout`].
    pub timeout: Duration,
}

impl Default for MercadoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MP_API_URL.to_string(),
            access_token: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_MP_TIMEOUT_SECS),
        }
    }
}

impl MercadoConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("QPG_MP_BASE_URL").unwrap_or_else(|_| {
            debug!("QPG_MP_BASE_URL not set, using {DEFAULT_MP_API_URL}");
            DEFAULT_MP_API_URL.to_string()
        });
        let access_token = Secret::new(std::env::var("QPG_MP_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("QPG_MP_ACCESS_TOKEN not set. Provider queries will be rejected as unauthorized");
            String::default()
        }));
        let timeout = std::env::var("QPG_MP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| {
                debug!("QPG_MP_TIMEOUT_SECS not set, using {DEFAULT_MP_TIMEOUT_SECS}s");
                Duration::from_secs(DEFAULT_MP_TIMEOUT_SECS)
            });
        Self { base_url, access_token, timeout }
    }
}
