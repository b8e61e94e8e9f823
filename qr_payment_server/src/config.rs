use std::env;

use log::*;
use mercado_tools::MercadoConfig;
use qpg_common::{parse_boolean_flag, Secret};

const DEFAULT_QPG_HOST: &str = "127.0.0.1";
const DEFAULT_QPG_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Webhook signature policy: the toggle and the shared secret.
    pub webhook_auth: WebhookAuthConfig,
    /// Provider API client configuration.
    pub mercado: MercadoConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_QPG_HOST.to_string(),
            port: DEFAULT_QPG_PORT,
            database_url: String::default(),
            webhook_auth: WebhookAuthConfig::default(),
            mercado: MercadoConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("QPG_HOST").ok().unwrap_or_else(|| DEFAULT_QPG_HOST.into());
        let port = env::var("QPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for QPG_PORT. {e} Using the default, {DEFAULT_QPG_PORT}, instead."
                    );
                    DEFAULT_QPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_QPG_PORT);
        let database_url = env::var("QPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ QPG_DATABASE_URL is not set. Please set it to the URL for the QPG database.");
            String::default()
        });
        let webhook_auth = WebhookAuthConfig::from_env_or_default();
        let mercado = MercadoConfig::new_from_env_or_default();
        Self { host, port, database_url, webhook_auth, mercado }
    }
}

//-------------------------------------------  WebhookAuthConfig  ------------------------------------------------------

/// The webhook signature policy. Verification is strict only when checks are enabled AND a secret
/// is configured; a missing secret downgrades to bypass so that local development works without
/// provider credentials, but never quietly.
#[derive(Clone, Debug, Default)]
pub struct WebhookAuthConfig {
    pub signature_checks: bool,
    pub secret: Secret<String>,
}

impl WebhookAuthConfig {
    pub fn from_env_or_default() -> Self {
        let signature_checks = parse_boolean_flag(env::var("QPG_WEBHOOK_SIGNATURE_CHECKS").ok(), true);
        let secret = env::var("QPG_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()).map(Secret::new);
        match (&secret, signature_checks) {
            (Some(_), true) => info!("🪛️ Webhook signature checks are ON. Unsigned deliveries will be rejected."),
            (Some(_), false) => warn!(
                "🪛️ A webhook secret is configured but QPG_WEBHOOK_SIGNATURE_CHECKS is off. Deliveries will NOT be \
                 verified."
            ),
            (None, true) => warn!(
                "🚨️🚨️🚨️ QPG_WEBHOOK_SECRET is not set. Webhook signatures WILL NOT BE VERIFIED this session. Do not \
                 run a production instance like this. 🚨️🚨️🚨️"
            ),
            (None, false) => info!("🪛️ Webhook signature checks are disabled."),
        }
        Self { signature_checks, secret: secret.unwrap_or_default() }
    }

    pub fn with_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.secret = Secret::new(secret.into());
        self
    }

    /// True when failed verification must reject the delivery with a 401.
    pub fn strict(&self) -> bool {
        self.signature_checks && !self.secret.reveal().is_empty()
    }
}
