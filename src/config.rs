use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tokens are issued by the hosted auth provider; only the shared signing
/// secret is needed to verify them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Flat home-delivery fee in UGX. Pickup is always free.
    pub delivery_fee: i64,
    pub currency: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            delivery_fee: 15_000,
            currency: "UGX".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// Settle mobile-money payments locally after `settlement_delay_secs`
    /// instead of waiting for the provider webhook.
    pub simulate_settlement: bool,
    pub settlement_delay_secs: u64,
    /// Mobile-money payments still processing after this long are failed by
    /// the background sweeper.
    pub stale_after_secs: i64,
    #[serde(default)]
    pub webhook_secret: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            simulate_settlement: true,
            settlement_delay_secs: 5,
            stale_after_secs: 15 * 60,
            webhook_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_address: String,
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_address: "Artisan Market <orders@artisanmarket.ug>".to_string(),
            base_url: "https://api.resend.com".to_string(),
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No file: the database URL is the one setting without a usable default
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: "0.0.0.0".to_string(),
                        port: 8080,
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: 10,
                    },
                    jwt: JwtConfig {
                        secret: "change-me-in-production".to_string(),
                    },
                    checkout: CheckoutConfig::default(),
                    payment: PaymentConfig::default(),
                    email: EmailConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    /// Environment variables win over file values.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env_parse("SERVER_PORT") {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env_parse("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(fee) = get_env_parse("CHECKOUT_DELIVERY_FEE") {
            self.checkout.delivery_fee = fee;
        }
        if let Some(v) = get_env("CHECKOUT_CURRENCY") {
            self.checkout.currency = v;
        }
        if let Some(b) = get_env_parse("PAYMENT_SIMULATE_SETTLEMENT") {
            self.payment.simulate_settlement = b;
        }
        if let Some(n) = get_env_parse("PAYMENT_SETTLEMENT_DELAY_SECS") {
            self.payment.settlement_delay_secs = n;
        }
        if let Some(n) = get_env_parse("PAYMENT_STALE_AFTER_SECS") {
            self.payment.stale_after_secs = n;
        }
        if let Some(v) = get_env("MOMO_WEBHOOK_SECRET") {
            self.payment.webhook_secret = v;
        }
        if let Some(v) = get_env("RESEND_API_KEY") {
            self.email.api_key = v;
        }
        if let Some(v) = get_env("EMAIL_FROM_ADDRESS") {
            self.email.from_address = v;
        }
        if let Some(v) = get_env("EMAIL_BASE_URL") {
            self.email.base_url = v;
        }
    }
}
