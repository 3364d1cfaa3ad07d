//! Application configuration loaded from environment variables.

use fulfillment::GatewayConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `GATEWAY_MERCHANT_CODE` — merchant id at the payment gateway
/// - `GATEWAY_SECRET` — shared secret for signing and verification
/// - `GATEWAY_PAY_URL` — gateway redirect base URL
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub gateway_merchant_code: String,
    pub gateway_secret: String,
    pub gateway_pay_url: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            gateway_merchant_code: std::env::var("GATEWAY_MERCHANT_CODE")
                .unwrap_or_else(|_| "SHOP001".to_string()),
            gateway_secret: std::env::var("GATEWAY_SECRET")
                .unwrap_or_else(|_| "dev-secret".to_string()),
            gateway_pay_url: std::env::var("GATEWAY_PAY_URL")
                .unwrap_or_else(|_| "https://sandbox.gateway.example/pay".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the gateway configuration slice of this config.
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            merchant_code: self.gateway_merchant_code.clone(),
            secret: self.gateway_secret.clone(),
            pay_url: self.gateway_pay_url.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            gateway_merchant_code: "SHOP001".to_string(),
            gateway_secret: "dev-secret".to_string(),
            gateway_pay_url: "https://sandbox.gateway.example/pay".to_string(),
        }
    }
}
