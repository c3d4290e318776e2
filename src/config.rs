use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// PostgreSQL connection URL for the durable backend. When absent the
    /// service runs against the in-memory store only.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Bearer token guarding /api/admin/*. Admin routes are disabled when
    /// no token is configured.
    #[serde(default)]
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    /// Bound on every durable-backend call before falling back in-memory.
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout_ms: 2000 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExchangeConfig {
    /// Destination address for the inbound crypto leg of every order.
    pub payment_address: String,
    pub order_ttl_minutes: i64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            payment_address: "UQCS3J9NntTQTrhpmYcCk45tO3iH2H-6vq5fqqrqKCGhT8bG".to_string(),
            order_ttl_minutes: 30,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
