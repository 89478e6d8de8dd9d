use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::chain::api::DEFAULT_API_BASE_URL;
use crate::chain::ChainId;
use crate::dashboard::Address;

/// Per-chain RPC endpoint override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcEndpoint {
    pub chain_id: ChainId,
    pub url: String,
}

/// Optional colour overrides, as `#RRGGBB` or `#RGB`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_dim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host serving `/api/dashboard/{address}`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Last connected account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    /// Refresh once whenever a shown auction reaches its end time
    #[serde(default = "default_true")]
    pub refresh_on_auction_end: bool,

    /// Periodic revalidation; off when unset or zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,

    /// Overrides for the built-in public RPC endpoints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rpc: Vec<RpcEndpoint>,

    #[serde(default)]
    pub theme: ThemeConfig,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            address: None,
            refresh_on_auction_end: true,
            refresh_interval_secs: None,
            rpc: Vec::new(),
            theme: ThemeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("daoboard");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Keep a broken file around for the user to fix
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// RPC endpoint per chain: built-in defaults with config overrides on top
    pub fn rpc_urls(&self) -> HashMap<ChainId, String> {
        let mut urls: HashMap<ChainId, String> = [
            ChainId::ETHEREUM,
            ChainId::OPTIMISM,
            ChainId::BASE,
            ChainId::ZORA,
            ChainId::SEPOLIA,
            ChainId::OPTIMISM_SEPOLIA,
            ChainId::BASE_SEPOLIA,
            ChainId::ZORA_SEPOLIA,
            ChainId::FOUNDRY,
        ]
        .into_iter()
        .filter_map(|id| id.default_rpc_url().map(|url| (id, url.to_string())))
        .collect();

        for endpoint in &self.rpc {
            urls.insert(endpoint.chain_id, endpoint.url.clone());
        }
        urls
    }

    pub fn refresh_interval(&self) -> Option<std::time::Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            api_base_url: "http://localhost:3000".to_string(),
            address: Some(Address::parse("0x000000000000000000000000000000000000dEaD").unwrap()),
            refresh_on_auction_end: false,
            refresh_interval_secs: Some(60),
            rpc: vec![RpcEndpoint {
                chain_id: ChainId::BASE,
                url: "https://base.example.org".to_string(),
            }],
            theme: ThemeConfig {
                accent: Some("#ffc107".to_string()),
                ..Default::default()
            },
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.refresh_on_auction_end);
        assert_eq!(config.api_base_url, "https://nouns.build");
        assert!(config.refresh_interval().is_none());
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("address = \"not-an-address\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_rpc_overrides() {
        let config: AppConfig = toml::from_str(
            r#"
            [[rpc]]
            chain_id = 8453
            url = "https://base.example.org"

            [[rpc]]
            chain_id = 42
            url = "http://localhost:8545"
            "#,
        )
        .unwrap();

        let urls = config.rpc_urls();
        assert_eq!(urls[&ChainId::BASE], "https://base.example.org");
        assert_eq!(urls[&ChainId(42)], "http://localhost:8545");
        assert_eq!(urls[&ChainId::ZORA], "https://rpc.zora.energy");
    }

    #[test]
    fn test_zero_interval_disables_refresh() {
        let config = AppConfig {
            refresh_interval_secs: Some(0),
            ..Default::default()
        };
        assert!(config.refresh_interval().is_none());
    }
}
