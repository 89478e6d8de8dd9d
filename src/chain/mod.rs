pub mod api;
pub mod governor;

use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM chain identifier as reported by the dashboard API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM: ChainId = ChainId(1);
    pub const OPTIMISM: ChainId = ChainId(10);
    pub const BASE: ChainId = ChainId(8453);
    pub const ZORA: ChainId = ChainId(7777777);
    pub const SEPOLIA: ChainId = ChainId(11155111);
    pub const OPTIMISM_SEPOLIA: ChainId = ChainId(11155420);
    pub const BASE_SEPOLIA: ChainId = ChainId(84532);
    pub const ZORA_SEPOLIA: ChainId = ChainId(999999999);
    pub const FOUNDRY: ChainId = ChainId(31337);

    /// Human readable network name, if the chain is one we know about
    pub fn name(self) -> Option<&'static str> {
        KNOWN_CHAINS
            .iter()
            .find(|(id, _, _)| *id == self)
            .map(|(_, name, _)| *name)
    }

    /// Public RPC endpoint used when the config has no override
    pub fn default_rpc_url(self) -> Option<&'static str> {
        KNOWN_CHAINS
            .iter()
            .find(|(id, _, _)| *id == self)
            .and_then(|(_, _, url)| *url)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "chain {}", self.0),
        }
    }
}

// (id, display name, default public RPC)
const KNOWN_CHAINS: &[(ChainId, &str, Option<&str>)] = &[
    (ChainId::ETHEREUM, "Ethereum", Some("https://cloudflare-eth.com")),
    (ChainId::OPTIMISM, "Optimism", Some("https://mainnet.optimism.io")),
    (ChainId::BASE, "Base", Some("https://mainnet.base.org")),
    (ChainId::ZORA, "Zora", Some("https://rpc.zora.energy")),
    (ChainId::SEPOLIA, "Sepolia", Some("https://rpc.sepolia.org")),
    (ChainId::OPTIMISM_SEPOLIA, "Optimism Sepolia", Some("https://sepolia.optimism.io")),
    (ChainId::BASE_SEPOLIA, "Base Sepolia", Some("https://sepolia.base.org")),
    (ChainId::ZORA_SEPOLIA, "Zora Sepolia", Some("https://sepolia.rpc.zora.energy")),
    (ChainId::FOUNDRY, "Foundry", Some("http://127.0.0.1:8545")),
];
