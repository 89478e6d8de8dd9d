use thiserror::Error;

use crate::chain::ChainId;

/// Failures while loading dashboard data.
///
/// Any of these fails the whole load: a single bad proposal lookup is
/// reported the same way as a failed dashboard fetch.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("No RPC endpoint configured for chain {0}")]
    UnknownChain(ChainId),

    #[error("Invalid proposal id: {0}")]
    InvalidProposalId(String),

    #[error("Unknown proposal state ordinal: {0}")]
    InvalidProposalState(u8),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}
