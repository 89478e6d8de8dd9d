//! Governor proposal-state lookups over JSON-RPC
//!
//! The state is read with an `eth_call` of `state(bytes32)` on the DAO's
//! governor contract, which returns the `ProposalState` ordinal as a single
//! ABI-encoded word.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::ChainId;
use crate::dashboard::loader::ProposalStateSource;
use crate::dashboard::ProposalState;
use crate::error::DashboardError;

/// First four bytes of keccak256("state(bytes32)")
const STATE_SELECTOR: &str = "61d585da";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (CallParams<'a>, &'static str),
}

#[derive(Debug, Serialize)]
struct CallParams<'a> {
    to: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse {
    Success { result: String },
    Error { error: RpcError },
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Clone)]
pub struct GovernorClient {
    rpc_urls: HashMap<ChainId, String>,
    client: reqwest::Client,
}

impl GovernorClient {
    pub fn new(rpc_urls: HashMap<ChainId, String>) -> Self {
        Self {
            rpc_urls,
            client: reqwest::Client::new(),
        }
    }

    fn rpc_url(&self, chain_id: ChainId) -> Result<&str, DashboardError> {
        self.rpc_urls
            .get(&chain_id)
            .map(String::as_str)
            .ok_or(DashboardError::UnknownChain(chain_id))
    }
}

impl ProposalStateSource for GovernorClient {
    async fn proposal_state(
        &self,
        chain_id: ChainId,
        governor_address: &str,
        proposal_id: &str,
    ) -> Result<ProposalState, DashboardError> {
        let url = self.rpc_url(chain_id)?;
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "eth_call",
            params: (
                CallParams {
                    to: governor_address,
                    data: encode_state_call(proposal_id)?,
                },
                "latest",
            ),
        };

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        match serde_json::from_str(&text)? {
            RpcResponse::Success { result } => {
                let state = decode_state(&result)?;
                debug!(%chain_id, governor = governor_address, proposal_id, ?state, "eth_call state");
                Ok(state)
            }
            RpcResponse::Error { error } => Err(DashboardError::Rpc(format!(
                "{} (code {})",
                error.message, error.code
            ))),
        }
    }
}

/// Calldata for `state(bytes32 proposalId)`
pub fn encode_state_call(proposal_id: &str) -> Result<String, DashboardError> {
    let hex = proposal_id
        .strip_prefix("0x")
        .unwrap_or(proposal_id);

    if hex.is_empty() || hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DashboardError::InvalidProposalId(proposal_id.to_string()));
    }

    Ok(format!("0x{}{:0>64}", STATE_SELECTOR, hex.to_ascii_lowercase()))
}

/// Decode the single `uint8` word returned by `state(bytes32)`
pub fn decode_state(result: &str) -> Result<ProposalState, DashboardError> {
    let hex = result.strip_prefix("0x").unwrap_or(result);
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DashboardError::Rpc(format!("unexpected eth_call result: {}", result)));
    }

    let (high, low) = hex.split_at(62);
    if high.chars().any(|c| c != '0') {
        return Err(DashboardError::Rpc(format!("state out of range: {}", result)));
    }

    let ordinal = u8::from_str_radix(low, 16)
        .map_err(|_| DashboardError::Rpc(format!("unexpected eth_call result: {}", result)))?;
    ProposalState::try_from(ordinal)
}
