//! Dashboard view-models
//!
//! A `DashboardDao` is one organisation the connected account holds tokens
//! in, as returned by the dashboard API. Its proposals start out raw
//! (`Proposal`) and are replaced wholesale by `EnrichedProposal`s once the
//! governor has been asked for each proposal's state.

pub mod cache;
pub mod loader;
pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chain::ChainId;
use crate::error::DashboardError;

/// Proposal states that still need attention from token holders
pub const LIVE_PROPOSAL_STATES: [ProposalState; 3] = [
    ProposalState::Active,
    ProposalState::Pending,
    ProposalState::Queued,
];

/// Wallet address of the connected account (`0x` + 40 hex digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self, DashboardError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| DashboardError::InvalidAddress(trimmed.to_string()))?;

        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DashboardError::InvalidAddress(trimmed.to_string()));
        }

        Ok(Self(format!("0x{}", hex)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `0x1234…cdef`
    pub fn short(&self) -> String {
        shorten_hex(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Shorten any 0x-prefixed hex string for display
pub fn shorten_hex(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 12 {
        return value.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Governor proposal lifecycle, in the contract's enum order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
    Vetoed,
}

impl ProposalState {
    pub fn is_live(self) -> bool {
        LIVE_PROPOSAL_STATES.contains(&self)
    }

    pub fn label(self) -> &'static str {
        match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Canceled => "Canceled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
            ProposalState::Vetoed => "Vetoed",
        }
    }
}

impl TryFrom<u8> for ProposalState {
    type Error = DashboardError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        Ok(match ordinal {
            0 => ProposalState::Pending,
            1 => ProposalState::Active,
            2 => ProposalState::Canceled,
            3 => ProposalState::Defeated,
            4 => ProposalState::Succeeded,
            5 => ProposalState::Queued,
            6 => ProposalState::Expired,
            7 => ProposalState::Executed,
            8 => ProposalState::Vetoed,
            other => return Err(DashboardError::InvalidProposalState(other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionConfig {
    /// Percentage a new bid must exceed the current one by
    pub minimum_bid_increment: String,
    /// Wei
    pub reserve_price: String,
}

impl AuctionConfig {
    /// Lowest bid (in wei) the auction will accept next
    pub fn minimum_next_bid(&self, highest_bid: Option<u128>) -> Result<u128, DashboardError> {
        match highest_bid {
            None => parse_wei(&self.reserve_price),
            Some(highest) => {
                let increment = parse_wei(&self.minimum_bid_increment)?;
                Ok(highest.saturating_add(highest.saturating_mul(increment) / 100))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    /// Wei
    pub amount: String,
    pub bidder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionToken {
    #[serde(deserialize_with = "numeric::as_string")]
    pub token_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAuction {
    /// Unix seconds
    #[serde(deserialize_with = "numeric::as_u64")]
    pub end_time: u64,
    #[serde(default)]
    pub highest_bid: Option<Bid>,
    pub token: AuctionToken,
}

impl CurrentAuction {
    pub fn highest_bid_wei(&self) -> Result<Option<u128>, DashboardError> {
        self.highest_bid
            .as_ref()
            .map(|bid| parse_wei(&bid.amount))
            .transpose()
    }

    pub fn seconds_remaining(&self, now: u64) -> u64 {
        self.end_time.saturating_sub(now)
    }

    pub fn has_ended(&self, now: u64) -> bool {
        now >= self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDao {
    pub governor_address: String,
}

/// Proposal as indexed by the subgraph; carries no lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    /// bytes32, 0x-prefixed
    pub proposal_id: String,
    #[serde(deserialize_with = "numeric::as_u64")]
    pub proposal_number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub vote_start: u64,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub vote_end: u64,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub for_votes: u64,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub against_votes: u64,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub abstain_votes: u64,
    #[serde(default, deserialize_with = "numeric::as_u64")]
    pub quorum_votes: u64,
    pub dao: ProposalDao,
}

/// A proposal together with the state its governor reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProposal {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub proposal_state: ProposalState,
}

/// One DAO on the dashboard, generic over how far its proposals are resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "P: Deserialize<'de>"))]
pub struct DashboardDao<P> {
    pub name: String,
    pub token_address: String,
    #[serde(default)]
    pub auction_address: String,
    pub chain_id: ChainId,
    #[serde(default)]
    pub dao_image: String,
    pub auction_config: AuctionConfig,
    #[serde(default)]
    pub proposals: Vec<P>,
    pub current_auction: CurrentAuction,
}

/// DAO exactly as the dashboard API returned it
pub type RawDao = DashboardDao<Proposal>;

/// DAO whose proposals are enriched and filtered down to live ones
pub type LiveDao = DashboardDao<EnrichedProposal>;

impl<P> DashboardDao<P> {
    /// Copy of this DAO carrying a different proposal list
    pub fn with_proposals<Q>(&self, proposals: Vec<Q>) -> DashboardDao<Q> {
        DashboardDao {
            name: self.name.clone(),
            token_address: self.token_address.clone(),
            auction_address: self.auction_address.clone(),
            chain_id: self.chain_id,
            dao_image: self.dao_image.clone(),
            auction_config: self.auction_config.clone(),
            proposals,
            current_auction: self.current_auction.clone(),
        }
    }

    /// Stable identity of the DAO's auction card
    pub fn card_key(&self) -> String {
        format!("{}:{}", self.token_address, self.current_auction.token.token_id)
    }
}

pub fn parse_wei(value: &str) -> Result<u128, DashboardError> {
    value
        .trim()
        .parse::<u128>()
        .map_err(|_| DashboardError::InvalidAmount(value.to_string()))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The subgraph serialises BigInt as strings and Int as numbers; the API
/// passes either through.
mod numeric {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn as_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(n),
            StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }

    pub fn as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(n.to_string()),
            StringOrNumber::String(s) => Ok(s),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub const GOVERNOR: &str = "0x9c8ff314c9bc7f6e59a9d9225fb22946427edc03";

    pub fn proposal(number: u64) -> Proposal {
        Proposal {
            proposal_id: format!("0x{:064x}", number),
            proposal_number: number,
            title: Some(format!("Proposal {}", number)),
            vote_start: 1_700_000_000,
            vote_end: 1_700_600_000,
            for_votes: 10,
            against_votes: 2,
            abstain_votes: 1,
            quorum_votes: 5,
            dao: ProposalDao {
                governor_address: GOVERNOR.to_string(),
            },
        }
    }

    pub fn dao(name: &str, proposals: Vec<Proposal>) -> RawDao {
        DashboardDao {
            name: name.to_string(),
            token_address: format!("0x{:0>40}", name.len()),
            auction_address: "0x658d3a1b6dabcfbaa8b75cc182bf33efefdc200d".to_string(),
            chain_id: ChainId::BASE,
            dao_image: format!("ipfs://{}", name),
            auction_config: AuctionConfig {
                minimum_bid_increment: "10".to_string(),
                reserve_price: "10000000000000000".to_string(),
            },
            proposals,
            current_auction: CurrentAuction {
                end_time: 1_700_000_000,
                highest_bid: None,
                token: AuctionToken {
                    token_id: "42".to_string(),
                    name: format!("{} #42", name),
                    image: None,
                },
            },
        }
    }

    pub fn address() -> Address {
        Address::parse("0x000000000000000000000000000000000000dEaD").unwrap()
    }
}
