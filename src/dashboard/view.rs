use super::cache::CacheEntry;
use super::{Address, LiveDao};

pub const EMPTY_PROPOSALS_TITLE: &str = "No Active Proposals";
pub const EMPTY_PROPOSALS_BODY: &str = "Currently, none of your DAOs have proposals that are in active, queue, or pending states. Check back later!";

/// What the dashboard screen shows, in priority order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewState<'a> {
    Error,
    Loading,
    Unconnected,
    Loaded(&'a [LiveDao]),
}

impl<'a> ViewState<'a> {
    /// `mutating` is set while an explicit refresh is in flight; it keeps the
    /// screen on the loaded data instead of flashing the loading state.
    pub fn resolve(
        address: Option<&Address>,
        entry: Option<&'a CacheEntry<Vec<LiveDao>>>,
        mutating: bool,
    ) -> Self {
        if entry.is_some_and(|e| e.error.is_some()) {
            return ViewState::Error;
        }
        if entry.is_some_and(|e| e.is_validating()) && !mutating {
            return ViewState::Loading;
        }
        if address.is_none() {
            return ViewState::Unconnected;
        }
        match entry.and_then(|e| e.data.as_deref()) {
            Some(daos) => ViewState::Loaded(daos),
            // Connected but the first fetch has not been issued yet
            None => ViewState::Loading,
        }
    }
}

/// Proposal half of the loaded screen
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalSection<'a> {
    /// DAOs with at least one live proposal, in server order
    Live(Vec<&'a LiveDao>),
    Empty,
}

/// The loaded screen: one auction card per DAO, plus proposals
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSections<'a> {
    pub auction_cards: &'a [LiveDao],
    pub proposals: ProposalSection<'a>,
}

pub fn has_live_proposals(daos: &[LiveDao]) -> bool {
    daos.iter().any(|dao| !dao.proposals.is_empty())
}

pub fn sections(daos: &[LiveDao]) -> DashboardSections<'_> {
    let proposals = if has_live_proposals(daos) {
        ProposalSection::Live(daos.iter().filter(|dao| !dao.proposals.is_empty()).collect())
    } else {
        ProposalSection::Empty
    };

    DashboardSections {
        auction_cards: daos,
        proposals,
    }
}
