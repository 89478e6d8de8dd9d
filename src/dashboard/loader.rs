//! Dashboard data loader
//!
//! Fetches the DAOs an account belongs to, asks each DAO's governor for the
//! state of every proposal, and keeps only the proposals that are still
//! live. Lookups fan out concurrently at two levels (across DAOs, and across
//! the proposals of one DAO) and each level is an all-or-nothing join.

use futures::future::{try_join_all, FutureExt};
use std::future::Future;
use tracing::{debug, info};

use super::{Address, EnrichedProposal, LiveDao, Proposal, ProposalState, RawDao};
use crate::chain::ChainId;
use crate::error::DashboardError;

/// Source of the raw DAO list for an account
pub trait DaoSource {
    fn fetch_user_daos(
        &self,
        address: &Address,
    ) -> impl Future<Output = Result<Vec<RawDao>, DashboardError>> + Send;
}

/// Source of a proposal's current lifecycle state
pub trait ProposalStateSource {
    fn proposal_state(
        &self,
        chain_id: ChainId,
        governor_address: &str,
        proposal_id: &str,
    ) -> impl Future<Output = Result<ProposalState, DashboardError>> + Send;
}

pub struct DashboardLoader<D, P> {
    daos: D,
    states: P,
}

impl<D, P> DashboardLoader<D, P>
where
    D: DaoSource + Sync,
    P: ProposalStateSource + Sync,
{
    pub fn new(daos: D, states: P) -> Self {
        Self { daos, states }
    }

    pub async fn fetch_user_daos(&self, address: &Address) -> Result<Vec<RawDao>, DashboardError> {
        self.daos.fetch_user_daos(address).await
    }

    /// Resolve the state of every proposal of `dao` and drop the ones that
    /// are no longer live. Proposal order is preserved.
    pub async fn enrich_dao(&self, dao: &RawDao) -> Result<LiveDao, DashboardError> {
        let lookups = dao
            .proposals
            .iter()
            .map(|proposal| self.resolve_proposal(dao, proposal).boxed());

        let live = try_join_all(lookups)
            .await?
            .into_iter()
            .filter(|proposal| proposal.proposal_state.is_live())
            .collect();

        Ok(dao.with_proposals(live))
    }

    async fn resolve_proposal(
        &self,
        dao: &RawDao,
        proposal: &Proposal,
    ) -> Result<EnrichedProposal, DashboardError> {
        let proposal_state = self
            .states
            .proposal_state(
                dao.chain_id,
                &proposal.dao.governor_address,
                &proposal.proposal_id,
            )
            .await?;

        debug!(
            dao = %dao.name,
            proposal = proposal.proposal_number,
            state = proposal_state.label(),
            "Resolved proposal state"
        );

        Ok(EnrichedProposal {
            proposal: proposal.clone(),
            proposal_state,
        })
    }

    /// Everything the dashboard shows for `address`, in server order
    pub async fn assemble(&self, address: &Address) -> Result<Vec<LiveDao>, DashboardError> {
        let daos = self.fetch_user_daos(address).await?;
        info!(address = %address, daos = daos.len(), "Fetched dashboard DAOs");

        let resolved = try_join_all(daos.iter().map(|dao| self.enrich_dao(dao).boxed())).await?;

        let live: usize = resolved.iter().map(|dao| dao.proposals.len()).sum();
        info!(address = %address, live_proposals = live, "Dashboard assembled");

        Ok(resolved)
    }
}
