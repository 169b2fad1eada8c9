// Giveaway Bot - Eligibility
use crate::error::GiveawayResult;
use crate::gateway::ChatGateway;
use crate::state::{Round, UserId};
use crate::store::GiveawayStore;

/// Why a candidate may not enter. Order of declaration is check order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Blacklisted,
    RecentWinner,
    NoDestination,
    InsufficientStanding,
    AlreadyEntered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryOutcome {
    Admit,
    Reject(RejectReason),
}

/// Inputs of the entry gate that do not come from the store
#[derive(Clone, Copy, Debug)]
pub struct EligibilityRules<'a> {
    /// Resolved rounds before the active one a winner sits out
    pub lookback: usize,
    /// Role the candidate needs in the server
    pub standing_role: &'a str,
}

/// True when `candidate` won any of `rounds`
pub fn won_any(rounds: &[Round], candidate: UserId) -> bool {
    rounds.iter().any(|round| round.winner == Some(candidate))
}

/// Run the entry gate for `candidate` against the active round.
///
/// Checks run in `RejectReason` order and stop at the first failure, so the
/// live role lookup only happens for candidates that pass every store check.
/// Nothing is written.
pub async fn evaluate(
    store: &dyn GiveawayStore,
    gateway: &dyn ChatGateway,
    rules: EligibilityRules<'_>,
    candidate: UserId,
) -> GiveawayResult<EntryOutcome> {
    if store.is_blacklisted(candidate).await? {
        return Ok(EntryOutcome::Reject(RejectReason::Blacklisted));
    }

    let history = store.recent_rounds(rules.lookback).await?;
    if won_any(&history, candidate) {
        return Ok(EntryOutcome::Reject(RejectReason::RecentWinner));
    }

    if !store.has_destination(candidate).await? {
        return Ok(EntryOutcome::Reject(RejectReason::NoDestination));
    }

    if !gateway.has_role(candidate, rules.standing_role).await? {
        return Ok(EntryOutcome::Reject(RejectReason::InsufficientStanding));
    }

    if store.is_entered(candidate).await? {
        return Ok(EntryOutcome::Reject(RejectReason::AlreadyEntered));
    }

    Ok(EntryOutcome::Admit)
}
