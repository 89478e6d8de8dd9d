//! Formatting helpers shared by the auction cards and proposal tables

use crate::dashboard::{parse_wei, EnrichedProposal};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Wei amount as ETH with at most four decimals, e.g. `0.0125 ETH`
pub fn format_eth(wei: u128) -> String {
    let whole = wei / WEI_PER_ETH;
    // round half up at the 4th decimal
    let frac = (wei % WEI_PER_ETH + 50_000_000_000_000) / 100_000_000_000_000;
    let (whole, frac) = if frac >= 10_000 { (whole + 1, 0) } else { (whole, frac) };

    if frac == 0 {
        return format!("{} ETH", whole);
    }
    let frac = format!("{:04}", frac);
    format!("{}.{} ETH", whole, frac.trim_end_matches('0'))
}

/// Same as `format_eth` for a decimal wei string; unparsable input shows as-is
pub fn format_wei_str(wei: &str) -> String {
    match parse_wei(wei) {
        Ok(amount) => format_eth(amount),
        Err(_) => wei.to_string(),
    }
}

/// `2d 4h`, `3h 12m`, `5m 09s`, `42s`
pub fn format_countdown(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let mins = (secs % 3_600) / 60;
    let s = secs % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, s)
    } else {
        format!("{}s", s)
    }
}

/// When voting opens/closes relative to `now`
pub fn voting_window(proposal: &EnrichedProposal, now: u64) -> String {
    let p = &proposal.proposal;
    if now < p.vote_start {
        format!("starts in {}", format_countdown(p.vote_start - now))
    } else if now < p.vote_end {
        format!("ends in {}", format_countdown(p.vote_end - now))
    } else {
        "voting closed".to_string()
    }
}

/// `12 / 2 / 1 (q 5)`: for / against / abstain, quorum
pub fn vote_tally(proposal: &EnrichedProposal) -> String {
    let p = &proposal.proposal;
    format!(
        "{} / {} / {} (q {})",
        p.for_votes, p.against_votes, p.abstain_votes, p.quorum_votes
    )
}
