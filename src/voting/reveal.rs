use crate::models::{ANONYMOUS_VOTER, Scores, VoteDetail};
use std::collections::BTreeMap;

/// Read-only view of a finished session's results.
#[derive(Debug, Clone)]
pub struct ResultsView {
    pub host: String,
    pub scores: BTreeMap<String, f64>,
    pub detailed_votes: BTreeMap<String, Vec<VoteDetail>>,
    pub reveal_names: bool,
}

/// Builds the view from a copy of `scores`; the stored names are never touched.
pub fn reveal(host: &str, scores: &Scores, reveal_names: bool) -> ResultsView {
    let mut detailed_votes = scores.detailed_votes.clone();
    if !reveal_names {
        for host_votes in detailed_votes.values_mut() {
            for vote in host_votes.iter_mut() {
                vote.voter = ANONYMOUS_VOTER.to_string();
            }
        }
    }

    ResultsView {
        host: host.to_string(),
        scores: scores.totals.clone(),
        detailed_votes,
        reveal_names,
    }
}
