pub mod reveal;
pub mod scoring;

use crate::error::{Error, Result};
use crate::models::{Ballot, Session, Stage};
use chrono::Utc;
use log::{debug, info};

/// Records one voter's ballot for the session's host.
///
/// The voter has to still be pending. Once the last pending voter is in, the
/// scores are calculated and the session moves to the results stage.
pub fn record_vote(session: &mut Session, voter: &str, ballot: Ballot) -> Result<Stage> {
    if session.stage != Stage::Voting {
        return Err(Error::VotingClosed(session.host.clone()));
    }

    let position = session
        .voters
        .iter()
        .position(|v| v == voter)
        .ok_or_else(|| Error::VoterNotPending(voter.to_string()))?;

    session
        .votes
        .entry(session.host.clone())
        .or_default()
        .insert(voter.to_string(), ballot);
    session.voters.remove(position);
    debug!(
        "Recorded {} for host '{}' from '{}', {} voter(s) left",
        if ballot == Ballot::OptedOut { "opt-out" } else { "rating" },
        session.host,
        voter,
        session.voters.len()
    );

    if session.voters.is_empty() {
        session.scores = Some(scoring::calculate_scores(&session.votes));
        session.stage = Stage::Results;
        session.completed_at = Some(Utc::now());
        info!("All votes are in for '{}', results are ready", session.host);
    }

    Ok(session.stage)
}
