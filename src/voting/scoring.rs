use crate::models::{HostVotes, Scores, VoteDetail};
use std::collections::BTreeMap;

/// Detail entries follow the order the ballots were handed in.
pub fn calculate_scores(votes: &BTreeMap<String, HostVotes>) -> Scores {
    let mut scores = Scores::default();

    for (host, host_votes) in votes {
        let mut voter_scores: Vec<f64> = Vec::new();
        let mut details = Vec::new();

        // Opt-outs neither count towards the mean nor show up in the detail
        for (voter, ballot) in host_votes.iter() {
            let Some(rating) = ballot.rating() else {
                continue;
            };
            voter_scores.push(rating.score());
            details.push(VoteDetail {
                voter: voter.to_string(),
                food: rating.food,
                creativity: rating.creativity,
                activity: rating.activity,
                global: rating.weighted_global(),
            });
        }

        let host_score = if voter_scores.is_empty() {
            0.0
        } else {
            voter_scores.iter().sum::<f64>() / voter_scores.len() as f64
        };

        scores.totals.insert(host.clone(), host_score);
        scores.detailed_votes.insert(host.clone(), details);
    }

    scores
}
