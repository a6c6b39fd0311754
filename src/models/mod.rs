use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, RangeInclusive};

use crate::error::{Error, Result};

/// Key under which per-voter detail sits inside a `Scores` object.
pub const DETAILED_VOTES_KEY: &str = "detailed_votes";

/// Placeholder shown instead of a voter's name in anonymous results.
pub const ANONYMOUS_VOTER: &str = "Anonymous";

pub fn session_key(host: &str) -> String {
    format!("{}_session", host)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Voting,
    Results,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Voting => "voting",
            Stage::Results => "results",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub host: String,
    pub votes: BTreeMap<String, HostVotes>,
    pub voters: Vec<String>,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A fresh session where everyone but the host still has to vote.
    pub fn new(host: String, participants: &[String]) -> Self {
        let voters = participants
            .iter()
            .filter(|name| **name != host)
            .cloned()
            .collect();

        let mut votes = BTreeMap::new();
        votes.insert(host.clone(), HostVotes::default());

        Self {
            host,
            votes,
            voters,
            stage: Stage::Voting,
            scores: None,
            version: 0,
            created_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    pub fn key(&self) -> String {
        session_key(&self.host)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub food: i32,
    pub creativity: i32,
    pub activity: i32,
    pub global: i32,
}

impl Rating {
    pub const GLOBAL_WEIGHT: f64 = 1.2;

    pub fn weighted_global(&self) -> f64 {
        self.global as f64 * Self::GLOBAL_WEIGHT
    }

    pub fn score(&self) -> f64 {
        self.food as f64 + self.creativity as f64 + self.activity as f64 + self.weighted_global()
    }

    pub fn validate(&self, scale: &RangeInclusive<i32>) -> Result<()> {
        let fields = [
            ("food", self.food),
            ("creativity", self.creativity),
            ("activity", self.activity),
            ("global", self.global),
        ];
        for (field, value) in fields {
            if !scale.contains(&value) {
                return Err(Error::RatingOutOfRange {
                    field,
                    value,
                    min: *scale.start(),
                    max: *scale.end(),
                });
            }
        }
        Ok(())
    }
}

/// What a voter handed in: a rating, or the `"opt_out"` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BallotRepr", into = "BallotRepr")]
pub enum Ballot {
    Rated(Rating),
    OptedOut,
}

impl Ballot {
    pub fn rating(&self) -> Option<&Rating> {
        match self {
            Ballot::Rated(rating) => Some(rating),
            Ballot::OptedOut => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BallotRepr {
    Rating(Rating),
    Marker(OptOutMarker),
}

#[derive(Serialize, Deserialize)]
enum OptOutMarker {
    #[serde(rename = "opt_out")]
    OptOut,
}

impl From<BallotRepr> for Ballot {
    fn from(repr: BallotRepr) -> Self {
        match repr {
            BallotRepr::Rating(rating) => Ballot::Rated(rating),
            BallotRepr::Marker(OptOutMarker::OptOut) => Ballot::OptedOut,
        }
    }
}

impl From<Ballot> for BallotRepr {
    fn from(ballot: Ballot) -> Self {
        match ballot {
            Ballot::Rated(rating) => BallotRepr::Rating(rating),
            Ballot::OptedOut => BallotRepr::Marker(OptOutMarker::OptOut),
        }
    }
}

/// Ballots for one host, in the order they were handed in.
///
/// Stored as a JSON object whose keys keep that order on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostVotes(Vec<(String, Ballot)>);

impl HostVotes {
    pub fn get(&self, voter: &str) -> Option<&Ballot> {
        self.0.iter().find(|(name, _)| name == voter).map(|(_, ballot)| ballot)
    }

    /// Replaces an earlier ballot from `voter` in place, otherwise appends.
    pub fn insert(&mut self, voter: String, ballot: Ballot) {
        match self.0.iter().position(|(name, _)| *name == voter) {
            Some(i) => self.0[i].1 = ballot,
            None => self.0.push((voter, ballot)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Ballot)> {
        self.0.iter().map(|(name, ballot)| (name.as_str(), ballot))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&str> for HostVotes {
    type Output = Ballot;

    fn index(&self, voter: &str) -> &Ballot {
        self.get(voter)
            .unwrap_or_else(|| panic!("no ballot from '{}'", voter))
    }
}

impl Serialize for HostVotes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (voter, ballot) in &self.0 {
            map.serialize_entry(voter, ballot)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HostVotes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HostVotesVisitor;

        impl<'de> Visitor<'de> for HostVotesVisitor {
            type Value = HostVotes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of voter name to ballot")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HostVotes, A::Error> {
                let mut votes = HostVotes::default();
                while let Some((voter, ballot)) = access.next_entry::<String, Ballot>()? {
                    if votes.get(&voter).is_some() {
                        return Err(de::Error::custom(format!("duplicate ballot from '{}'", voter)));
                    }
                    votes.0.push((voter, ballot));
                }
                Ok(votes)
            }
        }

        deserializer.deserialize_map(HostVotesVisitor)
    }
}

/// Aggregate score per host, flattened next to the `detailed_votes` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default)]
    pub detailed_votes: BTreeMap<String, Vec<VoteDetail>>,
    #[serde(flatten)]
    pub totals: BTreeMap<String, f64>,
}

/// One voter's contribution; `global` is already weighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteDetail {
    pub voter: String,
    pub food: i32,
    pub creativity: i32,
    pub activity: i32,
    pub global: f64,
}
