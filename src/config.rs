use crate::error::{Error, Result};
use crate::models::DETAILED_VOTES_KEY;
use std::collections::HashSet;
use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;

const DEFAULT_PARTICIPANTS: &str = "Kassia,Said,Alex,David,Papé";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Json(PathBuf),
    Sqlite(String),
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub participants: Vec<String>,
    pub rating_scale: RangeInclusive<i32>,
}

impl Config {
    /// Reads settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("VOTE_STORE").as_deref().unwrap_or("json") {
            "json" => StoreBackend::Json(PathBuf::from(
                lookup("DATA_FILE").unwrap_or_else(|| "data.json".to_string()),
            )),
            "sqlite" => StoreBackend::Sqlite(
                lookup("DATABASE_URL").unwrap_or_else(|| "sqlite:host_tally.db".to_string()),
            ),
            "memory" => StoreBackend::Memory,
            other => return Err(Error::Config(format!("unknown VOTE_STORE '{}'", other))),
        };

        let participants = parse_participants(
            &lookup("PARTICIPANTS").unwrap_or_else(|| DEFAULT_PARTICIPANTS.to_string()),
        )?;

        let min = parse_bound(&lookup, "RATING_MIN", 0)?;
        let max = parse_bound(&lookup, "RATING_MAX", 10)?;
        if min > max {
            return Err(Error::Config(format!("RATING_MIN {} is above RATING_MAX {}", min, max)));
        }

        Ok(Self {
            store,
            participants,
            rating_scale: min..=max,
        })
    }

    pub fn is_participant(&self, name: &str) -> bool {
        self.participants.iter().any(|p| p == name)
    }
}

fn parse_participants(raw: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut participants = Vec::new();

    for name in raw.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(Error::Config("PARTICIPANTS contains an empty name".to_string()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(Error::Config(format!("participant '{}' contains whitespace", name)));
        }
        if name == DETAILED_VOTES_KEY {
            return Err(Error::Config(format!("'{}' is reserved", DETAILED_VOTES_KEY)));
        }
        if !seen.insert(name) {
            return Err(Error::Config(format!("participant '{}' is listed twice", name)));
        }
        participants.push(name.to_string());
    }

    if participants.len() < 2 {
        return Err(Error::Config("at least two participants are needed".to_string()));
    }
    Ok(participants)
}

fn parse_bound<F>(lookup: &F, key: &str, default: i32) -> Result<i32>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be an integer, got '{}'", key, raw))),
        None => Ok(default),
    }
}
