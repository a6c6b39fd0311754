use crate::error::{Error, Result};
use crate::models::{Ballot, Rating};
use std::path::PathBuf;

pub const HELP: &str = "\
Commands:
  host <name>                                   start or rejoin the session for a host
  vote <voter> <food> <creativity> <activity> <global>
                                                rate the current host
  optout <voter>                                skip rating the current host
  results [reveal]                              show results, optionally with voter names
  status                                        show the current session
  sessions                                      list every stored session
  export <path>                                 write all sessions to a JSON file
  help                                          show this message
  quit                                          exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Host(String),
    Vote { voter: String, ballot: Ballot },
    Results { reveal_names: bool },
    Status,
    Sessions,
    Export(PathBuf),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let name = words
        .next()
        .ok_or_else(|| Error::InvalidInput("empty command".to_string()))?;
    let args: Vec<&str> = words.collect();

    let command = match (name, args.as_slice()) {
        ("host", [host]) => Command::Host(host.to_string()),
        ("vote", [voter, food, creativity, activity, global]) => Command::Vote {
            voter: voter.to_string(),
            ballot: Ballot::Rated(Rating {
                food: parse_rating("food", food)?,
                creativity: parse_rating("creativity", creativity)?,
                activity: parse_rating("activity", activity)?,
                global: parse_rating("global", global)?,
            }),
        },
        ("optout", [voter]) => Command::Vote {
            voter: voter.to_string(),
            ballot: Ballot::OptedOut,
        },
        ("results", []) => Command::Results { reveal_names: false },
        ("results", ["reveal"]) => Command::Results { reveal_names: true },
        ("status", []) => Command::Status,
        ("sessions", []) => Command::Sessions,
        ("export", [path]) => Command::Export(PathBuf::from(*path)),
        ("help", []) => Command::Help,
        ("quit", []) | ("exit", []) => Command::Quit,
        ("host" | "vote" | "optout" | "results" | "status" | "sessions" | "export" | "help" | "quit" | "exit", _) => {
            return Err(Error::InvalidInput(format!("wrong arguments for '{}', try 'help'", name)));
        }
        _ => return Err(Error::InvalidInput(format!("unknown command '{}', try 'help'", name))),
    };
    Ok(command)
}

fn parse_rating(field: &str, raw: &str) -> Result<i32> {
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("{} must be a whole number, got '{}'", field, raw)))
}
