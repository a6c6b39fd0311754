pub mod session;

use crate::commands::{Command, HELP, parse_command};
use crate::config::StoreBackend;
use crate::db::JsonFileStore;
use crate::error::{Error, Result};
use crate::models::{Session, Stage};
use crate::voting::reveal::ResultsView;
use log::{info, warn};
use session::{SessionContext, SessionFlow, Step};
use std::fmt::Write as _;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Reads commands line by line until `quit` or end of input.
pub async fn run_console<R, W>(flow: &SessionFlow, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut ctx = SessionContext::default();
    let mut lines = input.lines();

    output.write_all(b"Type 'help' for commands.\n").await?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match parse_command(line) {
            Ok(command) => handle_command(flow, &mut ctx, command).await,
            Err(e) => Err(e),
        };

        let text = match reply {
            Ok(Some(text)) => text,
            Ok(None) => break,
            Err(e) => {
                warn!("Command '{}' failed: {}", line, e);
                format!("Error: {}", e)
            }
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    info!("Console closed");
    Ok(())
}

/// Runs one command. `None` means the caller asked to quit.
pub async fn handle_command(
    flow: &SessionFlow,
    ctx: &mut SessionContext,
    command: Command,
) -> Result<Option<String>> {
    let text = match command {
        Command::Host(host) => {
            let session = flow.start_session(ctx, &host).await?;
            render_session(&session)
        }
        Command::Vote { voter, ballot } => match flow.submit_vote(ctx, &voter, ballot).await? {
            Step::Start => "No open voting session. Pick a host with 'host <name>'.".to_string(),
            Step::Voting => match flow.current_session(ctx).await? {
                Some(session) => format!("Vote recorded. Still waiting on: {}", session.voters.join(", ")),
                None => "Vote recorded.".to_string(),
            },
            Step::Results => "All votes are in. Use 'results' to see them.".to_string(),
        },
        Command::Results { reveal_names } => match flow.view_results(ctx, reveal_names).await? {
            Some(view) => render_results(&view),
            None => "Results are not ready yet.".to_string(),
        },
        Command::Status => match flow.current_session(ctx).await? {
            Some(session) => render_session(&session),
            None => "No session selected. Pick a host with 'host <name>'.".to_string(),
        },
        Command::Sessions => {
            let data = flow.sessions().await?;
            if data.sessions.is_empty() {
                "No sessions yet.".to_string()
            } else {
                data.sessions
                    .iter()
                    .map(|(key, session)| format!("{} ({})", key, session.stage.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        Command::Export(path) => {
            // The live file is only written through the running store
            if let StoreBackend::Json(live) = &flow.config().store {
                if is_same_file(&path, live).await {
                    return Err(Error::InvalidInput(format!(
                        "{} is the live session file, pick another path",
                        path.display()
                    )));
                }
            }
            let data = flow.sessions().await?;
            JsonFileStore::new(path.clone()).save(&data).await?;
            info!("Exported {} session(s) to {}", data.sessions.len(), path.display());
            format!("Wrote {} session(s) to {}", data.sessions.len(), path.display())
        }
        Command::Help => {
            let config = flow.config();
            format!(
                "{}\nParticipants: {}\nRatings run from {} to {}.",
                HELP,
                config.participants.join(", "),
                config.rating_scale.start(),
                config.rating_scale.end()
            )
        }
        Command::Quit => return Ok(None),
    };
    Ok(Some(text))
}

async fn is_same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn render_session(session: &Session) -> String {
    match session.stage {
        Stage::Voting => format!(
            "Voting for {}. Waiting on: {}",
            session.host,
            session.voters.join(", ")
        ),
        Stage::Results => format!("Voting for {} is finished. Use 'results' to see the scores.", session.host),
    }
}

fn render_results(view: &ResultsView) -> String {
    let mut out = format!("Results for {}", view.host);
    if !view.reveal_names {
        out.push_str(" (names hidden)");
    }
    for (host, score) in &view.scores {
        let _ = write!(out, "\n  {}: {:.2}", host, score);
        let Some(details) = view.detailed_votes.get(host) else {
            continue;
        };
        if details.is_empty() {
            out.push_str("\n    (no ratings)");
        }
        for vote in details {
            let _ = write!(
                out,
                "\n    {}: food {}, creativity {}, activity {}, global {:.1}",
                vote.voter, vote.food, vote.creativity, vote.activity, vote.global
            );
        }
    }
    out
}
