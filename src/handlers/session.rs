use crate::config::Config;
use crate::db::{SessionStore, StoreData};
use crate::error::{Error, Result};
use crate::models::{Ballot, Session, Stage, session_key};
use crate::voting::reveal::{ResultsView, reveal};
use crate::voting::record_vote;
use log::{info, warn};
use std::sync::Arc;

/// Per-caller state: which session the caller is working on, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session_key: Option<String>,
}

impl SessionContext {
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }
}

/// Where the caller should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No usable session; pick a host first.
    Start,
    Voting,
    Results,
}

pub struct SessionFlow {
    store: Arc<dyn SessionStore>,
    config: Config,
}

impl SessionFlow {
    pub fn new(store: Arc<dyn SessionStore>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binds `ctx` to the host's session, creating the session on first use.
    pub async fn start_session(&self, ctx: &mut SessionContext, host: &str) -> Result<Session> {
        if !self.config.is_participant(host) {
            return Err(Error::UnknownParticipant(host.to_string()));
        }

        let key = session_key(host);
        ctx.session_key = Some(key.clone());

        if let Some(existing) = self.store.get(&key).await? {
            info!("Rejoining session '{}' ({})", key, existing.stage.as_str());
            return Ok(existing);
        }

        let mut session = Session::new(host.to_string(), &self.config.participants);
        match self.store.put(&key, &session).await {
            Ok(version) => {
                session.version = version;
                info!("Created session '{}' with {} voter(s)", key, session.voters.len());
                Ok(session)
            }
            Err(Error::Conflict(_)) => {
                // Someone else created it in the meantime
                warn!("Session '{}' appeared while creating it, rejoining", key);
                self.store
                    .get(&key)
                    .await?
                    .ok_or_else(|| Error::Conflict(key.clone()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn current_session(&self, ctx: &SessionContext) -> Result<Option<Session>> {
        match ctx.session_key() {
            Some(key) => self.store.get(key).await,
            None => Ok(None),
        }
    }

    pub async fn submit_vote(&self, ctx: &SessionContext, voter: &str, ballot: Ballot) -> Result<Step> {
        let mut session = match self.current_session(ctx).await? {
            Some(session) if session.stage == Stage::Voting => session,
            _ => return Ok(Step::Start),
        };

        if let Some(rating) = ballot.rating() {
            rating.validate(&self.config.rating_scale)?;
        }

        let stage = record_vote(&mut session, voter, ballot)?;
        session.version = self.store.put(&session.key(), &session).await?;

        Ok(match stage {
            Stage::Voting => Step::Voting,
            Stage::Results => Step::Results,
        })
    }

    /// `None` until the caller's session has finished voting.
    pub async fn view_results(&self, ctx: &SessionContext, reveal_names: bool) -> Result<Option<ResultsView>> {
        let session = match self.current_session(ctx).await? {
            Some(session) if session.stage == Stage::Results => session,
            _ => return Ok(None),
        };

        Ok(session
            .scores
            .as_ref()
            .map(|scores| reveal(&session.host, scores, reveal_names)))
    }

    pub async fn sessions(&self) -> Result<StoreData> {
        self.store.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{ANONYMOUS_VOTER, Rating};

    fn flow_with(participants: &[&str]) -> SessionFlow {
        let participants = participants.join(",");
        let config = Config::from_lookup(|key| match key {
            "VOTE_STORE" => Some("memory".to_string()),
            "PARTICIPANTS" => Some(participants.clone()),
            _ => None,
        })
        .unwrap();
        SessionFlow::new(Arc::new(MemoryStore::default()), config)
    }

    fn rating(food: i32, creativity: i32, activity: i32, global: i32) -> Ballot {
        Ballot::Rated(Rating { food, creativity, activity, global })
    }

    #[tokio::test]
    async fn full_round_for_alex() {
        let flow = flow_with(&["Kassia", "Said", "Alex"]);
        let mut ctx = SessionContext::default();

        let session = flow.start_session(&mut ctx, "Alex").await.unwrap();
        assert_eq!(ctx.session_key(), Some("Alex_session"));
        assert_eq!(session.voters, vec!["Kassia", "Said"]);
        assert!(flow.view_results(&ctx, true).await.unwrap().is_none());

        assert_eq!(flow.submit_vote(&ctx, "Kassia", rating(8, 7, 9, 10)).await.unwrap(), Step::Voting);
        assert_eq!(flow.submit_vote(&ctx, "Said", Ballot::OptedOut).await.unwrap(), Step::Results);

        let stored = flow.current_session(&ctx).await.unwrap().unwrap();
        assert!(stored.voters.is_empty());
        assert_eq!(stored.stage, Stage::Results);

        let view = flow.view_results(&ctx, true).await.unwrap().unwrap();
        assert!((view.scores["Alex"] - 36.0).abs() < 1e-9);
        assert_eq!(view.detailed_votes["Alex"].len(), 1);
        assert_eq!(view.detailed_votes["Alex"][0].voter, "Kassia");
    }

    #[tokio::test]
    async fn anonymous_results_do_not_erase_stored_names() {
        let flow = flow_with(&["Kassia", "Alex"]);
        let mut ctx = SessionContext::default();
        flow.start_session(&mut ctx, "Alex").await.unwrap();
        flow.submit_vote(&ctx, "Kassia", rating(1, 2, 3, 4)).await.unwrap();

        for _ in 0..2 {
            let view = flow.view_results(&ctx, false).await.unwrap().unwrap();
            assert_eq!(view.detailed_votes["Alex"][0].voter, ANONYMOUS_VOTER);
        }
        let view = flow.view_results(&ctx, true).await.unwrap().unwrap();
        assert_eq!(view.detailed_votes["Alex"][0].voter, "Kassia");
    }

    #[tokio::test]
    async fn voting_without_a_session_goes_back_to_start() {
        let flow = flow_with(&["Kassia", "Alex"]);
        let ctx = SessionContext::default();
        assert_eq!(flow.submit_vote(&ctx, "Kassia", Ballot::OptedOut).await.unwrap(), Step::Start);
    }

    #[tokio::test]
    async fn voting_after_results_goes_back_to_start() {
        let flow = flow_with(&["Kassia", "Alex"]);
        let mut ctx = SessionContext::default();
        flow.start_session(&mut ctx, "Alex").await.unwrap();
        flow.submit_vote(&ctx, "Kassia", Ballot::OptedOut).await.unwrap();

        assert_eq!(flow.submit_vote(&ctx, "Kassia", Ballot::OptedOut).await.unwrap(), Step::Start);
        let view = flow.view_results(&ctx, false).await.unwrap().unwrap();
        assert_eq!(view.scores["Alex"], 0.0);
        assert!(view.detailed_votes["Alex"].is_empty());
    }

    #[tokio::test]
    async fn restarting_a_host_rejoins_existing_session() {
        let flow = flow_with(&["Kassia", "Said", "Alex"]);
        let mut first = SessionContext::default();
        flow.start_session(&mut first, "Alex").await.unwrap();
        flow.submit_vote(&first, "Kassia", Ballot::OptedOut).await.unwrap();

        let mut second = SessionContext::default();
        let session = flow.start_session(&mut second, "Alex").await.unwrap();
        assert_eq!(session.voters, vec!["Said"]);
        assert_eq!(session.version, 2);
    }

    #[tokio::test]
    async fn rejects_unknown_host_bad_rating_and_repeat_voter() {
        let flow = flow_with(&["Kassia", "Said", "Alex"]);
        let mut ctx = SessionContext::default();

        let err = flow.start_session(&mut ctx, "Mallory").await.unwrap_err();
        assert!(matches!(err, Error::UnknownParticipant(_)));
        assert!(ctx.session_key().is_none());

        flow.start_session(&mut ctx, "Alex").await.unwrap();
        let err = flow.submit_vote(&ctx, "Kassia", rating(8, 7, 9, 11)).await.unwrap_err();
        assert!(matches!(err, Error::RatingOutOfRange { field: "global", .. }));

        flow.submit_vote(&ctx, "Kassia", rating(8, 7, 9, 10)).await.unwrap();
        let err = flow.submit_vote(&ctx, "Kassia", Ballot::OptedOut).await.unwrap_err();
        assert!(matches!(err, Error::VoterNotPending(_)));

        let session = flow.current_session(&ctx).await.unwrap().unwrap();
        assert_eq!(session.voters, vec!["Said"]);
        assert_eq!(session.stage, Stage::Voting);
    }
}
