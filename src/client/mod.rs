//! Per-participant session client.
//!
//! The client owns the last known document, the local identity and the sync loop. Every edit
//! applies a pure transformation to the local document, publishes the result immediately and
//! pushes the whole document in the background. Nothing is merged: whichever overwrite reaches
//! the store last wins, and the next pull brings every client back in line.

pub mod api;
pub mod error;
pub mod identity;
pub mod sync;

use std::{sync::Arc, time::Duration};

use rand::Rng;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    state::{
        session::{EditError, Game, GameStatus, NewGame, Session, SessionDocument, User},
        spin::{SpinConfig, SpinError, SpinPresenter, SpinWheel, run_spin},
        tiebreak::{NotApplicable, TieBreakPool, select_pool},
    },
};

pub use api::{HttpSessionApi, InProcessSessionApi, SessionApi};
pub use error::ClientError;
pub use identity::{Identity, IdentityChoice, JoinToken};
pub use sync::{SyncHandle, SyncStatus};

use identity::resolve_identity;
use sync::SyncLoop;

/// Background overwrite started by an edit. Awaiting it is optional.
pub type PushHandle = JoinHandle<Result<(), ClientError>>;

/// Client tuning, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Period of the sync loop.
    pub poll_interval: Duration,
    /// Consecutive failed pulls before reporting [`SyncStatus::Reconnecting`].
    pub reconnecting_after: u32,
    /// Colors offered to new profiles.
    pub palette: Vec<String>,
    /// Wheel timing used for tie-break draws.
    pub spin: SpinConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        (&AppConfig::default()).into()
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            reconnecting_after: config.reconnecting_after(),
            palette: config.colors().to_vec(),
            spin: SpinConfig::default(),
        }
    }
}

/// Lifecycle of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPhase {
    /// No session requested yet.
    Uninitialized,
    /// First pull in progress.
    Loading,
    /// Session loaded and kept fresh by the sync loop.
    Ready(Identity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Uninitialized,
    Loading,
    Ready,
}

/// One participant's view of one session.
pub struct SessionClient {
    api: Arc<dyn SessionApi>,
    config: ClientConfig,
    stage: Stage,
    session_id: Option<String>,
    document: Arc<watch::Sender<Option<Session>>>,
    identity: Arc<watch::Sender<Identity>>,
    status: Arc<watch::Sender<SyncStatus>>,
    sync: Option<SyncHandle>,
    rotation: f64,
}

impl SessionClient {
    /// Build an idle client.
    pub fn new(api: Arc<dyn SessionApi>, config: ClientConfig) -> Self {
        let (document, _) = watch::channel(None);
        let (identity, _) = watch::channel(Identity::NoUser);
        let (status, _) = watch::channel(SyncStatus::Live);
        Self {
            api,
            config,
            stage: Stage::Uninitialized,
            session_id: None,
            document: Arc::new(document),
            identity: Arc::new(identity),
            status: Arc::new(status),
            sync: None,
            rotation: 0.0,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ClientPhase {
        match self.stage {
            Stage::Uninitialized => ClientPhase::Uninitialized,
            Stage::Loading => ClientPhase::Loading,
            Stage::Ready => ClientPhase::Ready(self.identity.borrow().clone()),
        }
    }

    /// Full id of the loaded session.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Participant edits are made for.
    pub fn current_user(&self) -> Option<User> {
        match self.stage {
            Stage::Ready => self.identity.borrow().user().cloned(),
            _ => None,
        }
    }

    /// Snapshot of the local document.
    pub fn document(&self) -> Option<SessionDocument> {
        self.document
            .borrow()
            .as_ref()
            .map(|session| session.document.clone())
    }

    /// Follow every local or pulled change of the session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.document.subscribe()
    }

    /// Follow the local identity, including logins completed by the sync loop.
    pub fn subscribe_identity(&self) -> watch::Receiver<Identity> {
        self.identity.subscribe()
    }

    /// Follow the connectivity reported by the sync loop.
    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Create an empty session and load it.
    pub async fn create(&mut self) -> Result<String, ClientError> {
        let id = self.api.create().await?;
        self.load(&id, None).await?;
        Ok(id)
    }

    /// Load a session by full id or short-id prefix and start syncing it.
    ///
    /// A join token naming a user of the session logs that user in directly. When the user is not
    /// there yet, every pull retries until they appear or another identity is bound.
    pub async fn load(
        &mut self,
        id_or_prefix: &str,
        join: Option<JoinToken>,
    ) -> Result<(), ClientError> {
        if let Some(current) = &self.session_id {
            return Err(ClientError::Busy(current.clone()));
        }
        if self.stage == Stage::Loading {
            return Err(ClientError::Busy(id_or_prefix.to_owned()));
        }

        self.stage = Stage::Loading;
        let session = match self.api.fetch(id_or_prefix.to_owned(), false).await {
            Ok(session) => session,
            Err(err) => {
                warn!(session_id = %id_or_prefix, error = %err, "initial session load failed");
                self.stage = Stage::Uninitialized;
                return Err(err);
            }
        };

        let identity = join
            .as_ref()
            .map(|token| token.resolve(&session.document))
            .unwrap_or(Identity::NoUser);
        let pending = join.filter(|_| identity.user().is_none());
        let session_id = session.id.clone();
        info!(
            session_id = %session_id,
            identified = identity.user().is_some(),
            join_pending = pending.is_some(),
            "session loaded"
        );

        self.identity.send_replace(identity);
        self.document.send_replace(Some(session));
        self.status.send_replace(SyncStatus::Live);
        self.sync = Some(
            SyncLoop {
                api: self.api.clone(),
                session_id: session_id.clone(),
                period: self.config.poll_interval.max(Duration::from_millis(1)),
                reconnecting_after: self.config.reconnecting_after.max(1),
                document: self.document.clone(),
                status: self.status.clone(),
                identity: self.identity.clone(),
                join: pending,
            }
            .spawn(),
        );
        self.session_id = Some(session_id);
        self.stage = Stage::Ready;
        Ok(())
    }

    /// Stop syncing and forget the session.
    pub async fn close(&mut self) {
        if let Some(sync) = self.sync.take() {
            sync.shutdown().await;
        }
        self.session_id = None;
        self.stage = Stage::Uninitialized;
        self.identity.send_replace(Identity::NoUser);
        self.document.send_replace(None);
    }

    /// Bind the local identity. Returns the push when the profile had to be appended.
    pub fn identify(&mut self, choice: IdentityChoice) -> Result<Option<PushHandle>, ClientError> {
        let current = self.current_document()?;
        let resolved = resolve_identity(&current, choice, &self.config.palette)?;
        let push = resolved.document.map(|next| self.commit(next));

        debug!(user_id = %resolved.user.id, appended = push.is_some(), "identity bound");
        self.identity
            .send_replace(Identity::Identified(resolved.user));
        Ok(push)
    }

    /// Return to the profile picker without touching the document.
    pub fn switch_user(&mut self) -> Result<(), ClientError> {
        self.current_document()?;
        self.identity.send_replace(Identity::NoUser);
        Ok(())
    }

    /// Remove the local user from the session, votes included, and return to the picker.
    pub fn leave(&mut self) -> Result<PushHandle, ClientError> {
        let user = self.require_user()?;
        let push = self.remove_user(&user.id)?;
        self.identity.send_replace(Identity::NoUser);
        Ok(push)
    }

    /// Append a catalog entry to the list.
    pub fn add_game(&mut self, game: NewGame) -> Result<PushHandle, ClientError> {
        self.mutate(|document, user| document.with_game(game, user))
    }

    /// Cast or withdraw the local user's vote.
    pub fn toggle_vote(&mut self, game_id: &str) -> Result<PushHandle, ClientError> {
        self.mutate(|document, user| document.with_vote_toggled(game_id, &user.id))
    }

    /// Flip a game between active and played.
    pub fn toggle_status(&mut self, game_id: &str) -> Result<PushHandle, ClientError> {
        self.mutate(|document, _| document.with_status_toggled(game_id))
    }

    /// Mark a game as played, typically the winner of a draw.
    pub fn mark_played(&mut self, game_id: &str) -> Result<PushHandle, ClientError> {
        self.mutate(|document, _| document.with_status(game_id, GameStatus::Played))
    }

    /// Remove a game from the list.
    pub fn delete_game(&mut self, game_id: &str) -> Result<PushHandle, ClientError> {
        self.mutate(|document, _| document.without_game(game_id))
    }

    /// Remove a participant and strip their votes from every game.
    pub fn remove_user(&mut self, user_id: &str) -> Result<PushHandle, ClientError> {
        let current = self.current_document()?;
        self.require_user()?;
        let known = current.find_user(user_id).is_some()
            || current.games.iter().any(|game| game.has_vote_from(user_id));
        if !known {
            return Err(EditError::UnknownUser(user_id.to_owned()).into());
        }

        let removing_self = self.current_user().is_some_and(|user| user.id == user_id);
        let push = self.commit(current.without_user(user_id));
        if removing_self {
            self.identity.send_replace(Identity::NoUser);
        }
        Ok(push)
    }

    /// Tie-break pool of the local document.
    pub fn tie_break(&self) -> Result<Result<TieBreakPool, NotApplicable>, ClientError> {
        let document = self.current_document()?;
        Ok(select_pool(&document.games))
    }

    /// Run a draw over the current pool in real time and return the winning game.
    ///
    /// The wheel starts where the previous draw left it.
    pub async fn spin<R, P>(&mut self, rng: &mut R, presenter: &mut P) -> Result<Game, ClientError>
    where
        R: Rng + ?Sized,
        P: SpinPresenter + ?Sized,
    {
        let pool = self.tie_break()??;

        let size = pool.size();
        let mut wheel = SpinWheel::new(size, self.config.spin)?.at_rotation(self.rotation);
        let winner_index = run_spin(&mut wheel, rng, presenter).await?;
        self.rotation = wheel.rotation();

        let winner = pool
            .games
            .into_iter()
            .nth(winner_index)
            .ok_or(SpinError::PoolTooSmall(size))?;
        info!(game_id = %winner.id, rotation = self.rotation, "tie-break settled");
        Ok(winner)
    }

    fn current_document(&self) -> Result<SessionDocument, ClientError> {
        match self.stage {
            Stage::Ready => self.document().ok_or(ClientError::NotReady),
            _ => Err(ClientError::NotReady),
        }
    }

    fn require_user(&self) -> Result<User, ClientError> {
        if self.stage != Stage::Ready {
            return Err(ClientError::NotReady);
        }
        self.identity
            .borrow()
            .user()
            .cloned()
            .ok_or(ClientError::IdentityRequired)
    }

    /// Apply `edit` on behalf of the bound user. A bound user an overwrite dropped from the
    /// document is appended again under the same id first.
    fn mutate(
        &mut self,
        edit: impl FnOnce(&SessionDocument, &User) -> Result<SessionDocument, EditError>,
    ) -> Result<PushHandle, ClientError> {
        let mut current = self.current_document()?;
        let user = self.require_user()?;
        if current.find_user(&user.id).is_none() {
            warn!(user_id = %user.id, "bound user lost by an overwrite, appending it again");
            current = current.with_user(user.clone())?;
        }
        let next = edit(&current, &user)?;
        Ok(self.commit(next))
    }

    /// Publish `next` locally, then overwrite the stored document in the background.
    fn commit(&self, next: SessionDocument) -> PushHandle {
        self.document.send_modify(|slot| {
            if let Some(session) = slot {
                session.document = next.clone();
            }
        });

        let api = self.api.clone();
        let session_id = self.session_id.clone().unwrap_or_default();
        tokio::spawn(async move {
            let result = api.push(session_id.clone(), next).await;
            match &result {
                Ok(()) => debug!(session_id = %session_id, "session pushed"),
                Err(err) => warn!(session_id = %session_id, error = %err, "session push failed"),
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::future::BoxFuture;
    use rand::{SeedableRng, rngs::StdRng};
    use tokio::time::timeout;

    use super::*;
    use crate::{
        dao::session_store::MemorySessionStore,
        services::search_service::DisabledSearch,
        state::{AppState, SharedState, spin::SpinLeg},
    };

    const WAIT: Duration = Duration::from_secs(30);

    async fn server() -> (SharedState, Arc<dyn SessionApi>) {
        let state = AppState::new(AppConfig::default(), Arc::new(DisabledSearch));
        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        let api: Arc<dyn SessionApi> = Arc::new(InProcessSessionApi::new(state.clone()));
        (state, api)
    }

    fn config() -> ClientConfig {
        ClientConfig {
            poll_interval: Duration::from_secs(1),
            reconnecting_after: 2,
            palette: vec!["red".into(), "blue".into()],
            spin: SpinConfig::default(),
        }
    }

    fn create(name: &str) -> IdentityChoice {
        IdentityChoice::Create {
            name: name.into(),
            color: None,
        }
    }

    fn new_game(id: &str) -> NewGame {
        NewGame {
            id: id.into(),
            title: id.to_uppercase(),
            cover: None,
        }
    }

    async fn pushed(push: PushHandle) {
        push.await.unwrap().unwrap();
    }

    async fn stored(api: &Arc<dyn SessionApi>, id: &str) -> SessionDocument {
        api.fetch(id.to_owned(), true).await.unwrap().document
    }

    struct FlakyApi {
        inner: Arc<dyn SessionApi>,
        failing: AtomicBool,
    }

    impl SessionApi for FlakyApi {
        fn create(&self) -> BoxFuture<'static, Result<String, ClientError>> {
            self.inner.create()
        }

        fn fetch(&self, id: String, exact: bool) -> BoxFuture<'static, Result<Session, ClientError>> {
            if self.failing.load(Ordering::SeqCst) {
                return Box::pin(async { Err(ClientError::TransientIo("offline".into())) });
            }
            self.inner.fetch(id, exact)
        }

        fn push(
            &self,
            id: String,
            document: SessionDocument,
        ) -> BoxFuture<'static, Result<(), ClientError>> {
            self.inner.push(id, document)
        }
    }

    #[derive(Default)]
    struct Recorder {
        legs: Vec<SpinLeg>,
        settled: Option<usize>,
    }

    impl SpinPresenter for Recorder {
        fn leg_started(&mut self, leg: &SpinLeg) {
            self.legs.push(*leg);
        }

        fn settled(&mut self, winner_index: usize, _rotation: f64) {
            self.settled = Some(winner_index);
        }
    }

    #[tokio::test]
    async fn edits_need_a_loaded_session_and_an_identity() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api, config());
        assert!(matches!(client.toggle_vote("a"), Err(ClientError::NotReady)));

        client.create().await.unwrap();
        assert_eq!(client.phase(), ClientPhase::Ready(Identity::NoUser));
        assert!(matches!(
            client.add_game(new_game("a")),
            Err(ClientError::IdentityRequired)
        ));
    }

    #[tokio::test]
    async fn new_profile_is_appended_and_pushed() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api.clone(), config());
        let id = client.create().await.unwrap();

        let push = client.identify(create("Ana")).unwrap().unwrap();
        pushed(push).await;

        let user = client.current_user().unwrap();
        assert_eq!(user.color, "red");
        assert_eq!(stored(&api, &id).await.users, vec![user]);
    }

    #[tokio::test]
    async fn join_token_logs_the_user_in_on_load() {
        let (_, api) = server().await;
        let mut ana = SessionClient::new(api.clone(), config());
        let id = ana.create().await.unwrap();
        pushed(ana.identify(create("Ana")).unwrap().unwrap()).await;
        let ana_id = ana.current_user().unwrap().id.clone();

        let link = format!("https://squad.example/session/{id}?u={ana_id}");
        let mut again = SessionClient::new(api.clone(), config());
        again.load(&id[..8], JoinToken::parse(&link)).await.unwrap();
        assert_eq!(again.session_id(), Some(id.as_str()));
        assert_eq!(again.current_user().unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn loading_an_unknown_session_returns_to_uninitialized() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api, config());
        let err = client.load("zzzzzzzzzzzz", None).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(client.phase(), ClientPhase::Uninitialized);
    }

    #[tokio::test]
    async fn loading_twice_is_busy_until_closed() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api, config());
        let id = client.create().await.unwrap();
        assert!(matches!(
            client.load(&id, None).await,
            Err(ClientError::Busy(_))
        ));

        client.close().await;
        assert!(client.document().is_none());
        client.load(&id, None).await.unwrap();
    }

    #[tokio::test]
    async fn vote_toggle_twice_restores_the_votes() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api.clone(), config());
        let id = client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;
        pushed(client.add_game(new_game("a")).unwrap()).await;
        let before = client.document().unwrap();

        pushed(client.toggle_vote("a").unwrap()).await;
        assert_eq!(client.document().unwrap().games[0].vote_count(), 1);
        pushed(client.toggle_vote("a").unwrap()).await;

        assert_eq!(client.document().unwrap(), before);
        assert_eq!(stored(&api, &id).await, before);
    }

    #[tokio::test]
    async fn unknown_game_is_rejected_without_a_push() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api.clone(), config());
        let id = client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;
        let before = stored(&api, &id).await;

        assert!(matches!(
            client.toggle_status("ghost"),
            Err(ClientError::NotFound(_))
        ));
        assert!(matches!(
            client.add_game(new_game("")),
            Err(ClientError::Validation(_))
        ));
        assert_eq!(stored(&api, &id).await, before);
    }

    #[tokio::test]
    async fn leaving_strips_votes_and_returns_to_the_picker() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api.clone(), config());
        let id = client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;
        pushed(client.add_game(new_game("a")).unwrap()).await;
        pushed(client.toggle_vote("a").unwrap()).await;

        pushed(client.leave().unwrap()).await;
        assert_eq!(client.phase(), ClientPhase::Ready(Identity::NoUser));

        let document = stored(&api, &id).await;
        assert!(document.users.is_empty());
        assert!(document.games.iter().all(|game| game.votes.is_empty()));
    }

    #[tokio::test]
    async fn switching_user_keeps_the_document() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api.clone(), config());
        let id = client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;

        client.switch_user().unwrap();
        assert!(client.current_user().is_none());
        assert_eq!(stored(&api, &id).await.users.len(), 1);

        assert!(client.identify(create("Ana")).unwrap().is_none());
        assert_eq!(client.current_user().unwrap().name, "Ana");
    }

    #[tokio::test(start_paused = true)]
    async fn sync_loop_brings_in_remote_writes() {
        let (_, api) = server().await;
        let mut ana = SessionClient::new(api.clone(), config());
        let id = ana.create().await.unwrap();
        pushed(ana.identify(create("Ana")).unwrap().unwrap()).await;

        let mut bo = SessionClient::new(api.clone(), config());
        bo.load(&id, None).await.unwrap();
        pushed(bo.identify(create("Bo")).unwrap().unwrap()).await;
        assert_eq!(bo.current_user().unwrap().color, "blue");

        let mut updates = ana.subscribe();
        timeout(
            WAIT,
            updates.wait_for(|session| {
                session
                    .as_ref()
                    .is_some_and(|session| session.document.users.len() == 2)
            }),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(ana.document().unwrap().users[1].name, "Bo");
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_pull_failures_report_reconnecting() {
        let (_, api) = server().await;
        let flaky = Arc::new(FlakyApi {
            inner: api,
            failing: AtomicBool::new(false),
        });
        let mut client = SessionClient::new(flaky.clone(), config());
        client.create().await.unwrap();

        let mut status = client.sync_status();
        flaky.failing.store(true, Ordering::SeqCst);
        timeout(
            WAIT,
            status.wait_for(|status| matches!(status, SyncStatus::Reconnecting { .. })),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(client.document().is_some());

        flaky.failing.store(false, Ordering::SeqCst);
        timeout(WAIT, status.wait_for(|status| *status == SyncStatus::Live))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn spin_picks_a_tied_game_which_can_then_be_marked_played() {
        let (_, api) = server().await;
        let slow_poll = ClientConfig {
            poll_interval: Duration::from_secs(600),
            ..config()
        };
        let mut client = SessionClient::new(api.clone(), slow_poll);
        let id = client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;
        for id in ["a", "b", "c"] {
            pushed(client.add_game(new_game(id)).unwrap()).await;
        }
        pushed(client.toggle_vote("a").unwrap()).await;
        pushed(client.toggle_vote("b").unwrap()).await;

        let pool = client.tie_break().unwrap().unwrap();
        assert_eq!(pool.size(), 2);

        let mut rng = StdRng::seed_from_u64(7);
        let mut recorder = Recorder::default();
        let winner = client.spin(&mut rng, &mut recorder).await.unwrap();
        assert!(["a", "b"].contains(&winner.id.as_str()));
        assert_eq!(recorder.legs[0].from, 0.0);
        assert!(recorder.settled.is_some());

        pushed(client.mark_played(&winner.id).unwrap()).await;
        assert!(matches!(
            client.tie_break().unwrap(),
            Err(NotApplicable::ClearWinner(_))
        ));
        assert!(matches!(
            select_pool(&stored(&api, &id).await.games),
            Err(NotApplicable::ClearWinner(_))
        ));
    }

    #[tokio::test]
    async fn spin_without_a_tie_reports_the_clear_winner() {
        let (_, api) = server().await;
        let mut client = SessionClient::new(api, config());
        client.create().await.unwrap();
        pushed(client.identify(create("Ana")).unwrap().unwrap()).await;
        pushed(client.add_game(new_game("a")).unwrap()).await;
        pushed(client.add_game(new_game("b")).unwrap()).await;
        pushed(client.toggle_vote("b").unwrap()).await;

        let mut rng = StdRng::seed_from_u64(1);
        let err = client
            .spin(&mut rng, &mut Recorder::default())
            .await
            .unwrap_err();
        match err {
            ClientError::NoDraw(NotApplicable::ClearWinner(game)) => assert_eq!(game.id, "b"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Ana and Bo join at the same time; Bo's overwrite lands last and drops Ana's profile.
    async fn lost_profile() -> (Arc<dyn SessionApi>, String, SessionClient, User) {
        let (_, api) = server().await;
        let mut ana = SessionClient::new(api.clone(), config());
        let id = ana.create().await.unwrap();
        let mut bo = SessionClient::new(api.clone(), config());
        bo.load(&id, None).await.unwrap();

        pushed(ana.identify(create("Ana")).unwrap().unwrap()).await;
        pushed(bo.identify(create("Bo")).unwrap().unwrap()).await;
        bo.close().await;
        let ana_user = ana.current_user().unwrap();

        let mut updates = ana.subscribe();
        timeout(
            WAIT,
            updates.wait_for(|session| {
                session
                    .as_ref()
                    .is_some_and(|session| session.document.find_user(&ana_user.id).is_none())
            }),
        )
        .await
        .unwrap()
        .unwrap();
        (api, id, ana, ana_user)
    }

    #[tokio::test(start_paused = true)]
    async fn rejoin_restores_a_profile_lost_to_an_overwrite() {
        let (api, id, mut ana, ana_user) = lost_profile().await;
        assert_eq!(ana.current_user(), Some(ana_user.clone()));

        let push = ana
            .identify(IdentityChoice::Rejoin(ana_user.clone()))
            .unwrap()
            .unwrap();
        pushed(push).await;

        let users = stored(&api, &id).await.users;
        assert_eq!(users.len(), 2);
        assert!(users.contains(&ana_user));
    }

    #[tokio::test(start_paused = true)]
    async fn edits_append_a_bound_user_lost_to_an_overwrite() {
        let (api, id, mut ana, ana_user) = lost_profile().await;

        pushed(ana.add_game(new_game("a")).unwrap()).await;
        pushed(ana.toggle_vote("a").unwrap()).await;

        let document = stored(&api, &id).await;
        assert_eq!(document.find_user(&ana_user.id), Some(&ana_user));
        assert!(document.games[0].has_vote_from(&ana_user.id));
    }

    #[tokio::test(start_paused = true)]
    async fn join_link_logs_in_once_the_profile_syncs() {
        let (_, api) = server().await;
        let mut host = SessionClient::new(api.clone(), config());
        let id = host.create().await.unwrap();

        let mut guest = SessionClient::new(api.clone(), config());
        guest
            .load(&id, JoinToken::new("cy000001"))
            .await
            .unwrap();
        assert_eq!(guest.phase(), ClientPhase::Ready(Identity::NoUser));

        let cy = User {
            id: "cy000001".into(),
            name: "Cy".into(),
            color: "green".into(),
        };
        pushed(host.identify(IdentityChoice::Rejoin(cy.clone())).unwrap().unwrap()).await;

        let mut identity = guest.subscribe_identity();
        timeout(WAIT, identity.wait_for(|identity| identity.user().is_some()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(guest.phase(), ClientPhase::Ready(Identity::Identified(cy)));

        guest.switch_user().unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(guest.current_user().is_none());
    }
}
