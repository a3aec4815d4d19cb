//! The session registry: creates sessions, hands out codes, finds
//! sessions again by code.
//!
//! The table is guarded by a Tokio `RwLock`. Lookups share the read
//! guard; creation picks its code and inserts under a single write
//! guard, so two concurrent creates can never claim the same code.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parlor_player::{InMemoryDirectory, Mailbox, Player, PlayerDirectory};
use parlor_protocol::{SESSION_CODE_SPACE, SessionCode, SessionId};
use rand::Rng;
use tokio::sync::RwLock;

use crate::event::PlayerEvent;
use crate::{EngineConfig, GameCatalog, Session, SessionError};

/// Counter for generating unique session IDs.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Code sources
// ---------------------------------------------------------------------------

/// Supplies candidate code indexes in `[0, SESSION_CODE_SPACE)`.
///
/// Any `Fn() -> u32` closure is a `CodeSource`, which is how tests
/// script collisions.
pub trait CodeSource: Send + Sync + 'static {
    fn draw(&self) -> u32;
}

impl<F> CodeSource for F
where
    F: Fn() -> u32 + Send + Sync + 'static,
{
    fn draw(&self) -> u32 {
        self()
    }
}

/// Uniformly random code indexes from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodes;

impl CodeSource for RandomCodes {
    fn draw(&self) -> u32 {
        rand::rng().random_range(0..SESSION_CODE_SPACE)
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// What a successful [`SessionRegistry::join`] hands back.
pub struct Joined {
    /// The session the join request was queued on.
    pub session: Session,
    /// The newly registered player.
    pub player: Player,
    /// The player's mailbox. `DID_JOIN` or an error lands here first.
    pub mailbox: Mailbox,
}

/// All live sessions of one server, keyed by code.
pub struct SessionRegistry<D: PlayerDirectory = InMemoryDirectory> {
    catalog: Arc<GameCatalog>,
    directory: D,
    sessions: RwLock<HashMap<SessionCode, Session>>,
    codes: Box<dyn CodeSource>,
    config: EngineConfig,
}

impl SessionRegistry<InMemoryDirectory> {
    /// Creates a registry backed by an in-memory player directory.
    pub fn new(catalog: Arc<GameCatalog>, config: EngineConfig) -> Self {
        Self::with_directory(catalog, InMemoryDirectory::default(), config)
    }
}

impl<D: PlayerDirectory> SessionRegistry<D> {
    /// Creates a registry that registers players through `directory`.
    pub fn with_directory(catalog: Arc<GameCatalog>, directory: D, config: EngineConfig) -> Self {
        Self {
            catalog,
            directory,
            sessions: RwLock::new(HashMap::new()),
            codes: Box::new(RandomCodes),
            config,
        }
    }

    /// Replaces the source of session codes.
    pub fn code_source(mut self, codes: impl CodeSource) -> Self {
        self.codes = Box::new(codes);
        self
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates a session of `game` and starts its execution loop.
    ///
    /// Draws codes until one is free. There is no retry limit.
    ///
    /// # Errors
    /// [`SessionError::UnknownGame`] if the catalog has no such game.
    pub async fn create(&self, game: &str) -> Result<Session, SessionError> {
        let initial = self.catalog.lookup(game)?.initial_stage();

        let mut sessions = self.sessions.write().await;
        let code = loop {
            let code = SessionCode::from_index(self.codes.draw())?;
            if !sessions.contains_key(&code) {
                break code;
            }
            tracing::debug!(%code, "session code collision, drawing again");
        };

        let id = SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed));
        let session = Session::spawn(id, code.clone(), game, initial, &self.config);
        sessions.insert(code, session.clone());
        Ok(session)
    }

    /// Finds the session using `code`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session has that code.
    pub async fn lookup(&self, code: &SessionCode) -> Result<Session, SessionError> {
        self.sessions
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(code.clone()))
    }

    /// Registers a new player named `name` and asks the session with
    /// `code` to admit it.
    ///
    /// The join goes through the active stage like any other event; the
    /// verdict arrives in the returned mailbox. Nobody is registered for
    /// a session that has already ended.
    pub async fn join(&self, code: &SessionCode, name: &str) -> Result<Joined, SessionError> {
        let session = self.lookup(code).await?;
        if !session.is_running() {
            return Err(SessionError::Ended(code.clone()));
        }
        let player_id = self.directory.register(name).await?;
        let (player, mailbox) = Player::new(player_id, name.trim(), self.config.mailbox_capacity);
        session.join(&player).await?;
        tracing::info!(%code, %player_id, "player joining session");
        Ok(Joined {
            session,
            player,
            mailbox,
        })
    }

    /// Routes a player event to the session with `code`.
    pub async fn submit(&self, code: &SessionCode, event: PlayerEvent) -> Result<(), SessionError> {
        self.lookup(code).await?.submit(event).await
    }

    /// Codes of all registered sessions, sorted.
    pub async fn codes(&self) -> Vec<SessionCode> {
        let mut codes: Vec<SessionCode> = self.sessions.read().await.keys().cloned().collect();
        codes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        codes
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forgets the session with `code`. Its loop keeps running until its
    /// stage ends; it just can't be found anymore.
    pub async fn remove(&self, code: &SessionCode) -> Option<Session> {
        self.sessions.write().await.remove(code)
    }

    /// Forgets every session whose loop has exited. Returns how many.
    pub async fn prune_ended(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_running());
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::info!(pruned, remaining = sessions.len(), "pruned ended sessions");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures_util::future::BoxFuture;

    use super::*;
    use crate::JoinStage;
    use crate::stage::{Stage, StageContext, StageResult, Transition};

    /// Ends as soon as it runs.
    struct Over;

    impl Stage for Over {
        fn name(&self) -> &str {
            "over"
        }

        fn run<'a>(self: Box<Self>, _ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
            Box::pin(async { Ok(Transition::End) })
        }
    }

    fn catalog() -> Arc<GameCatalog> {
        fn lobby() -> Box<dyn Stage> {
            Box::new(JoinStage::new(1, 2, |_| lobby()))
        }
        fn over() -> Box<dyn Stage> {
            Box::new(Over)
        }
        Arc::new(
            GameCatalog::new()
                .with("Lobby", lobby)
                .and_then(|c| c.with("Over", over))
                .unwrap(),
        )
    }

    /// Replays `script`, then repeats its last entry.
    fn scripted(script: Vec<u32>) -> impl CodeSource {
        let script = Mutex::new(script.into_iter().collect::<std::collections::VecDeque<_>>());
        move || {
            let mut script = script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script[0]
            }
        }
    }

    #[tokio::test]
    async fn test_create_registers_session_under_its_code() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default())
            .code_source(scripted(vec![3]));

        let session = registry.create("Lobby").await.unwrap();

        assert_eq!(session.code().as_str(), "AAAD");
        assert_eq!(session.game(), "Lobby");
        assert_eq!(registry.lookup(session.code()).await.unwrap().id(), session.id());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_redraws_on_collision() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default())
            .code_source(scripted(vec![0, 0, 0, 26]));

        let first = registry.create("Lobby").await.unwrap();
        let second = registry.create("Lobby").await.unwrap();

        assert_eq!(first.code().as_str(), "AAAA");
        assert_eq!(second.code().as_str(), "AABA");
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_random_codes_are_distinct() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        for _ in 0..50 {
            registry.create("Lobby").await.unwrap();
        }
        assert_eq!(registry.codes().await.len(), 50);
    }

    #[tokio::test]
    async fn test_create_unknown_game() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let err = registry.create("Chess").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownGame(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_lookup_unknown_code_names_the_code() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let code: SessionCode = "QQQQ".parse().unwrap();
        let err = registry.lookup(&code).await.unwrap_err();
        assert_eq!(err.to_string(), "could not find session with code \"QQQQ\"");
    }

    #[tokio::test]
    async fn test_join_registers_player_and_queues_join() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let session = registry.create("Lobby").await.unwrap();

        let mut joined = registry.join(session.code(), " Alice ").await.unwrap();

        assert_eq!(joined.player.name(), "Alice");
        assert_eq!(registry.directory().name_of(joined.player.id()).as_deref(), Some("Alice"));
        let ack = tokio::time::timeout(std::time::Duration::from_secs(1), joined.mailbox.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ack.kind, JoinStage::DID_JOIN);
    }

    #[tokio::test]
    async fn test_join_unknown_code_registers_nobody() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let code: SessionCode = "NOPE".parse().unwrap();
        assert!(matches!(
            registry.join(&code, "Alice").await,
            Err(SessionError::NotFound(_))
        ));
        assert!(registry.directory().is_empty());
    }

    #[tokio::test]
    async fn test_join_ended_session_registers_nobody() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let session = registry.create("Over").await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), session.finished())
            .await
            .unwrap();

        assert!(matches!(
            registry.join(session.code(), "Alice").await,
            Err(SessionError::Ended(_))
        ));
        assert!(registry.directory().is_empty());
    }

    #[tokio::test]
    async fn test_join_invalid_name() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default());
        let session = registry.create("Lobby").await.unwrap();
        assert!(matches!(
            registry.join(session.code(), "").await,
            Err(SessionError::Player(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_and_prune() {
        let registry = SessionRegistry::new(catalog(), EngineConfig::default())
            .code_source(scripted(vec![1, 2]));
        let first = registry.create("Lobby").await.unwrap();
        let _second = registry.create("Lobby").await.unwrap();

        assert_eq!(registry.prune_ended().await, 0);
        assert!(registry.remove(first.code()).await.is_some());
        assert!(registry.lookup(first.code()).await.is_err());
        assert_eq!(registry.len().await, 1);
    }
}
