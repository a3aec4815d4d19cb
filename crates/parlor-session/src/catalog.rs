//! The game catalog: game name → initial stage factory.
//!
//! Games are registered once at startup and looked up every time a
//! session is created, so the table sits behind a reader/writer lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::stage::Stage;
use crate::{CatalogError, SessionError};

/// A game that sessions can be created for.
///
/// Any `Fn() -> Box<dyn Stage>` closure is a `Game`.
pub trait Game: Send + Sync + 'static {
    /// Builds the first stage of a fresh session.
    fn initial_stage(&self) -> Box<dyn Stage>;
}

impl<F> Game for F
where
    F: Fn() -> Box<dyn Stage> + Send + Sync + 'static,
{
    fn initial_stage(&self) -> Box<dyn Stage> {
        self()
    }
}

/// Registered games, by name.
#[derive(Default)]
pub struct GameCatalog {
    games: RwLock<HashMap<String, Arc<dyn Game>>>,
}

impl GameCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `game` under `name`.
    ///
    /// # Errors
    /// [`CatalogError::Duplicate`] if the name is taken,
    /// [`CatalogError::EmptyName`] if it is blank.
    pub fn register(
        &self,
        name: impl Into<String>,
        game: impl Game,
    ) -> Result<(), CatalogError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        if games.contains_key(&name) {
            return Err(CatalogError::Duplicate(name));
        }
        tracing::info!(game = %name, "game registered");
        games.insert(name, Arc::new(game));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(self, name: impl Into<String>, game: impl Game) -> Result<Self, CatalogError> {
        self.register(name, game)?;
        Ok(self)
    }

    /// Returns the game registered under `name`.
    ///
    /// # Errors
    /// [`SessionError::UnknownGame`] if there is none.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Game>, SessionError> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownGame(name.to_string()))
    }

    /// Names of all registered games, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
