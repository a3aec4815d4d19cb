//! Player directory: where player ids come from.
//!
//! Parlor doesn't persist players itself. The [`PlayerDirectory`] trait
//! is the seam: registration takes a display name and hands back a
//! stable, unique [`PlayerId`]. A deployment backs it with a database;
//! [`InMemoryDirectory`] is enough for a single process and for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use parlor_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::PlayerError;

/// Assigns ids to players as they join sessions.
///
/// ```rust
/// use parlor_player::{PlayerDirectory, PlayerError};
/// use parlor_protocol::PlayerId;
///
/// /// Hands out ids from a fixed offset. Names are not checked.
/// struct OffsetDirectory(u64);
///
/// impl PlayerDirectory for OffsetDirectory {
///     async fn register(&self, name: &str) -> Result<PlayerId, PlayerError> {
///         Ok(PlayerId(self.0 + name.len() as u64))
///     }
/// }
/// ```
pub trait PlayerDirectory: Send + Sync + 'static {
    /// Records a new player and returns its id.
    ///
    /// # Errors
    /// [`PlayerError::InvalidName`] if the directory refuses the name.
    fn register(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<PlayerId, PlayerError>> + Send;
}

// ---------------------------------------------------------------------------
// DirectoryConfig
// ---------------------------------------------------------------------------

/// Name rules for [`InMemoryDirectory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Longest accepted display name, in characters.
    pub max_name_len: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self { max_name_len: 32 }
    }
}

// ---------------------------------------------------------------------------
// InMemoryDirectory
// ---------------------------------------------------------------------------

/// A process-local directory. Ids start at 1 and never repeat.
pub struct InMemoryDirectory {
    next_id: AtomicU64,
    names: Mutex<HashMap<PlayerId, String>>,
    config: DirectoryConfig,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            names: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Returns the name a player registered with.
    pub fn name_of(&self, player_id: PlayerId) -> Option<String> {
        let names = self.names.lock().unwrap_or_else(|e| e.into_inner());
        names.get(&player_id).cloned()
    }

    /// Number of players registered so far.
    pub fn len(&self) -> usize {
        self.names.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn validate(&self, name: &str) -> Result<String, PlayerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::InvalidName(
                "name must not be empty".into(),
            ));
        }
        if name.chars().count() > self.config.max_name_len {
            return Err(PlayerError::InvalidName(format!(
                "name exceeds {} characters",
                self.config.max_name_len
            )));
        }
        Ok(name.to_string())
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new(DirectoryConfig::default())
    }
}

impl PlayerDirectory for InMemoryDirectory {
    async fn register(&self, name: &str) -> Result<PlayerId, PlayerError> {
        let name = self.validate(name)?;
        let player_id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(player_id, name);
        tracing::debug!(%player_id, "player registered");
        Ok(player_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_assigns_increasing_unique_ids() {
        let dir = InMemoryDirectory::default();
        let a = dir.register("Alice").await.unwrap();
        let b = dir.register("Alice").await.unwrap();
        assert_eq!(a, PlayerId(1));
        assert_eq!(b, PlayerId(2));
        assert_eq!(dir.len(), 2);
    }

    #[tokio::test]
    async fn test_register_trims_name() {
        let dir = InMemoryDirectory::default();
        let id = dir.register("  Bob ").await.unwrap();
        assert_eq!(dir.name_of(id).as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name() {
        let dir = InMemoryDirectory::default();
        let err = dir.register("   ").await.unwrap_err();
        assert!(matches!(err, PlayerError::InvalidName(_)));
        assert!(dir.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_long_name() {
        let dir = InMemoryDirectory::new(DirectoryConfig { max_name_len: 3 });
        assert!(dir.register("Ann").await.is_ok());
        let err = dir.register("Anna").await.unwrap_err();
        assert!(err.to_string().contains("exceeds 3 characters"));
    }
}
