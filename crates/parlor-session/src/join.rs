//! The lobby stage: collect players, then start the game.
//!
//! | Event   | Condition            | Effect                                         |
//! |---------|----------------------|------------------------------------------------|
//! | `JOIN`  | roster < max         | sender admitted, `DID_JOIN` to sender          |
//! | `JOIN`  | roster ≥ max         | error to sender, roster unchanged              |
//! | `START` | roster ≥ min         | `DID_START` to every member, hand off to game  |
//! | `START` | roster < min         | error to sender, keep waiting                  |
//! | `START` | sender not a member  | error to sender, keep waiting                  |
//! | other   |                      | error to sender                                |

use futures_util::future::BoxFuture;
use parlor_player::{Player, PlayerSummary};
use parlor_protocol::{EventType, ServerEvent};
use serde::{Deserialize, Serialize};

use crate::StageError;
use crate::event::PlayerEvent;
use crate::stage::{Stage, StageContext, StageResult, Transition};

/// Builds the stage that follows the lobby from the final roster.
pub type StartFn = Box<dyn FnOnce(Vec<Player>) -> Box<dyn Stage> + Send>;

/// Payload of `DID_START`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Started {
    /// The roster the game starts with, in join order.
    pub players: Vec<PlayerSummary>,
}

/// Waits for between `min_players` and `max_players` players, then
/// hands the roster to the `start` factory.
///
/// The same player may join more than once while there is room; each
/// join takes a seat.
pub struct JoinStage {
    min_players: usize,
    max_players: usize,
    start: StartFn,
}

impl JoinStage {
    /// A player asks to join. The sender is the joining player.
    pub const JOIN: EventType = EventType::from_static("JOIN");
    /// Sent to a player whose join was accepted.
    pub const DID_JOIN: EventType = EventType::from_static("DID_JOIN");
    /// A player asks to start the game.
    pub const START: EventType = EventType::from_static("START");
    /// Sent to every member when the game starts.
    pub const DID_START: EventType = EventType::from_static("DID_START");

    /// Creates a lobby. `start` receives the roster in join order.
    pub fn new(
        min_players: usize,
        max_players: usize,
        start: impl FnOnce(Vec<Player>) -> Box<dyn Stage> + Send + 'static,
    ) -> Self {
        Self {
            min_players,
            max_players,
            start: Box::new(start),
        }
    }

    pub fn min_players(&self) -> usize {
        self.min_players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    fn handle_join(&self, ctx: &mut StageContext, event: PlayerEvent) {
        let player = event.sender().clone();
        if ctx.roster().len() >= self.max_players {
            ctx.reject(
                &player,
                format!(
                    "maximum player count of {} has already been reached",
                    self.max_players
                ),
            );
            return;
        }
        let ack = ServerEvent::new(
            Self::DID_JOIN,
            serde_json::json!({ "player": player.summary() }),
        );
        ctx.admit(player.clone());
        ctx.reply(&player, ack);
    }

    /// Returns `true` if the game can start.
    fn handle_start(&self, ctx: &StageContext, event: &PlayerEvent) -> Result<bool, StageError> {
        if !ctx.is_member(event.sender()) {
            ctx.reject(event.sender(), format!("unknown player: {}", event.sender().name()));
            return Ok(false);
        }
        let joined = ctx.roster().len();
        if joined < self.min_players {
            ctx.reject(
                event.sender(),
                format!(
                    "only {} player(s) have joined, a minimum of {} are required before the game can be started",
                    joined, self.min_players
                ),
            );
            return Ok(false);
        }
        let started = Started {
            players: ctx.roster().iter().map(Player::summary).collect(),
        };
        ctx.broadcast(&ServerEvent::with_payload(Self::DID_START, &started)?);
        Ok(true)
    }
}

impl Stage for JoinStage {
    fn name(&self) -> &str {
        "join"
    }

    fn run<'a>(self: Box<Self>, ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
        Box::pin(async move {
            while let Some(event) = ctx.next_event().await {
                if event.is(&Self::JOIN) {
                    self.handle_join(ctx, event);
                } else if event.is(&Self::START) {
                    if self.handle_start(ctx, &event)? {
                        let players = ctx.roster().to_vec();
                        tracing::info!(
                            code = %ctx.code(),
                            players = players.len(),
                            "game starting"
                        );
                        let JoinStage { start, .. } = *self;
                        return Ok(Transition::Next(start(players)));
                    }
                } else {
                    ctx.reject(
                        event.sender(),
                        format!("unexpected event \"{}\" while waiting for players", event.kind()),
                    );
                }
            }

            tracing::info!(code = %ctx.code(), "event queue closed while waiting for players");
            Ok(Transition::End)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use parlor_player::Mailbox;
    use parlor_protocol::PlayerId;

    use super::*;
    use crate::event::{EventSender, event_queue};

    /// Records the roster it was started with, then ends.
    struct Recorder {
        players: Vec<Player>,
        seen: Arc<Mutex<Option<Vec<PlayerId>>>>,
    }

    impl Stage for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn run<'a>(self: Box<Self>, _ctx: &'a mut StageContext) -> BoxFuture<'a, StageResult> {
            Box::pin(async move {
                let ids = self.players.iter().map(Player::id).collect();
                *self.seen.lock().unwrap() = Some(ids);
                Ok(Transition::End)
            })
        }
    }

    type Seen = Arc<Mutex<Option<Vec<PlayerId>>>>;

    fn lobby(min: usize, max: usize) -> (JoinStage, Seen) {
        let seen: Seen = Arc::new(Mutex::new(None));
        let handle = Arc::clone(&seen);
        let stage = JoinStage::new(min, max, move |players| {
            Box::new(Recorder {
                players,
                seen: handle,
            })
        });
        (stage, seen)
    }

    fn player(id: u64, name: &str) -> (Player, Mailbox) {
        Player::new(PlayerId(id), name, 16)
    }

    async fn send(tx: &EventSender, kind: EventType, sender: &Player) {
        tx.send(PlayerEvent::bare(kind, sender.clone())).await.unwrap();
    }

    /// Runs the stage over everything queued so far, with the producer
    /// side dropped so the stage sees end of input.
    async fn run_to_completion(
        stage: JoinStage,
        tx: EventSender,
        mut ctx: StageContext,
    ) -> (StageResult, StageContext) {
        drop(tx);
        let result = Box::new(stage).run(&mut ctx).await;
        (result, ctx)
    }

    fn context() -> (EventSender, StageContext) {
        let (tx, queue) = event_queue(32);
        (tx, StageContext::new("JOIN".parse().unwrap(), queue))
    }

    #[tokio::test]
    async fn test_join_acknowledges_only_the_joiner() {
        let (stage, _) = lobby(2, 4);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");
        let (b, mut mb) = player(2, "Bob");

        send(&tx, JoinStage::JOIN, &a).await;
        let (result, ctx) = run_to_completion(stage, tx, ctx).await;

        assert!(matches!(result, Ok(Transition::End)));
        assert_eq!(ctx.roster(), &[a]);
        let events = ma.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, JoinStage::DID_JOIN);
        assert_eq!(events[0].payload["player"]["name"], "Alice");
        assert!(mb.try_recv().is_none());
        drop(b);
    }

    #[tokio::test]
    async fn test_join_at_max_is_rejected() {
        let (stage, _) = lobby(1, 2);
        let (tx, ctx) = context();
        let (a, _ma) = player(1, "Alice");
        let (b, _mb) = player(2, "Bob");
        let (c, mut mc) = player(3, "Carol");

        send(&tx, JoinStage::JOIN, &a).await;
        send(&tx, JoinStage::JOIN, &b).await;
        send(&tx, JoinStage::JOIN, &c).await;
        let (_, ctx) = run_to_completion(stage, tx, ctx).await;

        assert_eq!(ctx.roster().len(), 2);
        assert!(!ctx.is_member(&c));
        let events = mc.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].error_message(),
            Some("maximum player count of 2 has already been reached")
        );
    }

    #[tokio::test]
    async fn test_start_below_min_is_rejected_and_lobby_stays_open() {
        let (stage, seen) = lobby(2, 4);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");
        let (b, mut mb) = player(2, "Bob");

        send(&tx, JoinStage::JOIN, &a).await;
        send(&tx, JoinStage::START, &a).await;
        send(&tx, JoinStage::JOIN, &b).await;
        let (result, ctx) = run_to_completion(stage, tx, ctx).await;

        assert!(matches!(result, Ok(Transition::End)));
        assert!(seen.lock().unwrap().is_none(), "game must not start");
        assert_eq!(ctx.roster().len(), 2, "joins still accepted after a failed start");

        let events = ma.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, JoinStage::DID_JOIN);
        assert_eq!(
            events[1].error_message(),
            Some("only 1 player(s) have joined, a minimum of 2 are required before the game can be started")
        );
        assert_eq!(mb.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_start_from_outsider_is_rejected_once() {
        let (stage, seen) = lobby(2, 2);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");
        let (b, mut mb) = player(2, "Bob");
        let (eve, mut me) = player(3, "Eve");

        send(&tx, JoinStage::JOIN, &a).await;
        send(&tx, JoinStage::JOIN, &b).await;
        send(&tx, JoinStage::START, &eve).await;
        let (result, ctx) = run_to_completion(stage, tx, ctx).await;

        assert!(matches!(result, Ok(Transition::End)), "lobby must not hand off");
        assert!(seen.lock().unwrap().is_none());
        assert!(!ctx.is_member(&eve));
        let events = me.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error_message(), Some("unknown player: Eve"));
        assert_eq!(ma.drain().len(), 1, "members only see their own DID_JOIN");
        assert_eq!(mb.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_start_before_any_join_is_from_an_outsider() {
        let (stage, _) = lobby(1, 4);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");

        send(&tx, JoinStage::START, &a).await;
        let _ = run_to_completion(stage, tx, ctx).await;

        assert_eq!(ma.try_recv().unwrap().error_message(), Some("unknown player: Alice"));
        assert!(ma.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_start_broadcasts_in_roster_order_and_hands_off_once() {
        let (stage, seen) = lobby(2, 3);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");
        let (b, mut mb) = player(2, "Bob");

        send(&tx, JoinStage::JOIN, &a).await;
        send(&tx, JoinStage::JOIN, &b).await;
        send(&tx, JoinStage::START, &b).await;
        // Left in the queue for whoever runs next.
        send(&tx, JoinStage::START, &a).await;
        let (result, mut ctx) = run_to_completion(stage, tx, ctx).await;

        let next = match result {
            Ok(Transition::Next(next)) => next,
            other => panic!("expected a hand-off, got {other:?}"),
        };
        assert_eq!(next.name(), "recorder");
        assert!(matches!(next.run(&mut ctx).await, Ok(Transition::End)));
        assert_eq!(*seen.lock().unwrap(), Some(vec![PlayerId(1), PlayerId(2)]));

        for mailbox in [&mut ma, &mut mb] {
            let events = mailbox.drain();
            assert_eq!(events.len(), 2);
            assert_eq!(events[1].kind, JoinStage::DID_START);
            let started: Started = events[1].payload_as().unwrap();
            let names: Vec<_> = started.players.iter().map(|p| p.name.as_str()).collect();
            assert_eq!(names, ["Alice", "Bob"]);
        }
    }

    #[tokio::test]
    async fn test_repeat_join_below_max_takes_another_seat() {
        let (stage, _) = lobby(1, 3);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");

        send(&tx, JoinStage::JOIN, &a).await;
        send(&tx, JoinStage::JOIN, &a).await;
        let (_, ctx) = run_to_completion(stage, tx, ctx).await;

        assert_eq!(ctx.roster().len(), 2);
        assert_eq!(ma.drain().len(), 2);
    }

    #[tokio::test]
    async fn test_unexpected_event_is_rejected() {
        let (stage, _) = lobby(1, 3);
        let (tx, ctx) = context();
        let (a, mut ma) = player(1, "Alice");

        send(&tx, EventType::from_static("DROP_PIECE"), &a).await;
        let _ = run_to_completion(stage, tx, ctx).await;

        assert_eq!(
            ma.try_recv().unwrap().error_message(),
            Some("unexpected event \"DROP_PIECE\" while waiting for players")
        );
    }
}
