//! Match session: the authoritative tick loop and its connected clients

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::util::time::tick_duration;
use crate::ws::protocol::merge_controls;
use crate::ws::{Connection, ProtocolError};

use super::r#match::{Game, MatchState};
use super::roster::PlayerId;

/// Outbound side of one connected client
struct ClientLink {
    player_id: PlayerId,
    outbox: mpsc::Sender<Bytes>,
}

/// Everything a tick touches; guarded by one lock
struct SessionInner {
    game: Game,
    clients: HashMap<Uuid, ClientLink>,
    encoder: Connection,
}

/// Counters for the health endpoint
#[derive(Debug, Clone, Copy)]
pub struct SessionStats {
    pub connections: usize,
    pub active_players: usize,
    pub match_state: MatchState,
    pub progress: f32,
}

/// Owns the match. Joins, leaves, controls merges and ticks each take the
/// lock once, so none of them interleave with a tick.
pub struct Session {
    inner: Mutex<SessionInner>,
    outbox_capacity: usize,
}

impl Session {
    pub fn new(game: Game, outbox_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                game,
                clients: HashMap::new(),
                encoder: Connection::new(),
            }),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Spawn a player for a new connection and register its outbox
    pub fn connect(&self, name: Option<String>) -> (Uuid, PlayerId, mpsc::Receiver<Bytes>) {
        let conn_id = Uuid::new_v4();
        let (outbox, outbox_rx) = mpsc::channel(self.outbox_capacity);

        let mut inner = self.inner.lock();
        let player_id = inner.game.spawn_player(name);
        inner.clients.insert(conn_id, ClientLink { player_id, outbox });

        info!(
            conn_id = %conn_id,
            player_id = %player_id,
            connections = inner.clients.len(),
            "Client connected"
        );
        (conn_id, player_id, outbox_rx)
    }

    /// Remove the connection's player. Unknown connections are ignored.
    pub fn disconnect(&self, conn_id: Uuid) {
        let mut inner = self.inner.lock();
        if let Some(link) = inner.clients.remove(&conn_id) {
            inner.game.remove_player(link.player_id);
            info!(
                conn_id = %conn_id,
                player_id = %link.player_id,
                connections = inner.clients.len(),
                "Client disconnected"
            );
        }
    }

    /// Merge one Controls payload into the player's pending controls
    pub fn merge_controls(&self, player_id: PlayerId, payload: &[u8]) -> Result<(), ProtocolError> {
        let mut inner = self.inner.lock();
        match inner.game.player_mut(player_id) {
            Some(player) => merge_controls(&mut player.controls, payload),
            None => {
                debug!(player_id = %player_id, "Controls for a removed player, dropping");
                Ok(())
            }
        }
    }

    /// Advance the match and publish a State frame to every client.
    /// Returns the number of frames queued.
    pub fn tick(&self, elapsed: f32) -> usize {
        let mut guard = self.inner.lock();
        let SessionInner {
            game,
            clients,
            encoder,
        } = &mut *guard;

        game.update(elapsed);

        let mut published = 0;
        for (conn_id, link) in clients.iter() {
            let snapshot = game.snapshot(Some(link.player_id));
            if let Err(e) = encoder.send_state(&snapshot) {
                error!(conn_id = %conn_id, error = %e, "Failed to encode state");
                continue;
            }
            match link.outbox.try_send(encoder.take_outgoing()) {
                Ok(()) => published += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(conn_id = %conn_id, "Client lagged, dropping state frame");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn_id = %conn_id, "Outbox closed");
                }
            }
        }
        published
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.inner.lock();
        SessionStats {
            connections: inner.clients.len(),
            active_players: inner.game.active_player_count(),
            match_state: inner.game.match_state(),
            progress: inner.game.progress(),
        }
    }

    /// Run the authoritative tick loop, feeding measured wall time to the match
    pub async fn run(self: Arc<Self>, tick_rate: u32) {
        let mut tick_interval = interval(tick_duration(tick_rate));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_rate, "Match session started");

        let mut last = Instant::now();
        loop {
            tick_interval.tick().await;
            let now = Instant::now();
            let elapsed = now.duration_since(last).as_secs_f32();
            last = now;
            self.tick(elapsed);
        }
    }
}

/// Wait on the spawned tick loop. It never returns on its own, so whatever
/// ends it (a contract violation panicking inside a tick) is fatal.
pub async fn supervise(tick_loop: JoinHandle<()>) -> anyhow::Error {
    match tick_loop.await {
        Ok(()) => anyhow!("tick loop exited"),
        Err(e) if e.is_panic() => {
            error!("Tick loop panicked, match state can no longer be trusted");
            anyhow!("tick loop panicked: {}", e)
        }
        Err(e) => anyhow!("tick loop cancelled: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientView;
    use crate::game::controls::ButtonKind;
    use crate::ws::handler::drain_controls;
    use crate::ws::MessageTag;
    use tokio_test::assert_ok;

    const TICK: f32 = 1.0 / 30.0;

    fn deliver(frame: Bytes, view: &mut ClientView, conn: &mut Connection) {
        conn.receive(&frame);
        assert_ok!(view.poll(conn));
    }

    #[tokio::test]
    async fn clients_see_themselves_first() {
        let session = Session::new(Game::new(5), 4);
        let (_, alice, mut alice_rx) = session.connect(Some("alice".to_string()));
        let (_, bob, mut bob_rx) = session.connect(None);

        assert_eq!(session.tick(TICK), 2);

        let mut alice_view = ClientView::new();
        let mut alice_conn = Connection::new();
        deliver(alice_rx.recv().await.unwrap(), &mut alice_view, &mut alice_conn);
        let me = alice_view.snapshot().me().unwrap();
        assert_eq!(me.id, alice);
        assert_eq!(me.name, "alice");

        let mut bob_view = ClientView::new();
        let mut bob_conn = Connection::new();
        deliver(bob_rx.recv().await.unwrap(), &mut bob_view, &mut bob_conn);
        assert_eq!(bob_view.snapshot().me().map(|p| p.id), Some(bob));
        assert_eq!(bob_view.snapshot().match_state, MatchState::Neutral);
        assert_eq!(bob_view.snapshot().active_player_count, 2);
    }

    #[tokio::test]
    async fn false_start_travels_from_client_to_snapshot() {
        let session = Session::new(Game::new(5), 4);
        let (_, alice, mut alice_rx) = session.connect(None);
        let (_, _, _bob_rx) = session.connect(None);
        session.tick(TICK);
        let _ = alice_rx.recv().await;

        let mut client = ClientView::new();
        client.press(ButtonKind::Up);
        client.release(ButtonKind::Up);
        let mut client_conn = Connection::new();
        assert_ok!(client.send_controls(&mut client_conn));

        let mut server_conn = Connection::new();
        server_conn.receive(&client_conn.take_outgoing());
        assert_eq!(assert_ok!(drain_controls(&mut server_conn, &session, alice)), 1);

        session.tick(TICK);
        let mut view_conn = Connection::new();
        deliver(alice_rx.recv().await.unwrap(), &mut client, &mut view_conn);
        let penalty = client.snapshot().me().map(|p| p.penalty).unwrap_or(0.0);
        assert!(penalty >= 6.0, "penalty {}", penalty);
    }

    #[tokio::test]
    async fn disconnect_promotes_spectator() {
        let session = Session::new(Game::new(5), 4);
        let (_, _, _a) = session.connect(None);
        let (bob_conn, _, _b) = session.connect(None);
        let (_, carol, mut carol_rx) = session.connect(None);

        session.disconnect(bob_conn);
        let stats = session.stats();
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.active_players, 2);

        session.tick(TICK);
        let mut view = ClientView::new();
        let mut conn = Connection::new();
        deliver(carol_rx.recv().await.unwrap(), &mut view, &mut conn);
        let me = view.snapshot().me().unwrap();
        assert_eq!(me.id, carol);
        assert!(me.active);
    }

    #[tokio::test]
    async fn panicking_tick_loop_is_reported() {
        let tick_loop = tokio::spawn(async {
            panic!("counter bonus 1 has the same sign as tug direction Right");
        });
        let err = supervise(tick_loop).await;
        assert!(err.to_string().contains("panicked"), "{}", err);
    }

    #[test]
    fn full_outbox_drops_frames_without_blocking() {
        let session = Session::new(Game::new(5), 1);
        let (_, _, _rx) = session.connect(None);
        assert_eq!(session.tick(TICK), 1);
        assert_eq!(session.tick(TICK), 0);
    }

    #[test]
    fn oversized_state_header_upstream_is_rejected_at_once() {
        let session = Session::new(Game::new(5), 1);
        let (_, player, _rx) = session.connect(None);
        let mut conn = Connection::accepting(MessageTag::Controls);
        conn.receive(&[b's', 0xff, 0xff, 0xff]);
        assert_eq!(
            drain_controls(&mut conn, &session, player),
            Err(ProtocolError::UnexpectedMessage(MessageTag::State))
        );
    }

    #[test]
    fn controls_from_a_state_frame_are_rejected() {
        let session = Session::new(Game::new(5), 1);
        let (_, player, _rx) = session.connect(None);
        let mut conn = Connection::new();
        assert_ok!(conn.send_state(&Default::default()));
        let bytes = conn.take_outgoing();
        conn.receive(&bytes);
        assert!(matches!(
            drain_controls(&mut conn, &session, player),
            Err(ProtocolError::UnexpectedMessage(_))
        ));
    }
}
