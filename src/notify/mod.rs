//! Notification Fabric: in-process topic-based pub/sub.
//! Each topic (`batch:{id}` / `file:{id}`) gets a broadcast channel and a
//! monotonic sequence counter; late subscribers receive a snapshot of the
//! last event before joining the live stream. Session auth and heartbeat
//! are handled here; the actual bidirectional transport (WebSocket) is the
//! server module's demo shell around this.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::external::AuthValidator;
use crate::models::{Phase, ProgressEvent, Topic};

const BROADCAST_CAPACITY: usize = 256;
/// Per-session bounded forwarder queue, so a slow session backs up rather
/// than blocking the publisher.
pub const SESSION_QUEUE_DEPTH: usize = 64;

/// Close codes the auth handshake / session reaper can terminate with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    Unauthorized,
    Overflow,
    IdleTimeout,
    Normal,
}

impl CloseCode {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseCode::Unauthorized => "UNAUTHORIZED",
            CloseCode::Overflow => "OVERFLOW",
            CloseCode::IdleTimeout => "IDLE_TIMEOUT",
            CloseCode::Normal => "NORMAL",
        }
    }
}

/// The first message a session must send.
#[derive(Debug, Clone)]
pub struct AuthMessage {
    pub msg_type: String,
    pub token: String,
}

/// Validate the session's first message against the auth handshake
/// contract. `message` is `None` when the caller's read deadline elapsed
/// before anything arrived.
pub async fn validate_handshake(
    message: Option<AuthMessage>,
    validator: &dyn AuthValidator,
) -> Result<String, CloseCode> {
    let Some(message) = message else {
        return Err(CloseCode::Unauthorized);
    };
    if message.msg_type != "auth" {
        return Err(CloseCode::Unauthorized);
    }
    validator.validate(&message.token).await.map_err(|_| CloseCode::Unauthorized)
}

struct TopicState {
    sender: broadcast::Sender<ProgressEvent>,
    sequence: AtomicU64,
    last: Mutex<Option<ProgressEvent>>,
}

impl TopicState {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            sender,
            sequence: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }
}

/// Counters snapshot carried on a [`ProgressEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub files_processed: u32,
    pub files_failed: u32,
    pub pages_processed: u32,
    pub total_files: u32,
    pub total_pages: Option<u32>,
}

pub struct NotificationFabric {
    topics: RwLock<HashMap<String, Arc<TopicState>>>,
}

impl NotificationFabric {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: RwLock::new(HashMap::new()),
        })
    }

    async fn topic_state(&self, topic: &Topic) -> Arc<TopicState> {
        let key = topic.as_key();
        if let Some(state) = self.topics.read().await.get(&key) {
            return state.clone();
        }
        let mut topics = self.topics.write().await;
        topics.entry(key).or_insert_with(|| Arc::new(TopicState::new())).clone()
    }

    /// Publish one progress event. Sequence numbers are strictly
    /// increasing per topic. Publishing never blocks: a topic with no
    /// subscribers simply drops the event.
    pub async fn publish(&self, topic: Topic, phase: Phase, counters: Counters) -> ProgressEvent {
        let state = self.topic_state(&topic).await;
        let sequence = state.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let event = ProgressEvent {
            topic: topic.as_key(),
            phase,
            sequence,
            files_processed: counters.files_processed,
            files_failed: counters.files_failed,
            pages_processed: counters.pages_processed,
            total_files: counters.total_files,
            total_pages: counters.total_pages,
        };
        *state.last.lock().await = Some(event.clone());
        // A send error here just means nobody is currently subscribed.
        let _ = state.sender.send(event.clone());
        event
    }

    /// Subscribe to a topic: returns the last known snapshot (if any) and
    /// a receiver for events published from this point on, so a late
    /// subscriber sees where things stand before joining the live stream.
    pub async fn subscribe(&self, topic: Topic) -> (Option<ProgressEvent>, broadcast::Receiver<ProgressEvent>) {
        let state = self.topic_state(&topic).await;
        let receiver = state.sender.subscribe();
        let snapshot = state.last.lock().await.clone();
        (snapshot, receiver)
    }
}

impl Default for NotificationFabric {
    fn default() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }
}

/// One registered client session: forwards a topic's broadcast stream
/// into a bounded per-session queue, dropping the session on overflow
/// rather than blocking the publisher.
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub topic: Topic,
}

pub struct SessionForwarder {
    pub outbox: mpsc::Receiver<ProgressEvent>,
    pub close: mpsc::Receiver<CloseCode>,
}

/// Register a session against a topic and start forwarding. Returns a
/// receiver for forwarded events plus a receiver that fires once with the
/// close code when the session should be torn down (overflow or idle
/// timeout).
pub async fn register_session(
    fabric: Arc<NotificationFabric>,
    session: Session,
    idle_timeout: Duration,
) -> (Option<ProgressEvent>, SessionForwarder) {
    let (outbox_tx, outbox_rx) = mpsc::channel(SESSION_QUEUE_DEPTH);
    let (close_tx, close_rx) = mpsc::channel(1);

    let topic = session.topic.clone();
    let session_id = session.id.clone();

    let (snapshot, mut receiver) = fabric.subscribe(topic.clone()).await;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if outbox_tx.try_send(event).is_err() {
                                warn!(session = %session_id, topic = %topic, "session send queue overflowed, dropping session");
                                let _ = close_tx.send(CloseCode::Overflow).await;
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(session = %session_id, skipped, "session lagged behind broadcast, dropping");
                            let _ = close_tx.send(CloseCode::Overflow).await;
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = tokio::time::sleep(idle_timeout) => {
                    let _ = close_tx.send(CloseCode::IdleTimeout).await;
                    break;
                }
            }
        }
    });

    (snapshot, SessionForwarder { outbox: outbox_rx, close: close_rx })
}

pub async fn heartbeat_interval(session_config: &crate::config::SessionConfig) -> Duration {
    Duration::from_secs(session_config.ping_interval_s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::StaticTokenValidator;
    use crate::models::{Phase, Topic};

    #[tokio::test]
    async fn handshake_rejects_missing_message() {
        let validator = StaticTokenValidator;
        let result = validate_handshake(None, &validator).await;
        assert_eq!(result.unwrap_err(), CloseCode::Unauthorized);
    }

    #[tokio::test]
    async fn handshake_rejects_non_auth_message_type() {
        let validator = StaticTokenValidator;
        let message = AuthMessage {
            msg_type: "ping".into(),
            token: "sometoken".into(),
        };
        let result = validate_handshake(Some(message), &validator).await;
        assert_eq!(result.unwrap_err(), CloseCode::Unauthorized);
    }

    #[tokio::test]
    async fn handshake_accepts_valid_auth_message() {
        let validator = StaticTokenValidator;
        let message = AuthMessage {
            msg_type: "auth".into(),
            token: "user-42".into(),
        };
        let user_id = validate_handshake(Some(message), &validator).await.unwrap();
        assert_eq!(user_id, "user-42");
    }

    #[tokio::test]
    async fn publish_sequence_numbers_strictly_increase_per_topic() {
        let fabric = NotificationFabric::new();
        let topic = Topic::Batch("batch-1".into());
        let first = fabric.publish(topic.clone(), Phase::BatchSubmitted, Counters::default()).await;
        let second = fabric.publish(topic, Phase::BatchCompleted, Counters::default()).await;
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[tokio::test]
    async fn late_subscriber_receives_last_snapshot_before_live_events() {
        let fabric = NotificationFabric::new();
        let topic = Topic::Batch("batch-2".into());
        fabric.publish(topic.clone(), Phase::BatchSubmitted, Counters::default()).await;

        let (snapshot, _receiver) = fabric.subscribe(topic).await;
        let snapshot = snapshot.expect("late subscriber should see the last published event");
        assert_eq!(snapshot.phase, Phase::BatchSubmitted);
    }
}

pub fn idle_timeout(session_config: &crate::config::SessionConfig) -> Duration {
    Duration::from_secs(session_config.idle_timeout_s)
}

pub type FabricResult<T> = CoreResult<T>;
