//! Replay transport: plays a recorded capture as if it came from a broker.
//!
//! A capture is a JSON-lines file, one record per line:
//!
//! ```text
//! {"topic": "smarthome/security/sensors/gas", "payload": "620", "delay_ms": 500}
//! {"lose_link": "wifi dropped", "delay_ms": 100}
//! ```
//!
//! `delay_ms` is the pause before the record.  Messages are delivered only
//! while subscribed and only if the topic matches the active filter.  A
//! `lose_link` record reports a connection loss; after a reconnect and
//! resubscribe the replay continues with the next record.
//!
//! All broker-side work happens on a dedicated I/O thread; the
//! [`TransportPort`] methods only queue operations for it.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::TransportPort;
use crate::error::{Error, Result, TransportError};
use crate::runtime::TransportLink;
use crate::session::{AttemptId, Endpoint};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayRecord {
    Message {
        topic: String,
        payload: String,
        #[serde(default)]
        delay_ms: u64,
    },
    LinkLoss {
        lose_link: String,
        #[serde(default)]
        delay_ms: u64,
    },
}

impl ReplayRecord {
    pub fn delay(&self) -> Duration {
        match self {
            Self::Message { delay_ms, .. } | Self::LinkLoss { delay_ms, .. } => {
                Duration::from_millis(*delay_ms)
            }
        }
    }
}

/// Parse a JSON-lines capture.  Blank lines are skipped.
pub fn parse_capture(text: &str) -> Result<Vec<ReplayRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| Error::Capture {
                line: n + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

pub fn load_capture(path: &Path) -> Result<Vec<ReplayRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_capture(&text)
}

/// MQTT topic filter matching with `+` and `#` wildcards.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut f = filter.split('/');
    let mut t = topic.split('/');
    loop {
        match (f.next(), t.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(a), Some(b)) if a == b => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

// ── Transport port ───────────────────────────────────────────

/// Pending broker operations.  The session issues at most a handful
/// between two records.
const OPS_DEPTH: usize = 8;

enum ReplayOp {
    Connect(AttemptId, Endpoint),
    Subscribe(AttemptId, String),
    Disconnect(AttemptId),
    Stop,
}

type OpsChannel = Channel<CriticalSectionRawMutex, ReplayOp, OPS_DEPTH>;
type DoneSignal = Signal<CriticalSectionRawMutex, ()>;

/// Signalled once when every record has been played.
pub struct ReplayDone {
    signal: Arc<DoneSignal>,
}

impl ReplayDone {
    /// Resolves when the capture is exhausted.
    pub async fn finished(&self) {
        self.signal.wait().await;
    }

    /// Block until the capture is exhausted.  Returns `false` on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        futures_lite::future::block_on(futures_lite::future::or(
            async {
                self.finished().await;
                true
            },
            async {
                Timer::after(timeout).await;
                false
            },
        ))
    }
}

pub struct ReplayTransport {
    ops: Arc<OpsChannel>,
}

impl ReplayTransport {
    /// Start the replay I/O thread.  It stops when the transport is dropped.
    pub fn spawn(records: Vec<ReplayRecord>, link: TransportLink) -> Result<(Self, ReplayDone)> {
        let ops = Arc::new(OpsChannel::new());
        let done = Arc::new(DoneSignal::new());
        info!("Replay: {} records loaded", records.len());

        let player = ReplayPlayer::new(records, link, done.clone());
        let rx = ops.clone();
        thread::Builder::new()
            .name("replay-io".into())
            .spawn(move || run_player(player, rx))?;
        Ok((Self { ops }, ReplayDone { signal: done }))
    }

    fn queue(&self, op: ReplayOp) {
        if self.ops.try_send(op).is_err() {
            warn!("Replay: op channel full, dropping operation");
        }
    }
}

impl TransportPort for ReplayTransport {
    fn connect(&mut self, attempt: AttemptId, endpoint: &Endpoint) {
        self.queue(ReplayOp::Connect(attempt, endpoint.clone()));
    }

    fn subscribe(&mut self, attempt: AttemptId, filter: &str) {
        self.queue(ReplayOp::Subscribe(attempt, filter.to_owned()));
    }

    fn disconnect(&mut self, attempt: AttemptId) {
        self.queue(ReplayOp::Disconnect(attempt));
    }
}

impl Drop for ReplayTransport {
    fn drop(&mut self) {
        self.queue(ReplayOp::Stop);
    }
}

// ── I/O thread ───────────────────────────────────────────────

/// Which future woke the player.
enum Wake {
    Op(ReplayOp),
    Due,
}

/// Entry point for the replay thread.
fn run_player(player: ReplayPlayer, ops: Arc<OpsChannel>) {
    let executor: edge_executor::LocalExecutor<'_, 2> = edge_executor::LocalExecutor::new();
    let task = executor.spawn(player.run(ops));
    futures_lite::future::block_on(executor.run(task));
}

struct ReplayPlayer {
    records: Vec<ReplayRecord>,
    cursor: usize,
    link: TransportLink,
    done: Arc<DoneSignal>,
    finished: bool,
    connected: Option<AttemptId>,
    filter: Option<String>,
    /// Fires when the record at `cursor` is due.
    due: Option<Timer>,
}

impl ReplayPlayer {
    fn new(records: Vec<ReplayRecord>, link: TransportLink, done: Arc<DoneSignal>) -> Self {
        Self {
            records,
            cursor: 0,
            link,
            done,
            finished: false,
            connected: None,
            filter: None,
            due: None,
        }
    }

    async fn run(mut self, ops: Arc<OpsChannel>) {
        loop {
            let wake = match self.due.as_mut() {
                Some(timer) => {
                    futures_lite::future::or(async { Wake::Op(ops.receive().await) }, async {
                        timer.await;
                        Wake::Due
                    })
                    .await
                }
                None => Wake::Op(ops.receive().await),
            };

            match wake {
                Wake::Op(ReplayOp::Stop) => break,
                Wake::Op(op) => self.apply(op),
                Wake::Due => self.play_next(),
            }
        }
        debug!("Replay: I/O thread exiting at record {}", self.cursor);
    }

    fn apply(&mut self, op: ReplayOp) {
        match op {
            ReplayOp::Connect(attempt, endpoint) => {
                info!("Replay[{}]: connected to {} (simulated)", attempt, endpoint);
                self.connected = Some(attempt);
                self.filter = None;
                self.due = None;
                self.link.connack(attempt, Ok(()));
            }
            ReplayOp::Subscribe(attempt, filter) => {
                if self.connected != Some(attempt) {
                    self.link
                        .suback(attempt, Err(TransportError::Io("not connected".into())));
                    return;
                }
                self.link.suback(attempt, Ok(()));
                self.filter = Some(filter);
                self.schedule();
            }
            ReplayOp::Disconnect(attempt) => {
                if self.connected == Some(attempt) {
                    info!("Replay[{}]: disconnected", attempt);
                    self.connected = None;
                    self.filter = None;
                    self.due = None;
                }
            }
            ReplayOp::Stop => {}
        }
    }

    fn schedule(&mut self) {
        self.due = match self.records.get(self.cursor) {
            Some(record) => Some(Timer::after(record.delay())),
            None => {
                self.finish();
                None
            }
        };
    }

    fn play_next(&mut self) {
        let (Some(attempt), Some(record)) = (self.connected, self.records.get(self.cursor)) else {
            self.due = None;
            return;
        };
        self.cursor += 1;

        match record {
            ReplayRecord::Message { topic, payload, .. } => {
                let matches = self
                    .filter
                    .as_deref()
                    .is_some_and(|filter| topic_matches(filter, topic));
                if matches {
                    self.link.deliver(attempt, topic, payload.as_bytes());
                } else {
                    debug!("Replay[{}]: '{}' not subscribed, skipped", attempt, topic);
                }
            }
            ReplayRecord::LinkLoss { lose_link, .. } => {
                info!("Replay[{}]: dropping link ({})", attempt, lose_link);
                self.link
                    .connection_lost(attempt, TransportError::ConnectionLost(lose_link.clone()));
                self.connected = None;
                self.filter = None;
                self.due = None;
                if self.cursor >= self.records.len() {
                    self.finish();
                }
                return;
            }
        }
        self.schedule();
    }

    fn finish(&mut self) {
        if !self.finished {
            info!("Replay: capture finished");
            self.finished = true;
            self.done.signal(());
        }
    }
}
