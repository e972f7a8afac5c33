//! HomeGuard: replay runner.
//!
//! ```text
//! homeguard [config.json] [capture.jsonl]
//! ```
//!
//! Loads the monitor configuration (defaults if omitted), plays a recorded
//! sensor capture through the full session core and prints the session
//! counters on exit.  Log verbosity follows `RUST_LOG`.
//!
//! ```text
//! ┌──────────────────┐   ┌─────────────────────────────┐   ┌─────────────┐
//! │ ReplayTransport  │──▶│ Runtime · SessionService     │──▶│ LogNotifier │
//! │ (capture thread) │◀──│ Router · Classifier · Latch  │   │ LogDisplay  │
//! └──────────────────┘   └─────────────────────────────┘   └─────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_io_mini::Timer;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homeguard::adapters::collaborators::CollaboratorSink;
use homeguard::adapters::log_sink::{LogDisplay, LogNotifier};
use homeguard::adapters::replay::{self, ReplayRecord, ReplayTransport};
use homeguard::app::events::SessionEvent;
use homeguard::app::ports::EventSink;
use homeguard::config::MonitorConfig;
use homeguard::runtime::Runtime;

/// Extra time allowed beyond the capture's own delays.
const REPLAY_SLACK: Duration = Duration::from_secs(30);

/// Longest the runner waits, whatever the capture says.
const MAX_REPLAY_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Forwards every event and raises `stopped` once the session gives up
/// on the link.
struct RecoveryWatch<S> {
    inner: S,
    stopped: Arc<StopSignal>,
}

impl<S: EventSink> EventSink for RecoveryWatch<S> {
    fn emit(&mut self, event: &SessionEvent) {
        if matches!(event, SessionEvent::RecoveryStopped { .. }) {
            self.stopped.signal(());
        }
        self.inner.emit(event);
    }
}

/// Why the runner stopped waiting.
#[derive(Debug)]
enum Finish {
    Replayed,
    LinkDown,
    TimedOut,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homeguard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("HomeGuard v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let config = match args.next() {
        Some(path) => MonitorConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            MonitorConfig::default()
        }
    };
    let records = match args.next() {
        Some(path) => replay::load_capture(&path)
            .with_context(|| format!("loading capture {}", path.display()))?,
        None => {
            warn!("No capture given, nothing to replay");
            Vec::new()
        }
    };
    if !config.auto_subscribe {
        warn!("auto_subscribe is disabled; captured messages will not be delivered");
    }

    let budget = replay_budget(&records, &config);
    let runtime = Runtime::new();
    let (transport, done) = ReplayTransport::spawn(records, runtime.transport_link())
        .context("starting replay transport")?;
    let stopped = Arc::new(StopSignal::new());
    let sink = RecoveryWatch {
        inner: CollaboratorSink::new(LogNotifier, LogDisplay),
        stopped: stopped.clone(),
    };
    let worker = runtime
        .spawn(config.clone(), transport, sink)
        .context("starting session worker")?;

    worker.handle().connect(&config.broker_host, config.broker_port);

    let finish = future::block_on(future::or(
        future::or(
            async {
                done.finished().await;
                Finish::Replayed
            },
            async {
                stopped.wait().await;
                Finish::LinkDown
            },
        ),
        async {
            Timer::after(budget).await;
            Finish::TimedOut
        },
    ));
    match finish {
        Finish::Replayed => info!("Replay finished"),
        Finish::LinkDown => warn!("Link lost with no reconnect pending, stopping replay"),
        Finish::TimedOut => warn!("Replay did not finish within {:?}", budget),
    }

    let report = worker
        .shutdown()
        .map_err(|_| anyhow!("session worker panicked"))?;
    let stats = report.service.stats();
    info!("Final state: {}", report.service.state());
    info!("Stats: {}", serde_json::to_string(&stats)?);
    Ok(())
}

/// Upper bound on how long the capture takes to play, including the
/// backoff of one reconnect per link loss.  Capped at
/// [`MAX_REPLAY_BUDGET`].
fn replay_budget(records: &[ReplayRecord], config: &MonitorConfig) -> Duration {
    let losses = records
        .iter()
        .filter(|r| matches!(r, ReplayRecord::LinkLoss { .. }))
        .count();
    let losses = u32::try_from(losses).unwrap_or(u32::MAX);
    let delays = records
        .iter()
        .map(ReplayRecord::delay)
        .try_fold(Duration::ZERO, Duration::checked_add);
    let backoff = Duration::from_millis(config.reconnect.max_delay_ms).checked_mul(losses);
    delays
        .zip(backoff)
        .and_then(|(d, b)| d.checked_add(b))
        .and_then(|t| t.checked_add(REPLAY_SLACK))
        .map_or(MAX_REPLAY_BUDGET, |t| t.min(MAX_REPLAY_BUDGET))
}
