//! Session worker: the single processing sequence.
//!
//! Runs in a dedicated thread using `edge-executor`, with `async-io-mini`
//! timers for reconnect backoff.  One task owns the [`SessionService`] and
//! is the only consumer of the inbox:
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  Session thread                                      │
//!  │  futures_lite::block_on                              │
//!  │  ┌────────────────────────────────────────────────┐  │
//!  │  │ edge_executor::LocalExecutor                   │  │
//!  │  │  session_loop:  inbox.receive()  ──┐           │  │
//!  │  │                 reconnect Timer  ──┴─▶ service │  │
//!  │  └────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_io_mini::Timer;
use log::info;

use crate::app::commands::SessionCommand;
use crate::app::ports::{EventSink, TransportPort};
use crate::app::service::SessionService;
use crate::session::AttemptId;

use super::channels::{Inbox, SessionInput};

/// Which future woke the loop.
enum Wake {
    Input(SessionInput),
    Reconnect(AttemptId),
}

/// Receive inputs until `Shutdown`, then hand everything back.
pub(crate) async fn session_loop<T, S>(
    inbox: Arc<Inbox>,
    mut service: SessionService,
    mut transport: T,
    mut sink: S,
) -> (SessionService, T, S)
where
    T: TransportPort,
    S: EventSink,
{
    let mut reconnect: Option<(Timer, AttemptId)> = None;

    loop {
        let wake = match reconnect.as_mut() {
            Some((timer, after)) => {
                let after = *after;
                futures_lite::future::or(async { Wake::Input(inbox.receive().await) }, async {
                    timer.await;
                    Wake::Reconnect(after)
                })
                .await
            }
            None => Wake::Input(inbox.receive().await),
        };

        match wake {
            Wake::Input(SessionInput::Shutdown) => {
                service.disconnect(&mut transport, &mut sink);
                break;
            }
            Wake::Input(SessionInput::Command(cmd)) => {
                service.handle_command(cmd, &mut transport, &mut sink);
            }
            Wake::Input(SessionInput::Transport(event)) => {
                service.handle_transport(event, &mut transport, &mut sink);
            }
            Wake::Reconnect(after) => {
                reconnect = None;
                service.handle_command(SessionCommand::Reconnect { after }, &mut transport, &mut sink);
            }
        }

        if let Some(req) = service.take_reconnect_request() {
            reconnect = Some((Timer::after(req.delay), req.after));
        }
    }

    info!("Session worker stopped ({:?})", service.stats());
    (service, transport, sink)
}

/// Drive `session_loop` to completion on the current thread.
pub(crate) fn run<T, S>(
    inbox: Arc<Inbox>,
    service: SessionService,
    transport: T,
    sink: S,
) -> (SessionService, T, S)
where
    T: TransportPort + 'static,
    S: EventSink + 'static,
{
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let task = executor.spawn(session_loop(inbox, service, transport, sink));
    futures_lite::future::block_on(executor.run(task))
}
