//! Reader threads: one per link, feeding the event loop.
//!
//! Transports block on reads, so each runs on a dedicated OS thread rather
//! than inside the Tokio runtime.  Decoded states are forwarded over a
//! bounded `mpsc` channel with `blocking_send`; the single event-loop task on
//! the other end processes them in arrival order.
//!
//! A reader stops when:
//!
//! - the transport reports the end of its stream (sends `Closed`),
//! - a read fails (sends `Failed`, the link becomes unusable),
//! - the event loop has dropped its receiver, or
//! - the shared `running` flag is cleared.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{Transport, TransportError};
use crate::application::process_samples::LinkMessage;

/// Starts a reader thread for the link at `path`.
///
/// # Errors
///
/// Returns [`TransportError::Spawn`] if the OS refuses to start the thread.
pub fn spawn_reader(
    path: String,
    transport: Box<dyn Transport>,
    tx: mpsc::Sender<LinkMessage>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, TransportError> {
    std::thread::Builder::new()
        .name(format!("tablet-reader {path}"))
        .spawn(move || read_loop(path, transport, tx, running))
        .map_err(TransportError::Spawn)
}

fn read_loop(
    path: String,
    mut transport: Box<dyn Transport>,
    tx: mpsc::Sender<LinkMessage>,
    running: Arc<AtomicBool>,
) {
    let mut forwarded = 0u64;

    while running.load(Ordering::Relaxed) {
        let message = match transport.read_state() {
            Ok(Some(state)) => LinkMessage::State {
                path: path.clone(),
                state,
            },
            Ok(None) => {
                // Receiver may already be gone during shutdown.
                let _ = tx.blocking_send(LinkMessage::Closed { path: path.clone() });
                break;
            }
            Err(e) => {
                let _ = tx.blocking_send(LinkMessage::Failed {
                    path: path.clone(),
                    error: e.to_string(),
                });
                break;
            }
        };
        if tx.blocking_send(message).is_err() {
            debug!(path = %path, "event loop gone; reader exiting");
            break;
        }
        forwarded += 1;
    }

    info!(path = %path, forwarded, "reader stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
