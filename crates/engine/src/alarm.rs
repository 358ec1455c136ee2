//! Periodic tick that lets the dispatcher flush eligible buffered messages.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Design constant: the resolving time duration between alarm ticks.
///
/// Shorter periods recover out-of-order arrivals faster at the cost of
/// wasted work.
pub const RESOLVING_INTERVAL: Duration = Duration::from_secs(1);

/// Publish a tick on the alarm queue every `period` until the dispatcher
/// goes away. The interval's immediate first tick is harmless: flushing
/// empty buffers is a no-op.
pub async fn run(tx: mpsc::UnboundedSender<()>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if tx.send(()).is_err() {
            debug!("alarm queue closed, stopping");
            break;
        }
    }
}
