//! Background expiry sweep.
//!
//! The sweep runs as a single tokio task per token store. Every tick issues
//! one filtered delete. Failures (including a panicking capability) go to
//! the store's [`Logger`] and never end the loop, since nothing supervises
//! the task.
//!
//! Stopping is signalled through a watch channel that the loop only observes
//! between ticks: a delete already in flight runs to completion.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::database::{Executor, Value};
use crate::logger::Logger;

/// Handle to a running sweep task.
pub(crate) struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    ///
    /// `statement` is a delete with a single timestamp parameter; it is run
    /// with the current time one `period` after spawning, then every
    /// `period`.
    pub(crate) fn spawn(
        executor: Executor,
        statement: String,
        period: Duration,
        logger: Arc<dyn Logger>,
    ) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);

        info!(interval = ?period, "Starting expired grant sweep");

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => {}
                }

                sweep_once(&executor, &statement, logger.as_ref()).await;
            }

            debug!("Expired grant sweep stopped");
        });

        Self { shutdown, handle }
    }

    /// Signal the loop to stop before its next tick.
    pub(crate) fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Returns `true` once the task has exited.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweep_once(executor: &Executor, statement: &str, logger: &dyn Logger) {
    let now = OffsetDateTime::now_utc();
    let params = [Value::Timestamp(now)];

    match AssertUnwindSafe(executor.execute(statement, &params))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => debug!(cutoff = %now, "Swept expired grants"),
        Ok(Err(e)) => {
            logger.printf(format_args!(
                "Error while cleaning out outdated entities: {e}"
            ));
        }
        Err(_) => {
            logger.printf(format_args!(
                "Panic while cleaning out outdated entities"
            ));
        }
    }
}
