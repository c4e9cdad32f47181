//! Busy-indicator ticker.
//!
//! Cycles a set of glyphs on a fixed interval, independent of any conversion
//! progress. Stopping is idempotent and synchronous: once [`Ticker::stop`]
//! returns the callback never runs again.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

pub struct Ticker {
    shared: Arc<Mutex<TickerState>>,
    task: Option<JoinHandle<()>>,
}

struct TickerState {
    stopped: bool,
    callback: Box<dyn FnMut(&str) + Send>,
}

impl Ticker {
    /// Start ticking on the current tokio runtime.
    ///
    /// The first frame fires immediately. An empty frame list never calls back.
    ///
    /// The callback runs while the ticker holds its internal lock, which is what
    /// lets [`Ticker::stop`] wait out a tick in flight. It must not stop or drop
    /// this same ticker; doing so deadlocks.
    pub fn start<F>(interval: Duration, frames: Vec<String>, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let shared = Arc::new(Mutex::new(TickerState {
            stopped: frames.is_empty(),
            callback: Box::new(callback),
        }));

        let task_state = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            for frame in frames.iter().cycle() {
                ticks.tick().await;

                // The callback runs under the lock, so stop() waits out a tick in flight
                let mut state = match task_state.lock() {
                    Ok(state) => state,
                    Err(_) => break,
                };
                if state.stopped {
                    break;
                }
                let callback = &mut state.callback;
                callback(frame.as_str());
            }
        });

        Self {
            shared,
            task: Some(task),
        }
    }

    /// Stop ticking; safe to call any number of times
    pub fn stop(&mut self) {
        match self.shared.lock() {
            Ok(mut state) => state.stopped = true,
            Err(poisoned) => poisoned.into_inner().stopped = true,
        }

        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Ticker stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
