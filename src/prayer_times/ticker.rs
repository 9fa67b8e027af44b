use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::clock::Clock;
use super::schedule::{ScheduleSnapshot, compute_schedule};
use crate::models::PrayerTimeSet;

/// Timings shared between the consumer and its ticker. Replacing the value
/// after a refresh makes the next tick use the new day.
pub type SharedTimings = Arc<RwLock<PrayerTimeSet>>;

/// Recomputes the schedule on a fixed interval and hands each snapshot to a
/// sink. Only reads the clock and the shared timings.
///
/// The thread ends when `stop` is called, when the ticker is dropped, or when
/// the sink returns `false` because its consumer has gone away.
pub struct ScheduleTicker {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduleTicker {
    pub fn start<C, F>(timings: SharedTimings, clock: C, interval: Duration, mut sink: F) -> Self
    where
        C: Clock + 'static,
        F: FnMut(ScheduleSnapshot) -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                let snapshot = match timings.read() {
                    Ok(t) => compute_schedule(&t, clock.now().naive_local()),
                    Err(_) => break,
                };

                if !sink(snapshot) {
                    debug!("schedule consumer went away, ticker exiting");
                    break;
                }

                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Stop requested, or the handle was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop ticking and wait for the thread to exit. Safe to call twice.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for ScheduleTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
