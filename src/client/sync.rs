//! Periodic pull replacing the local document wholesale.
//!
//! Failed pulls are logged and retried on the next tick without backoff. After enough consecutive
//! failures the loop reports [`SyncStatus::Reconnecting`] until a pull succeeds again.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tracing::{debug, info, warn};

use crate::{
    client::{
        api::SessionApi,
        identity::{Identity, JoinToken, rebind},
    },
    state::session::Session,
};

/// Connectivity as seen by the sync loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// The last pull succeeded, or failures are still below the threshold.
    Live,
    /// Pulls keep failing; the local document may be stale.
    Reconnecting {
        /// Consecutive failed pulls so far.
        failures: u32,
    },
}

/// Timer-driven pull loop for one session.
pub(crate) struct SyncLoop {
    pub(crate) api: Arc<dyn SessionApi>,
    pub(crate) session_id: String,
    pub(crate) period: Duration,
    pub(crate) reconnecting_after: u32,
    pub(crate) document: Arc<watch::Sender<Option<Session>>>,
    pub(crate) status: Arc<watch::Sender<SyncStatus>>,
    pub(crate) identity: Arc<watch::Sender<Identity>>,
    /// Join token still waiting for its user to show up.
    pub(crate) join: Option<JoinToken>,
}

/// Handle stopping the loop. Dropping it stops the loop as well.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Ask the loop to stop. A pull already in flight completes but its result is discarded.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Stop the loop and wait until it has exited.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}

impl SyncLoop {
    /// Start pulling every `period`, first tick one period from now.
    pub(crate) fn spawn(self) -> SyncHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        SyncHandle {
            stop: stop_tx,
            task: Some(task),
        }
    }

    async fn run(mut self, mut stop: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        info!(session_id = %self.session_id, period_ms = self.period.as_millis(), "sync loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }

            let pulled = self.api.fetch(self.session_id.clone(), true).await;
            if *stop.borrow() {
                debug!(session_id = %self.session_id, "discarding pull that finished after stop");
                break;
            }

            match pulled {
                Ok(session) => {
                    failures = 0;
                    self.rebind(&session);
                    self.document.send_replace(Some(session));
                    self.set_status(SyncStatus::Live);
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    warn!(session_id = %self.session_id, failures, error = %err, "session pull failed");
                    if failures >= self.reconnecting_after {
                        self.set_status(SyncStatus::Reconnecting { failures });
                    }
                }
            }
        }
        info!(session_id = %self.session_id, "sync loop stopped");
    }

    fn rebind(&mut self, session: &Session) {
        let join = self.join.as_ref();
        let session_id = &self.session_id;
        let changed = self.identity.send_if_modified(|identity| {
            match rebind(identity, join, &session.document) {
                Some(next) => {
                    debug!(
                        session_id = %session_id,
                        user_id = ?next.user().map(|user| &user.id),
                        "identity rebound after pull"
                    );
                    *identity = next;
                    true
                }
                None => false,
            }
        });

        let identity = self.identity.borrow();
        if let Identity::Identified(user) = &*identity {
            if changed && self.join.is_some() {
                info!(session_id = %self.session_id, user_id = %user.id, "join link resolved");
            }
            self.join = None;
            if session.document.find_user(&user.id).is_none() {
                warn!(
                    session_id = %self.session_id,
                    user_id = %user.id,
                    "bound user missing from pulled session"
                );
            }
        }
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}
