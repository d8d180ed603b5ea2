// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{check, ConnectionStatus};
use crate::auth::{AuthError, SessionFetcher};

/// How outcomes of overlapping probes are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// A new probe cancels the one in flight; only the newest outcome is applied.
    #[default]
    LatestRequestWins,
    /// Every outcome is applied in arrival order, so whichever probe resolves
    /// last decides the status, even if it was started first.
    LastWriteWins,
}

/// Terminal result of one probe task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Sequence number handed out by [`ProbeController::start`].
    pub seq: u64,
    pub status: ConnectionStatus,
    /// Time from task start to resolution.
    pub elapsed: Duration,
}

/// What the controller did with an outcome it received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeUpdate {
    /// The outcome became the current status.
    Applied(ProbeOutcome),
    /// The outcome belonged to a superseded probe and was dropped.
    Discarded(ProbeOutcome),
}

impl ProbeUpdate {
    #[must_use]
    pub fn outcome(&self) -> &ProbeOutcome {
        match self {
            Self::Applied(outcome) | Self::Discarded(outcome) => outcome,
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

type Notifier = Arc<dyn Fn() + Send + Sync>;

/// Single owner of the connection status.
///
/// [`start`](Self::start) flips the status to `Testing` immediately and spawns
/// the session fetch on the given runtime. Results come back over a channel and
/// are applied by [`poll`](Self::poll) or [`next_update`](Self::next_update), on
/// whichever thread owns the controller.
pub struct ProbeController {
    fetcher: Arc<dyn SessionFetcher>,
    runtime: Handle,
    policy: OverlapPolicy,
    status: ConnectionStatus,
    next_seq: u64,
    latest_seq: Option<u64>,
    in_flight: HashMap<u64, CancellationToken>,
    outcome_tx: mpsc::UnboundedSender<ProbeOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ProbeOutcome>,
    notifier: Option<Notifier>,
}

impl std::fmt::Debug for ProbeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeController")
            .field("policy", &self.policy)
            .field("status", &self.status)
            .field("latest_seq", &self.latest_seq)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl ProbeController {
    /// Create a controller that spawns probes onto `runtime`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn SessionFetcher>, runtime: Handle) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            fetcher,
            runtime,
            policy: OverlapPolicy::default(),
            status: ConnectionStatus::NotTested,
            next_seq: 0,
            latest_seq: None,
            in_flight: HashMap::new(),
            outcome_tx,
            outcome_rx,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Callback invoked from the probe task after its outcome is sent,
    /// typically a UI repaint request.
    #[must_use]
    pub fn with_notifier(mut self, notifier: impl Fn() + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    #[must_use]
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    #[must_use]
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Number of probes whose outcome has not been received yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Sequence number of the most recently started probe.
    #[must_use]
    pub fn latest_seq(&self) -> Option<u64> {
        self.latest_seq
    }

    /// Start a probe and return its sequence number.
    ///
    /// The status is `Testing` when this returns.
    pub fn start(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        match self.policy {
            OverlapPolicy::LatestRequestWins => {
                for (superseded, token) in &self.in_flight {
                    debug!("Cancelling probe #{} superseded by #{}", superseded, seq);
                    token.cancel();
                }
            }
            OverlapPolicy::LastWriteWins => {
                if !self.in_flight.is_empty() {
                    warn!(
                        "Probe #{} overlaps {} in-flight probe(s); the last to resolve sets the status",
                        seq,
                        self.in_flight.len()
                    );
                }
            }
        }

        let token = CancellationToken::new();
        self.in_flight.insert(seq, token.clone());
        self.latest_seq = Some(seq);
        self.status = ConnectionStatus::Testing;
        info!("Starting connectivity probe #{}", seq);

        let fetcher = Arc::clone(&self.fetcher);
        let outcome_tx = self.outcome_tx.clone();
        let notifier = self.notifier.clone();

        let runtime = self.runtime.clone();
        self.runtime.spawn(async move {
            let started = Instant::now();
            // Run the fetch as its own task so a panic still yields an outcome for `seq`
            let mut fetch = runtime.spawn(async move { check(fetcher.as_ref()).await });
            let status = tokio::select! {
                joined = &mut fetch => match joined {
                    Ok(status) => status,
                    Err(e) => {
                        warn!("Probe #{} task failed: {}", seq, e);
                        let reason = if e.is_panic() { "session fetch panicked" } else { "session fetch aborted" };
                        ConnectionStatus::Failed(reason.to_string())
                    }
                },
                () = token.cancelled() => {
                    fetch.abort();
                    ConnectionStatus::Failed(AuthError::Cancelled.to_string())
                }
            };

            // The receiver lives as long as the controller
            let _ = outcome_tx.send(ProbeOutcome {
                seq,
                status,
                elapsed: started.elapsed(),
            });

            if let Some(notify) = notifier {
                notify();
            }
        });

        seq
    }

    /// Apply every outcome that has arrived, without waiting.
    pub fn poll(&mut self) -> Vec<ProbeUpdate> {
        let mut updates = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            updates.push(self.apply(outcome));
        }
        updates
    }

    /// Wait for the next outcome and apply it.
    ///
    /// Returns `None` when no probe is in flight.
    pub async fn next_update(&mut self) -> Option<ProbeUpdate> {
        if self.in_flight.is_empty() {
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    /// Start a probe and wait until its own outcome has been received.
    pub async fn run_once(&mut self) -> ConnectionStatus {
        let seq = self.start();
        while let Some(update) = self.next_update().await {
            if update.outcome().seq == seq {
                break;
            }
        }
        self.status.clone()
    }

    fn apply(&mut self, outcome: ProbeOutcome) -> ProbeUpdate {
        self.in_flight.remove(&outcome.seq);

        let current = match self.policy {
            OverlapPolicy::LatestRequestWins => self.latest_seq == Some(outcome.seq),
            OverlapPolicy::LastWriteWins => true,
        };

        if current {
            info!(
                "Probe #{} finished in {} ms: {}",
                outcome.seq,
                outcome.elapsed.as_millis(),
                outcome.status
            );
            self.status = outcome.status.clone();
            ProbeUpdate::Applied(outcome)
        } else {
            debug!("Discarding outcome of superseded probe #{}", outcome.seq);
            ProbeUpdate::Discarded(outcome)
        }
    }
}

impl Drop for ProbeController {
    fn drop(&mut self) {
        for token in self.in_flight.values() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Session, User};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Reply = (Duration, Result<(), &'static str>);

    /// Fetcher that answers calls in order from a script, after a delay.
    struct ScriptedFetcher {
        replies: Mutex<VecDeque<Reply>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionFetcher for ScriptedFetcher {
        async fn fetch_session(&self) -> Result<Session, AuthError> {
            let (delay, reply) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected session fetch");
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            reply
                .map(|()| Session::from_user("token", test_user()))
                .map_err(|message| AuthError::Api {
                    status: 401,
                    message: message.to_string(),
                })
        }
    }

    fn test_user() -> User {
        User {
            id: "user-1".to_string(),
            aud: "authenticated".to_string(),
            role: None,
            email: None,
            phone: None,
            created_at: None,
            last_sign_in_at: None,
            is_anonymous: false,
        }
    }

    async fn wait_for_calls(fetcher: &ScriptedFetcher, calls: usize) {
        while fetcher.calls() < calls {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_starts_not_tested() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let mut controller = ProbeController::new(fetcher, Handle::current());
        assert_eq!(controller.status(), &ConnectionStatus::NotTested);
        assert_eq!(controller.in_flight(), 0);
        assert!(controller.next_update().await.is_none());
        assert!(controller.poll().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_goes_through_testing() {
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_millis(20), Ok(()))]);
        let mut controller = ProbeController::new(fetcher, Handle::current());

        let mut observed = vec![controller.status().clone()];
        let seq = controller.start();
        observed.push(controller.status().clone());

        let update = controller.next_update().await.unwrap();
        observed.push(controller.status().clone());

        assert_eq!(seq, 0);
        assert!(update.is_applied());
        assert_eq!(
            observed,
            vec![
                ConnectionStatus::NotTested,
                ConnectionStatus::Testing,
                ConnectionStatus::Connected,
            ]
        );
        assert_eq!(controller.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_carries_error_description() {
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_millis(5), Err("Invalid API key"))]);
        let mut controller = ProbeController::new(fetcher, Handle::current());

        let status = controller.run_once().await;
        assert_eq!(
            status,
            ConnectionStatus::Failed("Invalid API key (HTTP 401)".to_string())
        );
        assert_eq!(
            status.to_string(),
            "Connection failed: Invalid API key (HTTP 401)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins_applies_slowest_outcome() {
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::from_millis(50), Err("slow failure")),
            (Duration::from_millis(10), Ok(())),
        ]);
        let mut controller = ProbeController::new(fetcher.clone(), Handle::current())
            .with_policy(OverlapPolicy::LastWriteWins);

        let first = controller.start();
        wait_for_calls(&fetcher, 1).await;
        let second = controller.start();
        wait_for_calls(&fetcher, 2).await;

        let early = controller.next_update().await.unwrap();
        assert_eq!(early.outcome().seq, second);
        assert_eq!(controller.status(), &ConnectionStatus::Connected);

        let late = controller.next_update().await.unwrap();
        assert_eq!(late.outcome().seq, first);
        assert!(late.is_applied());

        // The first probe resolved last, so it overwrote the newer success
        assert_eq!(
            controller.status(),
            &ConnectionStatus::Failed("slow failure (HTTP 401)".to_string())
        );
        assert!(controller.next_update().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_request_wins_discards_superseded_probe() {
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::from_millis(50), Ok(())),
            (Duration::from_millis(10), Err("second failed")),
        ]);
        let mut controller = ProbeController::new(fetcher.clone(), Handle::current());
        assert_eq!(controller.policy(), OverlapPolicy::LatestRequestWins);

        let first = controller.start();
        wait_for_calls(&fetcher, 1).await;
        let second = controller.start();
        assert_eq!(controller.latest_seq(), Some(second));

        let mut updates = Vec::new();
        while let Some(update) = controller.next_update().await {
            updates.push(update);
        }

        let discarded: Vec<_> = updates.iter().filter(|u| !u.is_applied()).collect();
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].outcome().seq, first);
        assert_eq!(
            discarded[0].outcome().status,
            ConnectionStatus::Failed("request cancelled".to_string())
        );

        assert_eq!(
            controller.status(),
            &ConnectionStatus::Failed("second failed (HTTP 401)".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_probes_each_apply() {
        let fetcher = ScriptedFetcher::new(vec![
            (Duration::from_millis(5), Err("down")),
            (Duration::from_millis(5), Ok(())),
        ]);
        let mut controller = ProbeController::new(fetcher, Handle::current());

        assert!(!controller.run_once().await.is_connected());
        assert!(controller.run_once().await.is_connected());
        assert_eq!(controller.latest_seq(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifier_called_on_completion() {
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_millis(5), Ok(()))]);
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let mut controller = ProbeController::new(fetcher, Handle::current())
            .with_notifier(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        controller.run_once().await;
        // The notifier runs right after the send, on the probe task
        while notified.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_picks_up_finished_probe() {
        let fetcher = ScriptedFetcher::new(vec![(Duration::from_millis(5), Ok(()))]);
        let mut controller = ProbeController::new(fetcher, Handle::current());

        controller.start();
        assert!(controller.poll().is_empty());
        assert_eq!(controller.status(), &ConnectionStatus::Testing);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut updates = controller.poll();
        while updates.is_empty() {
            tokio::task::yield_now().await;
            updates = controller.poll();
        }
        assert_eq!(updates.len(), 1);
        assert_eq!(controller.status(), &ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn test_panicking_fetch_still_resolves() {
        // An empty script makes the fetcher panic on its first call
        let fetcher = ScriptedFetcher::new(vec![]);
        let mut controller = ProbeController::new(fetcher, Handle::current());

        let status = controller.run_once().await;
        assert_eq!(status, ConnectionStatus::Failed("session fetch panicked".to_string()));
        assert_eq!(controller.in_flight(), 0);
    }
}
