//! Status-change announcements handed to the notification collaborator.
//!
//! Emission never blocks or fails a registry mutation. Delivery is at-least-once, so every
//! event carries an id derived from the application version and consumers drop repeats.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::domain::{ActorId, Application, ApplicationId, ApplicationStatus, CandidateId, JobId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub event_id: String,
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    /// Absent on the creation event.
    pub old_status: Option<ApplicationStatus>,
    pub new_status: ApplicationStatus,
    pub actor_id: ActorId,
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

impl StatusChanged {
    /// Describe the latest history entry of `application`.
    pub fn for_application(
        application: &Application,
        old_status: Option<ApplicationStatus>,
    ) -> Self {
        let (actor_id, timestamp) = application
            .status_history
            .last()
            .map(|entry| (entry.actor_id.clone(), entry.timestamp))
            .unwrap_or_else(|| (ActorId::default(), application.updated_at));

        Self {
            event_id: format!("{}:v{}", application.id, application.version),
            application_id: application.id.clone(),
            job_id: application.job_id.clone(),
            candidate_id: application.candidate_id.clone(),
            old_status,
            new_status: application.status,
            actor_id,
            version: application.version,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("event channel closed")]
    ChannelClosed,
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Outbound hook the registry calls after every persisted status change.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: StatusChanged) -> Result<(), EmitError>;
}

/// Non-blocking emitter backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelEventEmitter {
    sender: mpsc::UnboundedSender<StatusChanged>,
}

impl ChannelEventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusChanged>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventEmitter for ChannelEventEmitter {
    fn emit(&self, event: StatusChanged) -> Result<(), EmitError> {
        self.sender.send(event).map_err(|_| EmitError::ChannelClosed)
    }
}

/// Final delivery target (e-mail, chat, push) owned by the notification collaborator.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, event: &StatusChanged) -> Result<(), EmitError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Duplicate,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub delivered: usize,
    pub duplicates: usize,
    /// Extra delivery attempts made after a sink failure.
    pub retried: usize,
    /// Events abandoned once every attempt failed.
    pub failed: usize,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Idempotent consumer draining the emitter channel into a sink.
///
/// A failed delivery is retried with doubling backoff before the next event is taken, so
/// per-application order is kept. Delivered versions are remembered per application only
/// until its terminal event goes out, which bounds the dedupe state by open applications.
pub struct NotificationDispatcher<S> {
    sink: Arc<S>,
    delivered: HashMap<ApplicationId, BTreeSet<u64>>,
    max_attempts: u32,
    backoff: Duration,
}

impl<S> NotificationDispatcher<S>
where
    S: NotificationSink + 'static,
{
    pub fn new(sink: Arc<S>) -> Self {
        Self {
            sink,
            delivered: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Override the retry budget. At least one attempt is always made.
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Applications with delivered events still held for deduplication.
    pub fn tracked_applications(&self) -> usize {
        self.delivered.len()
    }

    /// One delivery attempt, skipping versions already delivered.
    pub fn handle(&mut self, event: &StatusChanged) -> DispatchOutcome {
        if self.already_delivered(event) {
            debug!(event_id = %event.event_id, "dropping redelivered status event");
            return DispatchOutcome::Duplicate;
        }

        match self.sink.deliver(event) {
            Ok(()) => {
                self.record_delivery(event);
                DispatchOutcome::Delivered
            }
            Err(error) => {
                warn!(event_id = %event.event_id, %error, "status notification attempt failed");
                DispatchOutcome::Failed
            }
        }
    }

    /// Consume events until every emitter handle is dropped.
    pub async fn run(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<StatusChanged>,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(event) = receiver.recv().await {
            match self.deliver_with_retry(&event, &mut stats).await {
                DispatchOutcome::Delivered => stats.delivered += 1,
                DispatchOutcome::Duplicate => stats.duplicates += 1,
                DispatchOutcome::Failed => stats.failed += 1,
            }
        }
        stats
    }

    async fn deliver_with_retry(
        &mut self,
        event: &StatusChanged,
        stats: &mut DispatchStats,
    ) -> DispatchOutcome {
        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match self.handle(event) {
                DispatchOutcome::Failed if attempt < self.max_attempts => {
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                    stats.retried += 1;
                }
                DispatchOutcome::Failed => {
                    error!(
                        event_id = %event.event_id,
                        attempts = attempt,
                        "status notification abandoned"
                    );
                    return DispatchOutcome::Failed;
                }
                outcome => return outcome,
            }
        }
    }

    fn already_delivered(&self, event: &StatusChanged) -> bool {
        self.delivered
            .get(&event.application_id)
            .is_some_and(|versions| versions.contains(&event.version))
    }

    fn record_delivery(&mut self, event: &StatusChanged) {
        if event.new_status.is_terminal() {
            // No further versions are emitted for a closed application.
            self.delivered.remove(&event.application_id);
        } else {
            self.delivered
                .entry(event.application_id.clone())
                .or_default()
                .insert(event.version);
        }
    }
}
