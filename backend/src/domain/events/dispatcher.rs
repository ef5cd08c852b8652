//! Outbox fan-out and inbox processing, one claimed row at a time.
//!
//! Both dispatchers are driven by background loops; `run_once` returns
//! `true` while there is work so the loop can drain before sleeping.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, info, warn};

use super::consumers::ConsumerRegistry;
use super::handler::EventHandler;
use super::model::{InboxEvent, OutboxEvent};
use super::payload::EventBody;
use super::retry::{FailureDisposition, RetryPolicy, truncate_error};
use crate::domain::background::BackgroundTask;
use crate::domain::ports::EventStore;
use crate::domain::{Error, TraceId};

/// Longest error text kept on a row.
pub const LAST_ERROR_MAX_CHARS: usize = 1000;

/// Moves outbox rows into consumer inboxes.
pub struct OutboxDispatcher {
    store: Arc<dyn EventStore>,
    registry: ConsumerRegistry,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl OutboxDispatcher {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: ConsumerRegistry,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            policy,
            clock,
        }
    }

    /// Claim and fan out one outbox row.
    pub async fn dispatch_once(&self) -> Result<bool, Error> {
        let now = self.clock.utc();
        let Some(event) = self
            .store
            .claim_outbox(now, self.policy.stale_before(now))
            .await?
        else {
            return Ok(false);
        };
        let consumers = self.registry.consumers_for(&event.event_type);
        if consumers.is_empty() {
            warn!(event_id = %event.id, event_type = %event.event_type, "no consumer registered");
        }
        match self.store.fan_out(&event, consumers, now).await {
            Ok(()) => {
                debug!(event_id = %event.id, consumers = consumers.len(), "outbox event dispatched");
            }
            Err(err) => self.fail(&event, &err.to_string()).await?,
        }
        Ok(true)
    }

    async fn fail(&self, event: &OutboxEvent, message: &str) -> Result<(), Error> {
        let now = self.clock.utc();
        let message = truncate_error(message, LAST_ERROR_MAX_CHARS);
        match self.policy.on_failure(event.attempts, now) {
            FailureDisposition::Retry { available_at, .. } => {
                warn!(event_id = %event.id, attempts = event.attempts, error = %message, "outbox fan-out failed; retrying");
                self.store
                    .retry_outbox(event.id, available_at, &message, now)
                    .await?;
            }
            FailureDisposition::DeadLetter { attempts } => {
                error!(event_id = %event.id, attempts, error = %message, "outbox fan-out failed permanently");
                self.store.fail_outbox(event.id, &message, now).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BackgroundTask for OutboxDispatcher {
    fn name(&self) -> &'static str {
        "outbox_dispatcher"
    }

    async fn run_once(&self) -> Result<bool, Error> {
        self.dispatch_once().await
    }
}

/// Hands inbox rows of one consumer to its handler.
pub struct InboxDispatcher {
    store: Arc<dyn EventStore>,
    handler: Arc<dyn EventHandler>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl InboxDispatcher {
    pub fn new(
        store: Arc<dyn EventStore>,
        handler: Arc<dyn EventHandler>,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            handler,
            policy,
            clock,
        }
    }

    /// Claim and handle one inbox row.
    ///
    /// Handler failures are recorded on the row and never returned; only
    /// datastore failures surface as `Err`.
    pub async fn process_once(&self) -> Result<bool, Error> {
        let now = self.clock.utc();
        let Some(inbox) = self
            .store
            .claim_inbox(self.handler.consumer(), now, self.policy.stale_before(now))
            .await?
        else {
            return Ok(false);
        };

        let trace_id = TraceId::from_uuid(*inbox.outbox_event_id.as_uuid());
        let outcome = TraceId::scope(trace_id, self.handle(&inbox)).await;
        let finished_at = self.clock.utc();
        match outcome {
            Ok(()) => {
                self.store.complete_inbox(inbox.id, finished_at).await?;
                info!(inbox_id = %inbox.id, event_type = %inbox.event_type, attempts = inbox.attempts, "inbox event processed");
            }
            Err(err) => self.fail(&inbox, &err.to_string()).await?,
        }
        Ok(true)
    }

    async fn handle(&self, inbox: &InboxEvent) -> Result<(), Error> {
        let body = EventBody::decode(&inbox.event_type, &inbox.payload)?;
        self.handler.handle(inbox, body).await
    }

    async fn fail(&self, inbox: &InboxEvent, message: &str) -> Result<(), Error> {
        let now = self.clock.utc();
        let message = truncate_error(message, LAST_ERROR_MAX_CHARS);
        match self.policy.on_failure(inbox.attempts, now) {
            FailureDisposition::Retry { available_at, attempts } => {
                warn!(inbox_id = %inbox.id, attempts, %available_at, error = %message, "inbox handler failed; retrying");
                self.store
                    .retry_inbox(inbox.id, available_at, &message, now)
                    .await?;
            }
            FailureDisposition::DeadLetter { attempts } => {
                error!(inbox_id = %inbox.id, attempts, error = %message, "inbox handler exhausted retries; dead-lettering");
                self.store.dead_letter_inbox(inbox, &message, now).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BackgroundTask for InboxDispatcher {
    fn name(&self) -> &'static str {
        "inbox_dispatcher"
    }

    async fn run_once(&self) -> Result<bool, Error> {
        self.process_once().await
    }
}
