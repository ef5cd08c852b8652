//! Transactional outbox, per-consumer inbox and dead-letter queue.
//!
//! Business transactions enqueue [`NewDomainEvent`]s next to their writes.
//! The [`OutboxDispatcher`] fans each row out to the registered consumers;
//! the [`InboxDispatcher`] runs a consumer's [`EventHandler`] with
//! exponential backoff until the row is processed or dead-lettered.

mod consumers;
mod dispatcher;
mod dlq;
mod handler;
mod model;
mod payload;
mod retry;

pub use consumers::{ConsumerRegistry, REVIEWS_CORE_CONSUMER};
pub use dispatcher::{InboxDispatcher, LAST_ERROR_MAX_CHARS, OutboxDispatcher};
pub use dlq::{DLQ_DEFAULT_LIMIT, DLQ_MAX_LIMIT, DlqAdmin};
#[cfg(test)]
pub use handler::{MockCafeRecompute, MockEventHandler, MockPhotoProcessing};
pub use handler::{CafeRecompute, EventHandler, PhotoProcessing, ReviewsCoreHandler};
pub use model::{
    AggregateType, DlqEntry, EventStatus, EventType, InboxEvent, NewDomainEvent, OutboxEvent,
    ReplayMode, ReplayOutcome, UnknownEventStatus, UnknownEventType,
};
pub use payload::{
    AbuseConfirmed, EventBody, HelpfulAdded, PhotoProcessRequested, ReviewChanged, VisitVerified,
    envelope_dedupe_key,
};
pub use retry::{FailureDisposition, RetryPolicy, truncate_error};
