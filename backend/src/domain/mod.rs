//! Reviews integrity core: domain types, services and ports.
//!
//! Purpose: keep every business rule of the review write paths, the event
//! pipeline and the rating engine independent of HTTP and storage. Inbound
//! adapters call services; services talk to the outside world only through
//! the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Identifiers (`UserId`, `CafeId`, `ReviewId`, ...): UUID newtypes.
//! - Actor / Role: authenticated caller context.
//! - TraceId: request- or job-scoped correlation id.
//! - Services: `ReviewsService`, `CheckInService`, `EngagementService`,
//!   `PhotoService`, `RatingEngine`, `ReputationLedger`, `DlqAdmin`.

pub mod actor;
pub mod background;
pub mod checkins;
pub mod drinks;
pub mod engagement;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod ids;
pub mod photos;
pub mod ports;
pub mod rate_limit;
pub mod rating;
pub mod reputation;
pub mod reviews;
pub mod trace_id;

pub use self::actor::{Actor, Role, UnknownRole};
pub use self::error::{Error, ErrorCode};
pub use self::ids::{
    CafeId, CheckInId, DlqId, DrinkId, EventId, InboxId, PhotoUploadId, ReportId, ReviewId,
    UserId, VerificationId, VoteId,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

