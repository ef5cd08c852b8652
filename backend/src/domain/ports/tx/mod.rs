//! Row operations available inside a review transaction, grouped by the
//! aggregate they touch.

mod catalogue;
mod checkin;
mod engagement;
mod idempotency;
mod outbox;
mod photo;
mod reputation;
mod review;

pub use catalogue::CatalogueTx;
pub use checkin::CheckInTx;
pub use engagement::EngagementTx;
pub use idempotency::IdempotencyTx;
pub use outbox::OutboxTx;
pub use photo::PhotoUploadTx;
pub use reputation::ReputationTx;
pub use review::ReviewTx;
