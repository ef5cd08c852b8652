//! Transactional unit of work for the review write paths.
//!
//! Services describe their mutation as a closure over a [`ReviewsTx`]; the
//! adapter opens a transaction, runs it, commits on `Ok` and rolls back on
//! `Err`. Event enqueueing happens through the same handle so business rows
//! and outbox rows commit together.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use super::tx::{
    CatalogueTx, CheckInTx, EngagementTx, IdempotencyTx, OutboxTx, PhotoUploadTx, ReputationTx,
    ReviewTx,
};
use crate::domain::Error;

/// Future returned by a unit of work, borrowing the transaction handle.
pub type TxFuture<'t, T> = BoxFuture<'t, Result<T, Error>>;

/// Boxed closure executed inside one transaction.
pub type UnitOfWork<T> = Box<dyn for<'t> FnOnce(&'t mut dyn ReviewsTx) -> TxFuture<'t, T> + Send>;

/// Box a closure as a [`UnitOfWork`], pinning down its higher-ranked
/// signature.
pub fn unit_of_work<T, F>(work: F) -> UnitOfWork<T>
where
    F: for<'t> FnOnce(&'t mut dyn ReviewsTx) -> TxFuture<'t, T> + Send + 'static,
{
    Box::new(work)
}

/// Every row operation available inside a review transaction.
pub trait ReviewsTx:
    IdempotencyTx
    + CatalogueTx
    + ReviewTx
    + CheckInTx
    + EngagementTx
    + ReputationTx
    + PhotoUploadTx
    + OutboxTx
    + Send
{
}

impl<T> ReviewsTx for T where
    T: IdempotencyTx
        + CatalogueTx
        + ReviewTx
        + CheckInTx
        + EngagementTx
        + ReputationTx
        + PhotoUploadTx
        + OutboxTx
        + Send
{
}

/// Opens transactions against the datastore.
#[async_trait]
pub trait ReviewsStore: Send + Sync {
    /// Run `work` atomically.
    async fn transaction<T: Send + 'static>(&self, work: UnitOfWork<T>) -> Result<T, Error>;
}
