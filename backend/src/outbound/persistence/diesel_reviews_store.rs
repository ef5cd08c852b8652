//! PostgreSQL-backed [`ReviewsStore`].
//!
//! `transaction` checks out one pooled connection, opens a Diesel
//! transaction and hands the unit of work a [`DieselReviewsTx`] bound to that
//! connection. The transaction commits when the unit of work returns `Ok` and
//! rolls back on `Err` or on any Diesel failure, so idempotency slots,
//! business rows and outbox rows land together or not at all.
//!
//! Row operations live in the submodules, one per aggregate.

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection};

use crate::domain::Error;
use crate::domain::ports::{ReviewsStore, UnitOfWork};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::pool::DbPool;

mod catalogue;
mod checkins;
mod engagement;
mod idempotency;
mod outbox;
mod photos;
mod reputation;
mod reviews;

pub(crate) use reputation::{append_reputation_event, load_reputation_events};

/// Diesel-backed unit of work.
#[derive(Clone)]
pub struct DieselReviewsStore {
    pool: DbPool,
}

impl DieselReviewsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Transaction handle passed to services.
pub(crate) struct DieselReviewsTx<'c> {
    conn: &'c mut AsyncPgConnection,
}

impl DieselReviewsTx<'_> {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut *self.conn
    }
}

/// Either the unit of work refused to commit or Diesel failed underneath it.
enum TxError {
    Domain(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Diesel(err)
    }
}

impl From<TxError> for Error {
    fn from(err: TxError) -> Self {
        match err {
            TxError::Domain(err) => err,
            TxError::Diesel(err) => map_diesel_error(err).into(),
        }
    }
}

#[async_trait]
impl ReviewsStore for DieselReviewsStore {
    async fn transaction<T: Send + 'static>(&self, work: UnitOfWork<T>) -> Result<T, Error> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let outcome = conn
            .transaction::<T, TxError, _>(|conn| {
                async move {
                    let mut tx = DieselReviewsTx { conn };
                    work(&mut tx).await.map_err(TxError::Domain)
                }
                .scope_boxed()
            })
            .await;
        outcome.map_err(Error::from)
    }
}
