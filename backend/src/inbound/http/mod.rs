//! HTTP inbound adapter exposing the reviews REST endpoints.
//!
//! Handlers parse identity, idempotency keys and payloads, call a driving
//! port under a deadline and render the outcome. Business rules live in the
//! domain services behind those ports.

pub mod admin;
pub mod cafes;
pub mod checkins;
pub mod deadline;
pub mod engagement;
pub mod error;
pub mod health;
pub mod idempotency;
pub mod identity;
pub mod photos;
pub mod reviews;
pub mod routes;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;
