//! Reviews integrity core of the café reviews backend.
//!
//! - [`domain`]: services, rules and ports.
//! - [`inbound`]: Actix HTTP adapter.
//! - [`outbound`]: PostgreSQL, object store, image codec and summariser
//!   adapters.
//! - [`middleware`]: request tracing.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
