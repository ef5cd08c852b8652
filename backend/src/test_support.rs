//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is compiled for tests and behind the
//! `test-support` feature.
//!
//! [`MemoryDatabase`] implements every datastore port over one set of
//! in-memory tables, so services can be exercised end to end without
//! PostgreSQL. Transactions run against a copy of the tables and only
//! replace them when the unit of work returns `Ok`.

mod clock;
mod memory_database;
mod memory_events;
mod memory_object_store;
mod memory_queries;

pub use clock::{MutableClock, RecordingSleeper};
pub use memory_database::MemoryDatabase;
pub use memory_object_store::MemoryObjectStore;
