//! Error shared by the datastore-backed ports.

use super::define_port_error;

define_port_error! {
    /// Errors raised by persistence adapters.
    pub enum StoreError {
        /// The pool could not hand out a connection.
        Connection { message: String } => service_unavailable, "datastore connection failed: {message}",
        /// A statement failed.
        Query { message: String } => internal, "datastore query failed: {message}",
        /// A stored row could not be mapped back into the domain.
        Corrupt { message: String } => internal, "stored row is malformed: {message}",
    }
}
