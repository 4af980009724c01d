//! Per-session activation state for skillcue.
//!
//! One JSON record per session id under the cache directory. Every mutation
//! is a full read-modify-write of that record, published with an atomic
//! rename. Two invocations racing on the same session can still lose one
//! update; there is no cross-process lock.

pub mod error;
pub mod store;
pub mod types;

pub use error::SessionError;
pub use store::{SessionStore, to_chrono};
pub use types::{SessionData, Timestamp};
