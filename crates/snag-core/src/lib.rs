//! snag-core: ticket lifecycle state machine, worker assignment engine,
//! and the persistence seam they run against.
//!
//! # Conventions
//!
//! - **Errors**: core operations return [`error::Result`] with the typed
//!   taxonomy in [`error::Error`]; "no eligible worker" is an
//!   [`dispatch::AssignOutcome`] variant, not an error.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **Atomicity**: every state change runs inside one
//!   [`store::Store::transaction`] and commits all-or-nothing.

pub mod complaints;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod store;

pub use error::{Entity, Error, ErrorCode, Result};
