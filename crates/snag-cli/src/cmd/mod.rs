//! Command handlers for the `snag` binary.

pub mod assign;
pub mod complaint;
pub mod complete;
pub mod feedback;
pub mod init;
pub mod intake;
pub mod list;
pub mod setup;
pub mod show;
pub mod submit;
