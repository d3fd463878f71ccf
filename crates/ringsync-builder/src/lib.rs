//! Boundary to the external ring-builder tool.
//!
//! Ring construction and balancing are owned by an external
//! `swift-ring-builder`-style program; this crate wraps it behind the
//! [`RingBuilder`] trait with two backends:
//!
//! - [`CommandBuilder`] — the production backend, shelling out to the
//!   configured program per operation and bridging its on-disk device
//!   table through a helper interpreter.
//! - [`JsonBuilder`] — a JSON-file-backed stand-in for tests and offline
//!   dry runs, with the same file-existence behavior and an operation log.
//!
//! The [`metaswap`] transform lives here too: the field swap applied to
//! logical-volume devices around every rebalance.

mod command_builder;
mod error;
mod json_builder;
mod metaswap;
mod traits;

pub use command_builder::CommandBuilder;
pub use error::BuilderError;
pub use json_builder::JsonBuilder;
pub use metaswap::metaswap;
pub use traits::RingBuilder;
