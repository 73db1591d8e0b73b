//! # DCB Runtime
//!
//! Retry orchestration for the Decision Model layer and the polling
//! projection daemon, built on top of `dcb-core`'s `EventStore` trait and
//! `dcb-projections`'s keyed read models.
//!
//! ## Crate Layout
//!
//! - [`execute_decision`]: [`execute_decision::execute_decision`], retrying
//!   only on `AppendConditionFailed` (§4.6).
//! - [`daemon`]: [`daemon::ProjectionDaemon`], the single polling loop that
//!   folds events into every registered projection and supports destructive
//!   rebuild (§4.8).
//! - [`config`]: [`config::ProjectionsConfig`] and its startup validation.
//! - [`metrics`]: metric descriptions recorded by this crate.
//! - [`error`]: [`error::RuntimeError`].

pub mod config;
pub mod daemon;
pub mod error;
pub mod execute_decision;
pub mod metrics;

pub use config::ProjectionsConfig;
pub use daemon::ProjectionDaemon;
pub use error::{Result, RuntimeError};
pub use execute_decision::{execute_decision, CancellationToken, RetryPolicy};
