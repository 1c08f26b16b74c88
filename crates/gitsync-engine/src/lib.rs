//! Reconciliation of GitLab groups against a directory.
//!
//! A run reads a [`DirectoryTree`](gitsync_directory::DirectoryTree), checks
//! that it holds enough users, builds a [`PlatformView`] (creating the
//! missing GitLab groups) and applies the [`rules::PIPELINE`] in order. Any
//! error aborts the run.

pub mod config;
pub mod engine;
pub mod error;
pub mod filters;
pub mod membership;
pub mod rules;
pub mod view;

pub use config::{RemovalThreshold, SyncConfig};
pub use engine::{Reconciler, RunSummary};
pub use error::{SyncError, SyncResult};
pub use filters::{ComplianceFilters, ExemptionKind};
pub use rules::{Rule, RuleContext, RuleReport, PIPELINE, PRECONDITION};
pub use view::PlatformView;
