//! GitLab access layer for gitsync.
//!
//! - [`client::GitlabClient`]: REST v4 over `reqwest`, token auth, pagination
//! - [`api::GitlabApi`]: the operations the reconciliation engine needs
//! - [`dry_run::DryRunGitlab`]: decorator eliding every write
//! - [`capability::CapabilityClient`]: retry + dry-run facade used by rules

pub mod api;
pub mod capability;
pub mod client;
pub mod dry_run;
pub mod error;
pub mod models;
pub mod retry;

pub use api::GitlabApi;
pub use capability::CapabilityClient;
pub use client::GitlabClient;
pub use dry_run::DryRunGitlab;
pub use error::{GitlabError, GitlabResult};
pub use models::{AccessLevel, Group, Identity, Member, NewGroup, User, UserState, Visibility};
pub use retry::RetryPolicy;
