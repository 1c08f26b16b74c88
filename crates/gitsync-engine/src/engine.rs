//! Orchestration of a reconciliation run.

use chrono::{DateTime, Utc};
use gitsync_directory::{build_tree, DirectorySource, DirectoryTree};
use gitsync_gitlab::{CapabilityClient, GitlabApi};
use tracing::{info, instrument};

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::filters::ComplianceFilters;
use crate::rules::{Rule, RuleContext, RuleReport, PIPELINE, PRECONDITION};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub directory_users: usize,
    pub groups_in_scope: usize,
    pub reports: Vec<RuleReport>,
}

impl RunSummary {
    /// Mutations issued, or skipped because of dry-run.
    #[must_use]
    pub fn total_mutations(&self) -> usize {
        self.reports.iter().map(RuleReport::mutations).sum()
    }

    #[must_use]
    pub fn report(&self, rule: Rule) -> Option<&RuleReport> {
        self.reports.iter().find(|r| r.rule == rule)
    }
}

/// Runs the rule pipeline against a directory and a GitLab instance.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: SyncConfig,
    filters: ComplianceFilters,
}

impl Reconciler {
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let filters = ComplianceFilters::new(&config)?;
        Ok(Self { config, filters })
    }

    /// Wrap `api` with the configured retry policy and dry-run mode.
    pub fn client<A: GitlabApi + 'static>(&self, api: A) -> CapabilityClient {
        CapabilityClient::new(api, self.config.retry_policy(), self.config.dry_run)
    }

    /// Read the directory, then reconcile GitLab against it.
    pub async fn run<S>(&self, source: &S, client: &CapabilityClient) -> SyncResult<RunSummary>
    where
        S: DirectorySource + ?Sized,
    {
        let directory = build_tree(source, |name| self.filters.is_directory_group_in_scope(name)).await?;
        self.run_with_tree(&directory, client).await
    }

    /// Reconcile GitLab against an already built directory tree.
    ///
    /// The minimum user count is checked before any GitLab call, so a failed
    /// precondition leaves GitLab untouched.
    #[instrument(skip_all, fields(dry_run = client.is_dry_run()))]
    pub async fn run_with_tree(
        &self,
        directory: &DirectoryTree,
        client: &CapabilityClient,
    ) -> SyncResult<RunSummary> {
        let started_at = Utc::now();
        info!("Starting reconciliation");

        let ctx = RuleContext::new(directory, client, &self.filters, &self.config);
        let mut reports = vec![PRECONDITION.apply(&ctx).await?];

        for rule in PIPELINE {
            info!(rule = %rule, "Starting rule");
            let report = rule.apply(&ctx).await?;
            info!(
                rule = %rule,
                added = report.added,
                removed = report.removed,
                regranted = report.regranted,
                promoted = report.promoted,
                blocked = report.blocked,
                unblocked = report.unblocked,
                skipped = report.skipped,
                "Rule completed"
            );
            reports.push(report);
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            dry_run: client.is_dry_run(),
            directory_users: directory.user_count(),
            groups_in_scope: ctx.platform().await?.groups().len(),
            reports,
        };
        info!(
            mutations = summary.total_mutations(),
            dry_run = summary.dry_run,
            elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds(),
            "Reconciliation completed"
        );
        Ok(summary)
    }
}
