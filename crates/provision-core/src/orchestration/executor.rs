use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    CoreError, CoreErrorKind, DependencyKey, DependencyKind, ResolvedPackageUnit, UnitOutcome,
    UnitOutcomeKind, Version,
};
use crate::orchestration::{OrchestrationResult, TaskCancellationToken};

/// Installs one resolved unit. Runs on a blocking thread and may observe
/// the token to stop early.
pub trait UnitRunner: Send + Sync {
    fn run(&self, unit: ResolvedPackageUnit, token: &TaskCancellationToken) -> UnitOutcome;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionPolicy {
    /// Outcomes that do not count as failures.
    pub ignorable: Vec<UnitOutcomeKind>,
    /// Keep going after a non-ignorable failure.
    pub best_effort: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            ignorable: Vec::new(),
            best_effort: true,
        }
    }
}

impl ExecutionPolicy {
    /// Upgrading everything tolerates packages with nothing to do.
    pub fn upgrade_all() -> Self {
        Self {
            ignorable: vec![
                UnitOutcomeKind::AlreadyInstalled,
                UnitOutcomeKind::NoApplicableUpgrade,
            ],
            best_effort: true,
        }
    }

    pub fn stop_on_failure() -> Self {
        Self {
            ignorable: Vec::new(),
            best_effort: false,
        }
    }

    pub fn with_ignorable(mut self, kind: UnitOutcomeKind) -> Self {
        if !self.ignorable.contains(&kind) {
            self.ignorable.push(kind);
        }
        self
    }

    pub fn counts_as_failure(&self, outcome: &UnitOutcome) -> bool {
        !outcome.is_success() && !self.ignorable.contains(&outcome.kind())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnitReport {
    pub package_id: String,
    pub version: Version,
    pub outcome: UnitOutcome,
    /// Installed to satisfy another package rather than requested directly.
    pub is_dependency: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateOutcome {
    Success,
    PartialFailure,
    Aborted,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OverallResult {
    pub units: Vec<UnitReport>,
    /// Packages never started because the run stopped early.
    pub not_attempted: Vec<String>,
    pub outcome: AggregateOutcome,
}

impl OverallResult {
    pub fn is_success(&self) -> bool {
        self.outcome == AggregateOutcome::Success
    }

    pub fn report_for(&self, package_id: &str) -> Option<&UnitReport> {
        self.units
            .iter()
            .find(|report| report.package_id.eq_ignore_ascii_case(package_id))
    }
}

/// A requested package together with its dependency install order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackagePlan {
    pub root: ResolvedPackageUnit,
    pub dependencies: Vec<ResolvedPackageUnit>,
}

impl PackagePlan {
    pub fn new(root: ResolvedPackageUnit, dependencies: Vec<ResolvedPackageUnit>) -> Self {
        Self { root, dependencies }
    }
}

/// Runs resolved units one at a time, in order.
pub struct MultiPackageExecutor {
    runner: Arc<dyn UnitRunner>,
    token: TaskCancellationToken,
}

struct RunState<'a> {
    policy: &'a ExecutionPolicy,
    units: Vec<UnitReport>,
    failed: bool,
    aborted: bool,
}

impl RunState<'_> {
    fn record(&mut self, report: UnitReport) {
        if report.outcome == UnitOutcome::Cancelled {
            self.aborted = true;
        }
        if self.policy.counts_as_failure(&report.outcome) {
            self.failed = true;
            tracing::error!(
                package = %report.package_id,
                version = %report.version,
                outcome = report.outcome.kind().as_str(),
                "package unit failed"
            );
        } else if report.outcome.is_success() {
            tracing::info!(
                package = %report.package_id,
                version = %report.version,
                "package unit succeeded"
            );
        } else {
            tracing::warn!(
                package = %report.package_id,
                version = %report.version,
                outcome = report.outcome.kind().as_str(),
                "package unit finished with ignorable outcome"
            );
        }
        self.units.push(report);
    }

    fn should_stop(&self) -> bool {
        self.aborted || (self.failed && !self.policy.best_effort)
    }

    fn finish(self, not_attempted: Vec<String>) -> OverallResult {
        let outcome = if self.aborted {
            AggregateOutcome::Aborted
        } else if self.failed {
            AggregateOutcome::PartialFailure
        } else {
            AggregateOutcome::Success
        };
        OverallResult {
            units: self.units,
            not_attempted,
            outcome,
        }
    }
}

impl MultiPackageExecutor {
    pub fn new(runner: Arc<dyn UnitRunner>) -> Self {
        Self {
            runner,
            token: TaskCancellationToken::new(),
        }
    }

    pub fn with_token(runner: Arc<dyn UnitRunner>, token: TaskCancellationToken) -> Self {
        Self { runner, token }
    }

    pub fn cancellation_token(&self) -> TaskCancellationToken {
        self.token.clone()
    }

    /// Runs `order` sequentially. Failures are recorded and the run goes on
    /// under a best-effort policy; cancellation always stops it.
    pub async fn run(
        &self,
        order: Vec<ResolvedPackageUnit>,
        policy: &ExecutionPolicy,
    ) -> OrchestrationResult<OverallResult> {
        let mut state = RunState {
            policy,
            units: Vec::new(),
            failed: false,
            aborted: false,
        };
        let mut remaining = order.into_iter();

        while let Some(unit) = remaining.next() {
            if self.token.is_cancelled() {
                state.aborted = true;
                return Ok(state.finish(not_attempted(Some(unit), remaining)));
            }

            let report = self.run_unit(unit, false).await?;
            state.record(report);
            if state.should_stop() {
                return Ok(state.finish(not_attempted(None, remaining)));
            }
        }

        Ok(state.finish(Vec::new()))
    }

    /// Runs each plan's dependencies before its root. A dependency shared by
    /// several roots runs once. Any unit, dependency or root, whose own
    /// dependency failed is marked `SkippedDependencyFailed` instead of run,
    /// without affecting unrelated roots.
    pub async fn run_with_dependencies(
        &self,
        plans: Vec<PackagePlan>,
        policy: &ExecutionPolicy,
    ) -> OrchestrationResult<OverallResult> {
        let mut state = RunState {
            policy,
            units: Vec::new(),
            failed: false,
            aborted: false,
        };
        let mut dependency_results: HashMap<DependencyKey, bool> = HashMap::new();
        let mut remaining = plans.into_iter();

        while let Some(plan) = remaining.next() {
            let mut dependency_failed = false;
            let mut pending = plan.dependencies.into_iter();

            while let Some(dependency) = pending.next() {
                let key = dependency.key();
                if let Some(satisfied) = dependency_results.get(&key) {
                    dependency_failed |= !*satisfied;
                    continue;
                }
                if self.token.is_cancelled() {
                    state.aborted = true;
                    let mut skipped = not_attempted(Some(dependency), pending);
                    skipped.push(plan.root.package_id().to_string());
                    skipped.extend(remaining_roots(remaining));
                    return Ok(state.finish(skipped));
                }

                let report = match failed_dependency_of(&dependency, &dependency_results) {
                    Some(failed) => {
                        tracing::warn!(
                            package = %dependency.package_id(),
                            dependency = %failed,
                            "skipping dependency because one of its own dependencies failed"
                        );
                        UnitReport {
                            package_id: dependency.package_id().to_string(),
                            version: dependency.version.clone(),
                            outcome: UnitOutcome::SkippedDependencyFailed,
                            is_dependency: true,
                        }
                    }
                    None => self.run_unit(dependency, true).await?,
                };
                let satisfied = satisfies_dependency(&report.outcome);
                dependency_results.insert(key, satisfied);
                dependency_failed |= !satisfied;
                state.record(report);
                if state.should_stop() {
                    let mut skipped = not_attempted(None, pending);
                    skipped.push(plan.root.package_id().to_string());
                    skipped.extend(remaining_roots(remaining));
                    return Ok(state.finish(skipped));
                }
            }

            if dependency_failed {
                tracing::warn!(
                    package = %plan.root.package_id(),
                    "skipping package because one of its dependencies failed"
                );
                state.record(UnitReport {
                    package_id: plan.root.package_id().to_string(),
                    version: plan.root.version.clone(),
                    outcome: UnitOutcome::SkippedDependencyFailed,
                    is_dependency: false,
                });
            } else {
                if self.token.is_cancelled() {
                    state.aborted = true;
                    let mut skipped = vec![plan.root.package_id().to_string()];
                    skipped.extend(remaining_roots(remaining));
                    return Ok(state.finish(skipped));
                }
                let report = self.run_unit(plan.root, false).await?;
                state.record(report);
            }

            if state.should_stop() {
                return Ok(state.finish(remaining_roots(remaining)));
            }
        }

        Ok(state.finish(Vec::new()))
    }

    async fn run_unit(
        &self,
        unit: ResolvedPackageUnit,
        is_dependency: bool,
    ) -> OrchestrationResult<UnitReport> {
        let package_id = unit.package_id().to_string();
        let version = unit.version.clone();
        tracing::info!(package = %package_id, version = %version, is_dependency, "starting package unit");

        let runner = Arc::clone(&self.runner);
        let token = self.token.clone();
        let outcome = tokio::task::spawn_blocking(move || runner.run(unit, &token))
            .await
            .map_err(|join_error| {
                CoreError::for_package(
                    CoreErrorKind::Internal,
                    package_id.clone(),
                    format!("package unit join failure: {join_error}"),
                )
            })?;

        Ok(UnitReport {
            package_id,
            version,
            outcome,
            is_dependency,
        })
    }
}

fn satisfies_dependency(outcome: &UnitOutcome) -> bool {
    matches!(
        outcome,
        UnitOutcome::Succeeded | UnitOutcome::AlreadyInstalled | UnitOutcome::NoApplicableUpgrade
    )
}

/// First package dependency of `unit` that already ran and did not leave
/// the package usable.
fn failed_dependency_of(
    unit: &ResolvedPackageUnit,
    results: &HashMap<DependencyKey, bool>,
) -> Option<String> {
    let dependencies = unit.manifest.dependencies_for(&unit.installer);
    dependencies
        .of_kind(DependencyKind::Package)
        .find(|dependency| results.get(&dependency.key()) == Some(&false))
        .map(|dependency| dependency.id.clone())
}

fn not_attempted(
    current: Option<ResolvedPackageUnit>,
    rest: impl Iterator<Item = ResolvedPackageUnit>,
) -> Vec<String> {
    current
        .into_iter()
        .chain(rest)
        .map(|unit| unit.package_id().to_string())
        .collect()
}

fn remaining_roots(rest: impl Iterator<Item = PackagePlan>) -> Vec<String> {
    rest.map(|plan| plan.root.package_id().to_string()).collect()
}
