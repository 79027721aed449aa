use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use provision_core::models::{
    Architecture, Dependency, InstallScope, InstallerType, PackageManifest, ResolvedPackageUnit,
    UnitOutcome, UnitOutcomeKind,
};
use provision_core::orchestration::{
    AggregateOutcome, ExecutionPolicy, MultiPackageExecutor, PackagePlan, TaskCancellationToken,
    UnitRunner,
};

/// Returns scripted outcomes and records the order units were run in.
#[derive(Default)]
struct ScriptedRunner {
    outcomes: HashMap<&'static str, UnitOutcome>,
    cancel_after: Option<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn with_outcomes(outcomes: &[(&'static str, UnitOutcome)]) -> Self {
        Self {
            outcomes: outcomes.iter().cloned().collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl UnitRunner for ScriptedRunner {
    fn run(&self, unit: ResolvedPackageUnit, token: &TaskCancellationToken) -> UnitOutcome {
        let id = unit.package_id().to_string();
        self.calls.lock().expect("calls lock").push(id.clone());
        if self.cancel_after == Some(id.as_str()) {
            token.cancel();
        }
        self.outcomes
            .get(id.as_str())
            .cloned()
            .unwrap_or(UnitOutcome::Succeeded)
    }
}

fn unit(id: &str) -> ResolvedPackageUnit {
    unit_needing(id, &[])
}

fn unit_needing(id: &str, dependencies: &[&str]) -> ResolvedPackageUnit {
    let manifest = PackageManifest::single_installer(
        id,
        "1.0",
        Architecture::X64,
        InstallerType::Exe,
        InstallScope::Machine,
    )
    .with_dependencies(dependencies.iter().map(|id| Dependency::package(*id)).collect());
    ResolvedPackageUnit {
        version: manifest.version.clone(),
        installer: manifest.installers[0].clone(),
        installed_version: None,
        manifest,
    }
}

fn units(ids: &[&str]) -> Vec<ResolvedPackageUnit> {
    ids.iter().map(|id| unit(id)).collect()
}

#[tokio::test]
async fn ignorable_failure_keeps_aggregate_success() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[(
        "B",
        UnitOutcome::NoApplicableUpgrade,
    )]));
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run(units(&["A", "B", "C"]), &ExecutionPolicy::upgrade_all())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Success);
    assert!(result.is_success());
    assert_eq!(runner.calls(), vec!["A", "B", "C"]);
    assert_eq!(
        result.report_for("B").map(|report| report.outcome.clone()),
        Some(UnitOutcome::NoApplicableUpgrade)
    );
    assert!(result.not_attempted.is_empty());
}

#[tokio::test]
async fn ignorable_installer_failure_is_reported_but_not_counted() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("B", UnitOutcome::Failed(1603))]));
    let executor = MultiPackageExecutor::new(runner);
    let policy = ExecutionPolicy::default().with_ignorable(UnitOutcomeKind::Failed);

    let result = executor
        .run(units(&["A", "B", "C"]), &policy)
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Success);
    assert_eq!(result.units.len(), 3);
    assert_eq!(result.units[1].outcome, UnitOutcome::Failed(1603));
}

#[tokio::test]
async fn best_effort_run_continues_after_failure() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("B", UnitOutcome::Failed(1))]));
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run(units(&["A", "B", "C"]), &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::PartialFailure);
    assert_eq!(runner.calls(), vec!["A", "B", "C"]);
    assert_eq!(
        result.report_for("c").map(|report| report.outcome.clone()),
        Some(UnitOutcome::Succeeded)
    );
}

#[tokio::test]
async fn stop_on_failure_leaves_the_rest_unattempted() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("B", UnitOutcome::Failed(1))]));
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run(units(&["A", "B", "C", "D"]), &ExecutionPolicy::stop_on_failure())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::PartialFailure);
    assert_eq!(runner.calls(), vec!["A", "B"]);
    assert_eq!(result.not_attempted, vec!["C", "D"]);
}

#[tokio::test]
async fn cancellation_between_units_aborts_the_run() {
    let runner = Arc::new(ScriptedRunner {
        cancel_after: Some("B"),
        ..ScriptedRunner::default()
    });
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run(units(&["A", "B", "C"]), &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Aborted);
    assert_eq!(runner.calls(), vec!["A", "B"]);
    assert_eq!(result.units.len(), 2);
    assert_eq!(result.not_attempted, vec!["C"]);
}

#[tokio::test]
async fn cancelled_unit_aborts_the_run() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("A", UnitOutcome::Cancelled)]));
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run(units(&["A", "B"]), &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Aborted);
    assert_eq!(result.not_attempted, vec!["B"]);
}

#[tokio::test]
async fn token_cancelled_before_start_runs_nothing() {
    let runner = Arc::new(ScriptedRunner::default());
    let token = TaskCancellationToken::new();
    let executor = MultiPackageExecutor::with_token(runner.clone(), token.clone());
    token.cancel();

    let result = executor
        .run(units(&["A", "B"]), &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Aborted);
    assert!(runner.calls().is_empty());
    assert_eq!(result.not_attempted, vec!["A", "B"]);
    assert!(executor.cancellation_token().is_cancelled());
}

#[tokio::test]
async fn empty_order_succeeds() {
    let executor = MultiPackageExecutor::new(Arc::new(ScriptedRunner::default()));

    let result = executor
        .run(Vec::new(), &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Success);
    assert!(result.units.is_empty());
}

#[tokio::test]
async fn shared_dependency_runs_once_for_several_packages() {
    let runner = Arc::new(ScriptedRunner::default());
    let executor = MultiPackageExecutor::new(runner.clone());
    let plans = vec![
        PackagePlan::new(unit("App1"), units(&["Runtime", "Lib1"])),
        PackagePlan::new(unit("App2"), units(&["Runtime", "Lib2"])),
    ];

    let result = executor
        .run_with_dependencies(plans, &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Success);
    assert_eq!(
        runner.calls(),
        vec!["Runtime", "Lib1", "App1", "Lib2", "App2"]
    );
    let dependency_reports: Vec<&str> = result
        .units
        .iter()
        .filter(|report| report.is_dependency)
        .map(|report| report.package_id.as_str())
        .collect();
    assert_eq!(dependency_reports, vec!["Runtime", "Lib1", "Lib2"]);
}

#[tokio::test]
async fn failed_dependency_blocks_only_its_dependents() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[(
        "Runtime",
        UnitOutcome::Failed(5),
    )]));
    let executor = MultiPackageExecutor::new(runner.clone());
    let plans = vec![
        PackagePlan::new(unit("App1"), units(&["Runtime"])),
        PackagePlan::new(unit("App2"), units(&["Lib2"])),
        PackagePlan::new(unit("App3"), units(&["Runtime"])),
    ];

    let result = executor
        .run_with_dependencies(plans, &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::PartialFailure);
    assert_eq!(runner.calls(), vec!["Runtime", "Lib2", "App2"]);
    assert_eq!(
        result.report_for("App1").map(|report| report.outcome.clone()),
        Some(UnitOutcome::SkippedDependencyFailed)
    );
    assert_eq!(
        result.report_for("App2").map(|report| report.outcome.clone()),
        Some(UnitOutcome::Succeeded)
    );
    assert_eq!(
        result.report_for("App3").map(|report| report.outcome.clone()),
        Some(UnitOutcome::SkippedDependencyFailed)
    );
}

#[tokio::test]
async fn already_installed_dependency_counts_as_satisfied() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[(
        "Runtime",
        UnitOutcome::AlreadyInstalled,
    )]));
    let executor = MultiPackageExecutor::new(runner.clone());

    let result = executor
        .run_with_dependencies(
            vec![PackagePlan::new(unit("App"), units(&["Runtime"]))],
            &ExecutionPolicy::upgrade_all(),
        )
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::Success);
    assert_eq!(runner.calls(), vec!["Runtime", "App"]);
}

#[tokio::test]
async fn stop_on_failure_with_dependencies_lists_remaining_roots() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("Lib1", UnitOutcome::Failed(2))]));
    let executor = MultiPackageExecutor::new(runner.clone());
    let plans = vec![
        PackagePlan::new(unit("App1"), units(&["Lib1", "Lib1b"])),
        PackagePlan::new(unit("App2"), Vec::new()),
    ];

    let result = executor
        .run_with_dependencies(plans, &ExecutionPolicy::stop_on_failure())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::PartialFailure);
    assert_eq!(runner.calls(), vec!["Lib1"]);
    assert_eq!(result.not_attempted, vec!["Lib1b", "App1", "App2"]);
}

#[tokio::test]
async fn failure_propagates_through_a_dependency_chain() {
    let runner = Arc::new(ScriptedRunner::with_outcomes(&[("C", UnitOutcome::Failed(3))]));
    let executor = MultiPackageExecutor::new(runner.clone());
    let plans = vec![
        PackagePlan::new(unit_needing("R", &["B"]), vec![unit("C"), unit_needing("B", &["C"])]),
        PackagePlan::new(unit_needing("S", &["B"]), vec![unit_needing("B", &["C"])]),
        PackagePlan::new(unit("T"), vec![unit("D")]),
    ];

    let result = executor
        .run_with_dependencies(plans, &ExecutionPolicy::default())
        .await
        .expect("run should complete");

    assert_eq!(result.outcome, AggregateOutcome::PartialFailure);
    assert_eq!(runner.calls(), vec!["C", "D", "T"]);
    let b = result.report_for("B").expect("B should be reported");
    assert_eq!(b.outcome, UnitOutcome::SkippedDependencyFailed);
    assert!(b.is_dependency);
    assert_eq!(
        result.report_for("R").map(|report| report.outcome.clone()),
        Some(UnitOutcome::SkippedDependencyFailed)
    );
    assert_eq!(
        result.report_for("S").map(|report| report.outcome.clone()),
        Some(UnitOutcome::SkippedDependencyFailed)
    );
    assert_eq!(
        result.report_for("T").map(|report| report.outcome.clone()),
        Some(UnitOutcome::Succeeded)
    );
}
