pub mod cancellation;
pub mod executor;

pub use cancellation::TaskCancellationToken;
pub use executor::{
    AggregateOutcome, ExecutionPolicy, MultiPackageExecutor, OverallResult, PackagePlan,
    UnitReport, UnitRunner,
};

use crate::models::CoreError;

pub type OrchestrationResult<T> = Result<T, CoreError>;
