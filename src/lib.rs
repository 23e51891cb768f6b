// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod limits;
pub mod kubernetes;
pub mod metrics;
pub mod collector;
pub mod report;
pub mod checks;

// Re-export commonly used items
pub use types::*;
pub use error::CheckError;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use limits::{LimitKind, LimitTable};
pub use kubernetes::{fetch_snapshot, load_snapshot_file, Snapshot};
pub use metrics::{parse_snapshot, Resource};
pub use collector::MetricsCollector;
pub use report::{CheckReport, ReportSummary};
pub use checks::{config_failure, execute, ObjectStatsCheck, VolumeAvailabilityCheck};
