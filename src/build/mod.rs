mod clean;
mod context;
mod core;
mod feedback;
mod scheduler;
mod utils;

pub use clean::clean_working_path;
pub use context::BuildContext;
pub use core::{BuildCoordinator, BuildSummary};
pub use feedback::FeedbackAnalyzer;
pub use scheduler::{CompileJob, Job, JobReport, JobScheduler};
pub use utils::{SourceBuckets, gather_sources, link_order_for};
