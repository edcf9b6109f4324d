pub mod adapter;
pub mod config;
pub mod facade;
pub mod metrics;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod testing;
pub mod tools;
pub mod worker;

pub use adapter::{MediaMetadata, Mp3Encoding, TagMetadata};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
};
pub use facade::{JobFacade, JobSnapshot};
pub use pipeline::{
    Destination, FailureKind, JobRequest, JobStage, PipelineConfig, PipelineError, PipelineJob,
};
pub use progress::ProgressReport;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError, SchedulerHandle, SchedulerStatus};
pub use tools::{Toolbox, ToolsConfig};
pub use worker::{Worker, WorkerEvent, WorkerId, WorkerStatus};
