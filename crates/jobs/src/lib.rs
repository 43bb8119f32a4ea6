pub mod job;
pub mod queue;
pub mod tracker;

pub use job::{ExtractionJob, JobError, JobInput, JobResult, JobStatus};
pub use queue::QueueDepthCounter;
pub use tracker::{InMemoryJobRepository, JobRepository, JobTracker};
