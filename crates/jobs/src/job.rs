use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {id} not found")]
    NotFound { id: Uuid },
    #[error("illegal transition from {from:?} to {to:?} for job {id}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Lifecycle states. Transitions are monotonic and unidirectional into a
/// terminal state; nothing leaves completed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            // Dispatch failures can fail a job that never started processing.
            (JobStatus::Pending, JobStatus::Failed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInput {
    pub document_paths: Vec<String>,
    pub project_name: String,
    pub model: String,
}

/// Completed-job summary handed back to status-reporting callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub application_id: String,
    pub requirement_count: usize,
    pub requirement_ids: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub id: Uuid,
    pub status: JobStatus,
    pub input: JobInput,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExtractionJob {
    pub fn new(input: JobInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            input,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
