//! Waiting on server-side asynchronous jobs.

use std::time::Duration;

use crate::client::JobApi;
use crate::constants::JOB_POLL_INTERVAL_MS;
use crate::error::ApiError;
use crate::model::{Job, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("non-success status: {}", .0.status.as_str())]
    Failed(Box<Job>),
    #[error("polling job: {0}")]
    Api(#[from] ApiError),
}

/// Poll `job_id` until it leaves pending/in-progress.
///
/// There is no timeout here; wrap the call in `tokio::time::timeout` if needed.
pub async fn wait_for_job<C: JobApi + ?Sized>(client: &C, job_id: &str) -> Result<Job, JobError> {
    wait_for_job_every(client, job_id, Duration::from_millis(JOB_POLL_INTERVAL_MS)).await
}

pub async fn wait_for_job_every<C: JobApi + ?Sized>(
    client: &C,
    job_id: &str,
    interval: Duration,
) -> Result<Job, JobError> {
    loop {
        let job = client.get_job(job_id).await?;
        if job.status.is_terminal() {
            tracing::debug!(job_id, status = job.status.as_str(), "job finished");
            if job.status == JobStatus::Success {
                return Ok(job);
            }
            return Err(JobError::Failed(Box::new(job)));
        }
        tracing::debug!(job_id, status = job.status.as_str(), "job still running");
        tokio::time::sleep(interval).await;
    }
}
