use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("task {task_id} forced local but no eligible node")]
    ForcedLocal { task_id: u64 },

    #[error("task {task_id} forced remote but no eligible node")]
    ForcedRemote { task_id: u64 },

    #[error("task {task_id} failed on all available nodes")]
    Exhausted { task_id: u64 },

    #[error("request to job scheduler timed out after {0:?}")]
    Deadline(Duration),

    #[error("job scheduler has terminated")]
    Gone,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
