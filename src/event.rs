use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::scheduler::task::{Task, TaskInput};

/// One line of the job event log. Emitted for every abort condition and
/// when the scheduler is asked to stop.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub job: String,
    pub cause: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskContext>,
    pub at: DateTime<Utc>,
}

/// Task fields carried on task-level events.
#[derive(Debug, Clone, Serialize)]
pub struct TaskContext {
    pub mode: String,
    pub task_id: u64,
    pub inputs: Vec<TaskInput>,
}

impl JobEvent {
    pub fn task_failure(job: &str, task: &Task, cause: String) -> Self {
        Self {
            job: job.to_string(),
            cause,
            task: Some(TaskContext {
                mode: task.mode.clone(),
                task_id: task.task_id,
                inputs: task.inputs.clone(),
            }),
            at: Utc::now(),
        }
    }

    pub fn stopped(job: &str, cause: String) -> Self {
        Self {
            job: job.to_string(),
            cause,
            task: None,
            at: Utc::now(),
        }
    }
}

/// Cloneable sink for job events. Events always land in the tracing
/// output; a sink created with [`EventLog::channel`] also forwards them to
/// the receiver end (the cluster event log).
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    tx: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl EventLog {
    /// Sink connected to a channel consumed by the event-log service.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sink that only logs through tracing.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: JobEvent) {
        tracing::warn!(
            job = %event.job,
            cause = %event.cause,
            task_id = event.task.as_ref().map(|t| t.task_id),
            "Job event"
        );
        if let Some(tx) = &self.tx {
            // Receiver dropped means the event log went away; keep going.
            let _ = tx.send(event);
        }
    }
}
