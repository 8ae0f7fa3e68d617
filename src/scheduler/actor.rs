use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::event::EventLog;
use crate::scheduler::state::{Decision, JobState, JobStats};
use crate::scheduler::task::{NodeLoad, NodeName, Task};

/// Handle registered by `TaskStarted`. Worker termination, normal or
/// abnormal, is signalled by cancelling `done`; the actor observes the
/// token and drops the worker from its running set.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub id: Uuid,
    pub done: CancellationToken,
}

impl WorkerHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            done: CancellationToken::new(),
        }
    }

    /// Signal that the worker terminated.
    pub fn finished(&self) {
        self.done.cancel();
    }
}

impl Default for WorkerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Message types for the job scheduler event loop. Synchronous requests
/// carry a reply channel; fire-and-forget ones do not.
#[derive(Debug)]
pub enum JobMessage {
    NewTask {
        task: Task,
        node_stats: Vec<NodeLoad>,
    },
    UpdateNodes {
        nodes: Vec<NodeName>,
    },
    TaskStarted {
        node: NodeName,
        worker: WorkerHandle,
    },
    Die {
        reason: String,
    },
    GetStats {
        reply: oneshot::Sender<JobStats>,
    },
    GetEmptyNodes {
        available: Vec<NodeName>,
        reply: oneshot::Sender<Vec<NodeName>>,
    },
    ScheduleLocal {
        available: Vec<NodeName>,
        reply: oneshot::Sender<Decision>,
    },
    ScheduleRemote {
        free: Vec<NodeName>,
        reply: oneshot::Sender<Decision>,
    },
    WorkerDown {
        worker: Uuid,
    },
}

/// The per-job scheduler actor. All state mutation is serialized through
/// one mailbox; the actor processes one message at a time and dies with
/// its coordinator.
pub struct JobScheduler {
    state: JobState,
    coordinator: CancellationToken,
    rx: mpsc::Receiver<JobMessage>,
    tx: mpsc::Sender<JobMessage>,
}

impl JobScheduler {
    /// Spawn the scheduler for one job and return its handle.
    ///
    /// `coordinator` is the lifetime link to the job coordinator: when it
    /// is cancelled the actor exits. If the coordinator died before the
    /// link completed, no actor is started: the returned handle's mailbox
    /// is already closed, every call observes [`SchedulerError::Gone`],
    /// and higher-level supervision cleans up.
    pub fn spawn(
        name: impl Into<String>,
        nodes: Vec<NodeName>,
        coordinator: CancellationToken,
        config: SchedulerConfig,
        events: EventLog,
    ) -> JobSchedulerHandle {
        let name = name.into();
        let (tx, rx) = mpsc::channel(config.mailbox_capacity);
        let handle = JobSchedulerHandle {
            tx: tx.clone(),
            config,
        };
        if coordinator.is_cancelled() {
            tracing::warn!(job = %name, "Coordinator already terminated, scheduler not started");
            return handle;
        }
        let actor = Self {
            state: JobState::new(name, nodes, events),
            coordinator,
            rx,
            tx,
        };
        tokio::spawn(actor.run());
        handle
    }

    async fn run(mut self) {
        tracing::info!(job = %self.state.name(), "Job scheduler started");
        loop {
            tokio::select! {
                _ = self.coordinator.cancelled() => {
                    tracing::info!(job = %self.state.name(), "Coordinator terminated, stopping scheduler");
                    break;
                }
                Some(msg) = self.rx.recv() => {
                    match msg {
                        JobMessage::NewTask { task, node_stats } => {
                            if let Err(error) = self.state.assign_task(task, node_stats) {
                                tracing::error!(job = %self.state.name(), %error, "Job aborted");
                                break;
                            }
                        }
                        JobMessage::UpdateNodes { nodes } => {
                            if let Err(error) = self.state.update_nodes(nodes) {
                                tracing::error!(job = %self.state.name(), %error, "Job aborted during reassignment");
                                break;
                            }
                        }
                        JobMessage::TaskStarted { node, worker } => {
                            self.state.task_started(node, worker.id);
                            self.watch_worker(worker);
                        }
                        JobMessage::WorkerDown { worker } => {
                            self.state.worker_done(&worker);
                        }
                        JobMessage::Die { reason } => {
                            self.state.emit_stopped(&reason);
                            tracing::warn!(job = %self.state.name(), %reason, "Job scheduler asked to stop");
                            break;
                        }
                        JobMessage::GetStats { reply } => {
                            let _ = reply.send(self.state.stats());
                        }
                        JobMessage::GetEmptyNodes { available, reply } => {
                            let _ = reply.send(self.state.empty_nodes(available));
                        }
                        JobMessage::ScheduleLocal { available, reply } => {
                            let _ = reply.send(self.state.schedule_local(available));
                        }
                        JobMessage::ScheduleRemote { free, reply } => {
                            let _ = reply.send(self.state.schedule_remote(free));
                        }
                    }
                }
            }
        }
    }

    /// Begin observing a worker's liveness. The observer posts the
    /// worker-down notice back into the mailbox, so `TaskStarted` for a
    /// worker always precedes its termination notice.
    fn watch_worker(&self, worker: WorkerHandle) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = worker.done.cancelled() => {
                    let _ = tx.send(JobMessage::WorkerDown { worker: worker.id }).await;
                }
                _ = tx.closed() => {}
            }
        });
    }
}

/// Cloneable typed facade over a job scheduler's mailbox.
///
/// Synchronous requests are bounded by the configured deadlines; a closed
/// mailbox or a dropped reply surfaces as [`SchedulerError::Gone`].
#[derive(Debug, Clone)]
pub struct JobSchedulerHandle {
    tx: mpsc::Sender<JobMessage>,
    config: SchedulerConfig,
}

impl JobSchedulerHandle {
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// True once the actor has terminated.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub async fn new_task(&self, task: Task, node_stats: Vec<NodeLoad>) -> Result<()> {
        self.send(JobMessage::NewTask { task, node_stats }).await
    }

    pub async fn update_nodes(&self, nodes: Vec<NodeName>) -> Result<()> {
        self.send(JobMessage::UpdateNodes { nodes }).await
    }

    pub async fn task_started(&self, node: NodeName, worker: WorkerHandle) -> Result<()> {
        self.send(JobMessage::TaskStarted { node, worker }).await
    }

    /// Ask the actor to stop. Best-effort and non-blocking: the caller may
    /// be reacting to a wedged actor, so delivery is not awaited.
    pub fn die(&self, reason: impl Into<String>) {
        let reason = reason.into();
        if self
            .tx
            .try_send(JobMessage::Die {
                reason: reason.clone(),
            })
            .is_err()
        {
            tracing::warn!(%reason, "Could not deliver stop request to job scheduler");
        }
    }

    pub async fn stats(&self) -> Result<JobStats> {
        let (reply, rx) = oneshot::channel();
        self.request(
            JobMessage::GetStats { reply },
            rx,
            self.config.schedule_deadline,
        )
        .await
    }

    /// Peer query used by the arbiter's empty-node fan-out; bounded by the
    /// short peer deadline.
    pub async fn empty_nodes(&self, available: Vec<NodeName>) -> Result<Vec<NodeName>> {
        let (reply, rx) = oneshot::channel();
        self.request(
            JobMessage::GetEmptyNodes { available, reply },
            rx,
            self.config.peer_deadline,
        )
        .await
    }

    pub async fn schedule_local(&self, available: Vec<NodeName>) -> Result<Decision> {
        let (reply, rx) = oneshot::channel();
        self.request(
            JobMessage::ScheduleLocal { available, reply },
            rx,
            self.config.schedule_deadline,
        )
        .await
    }

    pub async fn schedule_remote(&self, free: Vec<NodeName>) -> Result<Decision> {
        let (reply, rx) = oneshot::channel();
        self.request(
            JobMessage::ScheduleRemote { free, reply },
            rx,
            self.config.schedule_deadline,
        )
        .await
    }

    async fn send(&self, msg: JobMessage) -> Result<()> {
        self.tx.send(msg).await.map_err(|_| SchedulerError::Gone)
    }

    async fn request<T>(
        &self,
        msg: JobMessage,
        rx: oneshot::Receiver<T>,
        deadline: Duration,
    ) -> Result<T> {
        let call = async {
            self.tx.send(msg).await.map_err(|_| SchedulerError::Gone)?;
            rx.await.map_err(|_| SchedulerError::Gone)
        };
        match timeout(deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(SchedulerError::Deadline(deadline)),
        }
    }
}
