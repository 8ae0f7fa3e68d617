use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::event::{EventLog, JobEvent};
use crate::scheduler::placement::choose_node;
use crate::scheduler::store::{Pref, TaskStore};
use crate::scheduler::task::{NodeLoad, NodeName, Task};

/// Outcome of one scheduling request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Run `task` on `node`. The task has been removed from its bucket.
    Run { node: NodeName, task: Task },
    /// The job has pending work but no admissible placement in the given
    /// node set.
    NoNodes,
    /// The job has no data-local work for the given node set; the arbiter
    /// may retry with the cross-job empty-node fallback.
    NoLocal,
}

/// Load snapshot reported to the fairness arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub queued: usize,
    pub running: usize,
}

/// The task-placement engine of one job: bucket store, running set and the
/// latest known cluster membership. All mutation goes through the owning
/// actor's mailbox, so the methods here are plain single-threaded code.
#[derive(Debug)]
pub struct JobState {
    name: String,
    store: TaskStore,
    running: HashMap<Uuid, NodeName>,
    nodes: Vec<NodeName>,
    events: EventLog,
}

impl JobState {
    pub fn new(name: impl Into<String>, nodes: Vec<NodeName>, events: EventLog) -> Self {
        Self {
            name: name.into(),
            store: TaskStore::new(),
            running: HashMap::new(),
            nodes,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn stats(&self) -> JobStats {
        JobStats {
            queued: self.store.queued_total(),
            running: self.running.len(),
        }
    }

    pub fn task_started(&mut self, node: NodeName, worker: Uuid) {
        tracing::debug!(job = %self.name, %node, worker = %worker, "Task started");
        self.running.insert(worker, node);
    }

    pub fn worker_done(&mut self, worker: &Uuid) {
        self.running.remove(worker);
    }

    /// The subset of `available` this job would surrender to another job:
    /// nodes it holds no pending data-local work for. A job with
    /// no-preference work pending surrenders nothing, since it would accept
    /// any of those nodes itself.
    pub fn empty_nodes(&self, available: Vec<NodeName>) -> Vec<NodeName> {
        if !self.store.nopref().is_empty() {
            return Vec::new();
        }
        available
            .into_iter()
            .filter(|node| self.store.queued_at(node) == 0)
            .collect()
    }

    /// Place a newly arrived task into the right bucket.
    ///
    /// `node_stats` pairs each of the task's inputs with the load of its
    /// hosting node. On an unschedulable forced task or a task blacklisted
    /// everywhere this emits an abort event and returns the error; the
    /// owning actor terminates and the linked coordinator follows.
    pub fn assign_task(&mut self, task: Task, node_stats: Vec<NodeLoad>) -> Result<()> {
        let admissible: Vec<NodeName> = self
            .nodes
            .iter()
            .filter(|node| !task.blacklist.contains(*node))
            .cloned()
            .collect();
        if task.force_remote {
            if admissible.iter().any(|node| !task.is_input_host(node)) {
                self.assign_nopref(task, &admissible)
            } else {
                Err(self.abort(task, |id| SchedulerError::ForcedRemote { task_id: id }))
            }
        } else {
            self.find_preferred(task, node_stats, &admissible)
        }
    }

    /// Rank the admissible input hosts by (bucket depth, load, entry
    /// order) and queue the task on the best one, falling back to the
    /// no-preference bucket when no input host is admissible.
    fn find_preferred(
        &mut self,
        mut task: Task,
        node_stats: Vec<NodeLoad>,
        admissible: &[NodeName],
    ) -> Result<()> {
        let best = node_stats
            .iter()
            .enumerate()
            .filter(|(_, stat)| admissible.contains(&stat.input.host))
            .min_by_key(|(entry, stat)| {
                (self.store.queued_at(&stat.input.host), stat.load, *entry)
            });
        match best {
            Some((_, stat)) => {
                let input = stat.input.clone();
                task.chosen_input = Some(input.url.clone());
                tracing::debug!(
                    job = %self.name,
                    task_id = task.task_id,
                    host = %input.host,
                    "Task queued on preferred node"
                );
                self.store.push_task(Pref::Node(input.host), task);
                Ok(())
            }
            None => self.assign_nopref(task, admissible),
        }
    }

    fn assign_nopref(&mut self, mut task: Task, admissible: &[NodeName]) -> Result<()> {
        if admissible.is_empty() {
            return Err(self.abort(task, |id| SchedulerError::Exhausted { task_id: id }));
        }
        if task.force_local {
            return Err(self.abort(task, |id| SchedulerError::ForcedLocal { task_id: id }));
        }
        task.chosen_input = task.inputs.first().map(|input| input.url.clone());
        tracing::debug!(job = %self.name, task_id = task.task_id, "Task queued without preference");
        self.store.push_task(Pref::NoPref, task);
        Ok(())
    }

    fn abort(&self, task: Task, error: impl FnOnce(u64) -> SchedulerError) -> SchedulerError {
        let error = error(task.task_id);
        self.events
            .emit(JobEvent::task_failure(&self.name, &task, error.to_string()));
        error
    }

    /// Two-phase scheduling, phase one: serve a data-local task from the
    /// least-loaded available node, or fall back to the no-preference
    /// bucket via victim selection. Returns `NoLocal` only when there is
    /// neither data-local nor no-preference work for this node set.
    pub fn schedule_local(&mut self, available: Vec<NodeName>) -> Decision {
        let local_pick = available
            .iter()
            .filter(|node| self.store.queued_at(node) > 0)
            .min_by_key(|node| self.store.queued_at(node))
            .cloned();
        if let Some(node) = local_pick {
            if let Some(task) = self.store.pop_head(&Pref::Node(node.clone())) {
                tracing::debug!(job = %self.name, %node, task_id = task.task_id, "Scheduled data-local task");
                return Decision::Run { node, task };
            }
        }
        if self.store.nopref().is_empty() {
            Decision::NoLocal
        } else {
            self.pop_and_switch_node(vec![Pref::NoPref], &available)
        }
    }

    /// Phase two, after the arbiter computed the cross-job empty-node set:
    /// displace a task from the busiest bucket onto one of the free nodes.
    pub fn schedule_remote(&mut self, free: Vec<NodeName>) -> Decision {
        let candidates = self.store.occupied_nodes();
        self.pop_and_switch_node(candidates, &free)
    }

    /// Victim selection: pick the busiest bucket among `keys`, try to move
    /// its head task to an admissible node in `available`, and fall back
    /// to a linear walk when the head cannot be placed. At most one task
    /// leaves the store, atomically with the returned decision.
    fn pop_and_switch_node(&mut self, keys: Vec<Pref>, available: &[NodeName]) -> Decision {
        if available.is_empty() {
            return Decision::NoNodes;
        }
        let Some(victim) = self.store.busiest(&keys) else {
            return Decision::NoNodes;
        };
        let target = self
            .store
            .peek_head(&victim)
            .and_then(|task| choose_node(task, available))
            .cloned();
        match target {
            Some(node) => match self.store.pop_head(&victim) {
                Some(task) => {
                    tracing::debug!(
                        job = %self.name,
                        from = %victim,
                        to = %node,
                        task_id = task.task_id,
                        "Moved task off its preferred bucket"
                    );
                    Decision::Run { node, task }
                }
                None => Decision::NoNodes,
            },
            None => self.pop_suitable(&keys, available),
        }
    }

    /// Linear fallback: the first task across `keys` (bucket order, then
    /// queue order) with an admissible placement in `available`.
    fn pop_suitable(&mut self, keys: &[Pref], available: &[NodeName]) -> Decision {
        for key in keys {
            let Some(bucket) = self.store.bucket(key) else {
                continue;
            };
            let found = bucket.iter().enumerate().find_map(|(index, task)| {
                choose_node(task, available).map(|node| (index, node.clone()))
            });
            if let Some((index, node)) = found {
                if let Some(task) = self.store.remove_at(key, index) {
                    tracing::debug!(
                        job = %self.name,
                        from = %key,
                        to = %node,
                        task_id = task.task_id,
                        "Moved task off its preferred bucket"
                    );
                    return Decision::Run { node, task };
                }
            }
        }
        Decision::NoNodes
    }

    /// Cluster-topology reassignment: drop the buckets of departed nodes
    /// and re-place their tasks against the new membership. Placement is
    /// locality-driven with a random tiebreak when several input hosts
    /// survive, so the synthesized stats pair each input with a uniform
    /// load in [1, 100].
    pub fn update_nodes(&mut self, new_nodes: Vec<NodeName>) -> Result<()> {
        let live: HashSet<NodeName> = new_nodes.iter().cloned().collect();
        let orphaned = self.store.drain_departed(&live);
        tracing::info!(
            job = %self.name,
            nodes = new_nodes.len(),
            reassigned = orphaned.len(),
            "Cluster membership updated"
        );
        self.nodes = new_nodes;
        let mut rng = rand::thread_rng();
        for task in orphaned {
            let stats = task
                .inputs
                .iter()
                .map(|input| NodeLoad::new(rng.gen_range(1..=100), input.clone()))
                .collect();
            self.assign_task(task, stats)?;
        }
        Ok(())
    }

    pub(crate) fn emit_stopped(&self, reason: &str) {
        self.events.emit(JobEvent::stopped(
            &self.name,
            format!("scheduler stopped: {}", reason),
        ));
    }
}
