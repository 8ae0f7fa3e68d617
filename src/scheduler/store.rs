use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::scheduler::task::{NodeName, Task};

/// Bucket key: a worker node, or the no-preference sentinel for tasks with
/// no admissible data-local host. Ordering puts nodes in name order ahead
/// of the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pref {
    Node(NodeName),
    NoPref,
}

impl fmt::Display for Pref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pref::Node(node) => write!(f, "{}", node),
            Pref::NoPref => write!(f, "nopref"),
        }
    }
}

/// Per-node queue of pending tasks, newest at the front, plus a lifetime
/// counter of every task ever placed here.
///
/// `lifetime` is a historical load hint for the fairness arbiter, not the
/// number of active tasks: it grows on every push, never shrinks, and is
/// reset only when the bucket is rebuilt after a topology change.
#[derive(Debug, Default)]
pub struct Bucket {
    lifetime: u64,
    tasks: VecDeque<Task>,
}

impl Bucket {
    /// Number of tasks currently queued.
    pub fn queued(&self) -> usize {
        self.tasks.len()
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn push(&mut self, task: Task) {
        self.lifetime += 1;
        self.tasks.push_front(task);
    }

    pub fn peek(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn remove(&mut self, index: usize) -> Option<Task> {
        self.tasks.remove(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    fn into_tasks(self) -> VecDeque<Task> {
        self.tasks
    }
}

/// Mapping from placement preference to pending-task bucket. The
/// no-preference bucket always exists; per-node buckets are created lazily
/// on first placement and removed only when the node leaves the cluster.
#[derive(Debug, Default)]
pub struct TaskStore {
    nopref: Bucket,
    nodes: HashMap<NodeName, Bucket>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket(&self, key: &Pref) -> Option<&Bucket> {
        match key {
            Pref::Node(node) => self.nodes.get(node),
            Pref::NoPref => Some(&self.nopref),
        }
    }

    pub fn nopref(&self) -> &Bucket {
        &self.nopref
    }

    /// Tasks queued at `node`; zero when the bucket does not exist.
    pub fn queued_at(&self, node: &NodeName) -> usize {
        self.nodes.get(node).map(Bucket::queued).unwrap_or(0)
    }

    /// Total queued tasks across all buckets, no-preference included.
    pub fn queued_total(&self) -> usize {
        self.nopref.queued() + self.nodes.values().map(Bucket::queued).sum::<usize>()
    }

    pub fn push_task(&mut self, key: Pref, task: Task) {
        match key {
            Pref::Node(node) => self.nodes.entry(node).or_default().push(task),
            Pref::NoPref => self.nopref.push(task),
        }
    }

    pub fn peek_head(&self, key: &Pref) -> Option<&Task> {
        self.bucket(key).and_then(Bucket::peek)
    }

    pub fn pop_head(&mut self, key: &Pref) -> Option<Task> {
        match key {
            Pref::Node(node) => self.nodes.get_mut(node).and_then(Bucket::pop),
            Pref::NoPref => self.nopref.pop(),
        }
    }

    pub fn remove_at(&mut self, key: &Pref, index: usize) -> Option<Task> {
        match key {
            Pref::Node(node) => self.nodes.get_mut(node).and_then(|b| b.remove(index)),
            Pref::NoPref => self.nopref.remove(index),
        }
    }

    /// Keys of every per-node bucket with pending work, in name order.
    pub fn occupied_nodes(&self) -> Vec<Pref> {
        let mut keys: Vec<Pref> = self
            .nodes
            .iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(node, _)| Pref::Node(node.clone()))
            .collect();
        keys.sort();
        keys
    }

    /// Busiest bucket among `keys` (largest queue, ties to the smallest
    /// key in the caller's order). Empty and absent buckets are skipped.
    pub fn busiest(&self, keys: &[Pref]) -> Option<Pref> {
        let mut best: Option<(usize, &Pref)> = None;
        for key in keys {
            let queued = self.bucket(key).map(Bucket::queued).unwrap_or(0);
            if queued == 0 {
                continue;
            }
            match best {
                Some((most, _)) if most >= queued => {}
                _ => best = Some((queued, key)),
            }
        }
        best.map(|(_, key)| key.clone())
    }

    /// Drop the buckets of every node not in `live` and rebuild the
    /// no-preference bucket fresh, returning the orphaned tasks flattened
    /// in bucket-key order. Surviving per-node buckets keep their lifetime
    /// counters.
    pub fn drain_departed(&mut self, live: &HashSet<NodeName>) -> Vec<Task> {
        let mut departed: Vec<NodeName> = self
            .nodes
            .keys()
            .filter(|node| !live.contains(*node))
            .cloned()
            .collect();
        departed.sort();

        let mut orphaned = Vec::new();
        for node in departed {
            if let Some(bucket) = self.nodes.remove(&node) {
                orphaned.extend(bucket.into_tasks());
            }
        }
        orphaned.extend(std::mem::take(&mut self.nopref).into_tasks());
        orphaned
    }
}
