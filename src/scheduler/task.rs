use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Worker-node identity. Nodes are compared by name wherever an ordering
/// is needed to break ties.
pub type NodeName = String;

/// One replica of a task's input data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub url: String,
    pub host: NodeName,
}

impl TaskInput {
    pub fn new(url: impl Into<String>, host: impl Into<NodeName>) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
        }
    }
}

/// Pending task descriptor produced by the job coordinator.
///
/// `inputs` is non-empty; multiple entries denote redundant replicas.
/// `force_local` and `force_remote` are never both set. `chosen_input` is
/// bound when the task is placed into a bucket and may be rewritten when
/// the task is moved by the reassignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: u64,
    pub mode: String,
    pub inputs: Vec<TaskInput>,
    pub blacklist: HashSet<NodeName>,
    pub force_local: bool,
    pub force_remote: bool,
    pub chosen_input: Option<String>,
}

impl Task {
    pub fn new(task_id: u64, mode: impl Into<String>, inputs: Vec<TaskInput>) -> Self {
        Self {
            task_id,
            mode: mode.into(),
            inputs,
            blacklist: HashSet::new(),
            force_local: false,
            force_remote: false,
            chosen_input: None,
        }
    }

    pub fn with_blacklist(mut self, nodes: impl IntoIterator<Item = NodeName>) -> Self {
        self.blacklist.extend(nodes);
        self
    }

    pub fn force_local(mut self) -> Self {
        debug_assert!(!self.force_remote);
        self.force_local = true;
        self
    }

    pub fn force_remote(mut self) -> Self {
        debug_assert!(!self.force_local);
        self.force_remote = true;
        self
    }

    /// True if `node` hosts one of this task's input replicas.
    pub fn is_input_host(&self, node: &NodeName) -> bool {
        self.inputs.iter().any(|input| &input.host == node)
    }
}

/// One entry of the `node_stats` supplied alongside a new task: an opaque
/// load signal (smaller is less loaded) for the node hosting `input`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub load: u64,
    pub input: TaskInput,
}

impl NodeLoad {
    pub fn new(load: u64, input: TaskInput) -> Self {
        Self { load, input }
    }
}
