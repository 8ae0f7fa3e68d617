use crate::scheduler::task::{NodeName, Task};

/// Placement-feasibility predicate: an admissible node for `task` among
/// `available`, or `None`.
///
/// Forced-local tasks are never moved to another node, so they are refused
/// outright. Blacklisted nodes are stripped; forced-remote tasks
/// additionally refuse every node hosting one of their inputs. "First" is
/// defined on the caller-provided order of `available`; callers that need
/// load-aware target selection pre-sort their input.
pub fn choose_node<'a>(task: &Task, available: &'a [NodeName]) -> Option<&'a NodeName> {
    if task.force_local {
        return None;
    }
    let mut candidates = available.iter().filter(|node| !task.blacklist.contains(*node));
    if task.force_remote {
        candidates.find(|node| !task.is_input_host(node))
    } else {
        candidates.next()
    }
}
