//! The arbiter-side half of a scheduling round.
//!
//! The fan-out to peer job actors runs here, in the arbiter's context,
//! never inside a job actor's handler: actor-to-actor synchronous calls
//! must not form a cycle.

use crate::error::SchedulerError;
use crate::scheduler::actor::JobSchedulerHandle;
use crate::scheduler::state::Decision;
use crate::scheduler::task::NodeName;

/// Run one scheduling round for `job` against the other live jobs.
///
/// Phase one asks the job for a data-local placement. On `NoLocal` the
/// round falls back to phase two: the nodes every peer job is willing to
/// surrender are intersected and offered for remote execution. A job that
/// misses its deadline is asked to die and the round reports `NoNodes`.
pub async fn schedule(
    job: &JobSchedulerHandle,
    peers: &[JobSchedulerHandle],
    available: Vec<NodeName>,
) -> Decision {
    let local = match job.schedule_local(available.clone()).await {
        Ok(decision) => decision,
        Err(error) => return no_decision(job, error),
    };
    if local != Decision::NoLocal {
        return local;
    }
    let free = cross_job_empty_nodes(peers, available).await;
    match job.schedule_remote(free).await {
        Ok(decision) => decision,
        Err(error) => no_decision(job, error),
    }
}

/// Intersect the empty-node answers of `peers`, starting from `available`.
///
/// Peers are asked one at a time under the short peer deadline. A peer
/// that is late or gone is skipped and the set passes through unfiltered;
/// one wedged job must not stall the whole scheduler.
pub async fn cross_job_empty_nodes(
    peers: &[JobSchedulerHandle],
    available: Vec<NodeName>,
) -> Vec<NodeName> {
    let mut free = available;
    for peer in peers {
        if free.is_empty() {
            break;
        }
        match peer.empty_nodes(free.clone()).await {
            Ok(nodes) => free = nodes,
            Err(error) => {
                tracing::warn!(%error, "Peer job skipped during empty-node fan-out");
            }
        }
    }
    free
}

fn no_decision(job: &JobSchedulerHandle, error: SchedulerError) -> Decision {
    if matches!(error, SchedulerError::Deadline(_)) {
        tracing::error!(%error, "Job scheduler missed its deadline, asking it to die");
        job.die("schedule request timed out");
    } else {
        tracing::warn!(%error, "Job scheduler unavailable, no decision");
    }
    Decision::NoNodes
}
