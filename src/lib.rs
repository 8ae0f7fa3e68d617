//! Per-job fair scheduler actor for a distributed data-processing cluster.
//!
//! One [`scheduler::JobScheduler`] runs per live job, owned by the
//! cluster-wide fairness arbiter. Given the currently idle worker nodes it
//! returns the best pending task from its job, honoring data locality,
//! force-local/force-remote constraints and per-task blacklists. The
//! arbiter-side scheduling round that fans out to peer job actors lives in
//! [`arbiter`].

pub mod arbiter;
pub mod config;
pub mod error;
pub mod event;
pub mod scheduler;
