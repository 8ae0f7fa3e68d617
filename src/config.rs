use std::time::Duration;

/// Tunables for one job scheduler actor and its callers.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Deadline for synchronous requests from the arbiter. On expiry the
    /// arbiter asks the actor to die and treats the round as "no decision".
    pub schedule_deadline: Duration,
    /// Deadline for `empty_nodes` queries against peer job actors. A late
    /// peer is skipped and the node set passes through unfiltered.
    pub peer_deadline: Duration,
    /// Mailbox depth of the actor.
    pub mailbox_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_deadline: Duration::from_secs(30),
            peer_deadline: Duration::from_millis(500),
            mailbox_capacity: 100,
        }
    }
}

impl SchedulerConfig {
    pub fn with_schedule_deadline(mut self, deadline: Duration) -> Self {
        self.schedule_deadline = deadline;
        self
    }

    pub fn with_peer_deadline(mut self, deadline: Duration) -> Self {
        self.peer_deadline = deadline;
        self
    }
}
