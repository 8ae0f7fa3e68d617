pub mod actor;
pub mod placement;
pub mod state;
pub mod store;
pub mod task;

pub use actor::{JobMessage, JobScheduler, JobSchedulerHandle, WorkerHandle};
pub use state::{Decision, JobState, JobStats};
pub use store::{Bucket, Pref, TaskStore};
pub use task::{NodeLoad, NodeName, Task, TaskInput};
