mod queue;
mod registry;

pub use queue::{DispatchError, Job, JobDispatcher, JobReceiver};
pub use registry::{JobError, JobRegistry, JobStatus, ParseStatusError};
