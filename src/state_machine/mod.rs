mod state;
mod task;

pub use state::{TallyOutcome, TaskEvent, TaskState, TaskStateMachine};
pub use task::{LogAction, Task, TaskLog, TaskScope, VerificationMode};
