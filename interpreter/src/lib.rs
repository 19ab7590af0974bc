pub mod channel;
pub mod command;
pub mod control;
pub mod error;
pub mod executor;
pub mod safety;
pub mod timing;

pub use channel::{CommandChannel, Published, RecordingChannel};
pub use command::{ActuatorTarget, Command, Twist, Vector3};
pub use control::{Interpreter, RunHandle, RunState};
pub use error::{ConfigError, RunError};
pub use executor::{ExecutionContext, RunOutcome, RunReport, execute_program};
pub use safety::is_risky_transition;
pub use timing::Timing;
