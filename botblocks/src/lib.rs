pub mod block;
pub mod hover;
pub mod parser;
pub mod path;
pub mod program;

pub use block::{Block, BlockError, BlockKind, Category, Param, Params, WheelMotion};
pub use path::Path;
pub use program::{EditError, NodeId, NodeRef, Program};
