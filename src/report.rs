//! The error-report tree produced by the builder.

mod display;
mod frame;
mod iter;
mod node;

pub use self::{
    frame::{NO_FRAMES_FILE_NAME, StackFrame},
    iter::NodeIter,
    node::{CauseLink, ErrorNode},
};
