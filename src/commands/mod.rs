pub mod catalog;
pub mod dispatch;
pub mod envelope;
pub mod registry;

pub use catalog::{command_ids, ArgSpec, ArgType, CommandSpec};
pub use dispatch::Dispatcher;
pub use envelope::{CommandErrorBody, CommandResult, ErrorKind, HandlerFailure, HandlerOutput};
pub use registry::{CommandHandler, CommandRegistry, RegistryError};
