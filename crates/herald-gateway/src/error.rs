//! Error types for the command surface.

use thiserror::Error;

use herald_schedule::ScheduleError;

/// Errors that can occur parsing or routing commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The verb did not match any command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The command needs an argument that was not supplied.
    #[error("command '{0}' requires an argument")]
    MissingArgument(&'static str),

    /// The argument failed validation.
    #[error(transparent)]
    InvalidArgument(#[from] ScheduleError),

    /// The channel actor is gone; the daemon is shutting down.
    #[error("command channel closed")]
    ChannelClosed,
}
