//! Command channel for herald.
//!
//! The chat-platform gateway is an external collaborator: whatever the
//! transport, it parses a line into a [`Command`], submits it through a
//! [`CommandSender`], and relays the acknowledgment text back to the
//! issuer. The [`CommandChannel`] actor owns the receiving side and is the
//! only writer of the schedule besides startup configuration.

mod channel;
mod command;
mod error;

pub use channel::{CommandChannel, CommandRequest, CommandSender, ProbeFn, ProviderLiveness, command_channel};
pub use command::Command;
pub use error::GatewayError;
