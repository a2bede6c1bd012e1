//! Service layer: the command sink shared by all sessions.

pub mod command_sink;

pub use command_sink::CommandSink;
