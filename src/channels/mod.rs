//! Front ends that drive a conversation.

pub mod cli;

pub use cli::CliRunner;
