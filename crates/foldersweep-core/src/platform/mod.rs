/// Platform-specific functionality: the OS directory-listing command
/// used as the fast size tier.

pub mod dir_command;

pub use dir_command::{dir_command_total, parse_dir_total};
