//! Subcommand implementations. Each `run` returns `Ok(true)` when the run
//! passed.

pub mod check;
pub mod init;
pub mod list_rules;
pub mod output;
pub mod test_config;
