pub mod cli;

pub use cli::{run, run_from_env, CliError};
