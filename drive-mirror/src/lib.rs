pub mod cli;
pub mod credentials;
pub mod github;
pub mod google_drive;
pub mod load_config;

pub use cli::{run, Cli, Commands};
