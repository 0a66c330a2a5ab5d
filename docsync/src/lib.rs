pub mod cli;
pub mod generate;
pub mod load_config;
pub mod store;

pub use cli::{run, Cli};
