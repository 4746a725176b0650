pub mod config;
pub mod flow;
pub mod paths;

pub use config::{ConfigError, Credentials, Environment, Overrides, Project, Settings};
pub use flow::{PublishedPage, copy_page_plan, run_copy_flow};
