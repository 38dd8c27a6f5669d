//! CLI command implementations.

mod add_example;
mod config;
mod doctor;
mod examples;
mod serve;
mod summarize;

pub use add_example::run_add_example;
pub use config::run_config;
pub use doctor::run_doctor;
pub use examples::run_examples;
pub use serve::run_serve;
pub use summarize::{run_summarize, SummarizeOptions};
