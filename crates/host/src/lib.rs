//! Host side of the tool server: the tool catalog and the executor that
//! runs those tools on this machine.

pub mod catalog;
mod executor;
mod ollama;
pub mod process;

pub use executor::{HostConfig, HostExecutor, search_url};
