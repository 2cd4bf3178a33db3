//! bcmaps: Business Capability Map Listener
//!
//! Keeps a published JSON snapshot of the business capability hierarchy in
//! sync with the fact sheet repository. Change events arrive over a webhook; a
//! transaction guard decides which ones trigger a rebuild, and each rebuild is
//! unrolled into nested maps and optionally uploaded to a file host.

pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod guard;
pub mod logging;
pub mod pipeline;
pub mod publish;
pub mod query;
pub mod server;
pub mod snapshot;
pub mod tree;
pub mod upstream;
