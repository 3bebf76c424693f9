//! xdp-acld: host side of the XDP ACL classifier.
//!
//! Loads a JSON rules file through the control plane, publishes the
//! resulting store to classification workers and runs offline
//! classification or packed dumps from the command line.

pub mod app;
pub mod cli;
pub mod config;
pub mod dump;
pub mod frames;
pub mod logging;
pub mod worker;

pub use config::{ConfigError, DaemonConfig};
pub use worker::{ClassifyReport, ClassifyStats, SnapshotPublisher, WorkerError, WorkerPool};
