//! Mirror a GitHub project's releases onto a NomadNet node.
//!
//! A periodic sync writes `releases.json` for the page templates and caches
//! one asset per release in the node's file storage. Page processes record
//! downloads in `download_counts.json` through [`counter::CounterStore`].

pub mod cli;
pub mod config;
pub mod counter;
pub mod download;
pub mod downloader;
pub mod filter;
pub mod model;
pub mod normalizer;
pub mod provider;
pub mod store;
pub mod sync;
