#![doc = "drive-mirror-core: core logic library for drive-mirror."]

//! This crate contains the data models and pipelines for mirroring files
//! between a Google Drive folder, a local directory and a GitHub repository.
//! Concrete HTTP clients and credential handling live in the `drive-mirror`
//! binary crate; everything here is written against the traits in [`contract`].
//!
//! # Usage
//! - [`download::materialize_tree`]: Drive folder → local directory
//! - [`mirror::mirror_repository`]: repository root → Drive folder
//! - [`selector`]: interactive folder selection and mapping file
//! - [`schedule`]: cron-driven re-runs

pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod export;
pub mod mirror;
pub mod schedule;
pub mod selector;

pub use error::SyncError;
