// THEORY:
// This file is the main entry point for the `topiko` library crate.
// It defines the public API used by the HTTP server and the command-line
// tester: the `DirectoryPipeline` for one-shot, synchronous view generation and
// the `ViewCoordinator` for async, cancellable, generation-ordered refreshes.
//
// The geometry and filtering stages live in `core_modules`. They are plain
// functions over slices of `Listing`s and hold no state between calls, which is
// what lets the coordinator fan requests out to a worker pool.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod sources;

pub use config::PipelineConfig;
pub use core_modules::cluster_engine::MapPoint;
pub use core_modules::listing::{Coords, Language, Listing};
pub use error::{LocationError, Result, TopikoError};
pub use parallel_pipeline::{PublishedView, ViewCoordinator};
pub use pipeline::{DirectoryPipeline, DirectoryView, ViewMode, ViewRequest};
