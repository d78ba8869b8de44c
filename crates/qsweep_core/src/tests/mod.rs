//! Integration tests for the sweep engine
//!
//! Tests are organized by topic:
//! - `engine` - Run order, result shapes, selective recomputation and broadcasting
//! - `invalidation` - Dispatch suppression and staleness tracking
//! - `views` - Selections, spectral data extraction and lookup queries
//! - `custom` - Custom sweep generators
//! - `stored` - Records, serialization and stored sweeps
//! - `parallel` - Worker pool dispatch

mod common;
mod engine;
