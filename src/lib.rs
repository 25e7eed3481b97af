//! lineprof - line-by-line execution statistics
//!
//! This library provides the pieces of a line profiler: the statistics
//! model, a wrapper that switches per-line counting on around calls and
//! generator resumptions, and renderers that turn a snapshot into annotated
//! text or heat-mapped HTML. Snapshots can be saved and re-rendered later
//! by the `lineprof` binary.

pub mod cli;
pub mod engine;
pub mod heat;
pub mod html_output;
pub mod instrument;
pub mod persistence;
pub mod report;
pub mod source;
pub mod stats;
pub mod text_output;
pub mod time_format;
