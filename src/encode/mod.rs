//! Encoding sinks and `ffmpeg` container operations.
//!
//! Sinks consume rendered frames in timeline order; the scheduler guarantees
//! strictly increasing frame indexes at this boundary.

/// `ffmpeg`-based sink and container operations (mux, extract, concat).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
