//! Audio data owned by render jobs.

/// Immutable mono audio tracks.
pub mod track;
