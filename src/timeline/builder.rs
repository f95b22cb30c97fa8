use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::foundation::core::format_hms;
use crate::foundation::error::PodwaveResult;

/// One source clip with its standalone duration, before placement.
#[derive(Clone, Debug)]
pub struct SegmentSpec {
    /// Source file path.
    pub path: PathBuf,
    /// Standalone duration in seconds.
    pub duration_secs: f64,
}

/// One clip placed on the merged track. Computed once, immutable thereafter.
#[derive(Clone, Debug, Serialize)]
pub struct TimelineSegment {
    /// 0-based position in the merged track.
    pub index: usize,
    /// Source file name.
    pub file: String,
    /// Full source path.
    pub full_path: PathBuf,
    /// Standalone duration in seconds.
    pub original_duration: f64,
    /// Absolute start offset in the merged track, seconds.
    pub start_time: f64,
    /// Absolute end offset in the merged track, seconds.
    pub end_time: f64,
    /// `start_time` as `HH:MM:SS.mmm`.
    pub start_formatted: String,
    /// `end_time` as `HH:MM:SS.mmm`.
    pub end_formatted: String,
}

/// Authoritative list of per-segment absolute time offsets within a merged
/// track.
#[derive(Clone, Debug, Serialize)]
pub struct Timeline {
    /// Placed segments in merge order.
    pub segments: Vec<TimelineSegment>,
    /// Sum of all segment durations, seconds.
    pub total_duration_secs: f64,
}

/// A chapter record destined for container metadata, times in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chapter {
    /// 0-based chapter index.
    pub index: usize,
    /// Human-readable navigation title.
    pub title: String,
    /// Start offset in milliseconds.
    pub start_ms: u64,
    /// End offset in milliseconds.
    pub end_ms: u64,
}

/// Compute absolute segment offsets from an ordered list of clip durations.
///
/// `start_time[i]` is the sum of all earlier durations; pure accumulation.
pub fn build_timeline(specs: &[SegmentSpec]) -> Timeline {
    let mut segments = Vec::with_capacity(specs.len());
    let mut position = 0.0f64;

    for (index, spec) in specs.iter().enumerate() {
        let start_time = position;
        let end_time = start_time + spec.duration_secs;
        segments.push(TimelineSegment {
            index,
            file: file_name_of(&spec.path),
            full_path: spec.path.clone(),
            original_duration: spec.duration_secs,
            start_time,
            end_time,
            start_formatted: format_hms(start_time),
            end_formatted: format_hms(end_time),
        });
        position = end_time;
    }

    Timeline {
        segments,
        total_duration_secs: position,
    }
}

/// Tentative timeline with zero-duration placeholders.
///
/// First phase of the two-phase chapter stamping protocol: the metadata file
/// shape exists before the merge, then the authoritative timeline built from
/// measured durations overwrites it.
pub fn placeholder_timeline(paths: &[PathBuf]) -> Timeline {
    let specs: Vec<SegmentSpec> = paths
        .iter()
        .map(|p| SegmentSpec {
            path: p.clone(),
            duration_secs: 0.0,
        })
        .collect();
    build_timeline(&specs)
}

impl Timeline {
    /// Chapter records for container metadata, one per segment.
    pub fn chapters(&self) -> Vec<Chapter> {
        self.segments
            .iter()
            .map(|seg| Chapter {
                index: seg.index,
                title: format!("Segment {}: {}", seg.index + 1, seg.file),
                start_ms: secs_to_ms(seg.start_time),
                end_ms: secs_to_ms(seg.end_time),
            })
            .collect()
    }

    /// Write the machine-readable sidecar next to the merged output:
    /// `{stem}_segments.json`.
    pub fn write_sidecar(&self, merged_audio_path: &Path) -> PodwaveResult<PathBuf> {
        let sidecar = sidecar_path(merged_audio_path);
        let json = serde_json::to_string_pretty(&self.segments)
            .context("serialize segments timeline")?;
        std::fs::write(&sidecar, json)
            .with_context(|| format!("write segments sidecar '{}'", sidecar.display()))?;
        Ok(sidecar)
    }
}

/// Sidecar path for a merged output: same base name, suffixed `_segments`.
pub fn sidecar_path(merged_audio_path: &Path) -> PathBuf {
    let stem = merged_audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    merged_audio_path.with_file_name(format!("{stem}_segments.json"))
}

/// Render chapter records in ffmpeg metadata format: a fixed header line,
/// then repeated `[CHAPTER]` blocks with a millisecond timebase.
pub fn render_ffmetadata(chapters: &[Chapter]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    for ch in chapters {
        out.push_str("[CHAPTER]\nTIMEBASE=1/1000\n");
        out.push_str(&format!("START={}\n", ch.start_ms));
        out.push_str(&format!("END={}\n", ch.end_ms));
        out.push_str(&format!("title={}\n\n", ch.title));
    }
    out
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).max(0.0) as u64
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(durations: &[f64]) -> Vec<SegmentSpec> {
        durations
            .iter()
            .enumerate()
            .map(|(i, &d)| SegmentSpec {
                path: PathBuf::from(format!("clips/part_{i}.mp3")),
                duration_secs: d,
            })
            .collect()
    }

    #[test]
    fn offsets_accumulate_prefix_sums() {
        let timeline = build_timeline(&specs(&[2.0, 3.5, 1.25]));

        let starts: Vec<f64> = timeline.segments.iter().map(|s| s.start_time).collect();
        let ends: Vec<f64> = timeline.segments.iter().map(|s| s.end_time).collect();
        assert_eq!(starts, vec![0.0, 2.0, 5.5]);
        assert_eq!(ends, vec![2.0, 5.5, 6.75]);
        assert_eq!(timeline.total_duration_secs, 6.75);
    }

    #[test]
    fn segments_carry_names_and_formatted_offsets() {
        let timeline = build_timeline(&specs(&[2.0, 3.5]));
        let seg = &timeline.segments[1];
        assert_eq!(seg.index, 1);
        assert_eq!(seg.file, "part_1.mp3");
        assert_eq!(seg.start_formatted, "00:00:02.000");
        assert_eq!(seg.end_formatted, "00:00:05.500");
    }

    #[test]
    fn placeholder_timeline_is_all_zeroes() {
        let timeline =
            placeholder_timeline(&[PathBuf::from("a.mp3"), PathBuf::from("b.mp3")]);
        assert_eq!(timeline.segments.len(), 2);
        for seg in &timeline.segments {
            assert_eq!(seg.start_time, 0.0);
            assert_eq!(seg.end_time, 0.0);
        }
        assert_eq!(timeline.total_duration_secs, 0.0);
    }

    #[test]
    fn chapters_use_millisecond_offsets_and_one_based_titles() {
        let timeline = build_timeline(&specs(&[1.0, 2.5]));
        let chapters = timeline.chapters();
        assert_eq!(
            chapters[0],
            Chapter {
                index: 0,
                title: "Segment 1: part_0.mp3".to_owned(),
                start_ms: 0,
                end_ms: 1000,
            }
        );
        assert_eq!(chapters[1].start_ms, 1000);
        assert_eq!(chapters[1].end_ms, 3500);
    }

    #[test]
    fn ffmetadata_has_header_and_chapter_blocks() {
        let timeline = build_timeline(&specs(&[1.0]));
        let meta = render_ffmetadata(&timeline.chapters());
        assert!(meta.starts_with(";FFMETADATA1\n"));
        assert!(meta.contains("[CHAPTER]\nTIMEBASE=1/1000\nSTART=0\nEND=1000\n"));
        assert!(meta.contains("title=Segment 1: part_0.mp3\n"));
    }

    #[test]
    fn sidecar_path_appends_segments_suffix() {
        assert_eq!(
            sidecar_path(Path::new("out/episode.mp3")),
            PathBuf::from("out/episode_segments.json")
        );
    }

    #[test]
    fn sidecar_serializes_segment_fields() {
        let timeline = build_timeline(&specs(&[2.0]));
        let json = serde_json::to_value(&timeline.segments).unwrap();
        let seg = &json[0];
        assert_eq!(seg["index"], 0);
        assert_eq!(seg["file"], "part_0.mp3");
        assert_eq!(seg["original_duration"], 2.0);
        assert_eq!(seg["start_time"], 0.0);
        assert_eq!(seg["end_time"], 2.0);
        assert_eq!(seg["start_formatted"], "00:00:00.000");
        assert_eq!(seg["end_formatted"], "00:00:02.000");
    }
}
