use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::media;
use crate::encode::ffmpeg::{concat_audio_reencode, ensure_parent_dir, stamp_chapter_metadata};
use crate::foundation::core::format_hms;
use crate::foundation::error::{PodwaveError, PodwaveResult};
use crate::timeline::builder::{
    SegmentSpec, Timeline, build_timeline, placeholder_timeline, render_ffmetadata,
};

/// Parsed concatenation manifest: the ordered source files for one merge.
///
/// Format: one entry per line, each line exactly `file <path>` (quotes around
/// the path optional). Blank lines are ignored; any other non-blank line
/// invalidates the whole manifest.
#[derive(Clone, Debug)]
pub struct ConcatManifest {
    /// Source files in merge order.
    pub entries: Vec<PathBuf>,
}

impl ConcatManifest {
    /// Read and parse a manifest file.
    pub fn parse(path: &Path) -> PodwaveResult<Self> {
        if !path.exists() {
            return Err(PodwaveError::validation(format!(
                "concat manifest '{}' does not exist",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read concat manifest '{}'", path.display()))?;
        Self::from_text(&content)
    }

    /// Parse manifest text.
    pub fn from_text(content: &str) -> PodwaveResult<Self> {
        let mut entries = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(rest) = line.strip_prefix("file ") else {
                return Err(PodwaveError::validation(format!(
                    "manifest line '{line}' does not follow format 'file PATH'"
                )));
            };
            let path = rest.trim().trim_matches(|c| c == '\'' || c == '"');
            if path.is_empty() {
                return Err(PodwaveError::validation(format!(
                    "manifest line '{line}' names an empty path"
                )));
            }
            entries.push(PathBuf::from(path));
        }

        if entries.is_empty() {
            return Err(PodwaveError::validation(
                "concat manifest contains no entries",
            ));
        }
        Ok(Self { entries })
    }

    /// Check that every entry references an existing file.
    pub fn validate_sources(&self) -> PodwaveResult<()> {
        for entry in &self.entries {
            if !entry.is_file() {
                return Err(PodwaveError::validation(format!(
                    "manifest entry '{}' does not exist",
                    entry.display()
                )));
            }
        }
        Ok(())
    }
}

/// Options for [`concat_audio`].
#[derive(Clone, Debug)]
pub struct ConcatOpts {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u16,
    /// Output bitrate passed to the encoder.
    pub bitrate: String,
    /// Estimated-vs-measured duration mismatch above this is logged as drift.
    pub drift_tolerance_secs: f64,
}

impl Default for ConcatOpts {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            bitrate: "192k".to_owned(),
            drift_tolerance_secs: 1.0,
        }
    }
}

/// Merge the clips named by `manifest_path` into one track at `out_path`,
/// stamping chapter metadata and writing the `_segments.json` sidecar.
///
/// Chapter stamping is a strict two-phase protocol: a placeholder metadata
/// file is written before the merge, then overwritten with offsets computed
/// from per-source probed durations once the merge tool has run. The
/// authoritative timeline is always the second pass.
///
/// Validation failures and subprocess failures return `Err` before anything
/// reaches `out_path`; intermediate artifacts of a failed run are left in
/// place for inspection. Duration drift beyond the tolerance (re-encoding can
/// shift timestamps slightly) is logged as a warning, not a failure.
pub fn concat_audio(
    manifest_path: &Path,
    out_path: &Path,
    opts: &ConcatOpts,
) -> PodwaveResult<Timeline> {
    let manifest = ConcatManifest::parse(manifest_path)?;
    manifest.validate_sources()?;

    if !media::is_ffmpeg_on_path() {
        return Err(PodwaveError::encode(
            "ffmpeg is required for audio concatenation, but was not found on PATH",
        ));
    }
    if !media::is_ffprobe_on_path() {
        return Err(PodwaveError::media(
            "ffprobe is required for duration probing, but was not found on PATH",
        ));
    }
    ensure_parent_dir(out_path)?;

    let metadata_path = append_suffix(manifest_path, ".metadata");
    let temp_output = append_suffix(out_path, ".temp.mp3");

    // Phase one: placeholder chapters so the metadata file shape exists
    // before real offsets are known.
    let placeholder = placeholder_timeline(&manifest.entries);
    write_metadata(&metadata_path, &placeholder)?;

    tracing::info!(
        entries = manifest.entries.len(),
        out = %out_path.display(),
        "concatenating audio clips"
    );
    concat_audio_reencode(
        manifest_path,
        opts.sample_rate,
        opts.channels,
        &opts.bitrate,
        &temp_output,
    )?;

    // Phase two: authoritative offsets from measured per-source durations.
    let mut specs = Vec::with_capacity(manifest.entries.len());
    for entry in &manifest.entries {
        specs.push(SegmentSpec {
            path: entry.clone(),
            duration_secs: media::probe_duration_secs(entry)?,
        });
    }
    let timeline = build_timeline(&specs);
    write_metadata(&metadata_path, &timeline)?;

    stamp_chapter_metadata(&temp_output, &metadata_path, out_path)?;

    // Success-path cleanup only; failed runs keep their intermediates.
    let _ = std::fs::remove_file(&temp_output);
    let _ = std::fs::remove_file(&metadata_path);

    let measured = media::probe_duration_secs(out_path)?;
    let drift = (measured - timeline.total_duration_secs).abs();
    if drift > opts.drift_tolerance_secs {
        tracing::warn!(
            estimated = %format_hms(timeline.total_duration_secs),
            measured = %format_hms(measured),
            "merged duration drifted from estimate; segment timestamps may be inexact after re-encoding"
        );
    }

    let sidecar = timeline.write_sidecar(out_path)?;
    tracing::info!(
        total = %format_hms(timeline.total_duration_secs),
        sidecar = %sidecar.display(),
        "merged audio with chapter markers"
    );

    Ok(timeline)
}

fn write_metadata(path: &Path, timeline: &Timeline) -> PodwaveResult<()> {
    std::fs::write(path, render_ffmetadata(&timeline.chapters()))
        .with_context(|| format!("write chapter metadata '{}'", path.display()))?;
    Ok(())
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = OsString::from(path.as_os_str());
    os.push(suffix);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_strips_quotes() {
        let manifest = ConcatManifest::from_text(
            "file 'clips/a.mp3'\n\nfile \"clips/b.mp3\"\nfile clips/c.mp3\n",
        )
        .unwrap();
        assert_eq!(
            manifest.entries,
            vec![
                PathBuf::from("clips/a.mp3"),
                PathBuf::from("clips/b.mp3"),
                PathBuf::from("clips/c.mp3"),
            ]
        );
    }

    #[test]
    fn empty_manifest_is_rejected() {
        let err = ConcatManifest::from_text("\n   \n").unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }

    #[test]
    fn malformed_line_invalidates_whole_manifest() {
        let err =
            ConcatManifest::from_text("file a.mp3\nbad_line_without_prefix\nfile b.mp3\n")
                .unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
        assert!(err.to_string().contains("bad_line_without_prefix"));
    }

    #[test]
    fn missing_manifest_file_is_rejected() {
        let err = ConcatManifest::parse(Path::new("/nonexistent/podwave/list.txt")).unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }

    #[test]
    fn missing_source_fails_validation_before_any_merge() {
        let manifest = ConcatManifest::from_text("file /nonexistent/podwave/a.mp3\n").unwrap();
        let err = manifest.validate_sources().unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
    }

    #[test]
    fn concat_audio_rejects_bad_manifest_without_invoking_ffmpeg() {
        // A manifest with a malformed line never reaches the merge tool; the
        // output path stays untouched.
        let dir = std::env::temp_dir().join("podwave_concat_reject_test");
        std::fs::create_dir_all(&dir).unwrap();
        let manifest_path = dir.join("list.txt");
        std::fs::write(&manifest_path, "bad_line_without_prefix\n").unwrap();
        let out_path = dir.join("merged.mp3");

        let err = concat_audio(&manifest_path, &out_path, &ConcatOpts::default()).unwrap_err();
        assert!(matches!(err, PodwaveError::Validation(_)));
        assert!(!out_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn append_suffix_keeps_full_name() {
        assert_eq!(
            append_suffix(Path::new("out/episode.mp3"), ".temp.mp3"),
            PathBuf::from("out/episode.mp3.temp.mp3")
        );
    }
}
