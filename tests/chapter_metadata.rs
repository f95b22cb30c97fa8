use std::path::PathBuf;

use podwave::SegmentSpec;
use podwave::timeline::builder::{build_timeline, placeholder_timeline, render_ffmetadata};

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
fn two_phase_metadata_goes_from_placeholder_to_authoritative() {
    let paths: Vec<PathBuf> = (0..2)
        .map(|i| PathBuf::from(format!("clips/part_{i}.mp3")))
        .collect();

    // Phase one: the metadata file shape exists before the merge, with
    // placeholder offsets.
    let tentative = render_ffmetadata(&placeholder_timeline(&paths).chapters());
    assert!(tentative.starts_with(";FFMETADATA1\n"));
    assert_eq!(tentative.matches("[CHAPTER]").count(), 2);
    assert_eq!(tentative.matches("START=0\n").count(), 2);
    assert_eq!(tentative.matches("END=0\n").count(), 2);

    // Phase two: measured durations overwrite the placeholders.
    let authoritative = render_ffmetadata(&build_timeline(&specs(&[2.0, 3.5])).chapters());
    assert!(authoritative.contains("START=0\nEND=2000\n"));
    assert!(authoritative.contains("START=2000\nEND=5500\n"));
    assert!(authoritative.contains("title=Segment 1: part_0.mp3\n"));
    assert!(authoritative.contains("title=Segment 2: part_1.mp3\n"));
    assert!(authoritative.contains("TIMEBASE=1/1000\n"));
}

#[test]
fn sidecar_round_trips_through_json() {
    let dir = std::env::temp_dir().join("podwave_sidecar_test");
    std::fs::create_dir_all(&dir).unwrap();
    let merged = dir.join("episode.mp3");

    let timeline = build_timeline(&specs(&[1.0, 2.0, 1.5]));
    let sidecar = timeline.write_sidecar(&merged).unwrap();
    assert_eq!(sidecar, dir.join("episode_segments.json"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&sidecar).unwrap()).unwrap();
    let segments = json.as_array().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[2]["index"], 2);
    assert_eq!(segments[2]["file"], "part_2.mp3");
    assert_eq!(segments[2]["start_time"], 3.0);
    assert_eq!(segments[2]["end_time"], 4.5);
    assert_eq!(segments[2]["start_formatted"], "00:00:03.000");
    assert_eq!(segments[2]["end_formatted"], "00:00:04.500");

    let _ = std::fs::remove_dir_all(&dir);
}
