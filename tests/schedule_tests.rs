//! Integration tests for planning and scheduling: analysis → music
//! structure → flat timeline.

use gomusic::planner::{LYDIAN_SCALE, MAJOR_SCALE};
use gomusic::{
    analyze_file, compose, flatten, preview, schedule_to_json, structure_to_json, GameAnalysis,
    GamePhase, PitchClass, ScheduleOptions, SectionType, Voice,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn sample(name: &str) -> GameAnalysis {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name);
    analyze_file(&path).unwrap_or_else(|e| panic!("Failed to analyze {name}: {e}"))
}

// ═══════════════════════════════════════════════════════════════════════
// Planning
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn simple_game_global_parameters() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());

    // Balanced territory, moderate aggression
    assert_eq!(music.key, PitchClass::G);
    assert_eq!(music.scale, MAJOR_SCALE);
    assert_eq!(music.tempo, 130);
}

#[test]
fn preview_agrees_with_the_plan() {
    let analysis = sample("simple.sgf");
    let music = compose(&analysis, &ScheduleOptions::default());
    let p = preview(&analysis);

    assert_eq!(p.key, music.key);
    assert_eq!(p.scale, music.scale);
    assert_eq!(p.tempo, music.tempo);
    assert_eq!(p.characteristics.phase, GamePhase::Opening);
    assert_eq!(p.characteristics.aggression, analysis.aggression_level);
}

#[test]
fn long_game_has_three_sections() {
    let music = compose(&sample("long_game.sgf"), &ScheduleOptions::default());

    let sections: Vec<(SectionType, f64, usize)> = music
        .sections
        .iter()
        .map(|s| (s.section_type, s.duration_seconds, s.melody.len()))
        .collect();
    assert_eq!(
        sections,
        vec![
            (SectionType::Opening, 10.0, 20),
            (SectionType::Middle, 40.0, 80),
            (SectionType::Ending, 56.0, 112),
        ]
    );
    assert_eq!(music.total_duration_seconds(), 106.0);

    // Over 200 moves slows the piece down
    assert_eq!(music.tempo, 110);
}

#[test]
fn empty_game_gets_the_fallback_section() {
    let music = compose(&sample("empty.sgf"), &ScheduleOptions::default());

    assert_eq!(music.key, PitchClass::G);
    assert_eq!(music.scale, LYDIAN_SCALE);
    assert_eq!(music.tempo, 110);
    assert_eq!(music.sections.len(), 1);

    let section = &music.sections[0];
    assert_eq!(section.section_type, SectionType::Fallback);
    assert_eq!(section.duration_seconds, 2.0);
    assert_eq!(section.melody.len(), 4);
    assert_eq!(section.pads.len(), 1);
    // Tengen and (12, 6) are close enough to the center to add a hit
    assert_eq!(section.percussion.len(), 2);
}

// ═══════════════════════════════════════════════════════════════════════
// Voices
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn simple_game_voice_counts() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());
    assert_eq!(music.sections.len(), 1);

    let section = &music.sections[0];
    assert_eq!(section.section_type, SectionType::Opening);
    assert_eq!(section.duration_seconds, 6.0);
    assert_eq!(section.melody.len(), 12);
    assert_eq!(section.bass.len(), 12);
    assert_eq!(section.pads.len(), 3);
    assert_eq!(section.percussion.len(), 1);

    // The only hit is B[jj], the seventh move
    assert_eq!(section.percussion[0].start_offset_seconds, 3.0);
    assert_eq!(section.percussion[0].velocity, 1.0);
}

#[test]
fn bass_follows_the_key() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());
    let section = &music.sections[0];

    for (melody, bass) in section.melody.iter().zip(&section.bass) {
        assert_eq!(bass.pitch, "G2");
        assert_eq!(bass.start_offset_seconds, melody.start_offset_seconds);
        assert_eq!(bass.duration_seconds, melody.duration_seconds * 2.0);
        assert!((bass.velocity - 0.7).abs() < 1e-12);
    }
}

#[test]
fn melody_velocity_is_flat_by_default() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());
    assert!(music.sections[0].melody.iter().all(|n| n.velocity == 1.0));
}

#[test]
fn weighted_velocity_favours_the_center() {
    let options = ScheduleOptions {
        weighted_melody_velocity: true,
    };
    let music = compose(&sample("simple.sgf"), &options);
    let melody = &music.sections[0].melody;

    assert!(melody.iter().all(|n| (0.1..=1.0).contains(&n.velocity)));
    // B[jj] (tengen) is louder than B[pd] (the opening 4-4 point)
    assert!(melody[6].velocity > melody[0].velocity);
}

// ═══════════════════════════════════════════════════════════════════════
// Timeline
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn flatten_offsets_later_sections() {
    let music = compose(&sample("long_game.sgf"), &ScheduleOptions::default());
    let timeline = flatten(&music);

    let total: usize = music.sections.iter().map(|s| s.note_count()).sum();
    assert_eq!(timeline.len(), total);

    let melody_starts: Vec<f64> = timeline
        .iter()
        .filter(|n| n.voice == Voice::Melody)
        .map(|n| n.start_seconds)
        .collect();
    assert_eq!(melody_starts.len(), 212);
    assert_eq!(melody_starts[19], 9.5);
    // First middle-section move starts where the opening ends
    assert_eq!(melody_starts[20], 10.0);
    assert_eq!(melody_starts[100], 50.0);
    assert_eq!(melody_starts[211], 105.5);
}

#[test]
fn composing_is_deterministic() {
    let analysis = sample("long_game.sgf");
    let first = structure_to_json(&compose(&analysis, &ScheduleOptions::default())).unwrap();
    let second = structure_to_json(&compose(&analysis, &ScheduleOptions::default())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn structure_json_uses_contract_names() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());
    let value: serde_json::Value =
        serde_json::from_str(&structure_to_json(&music).unwrap()).unwrap();

    assert_eq!(value["key"], "G");
    assert_eq!(value["tempo"], 130);
    assert_eq!(value["scale"][3], "F");
    assert_eq!(value["sections"][0]["type"], "opening");
    assert!(value["sections"][0]["melody"][0].get("durationSeconds").is_some());
    assert!(value["sections"][0]["melody"][0].get("startOffsetSeconds").is_some());
}

#[test]
fn schedule_json_lists_absolute_times() {
    let music = compose(&sample("simple.sgf"), &ScheduleOptions::default());
    let timeline = flatten(&music);
    let value: serde_json::Value =
        serde_json::from_str(&schedule_to_json(&timeline).unwrap()).unwrap();

    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 28);
    assert_eq!(entries[0]["voice"], "melody");
    assert_eq!(entries[0]["startSeconds"], 0.0);
    assert_eq!(entries[11]["startSeconds"], 5.5);
    assert_eq!(entries[12]["voice"], "bass");
    assert_eq!(entries[12]["note"]["pitch"], "G2");
}
