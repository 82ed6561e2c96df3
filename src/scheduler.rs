//! Score scheduling: turns each section's moves into note events for the
//! four voices and lays the sections end to end on one timeline.
//!
//! Move `i` of a section starts at `i * 0.5` seconds into the section and
//! a section lasts `moves * 0.5` seconds, so every voice's events are in
//! non-decreasing time order by construction.

use serde::{Deserialize, Serialize};

use crate::analyzer::aggression_proxy;
use crate::model::*;
use crate::planner::{SectionMoves, SECONDS_PER_MOVE};

/// Substituted for any pitch string that does not parse.
pub const SAFE_DEFAULT_PITCH: &str = "C4";

const BASS_OCTAVE: i32 = 2;
const BASS_VELOCITY_RATIO: f64 = 0.7;

const PAD_INTERVAL: usize = 4;
const PAD_OCTAVE: i32 = 4;
const PAD_DURATION: f64 = 2.0;
const PAD_VELOCITY: f64 = 0.3;

const PERCUSSION_PITCH: &str = "C2";
const PERCUSSION_DURATION: f64 = 0.1;
const PERCUSSION_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// Use the distance-weighted melody velocity instead of the fixed 1.0.
    pub weighted_melody_velocity: bool,
}

/// Fill the structure's sections with notes using the default options.
pub fn schedule(structure: MusicStructure, sections: &[SectionMoves]) -> MusicStructure {
    schedule_with(structure, sections, &ScheduleOptions::default())
}

/// Rebuild every section from its moves, keeping the structure's key,
/// scale and tempo.
pub fn schedule_with(
    structure: MusicStructure,
    sections: &[SectionMoves],
    options: &ScheduleOptions,
) -> MusicStructure {
    let built: Vec<Section> = sections
        .iter()
        .map(|s| build_section(s, &structure.scale, structure.key, options))
        .collect();

    log::debug!(
        "scheduled {} notes across {} section(s)",
        built.iter().map(Section::note_count).sum::<usize>(),
        built.len()
    );
    MusicStructure {
        sections: built,
        ..structure
    }
}

/// Generate the four voices for one section.
pub fn build_section(
    moves: &SectionMoves,
    scale: &[PitchClass; 7],
    key: PitchClass,
    options: &ScheduleOptions,
) -> Section {
    let mut section = Section::empty(moves.section_type, moves.duration_seconds());

    for (index, feature) in moves.moves.iter().enumerate() {
        let start = index as f64 * SECONDS_PER_MOVE;
        let duration = melody_duration(feature);
        let velocity = melody_velocity(feature, options);

        section.melody.push(NoteEvent {
            pitch: safe_pitch(melody_pitch(feature, index, scale)),
            duration_seconds: duration,
            velocity,
            start_offset_seconds: start,
        });

        section.bass.push(NoteEvent {
            pitch: safe_pitch(key.with_octave(BASS_OCTAVE)),
            duration_seconds: duration * 2.0,
            velocity: velocity * BASS_VELOCITY_RATIO,
            start_offset_seconds: start,
        });

        if index % PAD_INTERVAL == 0 {
            section.pads.push(NoteEvent {
                pitch: safe_pitch(pad_pitch(feature, scale)),
                duration_seconds: PAD_DURATION,
                velocity: PAD_VELOCITY,
                start_offset_seconds: start,
            });
        }

        let aggression = aggression_proxy(feature.distance_from_center);
        if aggression > PERCUSSION_THRESHOLD {
            section.percussion.push(NoteEvent {
                pitch: PERCUSSION_PITCH.to_string(),
                duration_seconds: PERCUSSION_DURATION,
                velocity: aggression,
                start_offset_seconds: start,
            });
        }
    }

    section
}

/// Scale degree from the move index, lifted a third for corners or a
/// fifth for sides, one more step for Black. Octave follows distance from
/// the center: close is high, far is low.
pub fn melody_pitch(feature: &MoveFeature, index: usize, scale: &[PitchClass; 7]) -> String {
    let len = scale.len();
    let mut degree = index % len;
    if feature.is_corner {
        degree = (degree + 2) % len;
    } else if feature.is_side {
        degree = (degree + 4) % len;
    }
    if feature.color == Color::Black {
        degree = (degree + 1) % len;
    }

    let octave = if feature.distance_from_center < 5.0 {
        5
    } else if feature.distance_from_center > 10.0 {
        3
    } else {
        4
    };
    scale[degree].with_octave(octave)
}

pub fn melody_duration(feature: &MoveFeature) -> f64 {
    let mut duration = if feature.is_corner {
        1.0
    } else if feature.is_side {
        0.75
    } else {
        0.5
    };
    if feature.distance_from_center < 5.0 {
        duration *= 0.8;
    }
    duration
}

/// Always 1.0 unless weighting is enabled, in which case center moves and
/// moves close to the center play louder.
pub fn melody_velocity(feature: &MoveFeature, options: &ScheduleOptions) -> f64 {
    if !options.weighted_melody_velocity {
        return 1.0;
    }
    let mut velocity = 0.6;
    if feature.is_center {
        velocity += 0.2;
    }
    velocity += (1.0 - feature.distance_from_center / max_distance()) * 0.3;
    velocity.clamp(0.1, 1.0)
}

/// Third of the scale for corners, fifth for sides, second otherwise.
pub fn pad_pitch(feature: &MoveFeature, scale: &[PitchClass; 7]) -> String {
    let degree = if feature.is_corner {
        2
    } else if feature.is_side {
        4
    } else {
        1
    };
    scale[degree].with_octave(PAD_OCTAVE)
}

fn safe_pitch(candidate: String) -> String {
    if pitch_to_midi(&candidate).is_some() {
        candidate
    } else {
        log::warn!("invalid pitch '{candidate}', using {SAFE_DEFAULT_PITCH}");
        SAFE_DEFAULT_PITCH.to_string()
    }
}

/// Place every note on the global timeline. Sections follow each other
/// back to back; within a section the voices are emitted melody, bass,
/// pad, percussion. Each voice's notes are in time order.
pub fn flatten(structure: &MusicStructure) -> Vec<ScheduledNote> {
    let mut out = Vec::with_capacity(structure.sections.iter().map(Section::note_count).sum());
    let mut section_start = 0.0;

    for section in &structure.sections {
        for voice in Voice::ALL {
            for note in section.notes(voice) {
                out.push(ScheduledNote {
                    voice,
                    note: note.clone(),
                    start_seconds: section_start + note.start_offset_seconds,
                });
            }
        }
        section_start += section.duration_seconds;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::move_feature;
    use crate::planner::MAJOR_SCALE;
    use pretty_assertions::assert_eq;

    fn feature(color: Color, x: u8, y: u8) -> MoveFeature {
        move_feature(1, color, Some(Position::new(x, y)))
    }

    fn section_of(moves: Vec<MoveFeature>) -> SectionMoves {
        SectionMoves {
            section_type: SectionType::Opening,
            moves,
        }
    }

    #[test]
    fn melody_pitch_shifts() {
        // (3,3): not side, distance ≈ 8.49 → octave 4
        assert_eq!(melody_pitch(&feature(Color::White, 3, 3), 0, &MAJOR_SCALE), "C4");
        assert_eq!(melody_pitch(&feature(Color::Black, 3, 3), 0, &MAJOR_SCALE), "D4");
        // corner (0,0): +2, distance ≈ 12.7 → octave 3
        assert_eq!(melody_pitch(&feature(Color::White, 0, 0), 0, &MAJOR_SCALE), "E3");
        // side (9,0): +4, distance 9 → octave 4
        assert_eq!(melody_pitch(&feature(Color::White, 9, 0), 1, &MAJOR_SCALE), "A4");
        // center (9,9), Black, index 6: (6 + 1) % 7 = 0 → octave 5
        assert_eq!(melody_pitch(&feature(Color::Black, 9, 9), 6, &MAJOR_SCALE), "C5");
    }

    #[test]
    fn melody_durations() {
        assert_eq!(melody_duration(&feature(Color::Black, 0, 0)), 1.0);
        assert_eq!(melody_duration(&feature(Color::Black, 9, 0)), 0.75);
        assert_eq!(melody_duration(&feature(Color::Black, 3, 3)), 0.5);
        assert!((melody_duration(&feature(Color::Black, 9, 9)) - 0.4).abs() < 1e-12);
        // pass: distance 0 → shortened
        let pass = move_feature(1, Color::White, None);
        assert!((melody_duration(&pass) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn melody_velocity_is_fixed_by_default() {
        let options = ScheduleOptions::default();
        for (x, y) in [(0, 0), (9, 9), (3, 15)] {
            assert_eq!(melody_velocity(&feature(Color::Black, x, y), &options), 1.0);
        }
    }

    #[test]
    fn weighted_melody_velocity() {
        let options = ScheduleOptions {
            weighted_melody_velocity: true,
        };
        // corner: 0.6 + 0.0 → 0.6
        assert!((melody_velocity(&feature(Color::Black, 0, 0), &options) - 0.6).abs() < 1e-9);
        // center: 0.6 + 0.2 + 0.3 = 1.1 → clamped
        assert_eq!(melody_velocity(&feature(Color::Black, 9, 9), &options), 1.0);
    }

    #[test]
    fn four_alternating_open_moves() {
        let moves = section_of(vec![
            feature(Color::Black, 3, 5),
            feature(Color::White, 5, 3),
            feature(Color::Black, 13, 5),
            feature(Color::White, 5, 13),
        ]);
        let options = ScheduleOptions::default();
        let section = build_section(&moves, &MAJOR_SCALE, PitchClass::G, &options);

        assert_eq!(section.melody.len(), 4);
        assert_eq!(section.bass.len(), 4);
        assert_eq!(section.pads.len(), 1);
        assert_eq!(section.pads[0].start_offset_seconds, 0.0);
        assert_eq!(section.pads[0].pitch, "D4");
        assert_eq!(section.duration_seconds, 2.0);

        let starts: Vec<f64> = section.melody.iter().map(|n| n.start_offset_seconds).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0, 1.5]);

        for (m, b) in section.melody.iter().zip(&section.bass) {
            assert_eq!(b.pitch, "G2");
            assert_eq!(b.duration_seconds, m.duration_seconds * 2.0);
            assert!((b.velocity - 0.7).abs() < 1e-12);
            assert_eq!(b.start_offset_seconds, m.start_offset_seconds);
        }

        // closest move is √32 ≈ 5.66 from the center → proxy ≈ 0.56
        assert!(section.percussion.is_empty());
    }

    #[test]
    fn percussion_follows_the_aggression_proxy() {
        let moves = section_of(vec![
            feature(Color::Black, 9, 9),
            feature(Color::White, 0, 0),
            feature(Color::Black, 10, 8),
        ]);
        let options = ScheduleOptions::default();
        let section = build_section(&moves, &MAJOR_SCALE, PitchClass::C, &options);
        assert_eq!(section.percussion.len(), 2);
        assert_eq!(section.percussion[0].pitch, "C2");
        assert_eq!(section.percussion[0].velocity, 1.0);
        assert_eq!(section.percussion[0].duration_seconds, 0.1);
        assert_eq!(section.percussion[1].start_offset_seconds, 1.0);
        assert!(section.percussion[1].velocity > 0.6 && section.percussion[1].velocity < 1.0);
    }

    #[test]
    fn pad_degrees_follow_position() {
        assert_eq!(pad_pitch(&feature(Color::Black, 0, 0), &MAJOR_SCALE), "E4");
        assert_eq!(pad_pitch(&feature(Color::Black, 0, 9), &MAJOR_SCALE), "G4");
        assert_eq!(pad_pitch(&feature(Color::Black, 9, 9), &MAJOR_SCALE), "D4");
    }

    #[test]
    fn invalid_pitch_falls_back() {
        assert_eq!(safe_pitch("Cundefined".to_string()), SAFE_DEFAULT_PITCH);
        assert_eq!(safe_pitch("F#3".to_string()), "F#3");
    }

    #[test]
    fn flatten_offsets_sections() {
        let structure = MusicStructure {
            key: PitchClass::G,
            scale: MAJOR_SCALE,
            tempo: 120,
            sections: Vec::new(),
        };
        let sections = vec![
            section_of(vec![feature(Color::Black, 3, 3), feature(Color::White, 15, 15)]),
            SectionMoves {
                section_type: SectionType::Middle,
                moves: vec![feature(Color::Black, 9, 9)],
            },
        ];
        let scheduled = schedule(structure, &sections);
        assert_eq!(scheduled.sections.len(), 2);

        let flat = flatten(&scheduled);
        let melody: Vec<f64> = flat
            .iter()
            .filter(|n| n.voice == Voice::Melody)
            .map(|n| n.start_seconds)
            .collect();
        assert_eq!(melody, vec![0.0, 0.5, 1.0]);

        let pads: Vec<f64> = flat
            .iter()
            .filter(|n| n.voice == Voice::Pad)
            .map(|n| n.start_seconds)
            .collect();
        assert_eq!(pads, vec![0.0, 1.0]);
        assert_eq!(flat.len(), scheduled.sections.iter().map(Section::note_count).sum::<usize>());
    }
}
