//! Composition planning: maps game aggregates onto global musical
//! parameters and cuts the move list into sections.
//!
//! Every mapping here is a fixed lookup, so identical analyses always plan
//! identical structures.

use crate::analyzer::move_feature;
use crate::model::*;
use crate::model::PitchClass::*;

/// Tempo never drops below this, whatever the adjustments.
pub const TEMPO_FLOOR_BPM: u32 = 60;

/// Games longer than this play slower.
const LONG_GAME_MOVES: usize = 200;
const LONG_GAME_TEMPO_DROP: u32 = 20;

/// Seconds of music per move.
pub const SECONDS_PER_MOVE: f64 = 0.5;

/// Section windows by absolute move index: opening `[0, 20)`,
/// middle `[20, 100)`, ending `[100, ..)`.
const OPENING_END: usize = 20;
const MIDDLE_END: usize = 100;

/// C natural minor, for aggressive games.
pub const MINOR_SCALE: [PitchClass; 7] = [C, D, Eb, F, G, Ab, Bb];
/// C major.
pub const MAJOR_SCALE: [PitchClass; 7] = [C, D, E, F, G, A, B];
/// C lydian, for calm games.
pub const LYDIAN_SCALE: [PitchClass; 7] = [C, D, E, FSharp, G, A, B];

/// Key when Black leads, when White leads, and when the game is balanced.
pub const BLACK_LEADS_KEY: PitchClass = C;
pub const WHITE_LEADS_KEY: PitchClass = F;
pub const BALANCED_KEY: PitchClass = G;

/// The moves that make up one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionMoves {
    pub section_type: SectionType,
    pub moves: Vec<MoveFeature>,
}

impl SectionMoves {
    pub fn duration_seconds(&self) -> f64 {
        self.moves.len() as f64 * SECONDS_PER_MOVE
    }
}

pub fn scale_for(aggression_level: f64) -> [PitchClass; 7] {
    if aggression_level > 0.7 {
        MINOR_SCALE
    } else if aggression_level > 0.4 {
        MAJOR_SCALE
    } else {
        LYDIAN_SCALE
    }
}

pub fn key_for(territory_balance: f64) -> PitchClass {
    if territory_balance > 0.5 {
        BLACK_LEADS_KEY
    } else if territory_balance < -0.5 {
        WHITE_LEADS_KEY
    } else {
        BALANCED_KEY
    }
}

pub fn tempo_for(aggression_level: f64, total_moves: usize) -> u32 {
    let mut tempo: u32 = if aggression_level > 0.7 {
        140
    } else if aggression_level > 0.4 {
        130
    } else {
        110
    };
    if total_moves > LONG_GAME_MOVES {
        tempo = tempo.saturating_sub(LONG_GAME_TEMPO_DROP);
    }
    tempo.max(TEMPO_FLOOR_BPM)
}

/// Global parameters plus one empty, correctly sized section per window.
pub fn plan(analysis: &GameAnalysis) -> MusicStructure {
    let sections = section_moves(analysis)
        .iter()
        .map(|s| Section::empty(s.section_type, s.duration_seconds()))
        .collect();

    let structure = MusicStructure {
        key: key_for(analysis.territory_balance),
        scale: scale_for(analysis.aggression_level),
        tempo: tempo_for(analysis.aggression_level, analysis.total_moves),
        sections,
    };
    log::debug!(
        "planned {} section(s) in key {} at {} BPM",
        structure.sections.len(),
        structure.key.name(),
        structure.tempo
    );
    structure
}

/// Split the move patterns into the non-empty section windows. A game
/// without moves gets a single fallback section so there is always
/// something to play.
pub fn section_moves(analysis: &GameAnalysis) -> Vec<SectionMoves> {
    let patterns = &analysis.move_patterns;
    let n = patterns.len();

    let windows = [
        (SectionType::Opening, 0, n.min(OPENING_END)),
        (SectionType::Middle, OPENING_END, n.min(MIDDLE_END)),
        (SectionType::Ending, MIDDLE_END, n),
    ];

    let mut sections: Vec<SectionMoves> = windows
        .into_iter()
        .filter(|(_, start, end)| start < end)
        .map(|(section_type, start, end)| SectionMoves {
            section_type,
            moves: patterns[start..end].to_vec(),
        })
        .collect();

    if sections.is_empty() {
        log::warn!("game has no moves, using the fallback section");
        sections.push(SectionMoves {
            section_type: SectionType::Fallback,
            moves: fallback_moves(),
        });
    }
    sections
}

/// Four placeholder moves used when a record has none.
pub fn fallback_moves() -> Vec<MoveFeature> {
    [
        (Color::Black, 3, 3),
        (Color::White, 15, 15),
        (Color::Black, 9, 9),
        (Color::White, 12, 6),
    ]
    .into_iter()
    .zip(1..)
    .map(|((color, x, y), n)| move_feature(n, color, Some(Position::new(x, y))))
    .collect()
}

pub fn preview(analysis: &GameAnalysis) -> MusicPreview {
    MusicPreview {
        key: key_for(analysis.territory_balance),
        scale: scale_for(analysis.aggression_level),
        tempo: tempo_for(analysis.aggression_level, analysis.total_moves),
        characteristics: Characteristics {
            aggression: analysis.aggression_level,
            balance: analysis.territory_balance,
            phase: analysis.game_phase,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use pretty_assertions::assert_eq;

    fn game(n: u32) -> GameAnalysis {
        let moves: Vec<MoveRecord> = (1..=n)
            .map(|i| MoveRecord {
                kind: MoveKind::Move,
                color: if i % 2 == 1 { Color::Black } else { Color::White },
                position: Some(Position::new((i % 19) as u8, ((i / 19) % 19) as u8)),
                sequence_number: i,
            })
            .collect();
        analyze(&moves)
    }

    #[test]
    fn scale_bands() {
        assert_eq!(scale_for(0.71), MINOR_SCALE);
        assert_eq!(scale_for(0.7), MAJOR_SCALE);
        assert_eq!(scale_for(0.41), MAJOR_SCALE);
        assert_eq!(scale_for(0.4), LYDIAN_SCALE);
        assert_eq!(scale_for(0.0), LYDIAN_SCALE);
    }

    #[test]
    fn key_bands() {
        assert_eq!(key_for(0.6), C);
        assert_eq!(key_for(0.5), G);
        assert_eq!(key_for(-0.5), G);
        assert_eq!(key_for(-0.6), F);
    }

    #[test]
    fn tempo_bands_and_long_game_drop() {
        assert_eq!(tempo_for(0.8, 10), 140);
        assert_eq!(tempo_for(0.5, 10), 130);
        assert_eq!(tempo_for(0.1, 10), 110);
        assert_eq!(tempo_for(0.8, 200), 140);
        assert_eq!(tempo_for(0.8, 201), 120);
        assert_eq!(tempo_for(0.1, 300), 90);
        assert!(tempo_for(0.0, usize::MAX) >= TEMPO_FLOOR_BPM);
    }

    #[test]
    fn sections_follow_index_windows() {
        let cases: [(u32, Vec<(SectionType, usize)>); 4] = [
            (5, vec![(SectionType::Opening, 5)]),
            (20, vec![(SectionType::Opening, 20)]),
            (21, vec![(SectionType::Opening, 20), (SectionType::Middle, 1)]),
            (
                130,
                vec![
                    (SectionType::Opening, 20),
                    (SectionType::Middle, 80),
                    (SectionType::Ending, 30),
                ],
            ),
        ];
        for (n, expected) in cases {
            let got: Vec<(SectionType, usize)> = section_moves(&game(n))
                .iter()
                .map(|s| (s.section_type, s.moves.len()))
                .collect();
            assert_eq!(got, expected, "{n} moves");
        }
    }

    #[test]
    fn sections_preserve_move_order() {
        let analysis = game(25);
        let sections = section_moves(&analysis);
        assert_eq!(sections[1].moves[0].sequence_number, 21);
        assert_eq!(sections[1].moves[4].sequence_number, 25);
    }

    #[test]
    fn empty_game_plans_a_fallback_section() {
        let structure = plan(&analyze(&[]));
        assert_eq!(structure.sections.len(), 1);
        assert_eq!(structure.sections[0].section_type, SectionType::Fallback);
        assert_eq!(structure.sections[0].duration_seconds, 2.0);
        assert_eq!(structure.scale, LYDIAN_SCALE);
        assert_eq!(structure.key, G);
        assert_eq!(structure.tempo, 110);
    }

    #[test]
    fn fallback_moves_have_real_features() {
        let moves = fallback_moves();
        assert_eq!(moves.len(), 4);
        assert_eq!(moves[2].distance_from_center, 0.0);
        assert!(moves[3].is_center);
        assert_eq!(moves[1].color, Color::White);
    }

    #[test]
    fn planned_durations_match_move_counts() {
        let structure = plan(&game(130));
        let durations: Vec<f64> = structure.sections.iter().map(|s| s.duration_seconds).collect();
        assert_eq!(durations, vec![10.0, 40.0, 15.0]);
        assert!(structure.sections.iter().all(|s| s.note_count() == 0));
    }

    #[test]
    fn preview_matches_plan() {
        let analysis = game(60);
        let p = preview(&analysis);
        let s = plan(&analysis);
        assert_eq!((p.key, p.scale, p.tempo), (s.key, s.scale, s.tempo));
        assert_eq!(p.characteristics.phase, GamePhase::Middlegame);
    }
}
