//! Feature analysis: per-move positional features and whole-game
//! aggregates.
//!
//! Everything here is a heuristic computed from coordinates alone. No
//! captures, territory counting or life-and-death is involved.

use serde::{Deserialize, Serialize};

use crate::model::*;

/// Influence of a stone fades to zero at this distance.
const INFLUENCE_RADIUS: f64 = 5.0;

/// Upper bounds (inclusive) of the opening and middlegame phases.
const OPENING_MAX_MOVES: usize = 50;
const MIDDLEGAME_MAX_MOVES: usize = 150;

/// Score progression counts this many points per unit of territory score.
const PROGRESSION_SCALE: f64 = 10.0;

/// Which of the optional (more expensive) outputs to compute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Compute the 19x19 influence map
    pub influence_map: bool,
    /// Compute the running score progression
    pub score_progression: bool,
    /// Treat a record without moves as an error instead of a degenerate game
    pub reject_empty_games: bool,
}

/// Analyze with the default options (no influence map, no progression).
pub fn analyze(moves: &[MoveRecord]) -> GameAnalysis {
    analyze_with(moves, &AnalysisOptions::default())
}

pub fn analyze_with(moves: &[MoveRecord], options: &AnalysisOptions) -> GameAnalysis {
    let played: Vec<&MoveRecord> = moves.iter().filter(|m| m.kind == MoveKind::Move).collect();
    let black_moves = played.iter().filter(|m| m.color == Color::Black).count();
    let white_moves = played.len() - black_moves;

    let move_patterns: Vec<MoveFeature> = played
        .iter()
        .map(|m| move_feature(m.sequence_number, m.color, m.position))
        .collect();

    let analysis = GameAnalysis {
        total_moves: played.len(),
        black_moves,
        white_moves,
        aggression_level: aggression_level(&move_patterns),
        territory_balance: territory_balance(&move_patterns),
        game_phase: game_phase(played.len()),
        influence_map: options.influence_map.then(|| influence_map(moves)),
        score_progression: options
            .score_progression
            .then(|| score_progression(&move_patterns)),
        move_patterns,
    };

    log::debug!(
        "analyzed {} moves: aggression {:.3}, balance {:.2}, phase {:?}",
        analysis.total_moves,
        analysis.aggression_level,
        analysis.territory_balance,
        analysis.game_phase
    );
    analysis
}

// ═══════════════════════════════════════════════════════════════════════
// Per-move features
// ═══════════════════════════════════════════════════════════════════════

/// Compute the features of one move. A pass (`None`) has distance 0,
/// quadrant `Center` and every predicate false.
pub fn move_feature(sequence_number: u32, color: Color, position: Option<Position>) -> MoveFeature {
    MoveFeature {
        sequence_number,
        color,
        position,
        distance_from_center: distance_from_center(position),
        quadrant: quadrant(position),
        is_corner: position.is_some_and(is_corner),
        is_side: position.is_some_and(is_side),
        is_center: position.is_some_and(is_center),
    }
}

pub fn distance_from_center(position: Option<Position>) -> f64 {
    position.map_or(0.0, |p| p.distance_to(BOARD_CENTER, BOARD_CENTER))
}

pub fn quadrant(position: Option<Position>) -> Quadrant {
    let Some(Position { x, y }) = position else {
        return Quadrant::Center;
    };
    match (x < 9, y < 9) {
        (true, true) => Quadrant::TopLeft,
        (false, true) => Quadrant::TopRight,
        (true, false) => Quadrant::BottomLeft,
        (false, false) => Quadrant::BottomRight,
    }
}

fn near_edge(v: u8) -> bool {
    v <= 2 || v >= 16
}

/// Both coordinates within three lines of an edge.
pub fn is_corner(p: Position) -> bool {
    near_edge(p.x) && near_edge(p.y)
}

/// Either coordinate within three lines of an edge. Every corner point is
/// also a side point.
pub fn is_side(p: Position) -> bool {
    near_edge(p.x) || near_edge(p.y)
}

/// Inside the central 7x7 block (lines 6..=12).
pub fn is_center(p: Position) -> bool {
    (6..=12).contains(&p.x) && (6..=12).contains(&p.y)
}

/// `1 - distance / √162`, clamped to be non-negative. 1.0 at the center,
/// 0.0 at the corners.
pub fn aggression_proxy(distance_from_center: f64) -> f64 {
    (1.0 - distance_from_center / max_distance()).max(0.0)
}

/// 1.0 for a corner move, 0.5 for a side move, 0.1 otherwise.
pub fn territory_score(feature: &MoveFeature) -> f64 {
    if feature.is_corner {
        1.0
    } else if feature.is_side {
        0.5
    } else {
        0.1
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Aggregates
// ═══════════════════════════════════════════════════════════════════════

/// Mean aggression proxy over all moves; 0.0 for a game without moves.
pub fn aggression_level(patterns: &[MoveFeature]) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }
    let sum: f64 = patterns
        .iter()
        .map(|m| aggression_proxy(m.distance_from_center))
        .sum();
    sum / patterns.len() as f64
}

/// Black's summed territory score minus White's.
pub fn territory_balance(patterns: &[MoveFeature]) -> f64 {
    patterns.iter().fold(0.0, |acc, m| match m.color {
        Color::Black => acc + territory_score(m),
        Color::White => acc - territory_score(m),
    })
}

pub fn game_phase(total_moves: usize) -> GamePhase {
    if total_moves <= OPENING_MAX_MOVES {
        GamePhase::Opening
    } else if total_moves <= MIDDLEGAME_MAX_MOVES {
        GamePhase::Middlegame
    } else {
        GamePhase::Endgame
    }
}

/// Influence of every stone on the board (setup stones included, passes
/// skipped) on every point, row by row.
pub fn influence_map(moves: &[MoveRecord]) -> Vec<InfluenceCell> {
    let stones: Vec<(Color, Position)> = moves
        .iter()
        .filter_map(|m| m.position.map(|p| (m.color, p)))
        .collect();

    let mut cells = Vec::with_capacity(BOARD_SIZE as usize * BOARD_SIZE as usize);
    for y in 0..BOARD_SIZE {
        for x in 0..BOARD_SIZE {
            let mut black = 0.0;
            let mut white = 0.0;
            for (color, stone) in &stones {
                let distance = stone.distance_to(x as f64, y as f64);
                let falloff = (1.0 - distance / INFLUENCE_RADIUS).max(0.0);
                match color {
                    Color::Black => black += falloff,
                    Color::White => white += falloff,
                }
            }
            let dominant_color = if black > white {
                Some(Color::Black)
            } else if white > black {
                Some(Color::White)
            } else {
                None
            };
            cells.push(InfluenceCell {
                x,
                y,
                black_influence: black,
                white_influence: white,
                dominant_color,
                influence_strength: (black - white).abs(),
            });
        }
    }
    cells
}

/// Running totals of ten times each side's territory score.
pub fn score_progression(patterns: &[MoveFeature]) -> Vec<ScoreProgressionEntry> {
    let mut black_score = 0.0;
    let mut white_score = 0.0;
    patterns
        .iter()
        .map(|m| {
            let points = territory_score(m) * PROGRESSION_SCALE;
            match m.color {
                Color::Black => black_score += points,
                Color::White => white_score += points,
            }
            ScoreProgressionEntry {
                sequence_number: m.sequence_number,
                black_score,
                white_score,
                difference: black_score - white_score,
            }
        })
        .collect()
}
