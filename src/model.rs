//! Data model shared by the pipeline stages.
//!
//! The game half (node tree, move records, features, analysis) is produced
//! once per uploaded record. The music half (structure, sections, note
//! events) is rebuilt on every generate request.
//!
//! Types that cross into the presentation layer serialize with camelCase
//! field names (`totalMoves`, `aggressionLevel`, ...); those names are the
//! contract and must not change.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Board edge length. Only 19x19 boards are supported.
pub const BOARD_SIZE: u8 = 19;

/// Center point on both axes.
pub const BOARD_CENTER: f64 = 9.0;

/// Distance from the center to a corner point: √(9² + 9²).
pub fn max_distance() -> f64 {
    (BOARD_CENTER * BOARD_CENTER * 2.0).sqrt()
}

// ═══════════════════════════════════════════════════════════════════════
// SGF node tree
// ═══════════════════════════════════════════════════════════════════════

/// One SGF property with its raw (unescaped) values.
///
/// Only the four identifiers the extractor reads get their own variant;
/// everything else lands in `Other` and is carried along untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// `AB`, black setup stones
    AddBlack(Vec<String>),
    /// `AW`, white setup stones
    AddWhite(Vec<String>),
    /// `B`, black move
    Black(Vec<String>),
    /// `W`, white move
    White(Vec<String>),
    Other { id: String, values: Vec<String> },
}

impl Property {
    pub fn from_raw(id: String, values: Vec<String>) -> Self {
        match id.as_str() {
            "AB" => Property::AddBlack(values),
            "AW" => Property::AddWhite(values),
            "B" => Property::Black(values),
            "W" => Property::White(values),
            _ => Property::Other { id, values },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Property::AddBlack(_) => "AB",
            Property::AddWhite(_) => "AW",
            Property::Black(_) => "B",
            Property::White(_) => "W",
            Property::Other { id, .. } => id,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Property::AddBlack(v)
            | Property::AddWhite(v)
            | Property::Black(v)
            | Property::White(v) => v,
            Property::Other { values, .. } => values,
        }
    }
}

/// A node in the game tree. Children are exclusively owned; the first
/// child continues the main line and later children are variations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub properties: Vec<Property>,
    pub children: Vec<Node>,
}

impl Node {
    /// Look up a property by identifier (first occurrence).
    pub fn property(&self, id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id() == id)
    }

    /// Iterate this node and every first-child descendant.
    pub fn main_line(&self) -> MainLine<'_> {
        MainLine { next: Some(self) }
    }
}

/// Iterator over the main line of a game tree.
pub struct MainLine<'a> {
    next: Option<&'a Node>,
}

impl<'a> Iterator for MainLine<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.next?;
        self.next = node.children.first();
        Some(node)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Moves
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKind {
    Setup,
    Move,
}

/// A board point, 0-based column (`x`) and row (`y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

/// Code SGF uses for a pass on boards up to 19x19.
pub const PASS_CODE: &str = "tt";

impl Position {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Decode a two-letter SGF point. `""` and `"tt"` are passes.
    pub fn from_sgf(code: &str) -> Result<Option<Position>> {
        if code.is_empty() || code == PASS_CODE {
            return Ok(None);
        }
        let bytes = code.as_bytes();
        if bytes.len() != 2 {
            return Err(GameError::invalid_position(
                code,
                "expected exactly two letters",
            ));
        }
        let x = decode_coordinate(code, bytes[0])?;
        let y = decode_coordinate(code, bytes[1])?;
        Ok(Some(Position { x, y }))
    }

    /// Encode back to the two-letter SGF form.
    pub fn to_sgf(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push((b'a' + self.x) as char);
        s.push((b'a' + self.y) as char);
        s
    }

    /// Euclidean distance to another (possibly fractional) point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x as f64 - x;
        let dy = self.y as f64 - y;
        (dx * dx + dy * dy).sqrt()
    }
}

fn decode_coordinate(code: &str, c: u8) -> Result<u8> {
    if !c.is_ascii_lowercase() {
        return Err(GameError::invalid_position(
            code,
            format!("'{}' is not a lowercase letter", c as char),
        ));
    }
    let v = c - b'a';
    if v >= BOARD_SIZE {
        return Err(GameError::invalid_position(
            code,
            format!("coordinate {v} is off the {BOARD_SIZE}x{BOARD_SIZE} board"),
        ));
    }
    Ok(v)
}

/// A setup stone or a move, in record order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub kind: MoveKind,
    pub color: Color,
    /// `None` for a pass
    pub position: Option<Position>,
    /// 1-based move number; always 0 for setup stones
    pub sequence_number: u32,
}

// ═══════════════════════════════════════════════════════════════════════
// Analysis
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

/// Positional features of a single move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFeature {
    pub sequence_number: u32,
    pub color: Color,
    pub position: Option<Position>,
    pub distance_from_center: f64,
    pub quadrant: Quadrant,
    pub is_corner: bool,
    pub is_side: bool,
    pub is_center: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

/// Influence of both colors on one board point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceCell {
    pub x: u8,
    pub y: u8,
    pub black_influence: f64,
    pub white_influence: f64,
    /// `None` when both sums are equal, including empty points. Ties are
    /// never reported as White; serialized as `null`.
    pub dominant_color: Option<Color>,
    pub influence_strength: f64,
}

/// Running heuristic score after each move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreProgressionEntry {
    pub sequence_number: u32,
    pub black_score: f64,
    pub white_score: f64,
    pub difference: f64,
}

/// Aggregate characteristics of one game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysis {
    pub total_moves: usize,
    pub black_moves: usize,
    pub white_moves: usize,
    /// Mean aggression proxy, in [0, 1]
    pub aggression_level: f64,
    /// Positive favors Black
    pub territory_balance: f64,
    pub game_phase: GamePhase,
    pub move_patterns: Vec<MoveFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub influence_map: Option<Vec<InfluenceCell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_progression: Option<Vec<ScoreProgressionEntry>>,
}

// ═══════════════════════════════════════════════════════════════════════
// Music
// ═══════════════════════════════════════════════════════════════════════

/// The pitch classes used by the scale and key tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    D,
    Eb,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl PitchClass {
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::D => "D",
            PitchClass::Eb => "Eb",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::Ab => "Ab",
            PitchClass::A => "A",
            PitchClass::Bb => "Bb",
            PitchClass::B => "B",
        }
    }

    /// Pitch string with octave, e.g. `"F#4"`.
    pub fn with_octave(self, octave: i32) -> String {
        format!("{}{}", self.name(), octave)
    }
}

/// Convert a pitch string such as `"C4"`, `"F#3"` or `"Bb5"` to a MIDI
/// note number (middle C = 60). Returns `None` for anything malformed or
/// outside 0..=127.
pub fn pitch_to_midi(pitch: &str) -> Option<u8> {
    let mut chars = pitch.chars();
    let step_semitone: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let rest = chars.as_str();
    let (alter, octave_str) = match rest.as_bytes().first()? {
        b'#' => (1, &rest[1..]),
        b'b' => (-1, &rest[1..]),
        _ => (0, rest),
    };
    if octave_str.is_empty() || !octave_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave_str.parse().ok()?;
    let midi = (octave + 1) * 12 + step_semitone + alter;
    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Opening,
    Middle,
    Ending,
    Fallback,
}

/// One note to be played by a voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub pitch: String,
    pub duration_seconds: f64,
    pub velocity: f64,
    /// Relative to the start of the owning section
    pub start_offset_seconds: f64,
}

/// One musical passage built from a contiguous slice of moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub duration_seconds: f64,
    pub melody: Vec<NoteEvent>,
    pub bass: Vec<NoteEvent>,
    pub pads: Vec<NoteEvent>,
    pub percussion: Vec<NoteEvent>,
}

impl Section {
    pub fn empty(section_type: SectionType, duration_seconds: f64) -> Self {
        Self {
            section_type,
            duration_seconds,
            melody: Vec::new(),
            bass: Vec::new(),
            pads: Vec::new(),
            percussion: Vec::new(),
        }
    }

    pub fn notes(&self, voice: Voice) -> &[NoteEvent] {
        match voice {
            Voice::Melody => &self.melody,
            Voice::Bass => &self.bass,
            Voice::Pad => &self.pads,
            Voice::Percussion => &self.percussion,
        }
    }

    pub fn note_count(&self) -> usize {
        self.melody.len() + self.bass.len() + self.pads.len() + self.percussion.len()
    }
}

/// Global musical parameters plus the ordered sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicStructure {
    pub key: PitchClass,
    pub scale: [PitchClass; 7],
    pub tempo: u32,
    pub sections: Vec<Section>,
}

impl MusicStructure {
    /// Sum of all section durations in seconds.
    pub fn total_duration_seconds(&self) -> f64 {
        self.sections.iter().map(|s| s.duration_seconds).sum()
    }
}

/// The four instrument tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Melody,
    Bass,
    Pad,
    Percussion,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Melody, Voice::Bass, Voice::Pad, Voice::Percussion];

    pub fn name(self) -> &'static str {
        match self {
            Voice::Melody => "Melody",
            Voice::Bass => "Bass",
            Voice::Pad => "Pad",
            Voice::Percussion => "Percussion",
        }
    }
}

/// A note placed on the global timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNote {
    pub voice: Voice,
    pub note: NoteEvent,
    pub start_seconds: f64,
}

/// Summary of the musical mapping, cheap enough to show before playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicPreview {
    pub key: PitchClass,
    pub scale: [PitchClass; 7],
    pub tempo: u32,
    pub characteristics: Characteristics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    pub aggression: f64,
    pub balance: f64,
    pub phase: GamePhase,
}
