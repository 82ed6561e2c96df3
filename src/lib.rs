//! gomusic turns Go game records (SGF) into music.
//!
//! The pipeline runs strictly forward:
//! SGF text → node tree → move records → `GameAnalysis` →
//! `MusicStructure` → flat note schedule → audio backend.
//!
//! # Example
//! ```no_run
//! use gomusic::{analyze_file, compose, render_midi, PlaybackSettings, ScheduleOptions};
//!
//! let analysis = analyze_file("path/to/game.sgf").unwrap();
//! println!("Moves: {}", analysis.total_moves);
//! println!("Aggression: {:.2}", analysis.aggression_level);
//!
//! let music = compose(&analysis, &ScheduleOptions::default());
//! let smf = render_midi(&music, &PlaybackSettings::default());
//! std::fs::write("game.mid", smf).unwrap();
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod extractor;
pub mod midi;
pub mod model;
pub mod parser;
pub mod planner;
pub mod playback;
pub mod scheduler;

use std::path::Path;

pub use analyzer::{analyze, analyze_with, AnalysisOptions};
pub use config::Config;
pub use error::{GameError, Result};
pub use extractor::extract_moves;
pub use midi::MidiRecorder;
pub use model::*;
pub use parser::{parse_collection, parse_sgf};
pub use planner::{plan, preview, section_moves, SectionMoves};
pub use playback::{AudioBackend, PlaybackSession, PlaybackSettings};
pub use scheduler::{flatten, schedule, schedule_with, ScheduleOptions};

/// Parse, extract and analyze an SGF record with default options.
pub fn analyze_str(text: &str) -> Result<GameAnalysis> {
    analyze_str_with(text, &AnalysisOptions::default())
}

/// Parse, extract and analyze an SGF record.
///
/// A record without moves is a valid, degenerate game unless
/// `options.reject_empty_games` is set, in which case it is an
/// `EmptyGame` error.
pub fn analyze_str_with(text: &str, options: &AnalysisOptions) -> Result<GameAnalysis> {
    let root = parse_sgf(text)?;
    let moves = extract_moves(&root)?;
    let analysis = analyze_with(&moves, options);
    if analysis.total_moves == 0 && options.reject_empty_games {
        return Err(GameError::EmptyGame);
    }
    Ok(analysis)
}

/// Analyze raw file contents, which must be UTF-8.
pub fn analyze_bytes(data: &[u8], options: &AnalysisOptions) -> Result<GameAnalysis> {
    let text = std::str::from_utf8(data).map_err(|e| {
        GameError::format(e.valid_up_to(), format!("invalid UTF-8 in SGF file: {e}"))
    })?;
    analyze_str_with(text, options)
}

/// Read and analyze an SGF file with default options.
pub fn analyze_file<P: AsRef<Path>>(path: P) -> Result<GameAnalysis> {
    let data = std::fs::read(path.as_ref())?;
    analyze_bytes(&data, &AnalysisOptions::default())
}

/// Plan and schedule the full piece for an analysis. Never fails: a game
/// without moves gets the fallback section.
pub fn compose(analysis: &GameAnalysis, options: &ScheduleOptions) -> MusicStructure {
    let structure = plan(analysis);
    let sections = section_moves(analysis);
    schedule_with(structure, &sections, options)
}

/// Play a structure into a `MidiRecorder` and return the SMF bytes.
pub fn render_midi(structure: &MusicStructure, settings: &PlaybackSettings) -> Vec<u8> {
    let mut session = PlaybackSession::new(MidiRecorder::new(), settings.clone());
    session.play(structure);
    session.into_backend().to_smf()
}

/// Serialize an analysis with the camelCase field names the presentation
/// layer reads.
pub fn analysis_to_json(analysis: &GameAnalysis) -> Result<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}

pub fn structure_to_json(structure: &MusicStructure) -> Result<String> {
    Ok(serde_json::to_string_pretty(structure)?)
}

pub fn schedule_to_json(schedule: &[ScheduledNote]) -> Result<String> {
    Ok(serde_json::to_string(schedule)?)
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for embedding in native UI shells
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::CString;
use std::os::raw::c_char;

fn into_c_string(result: Result<String>) -> *mut c_char {
    match result {
        Ok(json) => CString::new(json).map_or(std::ptr::null_mut(), CString::into_raw),
        Err(e) => {
            log::error!("{e}");
            std::ptr::null_mut()
        }
    }
}

fn ffi_analysis_options() -> AnalysisOptions {
    AnalysisOptions {
        influence_map: true,
        score_progression: true,
        reject_empty_games: false,
    }
}

/// Analyze SGF bytes and return the analysis as a JSON C string, or null
/// on error. The caller must free the result with `gomusic_free_string`.
///
/// # Safety
/// `data` must point to `len` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn gomusic_analyze_bytes(data: *const u8, len: usize) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    into_c_string(
        analyze_bytes(bytes, &ffi_analysis_options()).and_then(|a| analysis_to_json(&a)),
    )
}

/// Analyze SGF bytes and return the scheduled `MusicStructure` as a JSON C
/// string, or null on error. The caller must free the result with
/// `gomusic_free_string`.
///
/// # Safety
/// `data` must point to `len` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn gomusic_compose_bytes(data: *const u8, len: usize) -> *mut c_char {
    if data.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    let bytes = unsafe { std::slice::from_raw_parts(data, len) };
    into_c_string(
        analyze_bytes(bytes, &AnalysisOptions::default())
            .map(|a| compose(&a, &ScheduleOptions::default()))
            .and_then(|s| structure_to_json(&s)),
    )
}

/// Free a string previously returned by gomusic functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a gomusic function, or null.
#[no_mangle]
pub unsafe extern "C" fn gomusic_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
