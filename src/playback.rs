//! Playback: hands a scheduled structure to an audio backend.
//!
//! The backend is the external synthesizer. It owns the clock and fires
//! triggers on its own; a session only schedules notes and drives the
//! transport. There is no global audio state: every consumer constructs its
//! own `PlaybackSession` around the backend it wants to drive.

use serde::{Deserialize, Serialize};

use crate::model::{MusicStructure, ScheduledNote, Voice};
use crate::planner::TEMPO_FLOOR_BPM;
use crate::scheduler::flatten;

/// Contract of the external audio engine: four addressable voices plus a
/// global transport and master volume.
pub trait AudioBackend {
    /// Schedule one note at an absolute time on the backend clock.
    fn trigger_note(
        &mut self,
        voice: Voice,
        pitch: &str,
        duration_seconds: f64,
        start_seconds: f64,
        velocity: f64,
    );
    fn set_tempo(&mut self, bpm: u32);
    fn start(&mut self);
    fn stop(&mut self);
    /// Discard every note that has not fired yet.
    fn cancel_all_scheduled(&mut self);
    /// Master level in [0, 1], applied to all voices.
    fn set_volume(&mut self, level: f64);
    /// Effect send levels in [0, 1]. Backends without effects ignore this.
    fn set_effects(&mut self, _reverb: f64, _delay: f64) {}
}

/// User-adjustable playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// BPM used until a structure sets its own
    pub tempo: u32,
    pub volume: f64,
    /// Reverb send level, forwarded through `AudioBackend::set_effects`
    pub reverb: f64,
    /// Echo send level. Only real-time backends use it: General MIDI has
    /// no delay controller, so `MidiRecorder` ignores it.
    pub delay: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tempo: 120,
            volume: 0.7,
            reverb: 0.3,
            delay: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// An owned playback context around one backend.
pub struct PlaybackSession<B: AudioBackend> {
    backend: B,
    settings: PlaybackSettings,
    state: TransportState,
}

impl<B: AudioBackend> PlaybackSession<B> {
    /// Wrap a backend and push the initial settings into it.
    pub fn new(mut backend: B, settings: PlaybackSettings) -> Self {
        let volume = settings.volume.clamp(0.0, 1.0);
        let tempo = settings.tempo.max(TEMPO_FLOOR_BPM);
        backend.set_volume(volume);
        backend.set_tempo(tempo);
        backend.set_effects(settings.reverb, settings.delay);
        Self {
            backend,
            settings: PlaybackSettings {
                tempo,
                volume,
                ..settings
            },
            state: TransportState::Stopped,
        }
    }

    /// Stop anything playing, schedule every note of `structure` and start
    /// the transport. Returns how many notes were handed to the backend.
    ///
    /// Notes with an empty pitch or a non-positive duration or velocity are
    /// skipped with a warning.
    pub fn play(&mut self, structure: &MusicStructure) -> usize {
        self.stop();
        self.set_tempo(structure.tempo);

        let mut scheduled = 0;
        for entry in flatten(structure) {
            if !is_playable(&entry) {
                log::warn!(
                    "skipping invalid {:?} note {:?} at {:.2}s",
                    entry.voice,
                    entry.note,
                    entry.start_seconds
                );
                continue;
            }
            self.backend.trigger_note(
                entry.voice,
                &entry.note.pitch,
                entry.note.duration_seconds,
                entry.start_seconds,
                entry.note.velocity,
            );
            scheduled += 1;
        }

        self.backend.start();
        self.state = TransportState::Playing;
        log::debug!(
            "scheduled {scheduled} notes over {:.1}s at {} BPM",
            structure.total_duration_seconds(),
            self.settings.tempo
        );
        scheduled
    }

    /// Stop the transport and drop every pending note.
    pub fn stop(&mut self) {
        self.backend.stop();
        self.backend.cancel_all_scheduled();
        self.state = TransportState::Stopped;
    }

    pub fn set_volume(&mut self, level: f64) {
        self.settings.volume = level.clamp(0.0, 1.0);
        self.backend.set_volume(self.settings.volume);
    }

    pub fn set_tempo(&mut self, bpm: u32) {
        self.settings.tempo = bpm.max(TEMPO_FLOOR_BPM);
        self.backend.set_tempo(self.settings.tempo);
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn is_playable(entry: &ScheduledNote) -> bool {
    let note = &entry.note;
    !note.pitch.is_empty()
        && note.duration_seconds.is_finite()
        && note.duration_seconds > 0.0
        && note.velocity.is_finite()
        && note.velocity > 0.0
        && entry.start_seconds.is_finite()
        && entry.start_seconds >= 0.0
}
