//! MIDI rendering of a playback session.
//!
//! `MidiRecorder` is an `AudioBackend` that records every triggered note
//! instead of sounding it, then writes a Standard MIDI File (SMF) Type 1
//! as raw bytes. Track 0 is the tempo map; tracks 1–4 are melody, bass,
//! pad and percussion. Percussion goes to the General MIDI drum channel.

use crate::model::{pitch_to_midi, Voice};
use crate::playback::AudioBackend;

/// Ticks per quarter note in our MIDI output.
pub const TICKS_PER_QUARTER: u16 = 480;

/// A single MIDI event (note on/off, program change, etc.)
#[derive(Debug, Clone)]
pub struct MidiEvent {
    /// Absolute time in ticks from the start of the track
    pub tick: u32,
    /// Raw MIDI message bytes (status + data)
    pub bytes: Vec<u8>,
}

/// A note as it reached the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedNote {
    pub voice: Voice,
    pub pitch: String,
    pub duration_seconds: f64,
    pub start_seconds: f64,
    pub velocity: f64,
}

/// One note resolved to MIDI key, velocity and ticks.
#[derive(Debug, Clone, Copy)]
struct NoteSpan {
    key: u8,
    velocity: u8,
    on: u32,
    off: u32,
}

/// Channel and General MIDI program for each voice.
fn voice_channel(voice: Voice) -> (u8, Option<u8>) {
    match voice {
        Voice::Melody => (0, Some(0)),    // Acoustic Grand Piano
        Voice::Bass => (1, Some(38)),     // Synth Bass 1
        Voice::Pad => (2, Some(89)),      // Pad 2 (warm)
        Voice::Percussion => (9, None),   // drum channel, no program
    }
}

/// Reverb send controller.
const CC_REVERB: u8 = 91;

/// Backend that captures triggers and renders them as MIDI.
#[derive(Debug, Clone)]
pub struct MidiRecorder {
    notes: Vec<RecordedNote>,
    tempo: u32,
    volume: f64,
    reverb: f64,
    running: bool,
}

impl Default for MidiRecorder {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            tempo: 120,
            volume: 1.0,
            reverb: 0.0,
            running: false,
        }
    }
}

impl MidiRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[RecordedNote] {
        &self.notes
    }

    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Render everything recorded so far as an SMF Type 1 file.
    pub fn to_smf(&self) -> Vec<u8> {
        let mut tracks = vec![build_tempo_track(self.tempo)];

        for voice in Voice::ALL {
            let (channel, program) = voice_channel(voice);
            let mut events = Vec::new();
            if let Some(program) = program {
                events.push(MidiEvent {
                    tick: 0,
                    bytes: vec![0xC0 | channel, program],
                });
            }
            if matches!(voice, Voice::Melody | Voice::Pad) {
                events.push(MidiEvent {
                    tick: 0,
                    bytes: vec![0xB0 | channel, CC_REVERB, to_midi_level(self.reverb)],
                });
            }
            events.extend(self.note_events(voice, channel));
            tracks.push(encode_track(&events, voice.name()));
        }

        build_smf(&tracks)
    }

    /// Note-on/note-off pairs for one voice.
    ///
    /// A key can only sound once per channel, so a note that is still
    /// held when the same key strikes again is released on that strike.
    /// Two strikes on the same tick merge into one note. Notes whose
    /// volume-scaled velocity rounds to 0 are muted and not written.
    fn note_events(&self, voice: Voice, channel: u8) -> Vec<MidiEvent> {
        let mut spans: Vec<NoteSpan> = Vec::new();
        for note in self.notes.iter().filter(|n| n.voice == voice) {
            let Some(key) = pitch_to_midi(&note.pitch) else {
                log::warn!("cannot map pitch '{}' to MIDI, dropping note", note.pitch);
                continue;
            };
            let velocity = to_midi_level(note.velocity * self.volume);
            if velocity == 0 {
                continue;
            }
            let on = seconds_to_ticks(note.start_seconds, self.tempo);
            let off = seconds_to_ticks(note.start_seconds + note.duration_seconds, self.tempo)
                .max(on + 1);
            spans.push(NoteSpan {
                key,
                velocity,
                on,
                off,
            });
        }
        spans.sort_by_key(|s| s.on);

        // Index of the span currently holding each key
        let mut holding: [Option<usize>; 128] = [None; 128];
        let mut kept: Vec<NoteSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            let slot = &mut holding[span.key as usize];
            if let Some(i) = *slot {
                let held = &mut kept[i];
                if held.on == span.on {
                    held.off = held.off.max(span.off);
                    held.velocity = held.velocity.max(span.velocity);
                    continue;
                }
                held.off = held.off.min(span.on);
            }
            *slot = Some(kept.len());
            kept.push(span);
        }

        let mut events = Vec::with_capacity(kept.len() * 2);
        for span in kept {
            events.push(MidiEvent {
                tick: span.on,
                bytes: vec![0x90 | channel, span.key, span.velocity],
            });
            events.push(MidiEvent {
                tick: span.off,
                bytes: vec![0x80 | channel, span.key, 0],
            });
        }
        events
    }
}

impl AudioBackend for MidiRecorder {
    fn trigger_note(
        &mut self,
        voice: Voice,
        pitch: &str,
        duration_seconds: f64,
        start_seconds: f64,
        velocity: f64,
    ) {
        self.notes.push(RecordedNote {
            voice,
            pitch: pitch.to_string(),
            duration_seconds,
            start_seconds,
            velocity,
        });
    }

    fn set_tempo(&mut self, bpm: u32) {
        self.tempo = bpm.max(1);
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn cancel_all_scheduled(&mut self) {
        self.notes.clear();
    }

    fn set_volume(&mut self, level: f64) {
        self.volume = level.clamp(0.0, 1.0);
    }

    /// Reverb becomes CC 91 on the melody and pad tracks. Delay has no
    /// General MIDI controller and is dropped.
    fn set_effects(&mut self, reverb: f64, _delay: f64) {
        self.reverb = reverb.clamp(0.0, 1.0);
    }
}

/// Map a [0, 1] level onto 0..=127.
fn to_midi_level(level: f64) -> u8 {
    (level.clamp(0.0, 1.0) * 127.0).round() as u8
}

/// Convert seconds to ticks at a constant tempo.
pub fn seconds_to_ticks(seconds: f64, bpm: u32) -> u32 {
    let ticks_per_second = TICKS_PER_QUARTER as f64 * bpm as f64 / 60.0;
    (seconds.max(0.0) * ticks_per_second).round() as u32
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Build the complete Standard MIDI File bytes.
fn build_smf(tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes()); // header length
    out.extend_from_slice(&1u16.to_be_bytes()); // format type 1
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

    for track_data in tracks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(track_data);
    }

    out
}

/// Track 0: a single tempo meta-event at tick 0.
fn build_tempo_track(bpm: u32) -> Vec<u8> {
    let uspq = 60_000_000 / bpm.max(1); // microseconds per quarter
    // Meta event: FF 51 03 tt tt tt
    let event = MidiEvent {
        tick: 0,
        bytes: vec![
            0xFF,
            0x51,
            0x03,
            ((uspq >> 16) & 0xFF) as u8,
            ((uspq >> 8) & 0xFF) as u8,
            (uspq & 0xFF) as u8,
        ],
    };
    encode_track(&[event], "Tempo")
}

/// Encode a track's events into raw MTrk bytes (delta-time encoded).
fn encode_track(events: &[MidiEvent], name: &str) -> Vec<u8> {
    let mut data = Vec::new();

    // Track name meta event
    let name_bytes = name.as_bytes();
    data.push(0x00);
    data.push(0xFF);
    data.push(0x03);
    write_vlq(&mut data, name_bytes.len() as u32);
    data.extend_from_slice(name_bytes);

    // Stable sort keeps setup events ahead of notes on tick 0; a note-off
    // sorts before a note-on on the same tick so repeated pitches retrigger.
    let mut sorted: Vec<&MidiEvent> = events.iter().collect();
    sorted.sort_by_key(|e| (e.tick, e.bytes[0] & 0xF0 == 0x90));

    let mut last_tick: u32 = 0;
    for event in &sorted {
        let delta = event.tick.saturating_sub(last_tick);
        write_vlq(&mut data, delta);
        data.extend_from_slice(&event.bytes);
        last_tick = event.tick;
    }

    // End of track
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    data
}

/// Write a variable-length quantity (VLQ) to a byte vector.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 5];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}
