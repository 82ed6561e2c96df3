//! Configuration for the whole pipeline.
//!
//! Every section has defaults, so a config file only needs the keys it
//! changes:
//!
//! ```json
//! { "analysis": { "influence_map": true }, "playback": { "volume": 0.5 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzer::AnalysisOptions;
use crate::error::{GameError, Result};
use crate::planner::TEMPO_FLOOR_BPM;
use crate::playback::PlaybackSettings;
use crate::scheduler::ScheduleOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisOptions,
    pub schedule: ScheduleOptions,
    pub playback: PlaybackSettings,
}

impl Config {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.playback;
        for (name, value) in [("volume", p.volume), ("reverb", p.reverb), ("delay", p.delay)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GameError::Config(format!(
                    "playback.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if p.tempo < TEMPO_FLOOR_BPM {
            return Err(GameError::Config(format!(
                "playback.tempo must be at least {TEMPO_FLOOR_BPM} BPM, got {}",
                p.tempo
            )));
        }
        Ok(())
    }
}
