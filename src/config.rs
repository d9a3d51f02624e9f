// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use duration_string::DurationString;
use serde::Deserialize;

use crate::color::Color;

const DEFAULT_FADEOUT_DURATION: Duration = Duration::from_millis(500);
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_POLL_BATCH: usize = 10;

/// A YAML representation of the soundboard configuration.
#[derive(Deserialize, Clone)]
pub struct Config {
    /// The name of the control surface MIDI device.
    surface_device: String,

    /// The audio output device. Absent or "default" picks the default
    /// output device.
    audio_device: Option<String>,

    /// Path to the mapping document.
    mapping_file: PathBuf,

    /// The directory holding audio clips.
    audio_dir: PathBuf,

    /// How long the default fadeout ramp lasts (default: 500ms).
    fadeout_duration: Option<String>,

    /// The control loop cadence (default: 10ms).
    tick_interval: Option<String>,

    /// Maximum number of surface events consumed per tick (default: 10).
    poll_batch: Option<usize>,

    /// Whether the audio device is a live device. Plays made in testing
    /// mode are suppressed on a live device.
    live_device: Option<bool>,

    /// The working color given to newly committed assignments
    /// (default: yellow).
    assignment_color: Option<Color>,
}

impl Config {
    /// Deserializes the configuration from the given YAML file.
    pub fn load(path: &Path) -> Result<Config, Box<dyn Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("error reading config file {}: {}", path.display(), e))?;
        let config: Config = serde_yml::from_str(&contents)
            .map_err(|e| format!("error parsing config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Returns the control surface device name.
    pub fn surface_device(&self) -> &str {
        &self.surface_device
    }

    /// Returns the audio output device name.
    pub fn audio_device(&self) -> &str {
        self.audio_device.as_deref().unwrap_or("default")
    }

    /// Returns the path of the mapping document.
    pub fn mapping_file(&self) -> &Path {
        &self.mapping_file
    }

    /// Returns the audio clip directory.
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Returns the default fadeout duration.
    pub fn fadeout_duration(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.fadeout_duration {
            Some(duration) => Ok(DurationString::from_string(duration.clone())?.into()),
            None => Ok(DEFAULT_FADEOUT_DURATION),
        }
    }

    /// Returns the control loop tick interval.
    pub fn tick_interval(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.tick_interval {
            Some(interval) => Ok(DurationString::from_string(interval.clone())?.into()),
            None => Ok(DEFAULT_TICK_INTERVAL),
        }
    }

    /// Returns the maximum number of events consumed per tick.
    pub fn poll_batch(&self) -> usize {
        self.poll_batch.unwrap_or(DEFAULT_POLL_BATCH).max(1)
    }

    /// Returns whether the audio device is a live device.
    pub fn live_device(&self) -> bool {
        self.live_device.unwrap_or(false)
    }

    /// Returns the working color for newly committed assignments.
    pub fn assignment_color(&self) -> Color {
        self.assignment_color.unwrap_or(Color::Yellow)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let path = dir.path().join("config.yaml");
        let mut file = fs::File::create(&path).expect("unable to create config");
        file.write_all(contents.as_bytes())
            .expect("unable to write config");
        (dir, path)
    }

    #[test]
    fn full_config() -> Result<(), Box<dyn Error>> {
        let (_dir, path) = write_config(
            r#"
surface_device: "pad"
audio_device: "USB Audio"
mapping_file: "/data/mappings.json"
audio_dir: "/data/audio"
fadeout_duration: "2s"
tick_interval: "5ms"
poll_batch: 20
live_device: true
assignment_color: "green"
"#,
        );

        let config = Config::load(&path)?;
        assert_eq!(config.surface_device(), "pad");
        assert_eq!(config.audio_device(), "USB Audio");
        assert_eq!(config.mapping_file(), Path::new("/data/mappings.json"));
        assert_eq!(config.audio_dir(), Path::new("/data/audio"));
        assert_eq!(config.fadeout_duration()?, Duration::from_secs(2));
        assert_eq!(config.tick_interval()?, Duration::from_millis(5));
        assert_eq!(config.poll_batch(), 20);
        assert!(config.live_device());
        assert_eq!(config.assignment_color(), Color::Green);
        Ok(())
    }

    #[test]
    fn defaults() -> Result<(), Box<dyn Error>> {
        let (_dir, path) = write_config(
            r#"
surface_device: "pad"
mapping_file: "/data/mappings.json"
audio_dir: "/data/audio"
"#,
        );

        let config = Config::load(&path)?;
        assert_eq!(config.audio_device(), "default");
        assert_eq!(config.fadeout_duration()?, Duration::from_millis(500));
        assert_eq!(config.tick_interval()?, Duration::from_millis(10));
        assert_eq!(config.poll_batch(), 10);
        assert!(!config.live_device());
        assert_eq!(config.assignment_color(), Color::Yellow);
        Ok(())
    }

    #[test]
    fn missing_required_field_fails() {
        let (_dir, path) = write_config("audio_dir: \"/data/audio\"\n");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/config.yaml")).is_err());
    }
}
