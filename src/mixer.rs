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

//! Clip playback over a fixed bank of channels.
//!
//! This module provides:
//! - The playback device trait with cpal and mock implementations
//! - The render core (channel bank with per-channel transport state)
//! - Clip decoding via symphonia
//! - The mixer front the soundboard drives

use std::{
    error::Error,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tracing::info;

pub mod cpal;
pub mod engine;
pub mod loader;
pub mod mock;

pub use engine::Transport;

/// The number of playback channels. The channel rack has one button per
/// channel.
pub const CHANNEL_COUNT: usize = 8;

/// Typed error for clip playback failures. None of these are fatal to the
/// control loop; the soundboard logs them and keeps running.
#[derive(Debug, thiserror::Error)]
pub enum ClipError {
    #[error("clip {0} not found")]
    NotFound(PathBuf),
    #[error("unable to read clip {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to decode clip {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("clip rate {clip_rate} Hz does not match output rate {output_rate} Hz")]
    SampleRateMismatch { clip_rate: u32, output_rate: u32 },
    #[error("unsupported channel layout: {file_channels} channels into {output_channels}")]
    UnsupportedChannels {
        file_channels: usize,
        output_channels: usize,
    },
    #[error("channel index {0} out of range")]
    BadChannel(usize),
    #[error("mixer is unavailable: {0}")]
    Unavailable(String),
}

/// A playback device owning the channel bank. All transport operations are
/// addressed to an explicit channel index in 0..CHANNEL_COUNT.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Loads the clip at the given path and starts it on the channel,
    /// interrupting whatever was playing there.
    fn play(&self, channel: usize, clip: &Path) -> Result<(), ClipError>;

    /// Pauses the channel. No-op unless it is playing.
    fn pause(&self, channel: usize) -> Result<(), ClipError>;

    /// Resumes the channel. No-op unless it is paused.
    fn resume(&self, channel: usize) -> Result<(), ClipError>;

    /// Stops the channel.
    fn stop(&self, channel: usize) -> Result<(), ClipError>;

    /// Ramps the channel to silence over the given duration, then stops it.
    fn fadeout(&self, channel: usize, duration: Duration) -> Result<(), ClipError>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists audio output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list()
}

/// Gets a playback device with the given name. An empty name or "default"
/// selects the default output device.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(cpal::Device::get(name)?))
}

/// The mixer front the soundboard drives: holds the current channel
/// selection and the testing-device policy, and resolves clip ids against
/// the audio directory.
pub struct Mixer {
    device: Arc<dyn Device>,
    audio_dir: PathBuf,
    current_channel: usize,
    live_device: bool,
    default_fadeout: Duration,
}

impl Mixer {
    pub fn new(
        device: Arc<dyn Device>,
        audio_dir: PathBuf,
        live_device: bool,
        default_fadeout: Duration,
    ) -> Mixer {
        Mixer {
            device,
            audio_dir,
            current_channel: 0,
            live_device,
            default_fadeout,
        }
    }

    /// Changes which channel subsequent transport calls target. No side
    /// effect on audio.
    pub fn select(&mut self, channel: usize) {
        self.current_channel = channel;
    }

    /// The channel transport calls currently target.
    pub fn current_channel(&self) -> usize {
        self.current_channel
    }

    /// Plays the given clip id on the current channel. When `test_only` is
    /// set and this mixer drives a live device, the call is a no-op so
    /// mappings can be rehearsed silently.
    pub fn play(&self, clip: &str, test_only: bool) -> Result<(), ClipError> {
        if test_only && self.live_device {
            info!(clip, "Suppressing playback on live device in testing mode.");
            return Ok(());
        }

        self.device.play(self.current_channel, &self.audio_dir.join(clip))
    }

    /// Pauses the current channel.
    pub fn pause(&self) -> Result<(), ClipError> {
        self.device.pause(self.current_channel)
    }

    /// Resumes the current channel.
    pub fn resume(&self) -> Result<(), ClipError> {
        self.device.resume(self.current_channel)
    }

    /// Stops the current channel.
    pub fn stop(&self) -> Result<(), ClipError> {
        self.device.stop(self.current_channel)
    }

    /// Fades the current channel out over the default duration.
    pub fn fadeout_default(&self) -> Result<(), ClipError> {
        self.device.fadeout(self.current_channel, self.default_fadeout)
    }
}
