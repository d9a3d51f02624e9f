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
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;

use super::{engine::Transport, ClipError, CHANNEL_COUNT};

/// A transport operation recorded by the mock playback device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Play { channel: usize, clip: PathBuf },
    Pause(usize),
    Resume(usize),
    Stop(usize),
    Fadeout(usize, Duration),
}

/// A mock playback device. Records every transport call and tracks a
/// simplified per-channel transport state. Clips whose file name starts
/// with "missing" fail to load.
#[derive(Clone)]
pub struct Device {
    name: String,
    calls: Arc<Mutex<Vec<Call>>>,
    transports: Arc<Mutex<[Transport; CHANNEL_COUNT]>>,
}

impl Device {
    /// Gets the mock playback device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            transports: Arc::new(Mutex::new([Transport::Stopped; CHANNEL_COUNT])),
        }
    }

    /// The transport calls recorded so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// The simplified transport state of the channel.
    pub fn transport(&self, channel: usize) -> Transport {
        self.transports
            .lock()
            .get(channel)
            .copied()
            .unwrap_or(Transport::Stopped)
    }

    fn check_channel(&self, channel: usize) -> Result<(), ClipError> {
        if channel >= CHANNEL_COUNT {
            return Err(ClipError::BadChannel(channel));
        }
        Ok(())
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn play(&self, channel: usize, clip: &Path) -> Result<(), ClipError> {
        self.check_channel(channel)?;

        let missing = clip
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("missing"));
        if missing {
            return Err(ClipError::NotFound(clip.to_path_buf()));
        }

        self.calls.lock().push(Call::Play {
            channel,
            clip: clip.to_path_buf(),
        });
        self.transports.lock()[channel] = Transport::Playing;
        Ok(())
    }

    fn pause(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.calls.lock().push(Call::Pause(channel));

        let mut transports = self.transports.lock();
        if transports[channel] == Transport::Playing {
            transports[channel] = Transport::Paused;
        }
        Ok(())
    }

    fn resume(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.calls.lock().push(Call::Resume(channel));

        let mut transports = self.transports.lock();
        if transports[channel] == Transport::Paused {
            transports[channel] = Transport::Playing;
        }
        Ok(())
    }

    fn stop(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.calls.lock().push(Call::Stop(channel));
        self.transports.lock()[channel] = Transport::Stopped;
        Ok(())
    }

    fn fadeout(&self, channel: usize, duration: Duration) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.calls.lock().push(Call::Fadeout(channel, duration));
        self.transports.lock()[channel] = Transport::Stopped;
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn std::error::Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::super::Device as _;
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mock = Device::get("mock-mixer");

        mock.play(0, Path::new("/audio/kick.wav")).unwrap();
        mock.pause(0).unwrap();
        mock.resume(0).unwrap();
        mock.stop(0).unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                Call::Play {
                    channel: 0,
                    clip: PathBuf::from("/audio/kick.wav"),
                },
                Call::Pause(0),
                Call::Resume(0),
                Call::Stop(0),
            ]
        );
    }

    #[test]
    fn tracks_transport_state() {
        let mock = Device::get("mock-mixer");
        assert_eq!(mock.transport(0), Transport::Stopped);

        mock.play(0, Path::new("/audio/kick.wav")).unwrap();
        assert_eq!(mock.transport(0), Transport::Playing);

        mock.pause(0).unwrap();
        assert_eq!(mock.transport(0), Transport::Paused);

        // Pausing a stopped channel leaves it stopped.
        mock.stop(0).unwrap();
        mock.pause(0).unwrap();
        assert_eq!(mock.transport(0), Transport::Stopped);
    }

    #[test]
    fn missing_clips_fail_to_load() {
        let mock = Device::get("mock-mixer");

        assert!(matches!(
            mock.play(0, Path::new("/audio/missing.wav")),
            Err(ClipError::NotFound(_))
        ));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn out_of_range_channels_are_rejected() {
        let mock = Device::get("mock-mixer");

        assert!(matches!(
            mock.play(CHANNEL_COUNT, Path::new("/audio/kick.wav")),
            Err(ClipError::BadChannel(_))
        ));
    }
}
