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
    collections::HashMap,
    error::Error,
    fmt,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info};

use super::{
    engine::{ChannelBank, ClipBuffer},
    loader, ClipError, CHANNEL_COUNT,
};

/// A transport command sent into the audio callback. Clips arrive fully
/// decoded so the callback never touches the filesystem.
enum Command {
    Play(usize, ClipBuffer),
    Pause(usize),
    Resume(usize),
    Stop(usize),
    Fadeout(usize, Duration),
}

/// A playback device backed by a cpal output stream. The stream runs on a
/// dedicated thread (cpal streams cannot be sent across threads); transport
/// commands reach the callback over a channel and are drained at the top of
/// every render pass.
pub struct Device {
    /// The name of the underlying cpal device.
    name: String,
    /// Sends transport commands into the audio callback.
    commands: crossbeam_channel::Sender<Command>,
    /// The output stream sample rate.
    sample_rate: u32,
    /// The number of output channels.
    out_channels: usize,
    /// Decoded clips, cached per path.
    clips: Mutex<HashMap<PathBuf, ClipBuffer>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={} Hz)",
            self.name, self.out_channels, self.sample_rate
        )
    }
}

/// Lists the names of all output devices on the default host.
pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for device in host.output_devices()? {
        names.push(device.name()?);
    }
    Ok(names)
}

impl Device {
    /// Gets the playback device with the given name and starts its output
    /// stream. An empty name or "default" selects the default output device;
    /// any other name must match exactly one device as a substring.
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();

        let cpal_device = if name.is_empty() || name == "default" {
            host.default_output_device()
                .ok_or("no default audio output device")?
        } else {
            let mut matches: Vec<cpal::Device> = Vec::new();
            for device in host.output_devices()? {
                if device.name()?.contains(name) {
                    matches.push(device);
                }
            }
            match matches.len() {
                0 => return Err(format!("no audio device found matching {}", name).into()),
                1 => matches.remove(0),
                count => {
                    return Err(format!(
                        "found {} audio devices matching {}, provide a more specific name",
                        count, name
                    )
                    .into())
                }
            }
        };

        let device_name = cpal_device.name()?;
        let supported_config = cpal_device.default_output_config()?;
        let sample_rate = supported_config.sample_rate();
        let out_channels = usize::from(supported_config.channels());

        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        let (startup_sender, startup_receiver) = crossbeam_channel::bounded::<Option<String>>(1);

        // The stream has to be created on the thread that owns it.
        let stream_config: cpal::StreamConfig = supported_config.into();
        let thread_name = device_name.clone();
        thread::Builder::new()
            .name("mixer-output".into())
            .spawn(move || {
                let mut bank = ChannelBank::new(usize::from(stream_config.channels), sample_rate);

                let stream = cpal_device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        while let Ok(command) = command_receiver.try_recv() {
                            match command {
                                Command::Play(channel, clip) => bank.play(channel, clip),
                                Command::Pause(channel) => bank.pause(channel),
                                Command::Resume(channel) => bank.resume(channel),
                                Command::Stop(channel) => bank.stop(channel),
                                Command::Fadeout(channel, duration) => {
                                    bank.fadeout(channel, duration)
                                }
                            }
                        }

                        bank.render(data);
                    },
                    |err| {
                        error!(err = err.to_string(), "Audio output stream error.");
                    },
                    None,
                );

                let stream = match stream.map_err(|e| e.to_string()).and_then(|stream| {
                    stream.play().map_err(|e| e.to_string())?;
                    Ok(stream)
                }) {
                    Ok(stream) => stream,
                    Err(err) => {
                        let _ = startup_sender.send(Some(err));
                        return;
                    }
                };

                info!(device = thread_name, "Audio output stream started.");
                let _ = startup_sender.send(None);

                // Keep the stream alive for the life of the process.
                let _stream = stream;
                loop {
                    thread::sleep(Duration::from_secs(3600));
                }
            })?;

        if let Some(err) = startup_receiver.recv()? {
            return Err(format!("unable to start audio output stream: {}", err).into());
        }

        Ok(Device {
            name: device_name,
            commands: command_sender,
            sample_rate,
            out_channels,
            clips: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the decoded clip for the path, decoding and caching it on
    /// first use.
    fn clip(&self, path: &Path) -> Result<ClipBuffer, ClipError> {
        let mut clips = self.clips.lock();
        if let Some(clip) = clips.get(path) {
            return Ok(clip.clone());
        }

        let clip = loader::decode_clip(path, self.out_channels, self.sample_rate)?;
        clips.insert(path.to_path_buf(), clip.clone());
        Ok(clip)
    }

    fn send(&self, command: Command) -> Result<(), ClipError> {
        self.commands
            .send(command)
            .map_err(|_| ClipError::Unavailable("audio output stream is gone".to_string()))
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
        let clip = self.clip(clip)?;
        self.send(Command::Play(channel, clip))
    }

    fn pause(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.send(Command::Pause(channel))
    }

    fn resume(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.send(Command::Resume(channel))
    }

    fn stop(&self, channel: usize) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.send(Command::Stop(channel))
    }

    fn fadeout(&self, channel: usize, duration: Duration) -> Result<(), ClipError> {
        self.check_channel(channel)?;
        self.send(Command::Fadeout(channel, duration))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<std::sync::Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock playback device".into())
    }
}
