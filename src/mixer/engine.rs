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

//! The render core: a fixed bank of playback channels mixed into an
//! interleaved output buffer. All operations are real-time safe; clips are
//! decoded ahead of time and shared as immutable buffers.

use std::{sync::Arc, time::Duration};

use super::CHANNEL_COUNT;

/// A fully decoded clip: interleaved f32 samples at the output rate.
#[derive(Debug, Clone)]
pub struct ClipBuffer {
    /// Number of interleaved channels.
    pub channels: usize,
    /// Interleaved sample data.
    pub samples: Arc<[f32]>,
}

impl ClipBuffer {
    /// The number of frames in the clip.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }
}

/// The transport state of one playback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stopped,
    Playing,
    Paused,
    FadingOut,
}

/// One playback channel: at most one sounding clip.
struct Channel {
    clip: Option<ClipBuffer>,
    frame_pos: usize,
    transport: Transport,
    gain: f32,
    fade_step: f32,
}

impl Channel {
    fn new() -> Channel {
        Channel {
            clip: None,
            frame_pos: 0,
            transport: Transport::Stopped,
            gain: 1.0,
            fade_step: 0.0,
        }
    }

    fn reset(&mut self) {
        self.clip = None;
        self.frame_pos = 0;
        self.transport = Transport::Stopped;
        self.gain = 1.0;
        self.fade_step = 0.0;
    }
}

/// The fixed bank of playback channels.
pub struct ChannelBank {
    channels: Vec<Channel>,
    out_channels: usize,
    sample_rate: u32,
}

impl ChannelBank {
    pub fn new(out_channels: usize, sample_rate: u32) -> ChannelBank {
        ChannelBank {
            channels: (0..CHANNEL_COUNT).map(|_| Channel::new()).collect(),
            out_channels,
            sample_rate,
        }
    }

    /// Starts the clip on the channel, interrupting whatever was playing.
    pub fn play(&mut self, index: usize, clip: ClipBuffer) {
        let Some(channel) = self.channels.get_mut(index) else {
            return;
        };

        channel.reset();
        channel.clip = Some(clip);
        channel.transport = Transport::Playing;
    }

    /// Pauses the channel. No-op unless it is playing.
    pub fn pause(&mut self, index: usize) {
        let Some(channel) = self.channels.get_mut(index) else {
            return;
        };

        if channel.transport == Transport::Playing {
            channel.transport = Transport::Paused;
        }
    }

    /// Resumes the channel. No-op unless it is paused.
    pub fn resume(&mut self, index: usize) {
        let Some(channel) = self.channels.get_mut(index) else {
            return;
        };

        if channel.transport == Transport::Paused {
            channel.transport = Transport::Playing;
        }
    }

    /// Stops the channel and releases its clip.
    pub fn stop(&mut self, index: usize) {
        if let Some(channel) = self.channels.get_mut(index) {
            channel.reset();
        }
    }

    /// Begins a linear gain ramp to silence over the given duration. The
    /// channel stops once the ramp completes. No-op unless it is playing.
    pub fn fadeout(&mut self, index: usize, duration: Duration) {
        let sample_rate = self.sample_rate;
        let Some(channel) = self.channels.get_mut(index) else {
            return;
        };

        if channel.transport != Transport::Playing {
            return;
        }

        let fade_frames = duration.as_secs_f32() * sample_rate as f32;
        if fade_frames < 1.0 {
            channel.reset();
            return;
        }

        channel.fade_step = channel.gain / fade_frames;
        channel.transport = Transport::FadingOut;
    }

    /// The transport state of the channel.
    pub fn transport(&self, index: usize) -> Transport {
        self.channels
            .get(index)
            .map(|channel| channel.transport)
            .unwrap_or(Transport::Stopped)
    }

    /// Mixes all sounding channels into the interleaved output buffer.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(0.0);

        if self.out_channels == 0 {
            return;
        }
        let frames = output.len() / self.out_channels;

        for channel in &mut self.channels {
            if !matches!(channel.transport, Transport::Playing | Transport::FadingOut) {
                continue;
            }

            let Some(clip) = channel.clip.clone() else {
                channel.reset();
                continue;
            };
            let clip_frames = clip.frames();

            for frame in 0..frames {
                if channel.frame_pos >= clip_frames {
                    // End of clip; clips play once.
                    channel.reset();
                    break;
                }

                let out_base = frame * self.out_channels;
                let clip_base = channel.frame_pos * clip.channels;
                for out_channel in 0..self.out_channels {
                    // Clips are decoded to the output layout; anything else
                    // folds down to the first clip channel.
                    let clip_channel = out_channel.min(clip.channels - 1);
                    output[out_base + out_channel] +=
                        clip.samples[clip_base + clip_channel] * channel.gain;
                }

                channel.frame_pos += 1;

                if channel.transport == Transport::FadingOut {
                    channel.gain -= channel.fade_step;
                    if channel.gain <= 0.0 {
                        channel.reset();
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(channels: usize, frames: usize, value: f32) -> ClipBuffer {
        ClipBuffer {
            channels,
            samples: Arc::from(vec![value; channels * frames].into_boxed_slice()),
        }
    }

    #[test]
    fn play_interrupts_the_previous_clip() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 10, 0.5));
        bank.play(0, clip(1, 10, 0.25));

        let mut output = vec![0.0; 4];
        bank.render(&mut output);
        assert!(output.iter().all(|&s| (s - 0.25).abs() < f32::EPSILON));
    }

    #[test]
    fn pause_only_when_playing() {
        let mut bank = ChannelBank::new(1, 100);

        bank.pause(0);
        assert_eq!(bank.transport(0), Transport::Stopped);

        bank.play(0, clip(1, 10, 0.5));
        bank.pause(0);
        assert_eq!(bank.transport(0), Transport::Paused);

        // Paused channels render silence and hold their position.
        let mut output = vec![1.0; 4];
        bank.render(&mut output);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn resume_only_when_paused() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 10, 0.5));

        bank.resume(0);
        assert_eq!(bank.transport(0), Transport::Playing);

        bank.pause(0);
        bank.resume(0);
        assert_eq!(bank.transport(0), Transport::Playing);
    }

    #[test]
    fn end_of_clip_stops_the_channel() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 3, 0.5));

        let mut output = vec![0.0; 8];
        bank.render(&mut output);

        assert_eq!(&output[..3], &[0.5, 0.5, 0.5]);
        assert!(output[3..].iter().all(|&s| s == 0.0));
        assert_eq!(bank.transport(0), Transport::Stopped);
    }

    #[test]
    fn fadeout_ramps_to_silence_and_stops() {
        // 100 Hz, 50ms fade: 5 frames of ramp.
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 100, 1.0));
        bank.fadeout(0, Duration::from_millis(50));
        assert_eq!(bank.transport(0), Transport::FadingOut);

        let mut output = vec![0.0; 10];
        bank.render(&mut output);

        // Monotonically decreasing, then silence once the ramp completes.
        assert_eq!(output[0], 1.0);
        assert!(output[1] < output[0]);
        assert!(output[4] < output[3]);
        assert!(output[6..].iter().all(|&s| s == 0.0));
        assert_eq!(bank.transport(0), Transport::Stopped);
    }

    #[test]
    fn zero_duration_fadeout_stops_immediately() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 100, 1.0));
        bank.fadeout(0, Duration::ZERO);
        assert_eq!(bank.transport(0), Transport::Stopped);
    }

    #[test]
    fn fadeout_is_a_no_op_when_paused() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(0, clip(1, 100, 1.0));
        bank.pause(0);
        bank.fadeout(0, Duration::from_millis(50));
        assert_eq!(bank.transport(0), Transport::Paused);
    }

    #[test]
    fn channels_mix_additively() {
        let mut bank = ChannelBank::new(2, 100);
        bank.play(0, clip(2, 10, 0.3));
        bank.play(1, clip(2, 10, 0.2));

        let mut output = vec![0.0; 8];
        bank.render(&mut output);
        assert!(output.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn mono_clips_render_to_stereo_output() {
        let mut bank = ChannelBank::new(2, 100);
        bank.play(0, clip(1, 4, 0.5));

        let mut output = vec![0.0; 8];
        bank.render(&mut output);
        assert!(output.iter().all(|&s| (s - 0.5).abs() < f32::EPSILON));
    }

    #[test]
    fn out_of_range_channels_are_ignored() {
        let mut bank = ChannelBank::new(1, 100);
        bank.play(CHANNEL_COUNT, clip(1, 10, 0.5));
        bank.pause(CHANNEL_COUNT);
        bank.stop(CHANNEL_COUNT);
        assert_eq!(bank.transport(CHANNEL_COUNT), Transport::Stopped);
    }
}
