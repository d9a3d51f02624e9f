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

//! Clip decoding: turns an audio file into an interleaved f32 buffer
//! matching the output stream's channel layout and sample rate.

use std::{fs::File, path::Path, sync::Arc};

use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use super::engine::ClipBuffer;
use super::ClipError;

/// Decodes the clip at the given path. The clip must match the output
/// sample rate; there is no resampling.
pub fn decode_clip(
    path: &Path,
    output_channels: usize,
    output_rate: u32,
) -> Result<ClipBuffer, ClipError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ClipError::NotFound(path.to_path_buf())
        } else {
            ClipError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let decode_error = |e: SymphoniaError| ClipError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| ClipError::Decode {
        path: path.to_path_buf(),
        reason: "no default track".to_string(),
    })?;
    let clip_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ClipError::Decode {
            path: path.to_path_buf(),
            reason: "missing sample rate".to_string(),
        })?;
    let file_channels = track
        .codec_params
        .channels
        .ok_or_else(|| ClipError::Decode {
            path: path.to_path_buf(),
            reason: "missing channel description".to_string(),
        })?
        .count();

    if clip_rate != output_rate {
        return Err(ClipError::SampleRateMismatch {
            clip_rate,
            output_rate,
        });
    }

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(decode_error(err)),
        };

        let audio_buf = decoder.decode(&packet).map_err(decode_error)?;
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let mapped = map_channels(decoded, file_channels, output_channels)?;

    Ok(ClipBuffer {
        channels: output_channels,
        samples: Arc::from(mapped.into_boxed_slice()),
    })
}

/// Maps interleaved samples between channel layouts: mono fans out to any
/// width, stereo folds down to mono, identical layouts pass through.
fn map_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, ClipError> {
    if file_channels == output_channels {
        return Ok(samples);
    }

    match (file_channels, output_channels) {
        (1, n) if n > 1 => {
            let mut out = Vec::with_capacity(samples.len() * n);
            for s in samples {
                for _ in 0..n {
                    out.push(s);
                }
            }
            Ok(out)
        }
        (2, 1) => {
            let mut out = Vec::with_capacity(samples.len() / 2);
            for frame in samples.chunks_exact(2) {
                out.push((frame[0] + frame[1]) * 0.5);
            }
            Ok(out)
        }
        _ => Err(ClipError::UnsupportedChannels {
            file_channels,
            output_channels,
        }),
    }
}
