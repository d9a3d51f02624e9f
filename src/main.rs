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
mod board;
mod color;
mod config;
mod mixer;
mod playsync;
mod resolver;
mod store;
mod surface;
mod testutil;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use tracing::error;

use crate::board::{Options, Soundboard};
use crate::color::{ColorController, Palette};
use crate::config::Config;
use crate::mixer::Mixer;
use crate::playsync::CancelHandle;
use crate::store::Store;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=grid-controller soundboard

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/padboard
ExecStart=/usr/local/bin/padboard start "$PADBOARD_CONFIG"
ExecReload=/bin/kill -HUP $MAINPID

[Install]
WantedBy=multi-user.target
Alias=padboard.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A grid-controller soundboard."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Summarizes the mapping document.
    Mappings {
        /// The path to the soundboard config.
        config_path: String,
    },
    /// Lists the audio clips not yet assigned to a button.
    Unassigned {
        /// The path to the soundboard config.
        config_path: String,
    },
    /// Assigns a clip to the pending button position.
    Assign {
        /// The path to the soundboard config.
        config_path: String,
        /// The clip file name inside the audio directory.
        clip_id: String,
    },
    /// Start will start the soundboard.
    Start {
        /// The path to the soundboard config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = mixer::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = surface::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Mappings { config_path } => {
            let config = Config::load(Path::new(&config_path))?;
            let document = Store::new(config.mapping_file()).load()?;

            let mut controls: Vec<_> = document.controls().iter().collect();
            controls.sort_by_key(|(name, _)| name.to_string());
            println!("Controls (count: {}):", controls.len());
            for (name, entry) in controls {
                println!("- {}: {}", name, entry.position());
            }

            println!("\nChannel rack:");
            for (index, position) in document.channel_rack().iter().enumerate() {
                println!("- channel {}: {}", index, position);
            }

            let mut assignments: Vec<_> = document.audio_assignments().iter().collect();
            assignments.sort_by_key(|(clip, _)| clip.to_string());
            println!("\nAudio assignments (count: {}):", assignments.len());
            for (clip, assignment) in assignments {
                println!("- {}: {}", clip, assignment.position());
            }

            match document.pending_assignment() {
                Some(position) => println!("\nPending assignment: {}", position),
                None => println!("\nNo pending assignment."),
            }
        }
        Commands::Unassigned { config_path } => {
            let config = Config::load(Path::new(&config_path))?;
            let store = Store::new(config.mapping_file());
            let clips = store.unassigned_clips(config.audio_dir())?;

            if clips.is_empty() {
                println!("No unassigned clips.");
                return Ok(());
            }

            println!("Unassigned clips:");
            for clip in clips {
                println!("- {}", clip);
            }
        }
        Commands::Assign {
            config_path,
            clip_id,
        } => {
            let config = Config::load(Path::new(&config_path))?;
            if !config.audio_dir().join(&clip_id).is_file() {
                return Err(format!(
                    "no clip named {} in {}",
                    clip_id,
                    config.audio_dir().display()
                )
                .into());
            }

            let store = Store::new(config.mapping_file());
            let assignment = store.commit_assignment(&clip_id, config.assignment_color())?;
            println!("Assigned {} to {}.", clip_id, assignment.position());
        }
        Commands::Start { config_path } => {
            let config = Config::load(Path::new(&config_path))?;

            let surface_device = surface::get_device(config.surface_device())?;
            let mixer_device = mixer::get_device(config.audio_device())?;
            let mixer = Mixer::new(
                mixer_device,
                PathBuf::from(config.audio_dir()),
                config.live_device(),
                config.fadeout_duration()?,
            );

            let mut soundboard = Soundboard::new(
                surface_device.clone(),
                ColorController::new(surface_device, Palette::default()),
                mixer,
                Store::new(config.mapping_file()),
                Options {
                    poll_batch: config.poll_batch(),
                    tick_interval: config.tick_interval()?,
                },
            );

            let cancel_handle = CancelHandle::new();
            {
                let cancel_handle = cancel_handle.clone();
                tokio::spawn(async move {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!(err = %e, "Error waiting for interrupt signal.");
                    }
                    cancel_handle.cancel();
                });
            }

            // Box<dyn Error> is not Send, so the error crosses the task
            // boundary as a string.
            tokio::task::spawn_blocking(move || {
                soundboard.run(cancel_handle).map_err(|e| e.to_string())
            })
            .await??;
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
