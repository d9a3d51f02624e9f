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

//! The soundboard state machine: polls the control surface, resolves each
//! button event against the mapping document, and drives the mixer, the
//! LED feedback, and the assignment workflow.

use std::{error::Error, sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::{
    color::{Color, ColorController, Layer},
    mixer::Mixer,
    playsync::CancelHandle,
    resolver::{resolve, Resolution},
    store::{MappingDocument, Position, Store},
    surface,
};

/// The assignment workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Normal operation: events play clips and drive controls.
    Idle,
    /// A pending position is persisted and waits for a collaborator to
    /// supply a clip identifier.
    AwaitingAssignment,
}

/// Everything the soundboard needs beyond its devices. Passed in
/// explicitly; the board holds no ambient state.
pub struct Options {
    /// Maximum number of surface events consumed per tick.
    pub poll_batch: usize,
    /// The loop cadence.
    pub tick_interval: Duration,
}

/// The soundboard. Owns the control surface, the color controller, the
/// mixer and the mapping store, and runs the poll-dispatch-act loop.
pub struct Soundboard {
    surface: Arc<dyn surface::Device>,
    colors: ColorController,
    mixer: Mixer,
    store: Store,
    options: Options,
    state: State,
    testing_mode: bool,
    selected_channel: usize,
}

impl Soundboard {
    pub fn new(
        surface: Arc<dyn surface::Device>,
        colors: ColorController,
        mixer: Mixer,
        store: Store,
        options: Options,
    ) -> Soundboard {
        Soundboard {
            surface,
            colors,
            mixer,
            store,
            options,
            state: State::Idle,
            testing_mode: false,
            selected_channel: 0,
        }
    }

    /// The current assignment workflow state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether testing mode is active.
    pub fn testing_mode(&self) -> bool {
        self.testing_mode
    }

    /// The currently selected playback channel.
    pub fn selected_channel(&self) -> usize {
        self.selected_channel
    }

    /// Paints the startup interface and clears any stale pending
    /// assignment. A missing or corrupt mapping document is fatal here.
    pub fn init(&mut self) -> Result<(), Box<dyn Error>> {
        let document = self.store.load()?;

        self.colors.all_off(document.channel_rack())?;
        self.colors.paint_controls(&document)?;
        self.colors.paint_assignments(&document, Some(Color::Orange))?;

        if document.pending_assignment().is_some() {
            info!("Clearing stale pending assignment.");
            if let Err(e) = self.store.clear_pending() {
                warn!(err = %e, "Unable to clear stale pending assignment.");
            }
        }

        self.colors.paint_rack(&document, self.selected_channel)?;

        info!(surface = self.surface.name(), "Soundboard ready.");
        Ok(())
    }

    /// Runs the control loop until the cancel handle fires, then closes
    /// the surface. Surface failures abort the loop; the surface is still
    /// closed on the way out.
    pub fn run(&mut self, cancel_handle: CancelHandle) -> Result<(), Box<dyn Error>> {
        self.init()?;

        let result = loop {
            if cancel_handle.wait_timeout(self.options.tick_interval) {
                break Ok(());
            }
            if let Err(e) = self.tick() {
                break Err(e);
            }
        };

        info!("Soundboard stopping.");
        self.surface.close();
        result
    }

    /// Runs one tick: re-synchronizes with the store, then drains and
    /// dispatches a bounded batch of surface events.
    pub fn tick(&mut self) -> Result<(), Box<dyn Error>> {
        // Always re-read; a collaborator may have committed an assignment
        // since the last tick.
        let document = match self.store.load() {
            Ok(document) => document,
            Err(e) => {
                error!(err = %e, "Unable to read mapping document, skipping tick.");
                return Ok(());
            }
        };

        if self.state == State::AwaitingAssignment && document.pending_assignment().is_none() {
            info!("Pending assignment committed externally.");
            self.state = State::Idle;
            self.repaint(&document)?;
        }

        for event in self.surface.poll(self.options.poll_batch)? {
            self.dispatch(&document, event)?;
        }

        Ok(())
    }

    fn dispatch(
        &mut self,
        document: &MappingDocument,
        event: surface::Event,
    ) -> Result<(), Box<dyn Error>> {
        // The device emits a velocity-0 release after every press; releases
        // never trigger anything.
        if event.velocity == 0 {
            return Ok(());
        }

        match resolve(document, event.position) {
            Resolution::NamedControl(name) => self.dispatch_control(document, &name),
            Resolution::AssignedAudio(clip) => self.dispatch_audio(document, &clip),
            Resolution::ChannelSlot(index) => self.select_channel(document, index),
            Resolution::Unclassified => self.begin_assignment(document, event.position),
        }
    }

    fn dispatch_control(
        &mut self,
        document: &MappingDocument,
        name: &str,
    ) -> Result<(), Box<dyn Error>> {
        match name {
            "play" => {
                if let Err(e) = self.mixer.resume() {
                    error!(err = %e, "Unable to resume channel.");
                }
            }
            "pause" => {
                if let Err(e) = self.mixer.pause() {
                    error!(err = %e, "Unable to pause channel.");
                }
            }
            "stop" => {
                if let Err(e) = self.mixer.stop() {
                    error!(err = %e, "Unable to stop channel.");
                }
            }
            "fadeout" => {
                if let Err(e) = self.mixer.fadeout_default() {
                    error!(err = %e, "Unable to fade out channel.");
                }
            }
            "toggle_testmode" => {
                self.testing_mode = !self.testing_mode;
                info!(testing_mode = self.testing_mode, "Toggled testing mode.");
                if let Some(entry) = document.controls().get(name) {
                    let color = if self.testing_mode {
                        Color::Green
                    } else {
                        Color::Red
                    };
                    self.colors.set(entry.position(), color, Layer::Default)?;
                }
            }
            other => {
                warn!(control = other, "Unknown named control, ignoring.");
            }
        }

        Ok(())
    }

    fn dispatch_audio(
        &mut self,
        document: &MappingDocument,
        clip: &str,
    ) -> Result<(), Box<dyn Error>> {
        if self.state == State::AwaitingAssignment {
            // Any assigned button cancels an in-flight assignment.
            info!(clip, "Cancelling pending assignment.");
            self.state = State::Idle;
            if let Err(e) = self.store.clear_pending() {
                warn!(err = %e, "Unable to clear pending assignment.");
            }
            return self.repaint(document);
        }

        if let Err(e) = self.mixer.play(clip, self.testing_mode) {
            error!(err = %e, clip, "Unable to play clip.");
        }
        Ok(())
    }

    fn select_channel(
        &mut self,
        document: &MappingDocument,
        index: usize,
    ) -> Result<(), Box<dyn Error>> {
        if index == self.selected_channel {
            return Ok(());
        }

        info!(channel = index, "Switching channel.");
        self.colors.paint_rack(document, index)?;
        self.selected_channel = index;
        self.mixer.select(index);
        Ok(())
    }

    fn begin_assignment(
        &mut self,
        document: &MappingDocument,
        position: Position,
    ) -> Result<(), Box<dyn Error>> {
        // Persist first; an unpersisted pending position would strand the
        // collaborator commit.
        if let Err(e) = self.store.set_pending(position) {
            error!(err = %e, "Unable to persist pending assignment.");
            return Ok(());
        }

        info!(position = %position, "Awaiting assignment.");
        self.state = State::AwaitingAssignment;

        self.colors.all_off(document.channel_rack())?;
        self.colors.paint_assignments(document, Some(Color::Red))?;
        self.colors.set(position, Color::Green, Layer::Default)?;
        Ok(())
    }

    /// Repaints the full interface: everything off, controls and
    /// assignments in their working colors, rack at the selected channel.
    fn repaint(&self, document: &MappingDocument) -> Result<(), Box<dyn Error>> {
        self.colors.all_off(document.channel_rack())?;
        self.colors.paint_controls(document)?;
        self.colors.paint_assignments(document, None)?;
        self.colors.paint_rack(document, self.selected_channel)
    }
}
