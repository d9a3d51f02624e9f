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
use std::{error::Error, fmt, sync::Arc};

use crate::store::Position;

mod midir;
pub mod mock;

/// A button event reported by the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The button that produced the event.
    pub position: Position,
    /// The velocity of the event. Zero denotes a button release on this
    /// class of device.
    pub velocity: u8,
}

impl Event {
    /// Builds an event from the raw bytes of a MIDI message. Messages
    /// shorter than three bytes carry no button information.
    pub fn from_raw(raw: &[u8]) -> Option<Event> {
        if raw.len() < 3 {
            return None;
        }

        Some(Event {
            position: Position(raw[0], raw[1]),
            velocity: raw[2],
        })
    }
}

/// A grid-button control surface: a non-blocking source of button events
/// and a sink for LED color commands.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Returns up to `max` buffered button events. Never blocks; returns
    /// an empty vector when no events are waiting.
    fn poll(&self, max: usize) -> Result<Vec<Event>, Box<dyn Error>>;

    /// Writes a single color command to the device.
    fn write(&self, status: u8, note: u8, value: u8) -> Result<(), Box<dyn Error>>;

    /// Closes the device connections. Polls and writes fail afterwards.
    fn close(&self);

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists control surfaces known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets and opens a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_from_raw_needs_three_bytes() {
        assert_eq!(Event::from_raw(&[]), None);
        assert_eq!(Event::from_raw(&[144]), None);
        assert_eq!(Event::from_raw(&[144, 3]), None);
        assert_eq!(
            Event::from_raw(&[144, 3, 127]),
            Some(Event {
                position: Position(144, 3),
                velocity: 127,
            })
        );
        // Trailing bytes are ignored.
        assert_eq!(
            Event::from_raw(&[153, 40, 0, 99]),
            Some(Event {
                position: Position(153, 40),
                velocity: 0,
            })
        );
    }
}
