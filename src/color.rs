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
use std::{collections::HashMap, error::Error, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{MappingDocument, Position};
use crate::surface;

/// The status byte used for default grid addressing.
const DEFAULT_GRID_STATUS: u8 = 144;

/// The number of notes in the default addressable grid.
const DEFAULT_GRID_SIZE: u8 = 128;

/// LED off.
const OFF: u8 = 0;

/// The logical color palette of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    LightGreen,
    LightRed,
}

/// Maps logical colors to device color codes. Passed explicitly into the
/// color controller; a color absent from the table is treated as invalid
/// and writes for it are dropped.
#[derive(Debug, Clone)]
pub struct Palette {
    codes: HashMap<Color, u8>,
}

impl Palette {
    pub fn new(codes: HashMap<Color, u8>) -> Palette {
        Palette { codes }
    }

    /// The device code for the given color, if the palette knows it.
    pub fn code(&self, color: Color) -> Option<u8> {
        self.codes.get(&color).copied()
    }
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            codes: HashMap::from([
                (Color::Red, 3),
                (Color::Orange, 31),
                (Color::Yellow, 62),
                (Color::Green, 60),
                (Color::LightGreen, 56),
                (Color::LightRed, 1),
            ]),
        }
    }
}

/// Selects the device addressing mode for a color write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The fixed default grid (status byte 144).
    Default,
    /// Channel rack addressing: the position's own status byte.
    Rack,
}

impl Layer {
    fn status(&self, position: Position) -> u8 {
        match self {
            Layer::Default => DEFAULT_GRID_STATUS,
            Layer::Rack => position.status(),
        }
    }
}

/// Writes LED color feedback to the control surface.
pub struct ColorController {
    surface: Arc<dyn surface::Device>,
    palette: Palette,
}

impl ColorController {
    pub fn new(surface: Arc<dyn surface::Device>, palette: Palette) -> ColorController {
        ColorController { surface, palette }
    }

    /// Sets the color of a single button. A color missing from the palette
    /// is silently ignored; it may originate from stale persisted data and
    /// must never bring the loop down.
    pub fn set(&self, position: Position, color: Color, layer: Layer) -> Result<(), Box<dyn Error>> {
        let code = match self.palette.code(color) {
            Some(code) => code,
            None => {
                debug!(color = ?color, "Color not in palette, ignoring.");
                return Ok(());
            }
        };

        self.surface
            .write(layer.status(position), position.note(), code)
    }

    /// Turns a single button off.
    pub fn off(&self, position: Position, layer: Layer) -> Result<(), Box<dyn Error>> {
        self.surface
            .write(layer.status(position), position.note(), OFF)
    }

    /// Turns every addressable button off: all channel rack positions plus
    /// the full default grid.
    pub fn all_off(&self, channel_rack: &[Position]) -> Result<(), Box<dyn Error>> {
        for position in channel_rack {
            self.off(*position, Layer::Rack)?;
        }
        for note in 0..DEFAULT_GRID_SIZE {
            self.surface.write(DEFAULT_GRID_STATUS, note, OFF)?;
        }

        Ok(())
    }

    /// Paints every named control in its stored color.
    pub fn paint_controls(&self, document: &MappingDocument) -> Result<(), Box<dyn Error>> {
        for entry in document.controls().values() {
            self.set(entry.position(), entry.color(), Layer::Default)?;
        }

        Ok(())
    }

    /// Paints every assigned clip button, either in its working color or in
    /// a single override color (orange for "ready", red for "occupied").
    pub fn paint_assignments(
        &self,
        document: &MappingDocument,
        override_color: Option<Color>,
    ) -> Result<(), Box<dyn Error>> {
        for assignment in document.audio_assignments().values() {
            let color = override_color.unwrap_or_else(|| assignment.color());
            self.set(assignment.position(), color, Layer::Default)?;
        }

        Ok(())
    }

    /// Paints the channel rack, highlighting the active channel.
    pub fn paint_rack(
        &self,
        document: &MappingDocument,
        active_channel: usize,
    ) -> Result<(), Box<dyn Error>> {
        for (index, position) in document.channel_rack().iter().enumerate() {
            let color = if index == active_channel {
                Color::LightGreen
            } else {
                Color::LightRed
            };
            self.set(*position, color, Layer::Rack)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use std::error::Error;
    use std::sync::Arc;

    use crate::store::test::test_document;
    use crate::surface;

    use super::*;

    fn controller() -> (ColorController, Arc<surface::mock::Device>) {
        let mock = Arc::new(surface::mock::Device::get("mock-surface"));
        let controller = ColorController::new(mock.clone(), Palette::default());
        (controller, mock)
    }

    #[test]
    fn color_names() -> Result<(), Box<dyn Error>> {
        assert_eq!(serde_json::to_string(&Color::LightGreen)?, "\"lightgreen\"");
        assert_eq!(serde_json::to_string(&Color::Red)?, "\"red\"");
        assert_eq!(
            serde_json::from_str::<Color>("\"lightred\"")?,
            Color::LightRed
        );
        assert!(serde_json::from_str::<Color>("\"ultraviolet\"").is_err());
        Ok(())
    }

    #[test]
    fn set_uses_the_layer_status_byte() -> Result<(), Box<dyn Error>> {
        let (controller, mock) = controller();

        controller.set(Position(176, 10), Color::Green, Layer::Default)?;
        controller.set(Position(176, 10), Color::Green, Layer::Rack)?;

        assert_eq!(mock.writes(), vec![(144, 10, 60), (176, 10, 60)]);
        Ok(())
    }

    #[test]
    fn unknown_palette_entry_is_ignored() -> Result<(), Box<dyn Error>> {
        let mock = Arc::new(surface::mock::Device::get("mock-surface"));
        let palette = Palette::new(HashMap::from([(Color::Red, 3)]));
        let controller = ColorController::new(mock.clone(), palette);

        controller.set(Position(144, 1), Color::Orange, Layer::Default)?;
        assert!(mock.writes().is_empty());

        controller.set(Position(144, 1), Color::Red, Layer::Default)?;
        assert_eq!(mock.writes(), vec![(144, 1, 3)]);
        Ok(())
    }

    #[test]
    fn all_off_covers_rack_and_grid() -> Result<(), Box<dyn Error>> {
        let (controller, mock) = controller();
        let document = test_document(None);

        controller.all_off(document.channel_rack())?;

        let writes = mock.writes();
        assert_eq!(writes.len(), document.channel_rack().len() + 128);
        assert!(writes.iter().all(|(_, _, value)| *value == 0));
        assert_eq!(writes[0], (153, 40, 0));
        Ok(())
    }

    #[test]
    fn paint_rack_highlights_the_active_channel() -> Result<(), Box<dyn Error>> {
        let (controller, mock) = controller();
        let document = test_document(None);

        controller.paint_rack(&document, 2)?;

        let writes = mock.writes();
        assert_eq!(writes.len(), document.channel_rack().len());
        for (index, write) in writes.iter().enumerate() {
            let expected = if index == 2 { 56 } else { 1 };
            assert_eq!(*write, (153, 40 + index as u8, expected));
        }
        Ok(())
    }
}
