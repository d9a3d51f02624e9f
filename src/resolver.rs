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
use crate::store::{MappingDocument, Position};

/// The classification of a button position against the mapping document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A named control such as "play" or "stop".
    NamedControl(String),
    /// A button with a clip assigned to it.
    AssignedAudio(String),
    /// A channel rack slot; carries the 0-based channel index.
    ChannelSlot(usize),
    /// No table knows this position; it is eligible for assignment.
    Unclassified,
}

/// Classifies a position by consulting the mapping document: named controls
/// first, then clip assignments, then the channel rack. The tables are
/// small (tens of entries), so linear scans are fine.
pub fn resolve(document: &MappingDocument, position: Position) -> Resolution {
    if let Some((name, _)) = document
        .controls()
        .iter()
        .find(|(_, entry)| entry.position() == position)
    {
        return Resolution::NamedControl(name.clone());
    }

    if let Some((clip, _)) = document
        .audio_assignments()
        .iter()
        .find(|(_, assignment)| assignment.position() == position)
    {
        return Resolution::AssignedAudio(clip.clone());
    }

    if let Some(index) = document
        .channel_rack()
        .iter()
        .position(|rack_position| *rack_position == position)
    {
        return Resolution::ChannelSlot(index);
    }

    Resolution::Unclassified
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use crate::color::Color;
    use crate::store::{test::test_document, Assignment, ControlEntry, MappingDocument};

    use super::*;

    #[test]
    fn named_controls_resolve_first() {
        let document = test_document(None);
        assert_eq!(
            resolve(&document, Position(176, 10)),
            Resolution::NamedControl("stop".to_string())
        );
        assert_eq!(
            resolve(&document, Position(176, 11)),
            Resolution::NamedControl("play".to_string())
        );
    }

    #[test]
    fn assignments_resolve_by_exact_position() {
        let document = test_document(None);
        assert_eq!(
            resolve(&document, Position(144, 3)),
            Resolution::AssignedAudio("snare.wav".to_string())
        );
        // Same note on a different status byte is a different button.
        assert_eq!(resolve(&document, Position(145, 3)), Resolution::Unclassified);
    }

    #[test]
    fn rack_slots_resolve_to_zero_based_indices() {
        let document = test_document(None);
        assert_eq!(
            resolve(&document, Position(153, 40)),
            Resolution::ChannelSlot(0)
        );
        assert_eq!(
            resolve(&document, Position(153, 47)),
            Resolution::ChannelSlot(7)
        );
    }

    #[test]
    fn controls_shadow_assignments() {
        // A position present in both tables must resolve as the control.
        let mut controls = HashMap::new();
        controls.insert(
            "stop".to_string(),
            ControlEntry(Position(144, 5), Color::Red),
        );
        let mut audio_assignments = HashMap::new();
        audio_assignments.insert(
            "kick.wav".to_string(),
            Assignment(Position(144, 5), Color::Yellow),
        );
        let document = MappingDocument::new(
            controls,
            test_document(None).channel_rack().to_vec(),
            audio_assignments,
            None,
        );

        assert_eq!(
            resolve(&document, Position(144, 5)),
            Resolution::NamedControl("stop".to_string())
        );
    }

    #[test]
    fn unknown_positions_are_unclassified() {
        let document = test_document(None);
        assert_eq!(resolve(&document, Position(0, 0)), Resolution::Unclassified);
        assert_eq!(
            resolve(&document, Position(144, 99)),
            Resolution::Unclassified
        );
    }
}
