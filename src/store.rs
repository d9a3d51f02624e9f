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
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::mixer::CHANNEL_COUNT;

/// Typed error for mapping store failures so callers can distinguish a
/// missing or corrupt document from a rejected assignment.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unable to read mapping file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to write mapping file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("mapping file {path} is not well-formed: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("channel rack must have exactly {expected} positions, found {found}")]
    BadChannelRack { expected: usize, found: usize },
    #[error("no assignment is pending")]
    NothingPending,
    #[error("clip {0} is already assigned")]
    AlreadyAssigned(String),
    #[error("position {0} is already in use")]
    PositionOccupied(Position),
    #[error("unable to list audio directory {path}: {source}")]
    ListAudio {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A position descriptor: the raw status byte and note number that identify
/// one physical button on the surface. Serializes as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position(pub u8, pub u8);

impl Position {
    /// The status byte the device reports for this button.
    pub fn status(&self) -> u8 {
        self.0
    }

    /// The note number of this button.
    pub fn note(&self) -> u8 {
        self.1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// A named control's button position and the color it is painted at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlEntry(pub Position, pub Color);

impl ControlEntry {
    pub fn position(&self) -> Position {
        self.0
    }

    pub fn color(&self) -> Color {
        self.1
    }
}

/// An audio assignment: the button position a clip is bound to and the
/// clip's working color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment(pub Position, pub Color);

impl Assignment {
    pub fn position(&self) -> Position {
        self.0
    }

    pub fn color(&self) -> Color {
        self.1
    }
}

/// The persisted mapping document. This is the sole source of truth for
/// button bindings; the soundboard re-reads it on every logical access so
/// that concurrent editors (e.g. a front-end) are always observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDocument {
    /// Named controls (play, pause, stop, fadeout, toggle_testmode).
    controls: HashMap<String, ControlEntry>,
    /// The selectable playback channel buttons, in channel index order.
    channel_rack: Vec<Position>,
    /// Clip id to button binding.
    audio_assignments: HashMap<String, Assignment>,
    /// The single in-flight assignment workflow position, if any.
    /// On the wire this is `false` when absent for compatibility with
    /// documents written by earlier versions.
    #[serde(with = "pending")]
    pending_assignment: Option<Position>,
}

impl MappingDocument {
    pub fn new(
        controls: HashMap<String, ControlEntry>,
        channel_rack: Vec<Position>,
        audio_assignments: HashMap<String, Assignment>,
        pending_assignment: Option<Position>,
    ) -> MappingDocument {
        MappingDocument {
            controls,
            channel_rack,
            audio_assignments,
            pending_assignment,
        }
    }

    /// The named control table.
    pub fn controls(&self) -> &HashMap<String, ControlEntry> {
        &self.controls
    }

    /// The channel rack positions, in channel index order.
    pub fn channel_rack(&self) -> &[Position] {
        &self.channel_rack
    }

    /// The clip assignment table.
    pub fn audio_assignments(&self) -> &HashMap<String, Assignment> {
        &self.audio_assignments
    }

    /// The position awaiting a clip id, if an assignment is in flight.
    pub fn pending_assignment(&self) -> Option<Position> {
        self.pending_assignment
    }

    /// Returns true if the given position is already bound to a control,
    /// a channel rack slot, or an assigned clip.
    pub fn position_in_use(&self, position: Position) -> bool {
        self.controls
            .values()
            .any(|entry| entry.position() == position)
            || self.channel_rack.contains(&position)
            || self
                .audio_assignments
                .values()
                .any(|assignment| assignment.position() == position)
    }
}

/// Wire format for the pending assignment: `false` when unset, a position
/// array when set.
mod pending {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Position;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Disabled(bool),
        Set(Position),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<Position>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(position) => position.serialize(serializer),
            None => false.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Position>, D::Error> {
        match Wire::deserialize(deserializer)? {
            Wire::Disabled(_) => Ok(None),
            Wire::Set(position) => Ok(Some(position)),
        }
    }
}

/// The mapping store reads and writes the persisted document. There is no
/// caching: every operation is a full read (and write) of the backing file,
/// and every mutation is immediately durable.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(path: P) -> Store {
        Store { path: path.into() }
    }

    /// Loads the full mapping document. Fails if the file is absent,
    /// unreadable, malformed, or its channel rack is the wrong length.
    pub fn load(&self) -> Result<MappingDocument, StoreError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let document: MappingDocument =
            serde_json::from_str(&contents).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        if document.channel_rack.len() != CHANNEL_COUNT {
            return Err(StoreError::BadChannelRack {
                expected: CHANNEL_COUNT,
                found: document.channel_rack.len(),
            });
        }

        Ok(document)
    }

    /// Persists the full mapping document.
    pub fn save(&self, document: &MappingDocument) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, contents).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// The currently pending assignment position, re-read from disk.
    pub fn pending(&self) -> Result<Option<Position>, StoreError> {
        Ok(self.load()?.pending_assignment)
    }

    /// Records the given position as awaiting a clip id.
    pub fn set_pending(&self, position: Position) -> Result<(), StoreError> {
        let mut document = self.load()?;
        document.pending_assignment = Some(position);
        self.save(&document)
    }

    /// Clears any pending assignment.
    pub fn clear_pending(&self) -> Result<(), StoreError> {
        let mut document = self.load()?;
        document.pending_assignment = None;
        self.save(&document)
    }

    /// Commits the pending position to the given clip id with the given
    /// working color, clearing the pending state. A position that is
    /// already bound to a control, a rack slot, or a clip is rejected. On
    /// write failure
    /// the persisted document is unchanged and the commit can be retried.
    pub fn commit_assignment(&self, clip: &str, color: Color) -> Result<Assignment, StoreError> {
        let mut document = self.load()?;
        let position = document
            .pending_assignment
            .ok_or(StoreError::NothingPending)?;

        if document.audio_assignments.contains_key(clip) {
            return Err(StoreError::AlreadyAssigned(clip.to_string()));
        }
        if document.position_in_use(position) {
            return Err(StoreError::PositionOccupied(position));
        }

        let assignment = Assignment(position, color);
        document
            .audio_assignments
            .insert(clip.to_string(), assignment);
        document.pending_assignment = None;
        self.save(&document)?;

        debug!(clip, position = %position, "Assignment committed.");
        Ok(assignment)
    }

    /// Lists clips in the audio directory that have no assignment yet.
    pub fn unassigned_clips(&self, audio_dir: &Path) -> Result<Vec<String>, StoreError> {
        let document = self.load()?;
        let entries = fs::read_dir(audio_dir).map_err(|source| StoreError::ListAudio {
            path: audio_dir.to_path_buf(),
            source,
        })?;

        let mut clips: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !document.audio_assignments.contains_key(name))
            .collect();
        clips.sort();

        Ok(clips)
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::HashMap;
    use std::error::Error;
    use std::fs::File;

    use super::*;

    /// A small but fully populated document for tests.
    pub fn test_document(pending: Option<Position>) -> MappingDocument {
        let mut controls = HashMap::new();
        controls.insert(
            "stop".to_string(),
            ControlEntry(Position(176, 10), Color::Red),
        );
        controls.insert(
            "play".to_string(),
            ControlEntry(Position(176, 11), Color::Green),
        );
        controls.insert(
            "toggle_testmode".to_string(),
            ControlEntry(Position(176, 12), Color::Red),
        );
        controls.insert(
            "pause".to_string(),
            ControlEntry(Position(176, 13), Color::Orange),
        );
        controls.insert(
            "fadeout".to_string(),
            ControlEntry(Position(176, 14), Color::Orange),
        );

        let channel_rack = (0..CHANNEL_COUNT as u8)
            .map(|i| Position(153, 40 + i))
            .collect();

        let mut audio_assignments = HashMap::new();
        audio_assignments.insert(
            "snare.wav".to_string(),
            Assignment(Position(144, 3), Color::Yellow),
        );

        MappingDocument::new(controls, channel_rack, audio_assignments, pending)
    }

    #[test]
    fn round_trip() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));

        for pending in [None, Some(Position(144, 99))] {
            let document = test_document(pending);
            store.save(&document)?;
            assert_eq!(document, store.load()?);
        }

        Ok(())
    }

    #[test]
    fn pending_serializes_as_false_when_unset() -> Result<(), Box<dyn Error>> {
        let serialized = serde_json::to_value(test_document(None))?;
        assert_eq!(serialized["pending_assignment"], serde_json::json!(false));

        let serialized = serde_json::to_value(test_document(Some(Position(144, 99))))?;
        assert_eq!(
            serialized["pending_assignment"],
            serde_json::json!([144, 99])
        );

        Ok(())
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let store = Store::new(dir.path().join("missing.json"));
        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn load_malformed_file_fails() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mappings.json");
        fs::write(&path, "{ not json")?;

        let store = Store::new(path);
        assert!(matches!(store.load(), Err(StoreError::Malformed { .. })));
        Ok(())
    }

    #[test]
    fn load_short_channel_rack_fails() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mappings.json");
        fs::write(
            &path,
            r#"{"controls": {}, "channel_rack": [[153, 40]], "audio_assignments": {}, "pending_assignment": false}"#,
        )?;

        let store = Store::new(path);
        assert!(matches!(
            store.load(),
            Err(StoreError::BadChannelRack {
                expected: CHANNEL_COUNT,
                found: 1
            })
        ));
        Ok(())
    }

    #[test]
    fn commit_assignment_writes_and_clears_pending() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));
        store.save(&test_document(Some(Position(144, 99))))?;

        let assignment = store.commit_assignment("kick.wav", Color::Yellow)?;
        assert_eq!(assignment, Assignment(Position(144, 99), Color::Yellow));

        let document = store.load()?;
        assert_eq!(
            document.audio_assignments().get("kick.wav"),
            Some(&assignment)
        );
        assert_eq!(document.pending_assignment(), None);
        Ok(())
    }

    #[test]
    fn commit_without_pending_fails() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));
        store.save(&test_document(None))?;

        assert!(matches!(
            store.commit_assignment("kick.wav", Color::Yellow),
            Err(StoreError::NothingPending)
        ));
        Ok(())
    }

    #[test]
    fn commit_occupied_position_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));

        // Pending position collides with the existing snare.wav binding.
        store.save(&test_document(Some(Position(144, 3))))?;

        assert!(matches!(
            store.commit_assignment("kick.wav", Color::Yellow),
            Err(StoreError::PositionOccupied(Position(144, 3)))
        ));

        // The document must be untouched so the operation can be retried.
        let document = store.load()?;
        assert_eq!(document.pending_assignment(), Some(Position(144, 3)));
        assert!(!document.audio_assignments().contains_key("kick.wav"));
        Ok(())
    }

    #[test]
    fn commit_rack_position_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));

        // An external editor set the pending position onto a channel rack
        // slot. Committing it would shadow the slot.
        store.save(&test_document(Some(Position(153, 40))))?;

        assert!(matches!(
            store.commit_assignment("kick.wav", Color::Yellow),
            Err(StoreError::PositionOccupied(Position(153, 40)))
        ));
        assert!(!store.load()?.audio_assignments().contains_key("kick.wav"));
        Ok(())
    }

    #[test]
    fn commit_duplicate_clip_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let store = Store::new(dir.path().join("mappings.json"));
        store.save(&test_document(Some(Position(144, 99))))?;

        assert!(matches!(
            store.commit_assignment("snare.wav", Color::Yellow),
            Err(StoreError::AlreadyAssigned(_))
        ));
        Ok(())
    }

    #[test]
    fn unassigned_clips_is_the_set_difference() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let audio_dir = dir.path().join("audio");
        fs::create_dir(&audio_dir)?;
        for name in ["kick.wav", "snare.wav", "hat.wav"] {
            File::create(audio_dir.join(name))?;
        }

        let store = Store::new(dir.path().join("mappings.json"));
        store.save(&test_document(None))?;

        // snare.wav is assigned in the test document.
        assert_eq!(
            store.unassigned_clips(&audio_dir)?,
            vec!["hat.wav".to_string(), "kick.wav".to_string()]
        );
        Ok(())
    }
}
