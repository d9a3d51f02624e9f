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
    collections::VecDeque,
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use super::Event;

/// A mock control surface. Events are queued by tests; writes are recorded.
#[derive(Clone)]
pub struct Device {
    name: String,
    events: Arc<Mutex<VecDeque<Event>>>,
    writes: Arc<Mutex<Vec<(u8, u8, u8)>>>,
    closed: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            events: Arc::new(Mutex::new(VecDeque::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queues an event for the next poll.
    pub fn push_event(&self, event: Event) {
        self.events.lock().push_back(event);
    }

    /// Returns all recorded writes as (status, note, value) triples.
    pub fn writes(&self) -> Vec<(u8, u8, u8)> {
        self.writes.lock().clone()
    }

    /// Clears the recorded writes.
    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Returns true once the device has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Makes subsequent writes fail, for exercising fatal device errors.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn poll(&self, max: usize) -> Result<Vec<Event>, Box<dyn Error>> {
        if self.closed.load(Ordering::Relaxed) {
            return Err("mock surface is closed".into());
        }

        let mut queue = self.events.lock();
        let count = queue.len().min(max);
        Ok(queue.drain(..count).collect())
    }

    fn write(&self, status: u8, note: u8, value: u8) -> Result<(), Box<dyn Error>> {
        if self.closed.load(Ordering::Relaxed) {
            return Err("mock surface is closed".into());
        }
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err("mock surface write failure".into());
        }

        self.writes.lock().push((status, note, value));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
