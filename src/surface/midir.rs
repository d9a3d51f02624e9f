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
use std::{collections::HashMap, error::Error, fmt, mem, sync::Mutex};

use crossbeam_channel::{Receiver, TryRecvError};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;
use tracing::{debug, info};

use super::Event;

/// A midir backed control surface. Listing produces unconnected devices for
/// display; `get` opens both directions and fails if either is missing.
pub struct Device {
    name: String,
    has_input: bool,
    has_output: bool,
    events: Receiver<Event>,
    input_connection: Mutex<Option<MidiInputConnection<()>>>,
    output_connection: Mutex<Option<MidiOutputConnection>>,
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn poll(&self, max: usize) -> Result<Vec<Event>, Box<dyn Error>> {
        let mut events = Vec::new();
        while events.len() < max {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err("control surface input is closed".into())
                }
            }
        }

        Ok(events)
    }

    fn write(&self, status: u8, note: u8, value: u8) -> Result<(), Box<dyn Error>> {
        let mut output_connection = self.output_connection.lock().expect("unable to get lock");
        match output_connection.as_mut() {
            Some(connection) => {
                connection.send(&[status, note, value])?;
                Ok(())
            }
            None => Err("control surface output is closed".into()),
        }
    }

    fn close(&self) {
        info!(device = self.name, "Closing control surface.");

        // Explicitly drop both connections.
        let input_connection = self
            .input_connection
            .lock()
            .expect("error getting mutex")
            .take();
        mem::drop(input_connection);

        let output_connection = self
            .output_connection
            .lock()
            .expect("error getting mutex")
            .take();
        mem::drop(output_connection);
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<std::sync::Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<String> = Vec::new();
        if self.has_input {
            capabilities.push(String::from("Input"));
        }
        if self.has_output {
            capabilities.push(String::from("Output"));
        }

        write!(f, "{} ({})", self.name, capabilities.join("/"))
    }
}

/// Lists midir devices and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
    Ok(list_midir_devices()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir devices without opening any connections.
fn list_midir_devices() -> Result<Vec<Device>, Box<dyn Error>> {
    let input = MidiInput::new("padboard input listing")?;
    let output = MidiOutput::new("padboard output listing")?;

    let mut devices: HashMap<String, (bool, bool)> = HashMap::new();
    for port in input.ports() {
        let name = input.port_name(&port)?;
        devices.entry(name).or_insert((false, false)).0 = true;
    }
    for port in output.ports() {
        let name = output.port_name(&port)?;
        devices.entry(name).or_insert((false, false)).1 = true;
    }

    let mut sorted_devices = devices
        .into_iter()
        .map(|(name, (has_input, has_output))| {
            // Listing devices carry a dead receiver; polls on them fail.
            let (_, events) = crossbeam_channel::unbounded();
            Device {
                name,
                has_input,
                has_output,
                events,
                input_connection: Mutex::new(None),
                output_connection: Mutex::new(None),
            }
        })
        .collect::<Vec<Device>>();
    sorted_devices.sort_by_key(|device| device.name.clone());
    Ok(sorted_devices)
}

/// Gets the midir device matching the given name and opens its input and
/// output connections.
pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
    let input = MidiInput::new("padboard surface input")?;
    let output = MidiOutput::new("padboard surface output")?;

    let mut input_ports = Vec::new();
    for port in input.ports() {
        if input.port_name(&port)?.contains(name) {
            input_ports.push(port);
        }
    }
    let mut output_ports = Vec::new();
    for port in output.ports() {
        if output.port_name(&port)?.contains(name) {
            output_ports.push(port);
        }
    }

    if input_ports.is_empty() || output_ports.is_empty() {
        return Err(format!("no device with both input and output matches {}", name).into());
    }
    if input_ports.len() > 1 || output_ports.len() > 1 {
        return Err(format!(
            "found too many devices that match {}, use a less ambiguous device name",
            name
        )
        .into());
    }

    let full_name = input.port_name(&input_ports[0])?;
    let (sender, events) = crossbeam_channel::unbounded();
    let input_connection = input.connect(
        &input_ports[0],
        "padboard surface watcher",
        move |_, raw_event, _| {
            if let Ok(event) = LiveEvent::parse(raw_event) {
                debug!(event = format!("{:?}", event), "Received surface event.");
            }
            if let Some(event) = Event::from_raw(raw_event) {
                // The receiver outlives the connection; ignore send errors
                // during teardown.
                let _ = sender.send(event);
            }
        },
        (),
    )?;
    let output_connection = output.connect(&output_ports[0], "padboard surface painter")?;

    info!(device = full_name, "Control surface opened.");

    Ok(Device {
        name: full_name,
        has_input: true,
        has_output: true,
        events,
        input_connection: Mutex::new(Some(input_connection)),
        output_connection: Mutex::new(Some(output_connection)),
    })
}
