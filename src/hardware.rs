//! Control surface MIDI driver
//!
//! Owns the midir input and output connections. Incoming messages are parsed,
//! resolved to an element through the [`SurfaceLayout`] and forwarded to the
//! actor from the midir callback thread. Feedback goes out through
//! [`SurfaceDriver::send_feedback`], called from the main task only.

use anyhow::{Context, Result};
use colored::*;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::actor_handle::SurfaceHandle;
use crate::element::Feedback;
use crate::layout::SurfaceLayout;
use crate::midi::{format_hex, MidiMessage};

const CLIENT_NAME: &str = "Trackdeck";

/// Case-insensitive substring match used to pick ports
pub fn port_matches(name: &str, pattern: &str) -> bool {
    name.to_lowercase().contains(&pattern.to_lowercase())
}

fn find_port<P>(ports: impl IntoIterator<Item = (P, String)>, pattern: &str) -> Option<(P, String)> {
    ports.into_iter().find(|(_, name)| {
        let found = port_matches(name, pattern);
        if found {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
        }
        found
    })
}

/// MIDI connections to the control surface
pub struct SurfaceDriver {
    layout: Arc<SurfaceLayout>,
    input_port_name: String,
    output_port_name: String,
    input_conn: Option<MidiInputConnection<()>>,
    output_conn: Option<MidiOutputConnection>,
    sent: u64,
}

impl SurfaceDriver {
    pub fn new(layout: Arc<SurfaceLayout>, input_port: &str, output_port: &str) -> Self {
        Self {
            layout,
            input_port_name: input_port.to_string(),
            output_port_name: output_port.to_string(),
            input_conn: None,
            output_conn: None,
            sent: 0,
        }
    }

    /// Open both ports; input is forwarded to `handle`
    pub fn connect(&mut self, handle: SurfaceHandle) -> Result<()> {
        self.disconnect();

        info!(
            "Connecting to surface - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let midi_in =
            MidiInput::new(&format!("{}-Input", CLIENT_NAME)).context("Failed to create MIDI input")?;
        let in_ports = midi_in
            .ports()
            .into_iter()
            .filter_map(|p| midi_in.port_name(&p).ok().map(|n| (p, n)));
        let (in_port, port_name) = find_port(in_ports, &self.input_port_name)
            .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", self.input_port_name))?;
        info!("Connecting to input port: {}", port_name);

        let layout = Arc::clone(&self.layout);
        let input_conn = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |_timestamp, data, _| {
                    let Some(message) = MidiMessage::parse(data) else {
                        trace!("Ignored MIDI: {}", format_hex(data));
                        return;
                    };
                    match layout.resolve(&message) {
                        Some((element, input)) => handle.hardware_input(element, input),
                        None => trace!("Unmapped input: {}", message),
                    }
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("Failed to connect to input port: {}", e))?;
        self.input_conn = Some(input_conn);

        let midi_out = MidiOutput::new(&format!("{}-Output", CLIENT_NAME))
            .context("Failed to create MIDI output")?;
        let out_ports = midi_out
            .ports()
            .into_iter()
            .filter_map(|p| midi_out.port_name(&p).ok().map(|n| (p, n)));
        let (out_port, port_name) = find_port(out_ports, &self.output_port_name)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", self.output_port_name))?;
        info!("Connecting to output port: {}", port_name);

        let output_conn = midi_out
            .connect(&out_port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("Failed to connect to output port: {}", e))?;
        self.output_conn = Some(output_conn);

        info!("Surface connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.is_connected() {
            info!(sent = self.sent, "Surface disconnected");
        }
        self.input_conn = None;
        self.output_conn = None;
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }

    /// Write one LED update to the surface
    pub fn send_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        let output = self
            .output_conn
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected to output port"))?;
        let data = feedback.to_bytes();
        output.send(&data).context("Failed to send MIDI message")?;
        self.sent += 1;
        trace!("Sent: {}", format_hex(&data));
        Ok(())
    }
}

impl Drop for SurfaceDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Names of the available input and output ports
pub fn list_ports() -> Result<(Vec<String>, Vec<String>)> {
    let midi_in = MidiInput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    let inputs = midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect();
    let midi_out = MidiOutput::new(&format!("{}-Scanner", CLIENT_NAME))?;
    let outputs = midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect();
    Ok((inputs, outputs))
}

/// Print available ports, marking those matching the configured patterns
pub fn print_ports(input_pattern: Option<&str>, output_pattern: Option<&str>) -> Result<()> {
    let (inputs, outputs) = list_ports()?;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
    for (title, ports, pattern) in [
        ("Input Ports:", inputs, input_pattern),
        ("Output Ports:", outputs, output_pattern),
    ] {
        println!("\n{}", title.bold());
        if ports.is_empty() {
            println!("  {}", "No ports found".dimmed());
        }
        for name in ports {
            if pattern.is_some_and(|p| port_matches(&name, p)) {
                println!("  {} {}", "[MATCH]".green(), name.bright_white());
            } else {
                println!("  {}", name);
            }
        }
    }
    println!();
    Ok(())
}
