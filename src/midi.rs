//! MIDI message types and control addressing
//!
//! Parses raw bytes from the surface into [`MidiMessage`]s and encodes element
//! feedback back into bytes. A [`ControlAddress`] names one physical control
//! (note or CC number on a channel) independent of the value it carries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIDI channel voice messages sent by surface controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    ///
    /// Aftertouch and system messages are not control input and yield `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        // Running status and system messages never carry control input
        if !(0x80..=0xEF).contains(&status) {
            return None;
        }

        let channel = status & 0x0F;
        let d1 = data.get(1).map(|b| b & 0x7F);
        let d2 = data.get(2).map(|b| b & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: d1?,
                velocity: d2?,
            }),
            0x90 => {
                let (note, velocity) = (d1?, d2?);
                // Note On with velocity 0 is a Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                cc: d1?,
                value: d2?,
            }),
            0xE0 => {
                let (lsb, msb) = (u16::from(d1?), u16::from(d2?));
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
        }
    }

    /// Address of the control that sent this message, if it names one
    pub fn address(&self) -> Option<ControlAddress> {
        match *self {
            MidiMessage::NoteOn { channel, note, .. } | MidiMessage::NoteOff { channel, note, .. } => {
                Some(ControlAddress::note(channel, note))
            }
            MidiMessage::ControlChange { channel, cc, .. } => Some(ControlAddress::cc(channel, cc)),
            _ => None,
        }
    }

    /// Data value carried by a note or CC message (velocity 0 for Note Off)
    pub fn value(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOn { velocity, .. } => Some(velocity),
            MidiMessage::NoteOff { .. } => Some(0),
            MidiMessage::ControlChange { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
        }
    }
}

/// Message family a control speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Note,
    Cc,
}

/// One physical control's MIDI address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlAddress {
    pub kind: ControlKind,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Note or CC number
    pub number: u8,
}

impl ControlAddress {
    pub fn note(channel: u8, note: u8) -> Self {
        Self {
            kind: ControlKind::Note,
            channel,
            number: note,
        }
    }

    pub fn cc(channel: u8, cc: u8) -> Self {
        Self {
            kind: ControlKind::Cc,
            channel,
            number: cc,
        }
    }

    /// Message carrying `value` to this control (LED color or intensity)
    pub fn message(&self, value: u8) -> MidiMessage {
        match self.kind {
            ControlKind::Note => MidiMessage::NoteOn {
                channel: self.channel,
                note: self.number,
                velocity: value,
            },
            ControlKind::Cc => MidiMessage::ControlChange {
                channel: self.channel,
                cc: self.number,
                value,
            },
        }
    }
}

impl fmt::Display for ControlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ControlKind::Note => write!(f, "note {} ch:{}", self.number, self.channel + 1),
            ControlKind::Cc => write!(f, "cc {} ch:{}", self.number, self.channel + 1),
        }
    }
}

/// Format bytes as hex for logging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
