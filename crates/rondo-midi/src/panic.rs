//! Hanging-note protection: the kill burst and the panic controller filter.

use serde::{Deserialize, Serialize};

use crate::buffer::MidiBuffer;
use crate::event::MidiEvent;
use crate::{Error, Result};

/// Sustain, sostenuto and hold-2 pedals, released in this order.
const PEDAL_CONTROLLERS: [u8; 3] = [64, 66, 69];

/// Events in one kill burst: three pedal releases and All Notes Off per channel.
pub const KILL_BURST_LEN: usize = 16 * (PEDAL_CONTROLLERS.len() + 1);

/// Append the 16-channel kill burst at offset 0.
///
/// For each channel: CC64=0, CC66=0, CC69=0, then All Notes Off.
pub fn write_kill_burst(midi: &mut MidiBuffer) {
    for channel in 0..16u8 {
        for controller in PEDAL_CONTROLLERS {
            midi.add_event(MidiEvent::control_change(0, channel, controller, 0));
        }
        midi.add_event(MidiEvent::all_notes_off(0, channel));
    }
}

/// Controller that triggers a panic when it arrives on the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanicTrigger {
    pub controller: u8,
    /// 1-16, or `None` to react on any channel.
    pub channel: Option<u8>,
}

impl PanicTrigger {
    pub fn new(controller: u8, channel: Option<u8>) -> Self {
        Self {
            controller,
            channel,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.controller > 127 {
            return Err(Error::InvalidPanicTrigger(format!(
                "controller {} out of range (0-127)",
                self.controller
            )));
        }
        if let Some(channel) = self.channel {
            if !(1..=16).contains(&channel) {
                return Err(Error::InvalidPanicTrigger(format!(
                    "channel {channel} out of range (1-16)"
                )));
            }
        }
        Ok(())
    }

    #[inline]
    fn matches(&self, event: &MidiEvent) -> bool {
        let Some((controller, _)) = event.controller() else {
            return false;
        };
        if controller != self.controller {
            return false;
        }
        match (self.channel, event.channel()) {
            (None, _) => true,
            (Some(wanted), Some(channel)) => wanted == channel + 1,
            (Some(_), None) => false,
        }
    }
}

/// Replaces a block's MIDI with a kill burst when the panic controller shows up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MidiPanic {
    trigger: Option<PanicTrigger>,
}

impl MidiPanic {
    pub fn new(trigger: Option<PanicTrigger>) -> Self {
        Self { trigger }
    }

    pub fn trigger(&self) -> Option<PanicTrigger> {
        self.trigger
    }

    pub fn set_trigger(&mut self, trigger: Option<PanicTrigger>) {
        self.trigger = trigger;
    }

    /// Scan the block; on the first match the whole block is discarded and
    /// replaced with the kill burst. Returns true when that happened.
    #[inline]
    pub fn process(&self, midi: &mut MidiBuffer) -> bool {
        let Some(trigger) = self.trigger else {
            return false;
        };
        if !midi.iter().any(|event| trigger.matches(event)) {
            return false;
        }
        midi.clear();
        write_kill_burst(midi);
        true
    }
}
