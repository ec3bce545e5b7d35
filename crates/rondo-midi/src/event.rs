//! RT-safe MIDI events with sample-accurate timing.

use midi_msg::{Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg, SystemRealTimeMsg};

use crate::{Error, Result};

/// The subset of MIDI the engine routes through a render block.
///
/// Every variant is `Copy`, so a block buffer never owns heap data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MidiMessage {
    ChannelVoice {
        channel: Channel,
        msg: ChannelVoiceMsg,
    },
    ChannelMode {
        channel: Channel,
        msg: ChannelModeMsg,
    },
    SystemRealTime(SystemRealTimeMsg),
}

/// MIDI message stamped with its offset inside the current block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidiEvent {
    /// Offset within the current block (0 = first sample).
    pub frame_offset: usize,
    pub msg: MidiMessage,
}

impl MidiEvent {
    #[inline]
    pub fn new(frame_offset: usize, msg: MidiMessage) -> Self {
        Self { frame_offset, msg }
    }

    #[inline]
    pub fn channel_voice(frame_offset: usize, channel: u8, msg: ChannelVoiceMsg) -> Self {
        Self::new(
            frame_offset,
            MidiMessage::ChannelVoice {
                channel: Channel::from_u8(channel & 0x0F),
                msg,
            },
        )
    }

    #[inline]
    pub fn note_on(frame_offset: usize, channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_voice(frame_offset, channel, ChannelVoiceMsg::NoteOn { note, velocity })
    }

    #[inline]
    pub fn note_off(frame_offset: usize, channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel_voice(frame_offset, channel, ChannelVoiceMsg::NoteOff { note, velocity })
    }

    #[inline]
    pub fn control_change(frame_offset: usize, channel: u8, cc: u8, value: u8) -> Self {
        Self::channel_voice(
            frame_offset,
            channel,
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control: cc, value },
            },
        )
    }

    #[inline]
    pub fn program_change(frame_offset: usize, channel: u8, program: u8) -> Self {
        Self::channel_voice(frame_offset, channel, ChannelVoiceMsg::ProgramChange { program })
    }

    #[inline]
    pub fn all_notes_off(frame_offset: usize, channel: u8) -> Self {
        Self::new(
            frame_offset,
            MidiMessage::ChannelMode {
                channel: Channel::from_u8(channel & 0x0F),
                msg: ChannelModeMsg::AllNotesOff,
            },
        )
    }

    #[inline]
    pub fn real_time(frame_offset: usize, msg: SystemRealTimeMsg) -> Self {
        Self::new(frame_offset, MidiMessage::SystemRealTime(msg))
    }

    #[inline]
    pub fn timing_clock(frame_offset: usize) -> Self {
        Self::real_time(frame_offset, SystemRealTimeMsg::TimingClock)
    }

    #[inline]
    pub fn start(frame_offset: usize) -> Self {
        Self::real_time(frame_offset, SystemRealTimeMsg::Start)
    }

    #[inline]
    pub fn resume(frame_offset: usize) -> Self {
        Self::real_time(frame_offset, SystemRealTimeMsg::Continue)
    }

    #[inline]
    pub fn stop(frame_offset: usize) -> Self {
        Self::real_time(frame_offset, SystemRealTimeMsg::Stop)
    }

    /// Zero-based channel, `None` for system messages.
    #[inline]
    pub fn channel(&self) -> Option<u8> {
        match self.msg {
            MidiMessage::ChannelVoice { channel, .. } | MidiMessage::ChannelMode { channel, .. } => {
                Some(channel as u8)
            }
            MidiMessage::SystemRealTime(_) => None,
        }
    }

    /// `(controller, value)` for plain control changes.
    #[inline]
    pub fn controller(&self) -> Option<(u8, u8)> {
        match self.msg {
            MidiMessage::ChannelVoice {
                msg:
                    ChannelVoiceMsg::ControlChange {
                        control: ControlChange::CC { control, value },
                    },
                ..
            } => Some((control, value)),
            _ => None,
        }
    }

    #[inline]
    pub fn program(&self) -> Option<u8> {
        match self.msg {
            MidiMessage::ChannelVoice {
                msg: ChannelVoiceMsg::ProgramChange { program },
                ..
            } => Some(program),
            _ => None,
        }
    }

    #[inline]
    pub fn real_time_msg(&self) -> Option<SystemRealTimeMsg> {
        match self.msg {
            MidiMessage::SystemRealTime(msg) => Some(msg),
            _ => None,
        }
    }

    #[inline]
    pub fn is_all_notes_off(&self) -> bool {
        matches!(
            self.msg,
            MidiMessage::ChannelMode {
                msg: ChannelModeMsg::AllNotesOff,
                ..
            }
        )
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(
            self.msg,
            MidiMessage::ChannelVoice {
                msg: ChannelVoiceMsg::NoteOn { velocity, .. },
                ..
            } if velocity > 0
        )
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            MidiMessage::ChannelVoice {
                msg:
                    ChannelVoiceMsg::NoteOn { note, .. }
                    | ChannelVoiceMsg::NoteOff { note, .. }
                    | ChannelVoiceMsg::PolyPressure { note, .. },
                ..
            } => Some(note),
            _ => None,
        }
    }

    /// Same message, moved to another offset.
    #[inline]
    pub fn with_offset(mut self, frame_offset: usize) -> Self {
        self.frame_offset = frame_offset;
        self
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        match self.msg {
            MidiMessage::ChannelVoice { channel, msg } => MidiMsg::ChannelVoice { channel, msg },
            MidiMessage::ChannelMode { channel, msg } => MidiMsg::ChannelMode { channel, msg },
            MidiMessage::SystemRealTime(msg) => MidiMsg::SystemRealTime { msg },
        }
    }

    /// Wire bytes. Allocates; not for the audio thread.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_offset(bytes, 0)
    }

    pub fn from_bytes_with_offset(bytes: &[u8], frame_offset: usize) -> Result<Self> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        let msg = match msg {
            MidiMsg::ChannelVoice { channel, msg } => MidiMessage::ChannelVoice { channel, msg },
            MidiMsg::ChannelMode { channel, msg } => MidiMessage::ChannelMode { channel, msg },
            MidiMsg::SystemRealTime { msg } => MidiMessage::SystemRealTime(msg),
            _ => {
                return Err(Error::Unsupported(
                    "expected channel voice, channel mode or real-time message",
                ))
            }
        };
        Ok(Self { frame_offset, msg })
    }
}
