//! Per-graph render context.

use rondo_midi::MidiBuffer;

use crate::buffer::AudioBuffer;
use crate::transport::TransportSnapshot;

/// Everything one root graph sees for one block.
///
/// Built fresh for every graph on every block and never stored.
pub struct RenderContext<'a> {
    /// Input on entry, graph output on return.
    pub audio: &'a mut AudioBuffer,
    /// Control-voltage lanes, cleared before each render.
    pub control: &'a mut AudioBuffer,
    /// MIDI routed to this graph on entry, MIDI it produced on return.
    pub midi: &'a mut MidiBuffer,
    pub num_samples: usize,
    pub transport: TransportSnapshot,
}
