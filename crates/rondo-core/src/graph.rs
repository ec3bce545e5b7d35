//! Root graphs: the unit the engine switches between.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicIsize, AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::context::RenderContext;
use crate::AtomicFlag;

/// How a root graph shares the engine with the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum RenderMode {
    /// Exclusive: only the current graph is heard and receives live MIDI.
    #[default]
    Single = 0,
    /// Layered: heard together with every other parallel graph.
    Parallel = 1,
}

impl RenderMode {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => RenderMode::Parallel,
            _ => RenderMode::Single,
        }
    }
}

/// Signal processor behind a root graph.
///
/// Node internals are out of the engine's reach; it only drives this
/// interface, always under the graph's property lock.
pub trait RootGraph: Send {
    /// Called before the first block after the device (re)starts.
    fn prepare(&mut self, _sample_rate: f64, _block_size: usize) {}

    /// Called when the device stops or the graph is removed.
    fn release(&mut self) {}

    /// Process one block in place.
    fn render(&mut self, ctx: &mut RenderContext<'_>);

    /// Process one block while suspended. Default passes audio through and
    /// swallows MIDI.
    fn render_bypassed(&mut self, ctx: &mut RenderContext<'_>) {
        ctx.midi.clear();
    }

    fn latency_samples(&self) -> usize {
        0
    }
}

struct GraphShared {
    name: String,
    processor: Mutex<Box<dyn RootGraph>>,
    render_mode: AtomicU8,
    suspended: AtomicFlag,
    midi_program: AtomicI32,
    midi_channels: AtomicU16,
    engine_index: AtomicIsize,
}

/// Shared handle to a root graph.
///
/// The caller owns the graph; the engine keeps a clone while it is
/// registered. Equality is identity.
#[derive(Clone)]
pub struct GraphHandle {
    inner: Arc<GraphShared>,
}

impl GraphHandle {
    /// Channel mask accepting all 16 channels.
    pub const ALL_CHANNELS: u16 = 0xFFFF;

    pub fn new(name: impl Into<String>, processor: impl RootGraph + 'static) -> Self {
        Self::from_boxed(name, Box::new(processor))
    }

    pub fn from_boxed(name: impl Into<String>, processor: Box<dyn RootGraph>) -> Self {
        Self {
            inner: Arc::new(GraphShared {
                name: name.into(),
                processor: Mutex::new(processor),
                render_mode: AtomicU8::new(RenderMode::Single as u8),
                suspended: AtomicFlag::new(false),
                midi_program: AtomicI32::new(-1),
                midi_channels: AtomicU16::new(Self::ALL_CHANNELS),
                engine_index: AtomicIsize::new(-1),
            }),
        }
    }

    pub fn with_render_mode(self, mode: RenderMode) -> Self {
        self.set_render_mode(mode);
        self
    }

    pub fn with_midi_program(self, program: Option<u8>) -> Self {
        self.set_midi_program(program);
        self
    }

    pub fn with_midi_channels(self, mask: u16) -> Self {
        self.set_midi_channels(mask);
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn render_mode(&self) -> RenderMode {
        RenderMode::from_u8(self.inner.render_mode.load(Ordering::Acquire))
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        self.inner.render_mode.store(mode as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.render_mode() == RenderMode::Single
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.inner.suspended.get()
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.inner.suspended.set(suspended);
    }

    /// Program change number that selects this graph.
    #[inline]
    pub fn midi_program(&self) -> Option<u8> {
        let program = self.inner.midi_program.load(Ordering::Acquire);
        (0..128).contains(&program).then_some(program as u8)
    }

    pub fn set_midi_program(&self, program: Option<u8>) {
        let value = program.filter(|p| *p < 128).map_or(-1, i32::from);
        self.inner.midi_program.store(value, Ordering::Release);
    }

    /// Bit `n` set means zero-based channel `n` is accepted.
    #[inline]
    pub fn midi_channels(&self) -> u16 {
        self.inner.midi_channels.load(Ordering::Acquire)
    }

    pub fn set_midi_channels(&self, mask: u16) {
        self.inner.midi_channels.store(mask, Ordering::Release);
    }

    #[inline]
    pub fn accepts_midi_channel(&self, channel: u8) -> bool {
        channel < 16 && self.midi_channels() & (1 << channel) != 0
    }

    /// Position in the engine, `-1` while detached.
    #[inline]
    pub fn engine_index(&self) -> isize {
        self.inner.engine_index.load(Ordering::Acquire)
    }

    pub(crate) fn set_engine_index(&self, index: isize) {
        self.inner.engine_index.store(index, Ordering::Release);
    }

    /// Run `f` on the processor under the property lock.
    pub fn with_processor<R>(&self, f: impl FnOnce(&mut dyn RootGraph) -> R) -> R {
        let mut processor = self.inner.processor.lock();
        f(&mut **processor)
    }

    pub fn prepare(&self, sample_rate: f64, block_size: usize) {
        self.with_processor(|p| p.prepare(sample_rate, block_size));
    }

    pub fn release(&self) {
        self.with_processor(|p| p.release());
    }

    pub fn latency_samples(&self) -> usize {
        self.with_processor(|p| p.latency_samples())
    }

    /// Render or bypass depending on the suspended flag.
    #[inline]
    pub(crate) fn render_block(&self, ctx: &mut RenderContext<'_>) {
        let suspended = self.is_suspended();
        let mut processor = self.inner.processor.lock();
        if suspended {
            processor.render_bypassed(ctx);
        } else {
            processor.render(ctx);
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &GraphHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for GraphHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for GraphHandle {}

impl fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphHandle")
            .field("name", &self.name())
            .field("render_mode", &self.render_mode())
            .field("engine_index", &self.engine_index())
            .field("midi_program", &self.midi_program())
            .field("suspended", &self.is_suspended())
            .finish()
    }
}
