//! Lock-free cells shared between the control thread and the audio callback.

use atomic_float::{AtomicF32, AtomicF64};
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};

macro_rules! atomic_float_cell {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $value:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        #[repr(align(64))]
        pub struct $name {
            value: $inner,
        }

        impl $name {
            pub fn new(value: $value) -> Self {
                Self {
                    value: <$inner>::new(value),
                }
            }

            #[inline]
            pub fn get(&self) -> $value {
                self.value.load(Ordering::Acquire)
            }

            #[inline]
            pub fn set(&self, value: $value) {
                self.value.store(value, Ordering::Release);
            }

            #[inline]
            pub fn swap(&self, value: $value) -> $value {
                self.value.swap(value, Ordering::AcqRel)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(0.0)
            }
        }
    };
}

atomic_float_cell!(
    /// Cache-line aligned atomic f32 (meter levels, tempo).
    AtomicFloat,
    AtomicF32,
    f32
);

atomic_float_cell!(
    /// Cache-line aligned atomic f64 (sample rate).
    AtomicDouble,
    AtomicF64,
    f64
);

/// Cache-line aligned atomic bool.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

/// Atomic graph index where `-1` means "none".
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicIndex {
    value: AtomicIsize,
}

impl AtomicIndex {
    pub const NONE: isize = -1;

    pub fn new(value: isize) -> Self {
        Self {
            value: AtomicIsize::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> isize {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: isize) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: isize) -> isize {
        self.value.swap(value, Ordering::AcqRel)
    }

    /// Store `new` only if the cell still holds `current`.
    #[inline]
    pub fn compare_exchange(&self, current: isize, new: isize) -> bool {
        self.value
            .compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for AtomicIndex {
    fn default() -> Self {
        Self::new(Self::NONE)
    }
}
