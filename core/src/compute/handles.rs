//! Generation-counted resource handles and the pools they index.
//!
//! A handle is `(slot index, generation)`. Removing a resource bumps the
//! slot's generation, so any copy of the old handle is detected as stale.

use std::marker::PhantomData;

use crate::error::ComputeError;

/// Opaque handle into a [`ResourcePool`].
pub trait PoolHandle: Copy + Eq + std::fmt::Debug {
    /// Resource kind used in error messages.
    const KIND: &'static str;

    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(self) -> u32;
    fn generation(self) -> u32;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl PoolHandle for $name {
            const KIND: &'static str = $kind;

            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn index(self) -> u32 {
                self.index
            }

            fn generation(self) -> u32 {
                self.generation
            }
        }
    };
}

define_handle!(
    /// Handle to a device buffer.
    BufferHandle,
    "buffer"
);
define_handle!(
    /// Handle to a device 2D texture (with its mip chain).
    TextureHandle,
    "texture"
);

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of resources addressed by generation-counted handles.
///
/// Each live slot has exactly one owner: whoever holds the handle returned by
/// [`insert`](Self::insert). Freed slots are reused with a bumped generation.
#[derive(Debug)]
pub struct ResourcePool<H, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    _handle: PhantomData<H>,
}

impl<H, T> Default for ResourcePool<H, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            _handle: PhantomData,
        }
    }
}

impl<H: PoolHandle, T> ResourcePool<H, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, value: T) -> H {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return H::from_parts(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        H::from_parts(index, 0)
    }

    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_ok()
    }

    pub fn get(&self, handle: H) -> Result<&T, ComputeError> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| stale(handle))
    }

    pub fn get_mut(&mut self, handle: H) -> Result<&mut T, ComputeError> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| stale(handle))
    }

    /// Remove a resource, invalidating every copy of `handle`.
    pub fn remove(&mut self, handle: H) -> Result<T, ComputeError> {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation() && slot.value.is_some())
            .ok_or_else(|| stale(handle))?;
        let value = slot.value.take().ok_or_else(|| stale(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Ok(value)
    }

    /// Live `(handle, resource)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (H::from_parts(index as u32, slot.generation), value))
        })
    }
}

fn stale<H: PoolHandle>(handle: H) -> ComputeError {
    ComputeError::StaleHandle {
        kind: H::KIND,
        index: handle.index(),
        generation: handle.generation(),
    }
}
