//! Binding table shared by every backend.
//!
//! A texture may be bound as input or as output, never both at once. Callers
//! release everything with [`BindingTable::unbind_all`] between passes before
//! swapping roles.

use super::handles::{PoolHandle, TextureHandle};
use super::kernel::Kernel;
use super::params::KernelParams;
use crate::error::ComputeError;

pub const MAX_INPUT_SLOTS: usize = 4;
pub const MAX_OUTPUT_SLOTS: usize = 2;

/// A single mip level of a texture bound to a kernel slot.
///
/// Input bindings expose the levels from `mip` down; output bindings expose
/// only `mip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    pub texture: TextureHandle,
    pub mip: u32,
}

impl TextureBinding {
    pub fn new(texture: TextureHandle, mip: u32) -> Self {
        Self { texture, mip }
    }
}

impl From<TextureHandle> for TextureBinding {
    fn from(texture: TextureHandle) -> Self {
        Self { texture, mip: 0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    inputs: [Option<TextureBinding>; MAX_INPUT_SLOTS],
    outputs: [Option<TextureBinding>; MAX_OUTPUT_SLOTS],
    params: Option<KernelParams>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_input(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        let index = slot_index(slot, MAX_INPUT_SLOTS, "input")?;
        if self.outputs.iter().flatten().any(|b| b.texture == binding.texture) {
            return Err(ComputeError::AliasedBinding {
                index: binding_index(binding),
            });
        }
        self.inputs[index] = Some(binding);
        Ok(())
    }

    pub fn bind_output(&mut self, slot: u32, binding: TextureBinding) -> Result<(), ComputeError> {
        let index = slot_index(slot, MAX_OUTPUT_SLOTS, "output")?;
        if self.inputs.iter().flatten().any(|b| b.texture == binding.texture) {
            return Err(ComputeError::AliasedBinding {
                index: binding_index(binding),
            });
        }
        self.outputs[index] = Some(binding);
        Ok(())
    }

    pub fn bind_params(&mut self, params: KernelParams) {
        self.params = Some(params);
    }

    pub fn unbind_all(&mut self) {
        *self = Self::default();
    }

    pub fn input(&self, slot: u32) -> Option<TextureBinding> {
        self.inputs.get(slot as usize).copied().flatten()
    }

    pub fn output(&self, slot: u32) -> Option<TextureBinding> {
        self.outputs.get(slot as usize).copied().flatten()
    }

    pub fn params(&self) -> Option<&KernelParams> {
        self.params.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.iter().all(Option::is_none)
            && self.outputs.iter().all(Option::is_none)
            && self.params.is_none()
    }

    /// Check that everything `kernel` reads or writes is bound.
    pub fn validate(&self, kernel: Kernel) -> Result<(), ComputeError> {
        let signature = kernel.signature();
        let unbound = |what, slot| ComputeError::UnboundSlot {
            kernel: kernel.label(),
            what,
            slot,
        };

        if let Some(slot) = (0..signature.inputs).find(|&s| self.input(s).is_none()) {
            return Err(unbound("input", slot));
        }
        if let Some(slot) = (0..signature.outputs).find(|&s| self.output(s).is_none()) {
            return Err(unbound("output", slot));
        }
        if signature.params && self.params.is_none() {
            return Err(unbound("params", 0));
        }
        Ok(())
    }
}

fn slot_index(slot: u32, max: usize, what: &str) -> Result<usize, ComputeError> {
    let index = slot as usize;
    if index >= max {
        return Err(ComputeError::InvalidArgument(format!(
            "{what} slot {slot} exceeds the {max} available"
        )));
    }
    Ok(index)
}

fn binding_index(binding: TextureBinding) -> u32 {
    binding.texture.index()
}
