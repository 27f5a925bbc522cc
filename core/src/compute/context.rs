//! Pipeline context shared by the renderers.

use hashbrown::HashSet;

use super::device::RenderDevice;
use super::kernel::Kernel;
use crate::error::ComputeError;

/// Tracks which kernels have been prepared on the device and counts
/// dispatches.
///
/// One context is owned by the top-level pipeline driver and passed to every
/// renderer's `initialize`, so a kernel used by several renderers is compiled
/// once.
#[derive(Debug, Default)]
pub struct PipelineContext {
    prepared: HashSet<Kernel>,
    dispatches: u64,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare `kernel` on `device` unless already done.
    pub fn prepare(
        &mut self,
        device: &mut dyn RenderDevice,
        kernel: Kernel,
    ) -> Result<(), ComputeError> {
        if self.prepared.contains(&kernel) {
            return Ok(());
        }
        device.prepare_kernel(kernel)?;
        self.prepared.insert(kernel);
        tracing::debug!(kernel = kernel.label(), "kernel prepared");
        Ok(())
    }

    pub fn is_prepared(&self, kernel: Kernel) -> bool {
        self.prepared.contains(&kernel)
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.len()
    }

    /// Issue `kernel` over `groups` workgroups with the currently bound resources.
    pub fn dispatch(
        &mut self,
        device: &mut dyn RenderDevice,
        kernel: Kernel,
        groups: [u32; 3],
    ) -> Result<(), ComputeError> {
        if !self.is_prepared(kernel) {
            return Err(ComputeError::NotInitialized(kernel.label()));
        }
        tracing::trace!(kernel = kernel.label(), ?groups, "dispatch");
        device.dispatch(kernel, groups)?;
        self.dispatches += 1;
        Ok(())
    }

    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }
}
