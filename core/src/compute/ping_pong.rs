//! Ping-pong texture pair for iterative passes.

use super::device::RenderDevice;
use super::handles::TextureHandle;
use crate::error::ComputeError;

/// Two equally sized textures alternating source/destination roles.
///
/// After `n` calls to [`swap`](Self::swap), [`destination`](Self::destination)
/// is the texture the `n`th pass writes and the only one consumers should
/// read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    textures: [TextureHandle; 2],
    destination: usize,
    passes: u32,
    accumulated: u32,
}

impl PingPong {
    /// Pair `source` and `destination`, checking their mip 0 sizes match.
    pub fn new(
        device: &dyn RenderDevice,
        source: TextureHandle,
        destination: TextureHandle,
    ) -> Result<Self, ComputeError> {
        if source == destination {
            return Err(ComputeError::InvalidArgument(
                "ping-pong source and destination must be different textures".into(),
            ));
        }
        let source_size = device.texture_size(source, 0)?;
        let destination_size = device.texture_size(destination, 0)?;
        if source_size != destination_size {
            return Err(ComputeError::DimensionMismatch {
                what: "ping-pong texture size",
                expected: destination_size,
                actual: source_size,
            });
        }
        Ok(Self {
            textures: [source, destination],
            destination: 1,
            passes: 0,
            accumulated: 0,
        })
    }

    pub fn source(&self) -> TextureHandle {
        self.textures[1 - self.destination]
    }

    pub fn destination(&self) -> TextureHandle {
        self.textures[self.destination]
    }

    pub fn textures(&self) -> [TextureHandle; 2] {
        self.textures
    }

    /// Exchange roles: the previous destination becomes the next source.
    pub fn swap(&mut self) {
        self.destination = 1 - self.destination;
        self.passes += 1;
    }

    /// Number of swaps since construction or the last [`reset`](Self::reset).
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Add this pass's delta (e.g. spread distance) and return the running total.
    pub fn accumulate(&mut self, delta: u32) -> u32 {
        self.accumulated = self.accumulated.saturating_add(delta);
        self.accumulated
    }

    pub fn accumulated(&self) -> u32 {
        self.accumulated
    }

    /// Restart pass counting and the accumulated delta, keeping roles.
    pub fn reset(&mut self, accumulated: u32) {
        self.passes = 0;
        self.accumulated = accumulated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::cpu::CpuBackend;
    use crate::compute::device::{TextureDesc, TextureFormat};

    fn pair(backend: &mut CpuBackend) -> (TextureHandle, TextureHandle) {
        let desc = TextureDesc::new("value", 8, 4, TextureFormat::R8Uint);
        (
            backend.create_texture(&desc).unwrap(),
            backend.create_texture(&desc).unwrap(),
        )
    }

    #[test]
    fn test_swap_alternates() {
        let mut backend = CpuBackend::new();
        let (a, b) = pair(&mut backend);
        let mut pp = PingPong::new(&backend, a, b).unwrap();

        assert_eq!((pp.source(), pp.destination()), (a, b));
        pp.swap();
        assert_eq!((pp.source(), pp.destination()), (b, a));
        pp.swap();
        assert_eq!((pp.source(), pp.destination()), (a, b));
        assert_eq!(pp.passes(), 2);
    }

    #[test]
    fn test_size_mismatch() {
        let mut backend = CpuBackend::new();
        let a = backend
            .create_texture(&TextureDesc::new("a", 8, 8, TextureFormat::R8Uint))
            .unwrap();
        let b = backend
            .create_texture(&TextureDesc::new("b", 8, 4, TextureFormat::R8Uint))
            .unwrap();
        assert!(matches!(
            PingPong::new(&backend, a, b),
            Err(ComputeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_same_texture_rejected() {
        let mut backend = CpuBackend::new();
        let (a, _) = pair(&mut backend);
        assert!(matches!(
            PingPong::new(&backend, a, a),
            Err(ComputeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_accumulate() {
        let mut backend = CpuBackend::new();
        let (a, b) = pair(&mut backend);
        let mut pp = PingPong::new(&backend, a, b).unwrap();
        pp.reset(3);
        assert_eq!(pp.accumulate(2), 5);
        assert_eq!(pp.accumulate(2), 7);
        assert_eq!(pp.accumulated(), 7);
    }
}
