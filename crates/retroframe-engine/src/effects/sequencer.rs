use anyhow::{Context, Result};

use crate::coords::{Color32, Size};
use crate::render::{GraphicsBackend, SurfaceId};

use super::params::EffectParams;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrontBuffer {
    pub surface: SurfaceId,
    /// Effects captured when rendering into this buffer ended.
    pub params: EffectParams,
}

/// Ordered list of render surfaces making up one displayed frame.
///
/// Each `next_buffer` call closes the current buffer (capturing the live effect
/// parameters into it) and moves drawing to the next one, so effects applied
/// mid-frame only affect what was drawn before them. Surfaces are created on
/// demand and reused across frames.
#[derive(Debug)]
pub struct FrontBufferSequencer {
    size: Size,
    buffers: Vec<FrontBuffer>,
    current: usize,
    used: usize,
}

impl FrontBufferSequencer {
    pub fn new(size: Size) -> Self {
        Self { size, buffers: Vec::new(), current: 0, used: 0 }
    }

    /// Creates buffer 0 if needed and returns its surface.
    pub fn ensure_initial<B: GraphicsBackend>(&mut self, backend: &mut B) -> Result<SurfaceId> {
        if self.buffers.is_empty() {
            let surface = backend
                .create_surface("front buffer 0", self.size)
                .context("failed to create initial front buffer")?;
            self.buffers.push(FrontBuffer { surface, params: EffectParams::default() });
            self.used = 1;
        }
        Ok(self.buffers[0].surface)
    }

    /// Closes the current buffer with a copy of `live` and switches to the next one,
    /// cleared to transparent.
    ///
    /// On failure the sequencer stays on the current buffer.
    pub fn next_buffer<B: GraphicsBackend>(
        &mut self,
        backend: &mut B,
        live: &EffectParams,
    ) -> Result<SurfaceId> {
        self.ensure_initial(backend)?;

        let next = self.current + 1;
        if next == self.buffers.len() {
            let surface = backend
                .create_surface(&format!("front buffer {next}"), self.size)
                .with_context(|| format!("failed to create front buffer {next}"))?;
            log::debug!("front buffers: grew to {}", next + 1);
            self.buffers.push(FrontBuffer { surface, params: EffectParams::default() });
        }

        self.buffers[self.current].params = *live;
        self.current = next;
        self.used = self.used.max(next + 1);

        let surface = self.buffers[next].surface;
        backend.clear_surface(surface, Color32::TRANSPARENT);
        Ok(surface)
    }

    /// Stores `live` into the current buffer (end of frame).
    pub fn capture_current(&mut self, live: &EffectParams) {
        if let Some(b) = self.buffers.get_mut(self.current) {
            b.params = *live;
        }
    }

    /// Starts a new frame on buffer 0.
    pub fn reset(&mut self) {
        self.current = 0;
        self.used = self.buffers.len().min(1);
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Buffers drawn into this frame.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn current_surface(&self) -> Option<SurfaceId> {
        self.buffers.get(self.current).map(|b| b.surface)
    }

    /// Buffers to composite this frame, bottom first.
    pub fn layers(&self) -> &[FrontBuffer] {
        &self.buffers[..self.used]
    }

    /// Resizes every surface; contents are undefined afterwards.
    pub fn resize<B: GraphicsBackend>(&mut self, backend: &mut B, size: Size) {
        if size == self.size || size.is_empty() {
            return;
        }
        self.size = size;
        for b in &self.buffers {
            backend.resize_surface(b.surface, size);
        }
    }
}
