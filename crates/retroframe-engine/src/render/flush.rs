use std::fmt;

use crate::core::DoubleBuffered;

/// Why a batch was submitted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FlushReason {
    /// Not enough room left for the next primitive.
    BatchFull,
    /// Sprite sheet or offscreen source differs from the batch's.
    TextureChange,
    ShaderChange,
    ClipChange,
    TargetChange,
    FrameEnd,
    /// Front buffer advanced for a post-processing capture.
    EffectApply,
    /// Requested by a caller (clears, resource replacement, manual flush).
    Explicit,
}

impl FlushReason {
    pub const COUNT: usize = 8;

    pub const ALL: [FlushReason; Self::COUNT] = [
        FlushReason::BatchFull,
        FlushReason::TextureChange,
        FlushReason::ShaderChange,
        FlushReason::ClipChange,
        FlushReason::TargetChange,
        FlushReason::FrameEnd,
        FlushReason::EffectApply,
        FlushReason::Explicit,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short uppercase label for the diagnostics overlay.
    pub const fn label(self) -> &'static str {
        match self {
            FlushReason::BatchFull => "FULL",
            FlushReason::TextureChange => "TEXTURE",
            FlushReason::ShaderChange => "SHADER",
            FlushReason::ClipChange => "CLIP",
            FlushReason::TargetChange => "TARGET",
            FlushReason::FrameEnd => "FRAME",
            FlushReason::EffectApply => "EFFECT",
            FlushReason::Explicit => "EXPLICIT",
        }
    }
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-reason flush counters, double-buffered per frame.
#[derive(Debug, Clone, Default)]
pub struct FlushStats {
    counts: DoubleBuffered<[u32; FlushReason::COUNT]>,
}

impl FlushStats {
    #[inline]
    pub fn record(&mut self, reason: FlushReason) {
        self.counts.current_mut()[reason.index()] += 1;
    }

    /// Starts a new frame; the finished frame becomes `previous`.
    #[inline]
    pub fn advance(&mut self) {
        self.counts.advance_with([0; FlushReason::COUNT]);
    }

    #[inline]
    pub fn current(&self, reason: FlushReason) -> u32 {
        self.counts.current()[reason.index()]
    }

    #[inline]
    pub fn previous(&self, reason: FlushReason) -> u32 {
        self.counts.previous()[reason.index()]
    }

    pub fn current_total(&self) -> u32 {
        self.counts.current().iter().sum()
    }

    pub fn previous_total(&self) -> u32 {
        self.counts.previous().iter().sum()
    }
}
