use std::fmt;

/// Resource table a slot index refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotKind {
    SpriteSheet,
    Shader,
    Offscreen,
    PaletteColor,
    PaletteSwap,
    MapLayer,
    SoundChannel,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::SpriteSheet => "sprite sheet",
            SlotKind::Shader => "shader",
            SlotKind::Offscreen => "offscreen",
            SlotKind::PaletteColor => "palette color",
            SlotKind::PaletteSwap => "palette swap",
            SlotKind::MapLayer => "map layer",
            SlotKind::SoundChannel => "sound channel",
        };
        f.write_str(name)
    }
}

/// Caller-side configuration error.
///
/// Setup calls validate their arguments before touching any state and return this
/// error on rejection. The engine logs the rejection where it happens, so callers
/// are free to ignore the result.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// An index addressed a slot outside `0..max`.
    SlotOutOfRange { kind: SlotKind, index: usize, max: usize },
    /// A size or count argument was zero, negative or above its hardware bound.
    InvalidSize(String),
    /// A backing resource (texture, shader, surface) could not be created or found.
    ResourceMissing(String),
    /// A call that requires the render phase was made outside it.
    NotInRenderPhase,
}

impl EngineError {
    #[inline]
    pub(crate) fn slot(kind: SlotKind, index: usize, max: usize) -> Self {
        EngineError::SlotOutOfRange { kind, index, max }
    }

    /// Logs the error at warn level and hands it back, for `return Err(e.logged())`.
    #[inline]
    pub(crate) fn logged(self) -> Self {
        log::warn!("{self}");
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::SlotOutOfRange { kind, index, max } => {
                write!(f, "{kind} index {index} out of range (0..{max})")
            }
            EngineError::InvalidSize(msg) => write!(f, "invalid size: {msg}"),
            EngineError::ResourceMissing(msg) => write!(f, "resource missing: {msg}"),
            EngineError::NotInRenderPhase => f.write_str("call is only valid during the render phase"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Validates `index < max` for the given slot table.
#[inline]
pub(crate) fn check_slot(kind: SlotKind, index: usize, max: usize) -> Result<(), EngineError> {
    if index < max {
        Ok(())
    } else {
        Err(EngineError::slot(kind, index, max).logged())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_error_message_names_the_table() {
        let e = EngineError::slot(SlotKind::Offscreen, 9, 8);
        assert_eq!(e.to_string(), "offscreen index 9 out of range (0..8)");
    }

    #[test]
    fn check_slot_accepts_last_index() {
        assert!(check_slot(SlotKind::Shader, 15, 16).is_ok());
        assert!(check_slot(SlotKind::Shader, 16, 16).is_err());
    }
}
