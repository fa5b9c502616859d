use crate::coords::Size;
use crate::error::EngineError;

/// Hardware capacity bounds.
///
/// Every limit the engine enforces lives here so callers can rely on the overflow
/// behavior (rejected or clamped, never a crash). Values are fixed for the lifetime
/// of an `Engine`.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareConfig {
    /// Fixed display resolution in pixels.
    pub display_size: Size,

    /// Largest batch bucket, in quads. Must be a power of two.
    pub max_batch_quads: u32,

    /// Smallest batch bucket, in quads. Must be a power of two.
    pub min_bucket_quads: u32,

    /// Tilemap chunk dimensions, in tiles.
    pub chunk_width: u32,
    pub chunk_height: u32,

    /// Upper bound on chunk meshes kept in the recycle pool.
    pub max_cached_meshes: usize,

    pub max_sprite_sheets: usize,
    pub max_shaders: usize,
    pub max_offscreens: usize,

    /// Channels of the host audio layer. `Engine::sound_channel_check` bounds
    /// channel indices by it.
    pub sound_channels: usize,

    pub max_palette_colors: usize,
    pub max_palette_swaps: usize,

    pub map_layers: usize,

    /// User-visible map size, in tiles.
    pub map_size: Size,

    /// Ellipses with a radius below this use the per-scanline path.
    pub ellipse_slow_radius: u32,
    pub max_polygon_points: usize,

    /// Chunks unused for more than this many frames release their mesh.
    pub chunk_stale_frames: u64,
    /// Staleness is checked every this many frames.
    pub chunk_maintenance_interval: u64,

    /// Fixed update rate, in updates per second.
    pub fixed_update_hz: u32,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            display_size: Size::new(480, 270),
            max_batch_quads: 512,
            min_bucket_quads: 4,
            chunk_width: 16,
            chunk_height: 16,
            max_cached_meshes: 256,
            max_sprite_sheets: 16,
            max_shaders: 16,
            max_offscreens: 8,
            sound_channels: 8,
            max_palette_colors: 256,
            max_palette_swaps: 64,
            map_layers: 8,
            map_size: Size::new(256, 256),
            ellipse_slow_radius: 12,
            max_polygon_points: 128,
            chunk_stale_frames: 200,
            chunk_maintenance_interval: 100,
            fixed_update_hz: 60,
        }
    }
}

impl HardwareConfig {
    /// Checks that the bounds are mutually consistent.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidSize(msg).logged());

        if self.display_size.is_empty() {
            return invalid("display size must be non-zero".into());
        }
        if !self.min_bucket_quads.is_power_of_two() || !self.max_batch_quads.is_power_of_two() {
            return invalid(format!(
                "bucket sizes must be powers of two (min {}, max {})",
                self.min_bucket_quads, self.max_batch_quads
            ));
        }
        if self.min_bucket_quads > self.max_batch_quads {
            return invalid(format!(
                "min bucket ({}) exceeds max batch ({})",
                self.min_bucket_quads, self.max_batch_quads
            ));
        }
        // u16 indices address at most 65536 vertices.
        if self.max_batch_vertices() > u16::MAX as usize + 1 {
            return invalid(format!("max batch of {} quads overflows u16 indices", self.max_batch_quads));
        }
        if self.chunk_width == 0 || self.chunk_height == 0 {
            return invalid("chunk dimensions must be non-zero".into());
        }
        if self.chunk_tiles() > self.max_batch_quads as usize {
            return invalid(format!(
                "a full chunk ({} tiles) does not fit in one batch ({} quads)",
                self.chunk_tiles(),
                self.max_batch_quads
            ));
        }
        if self.max_palette_colors == 0 || self.max_palette_colors > 256 {
            return invalid(format!("palette size {} outside 1..=256", self.max_palette_colors));
        }
        if self.max_palette_swaps == 0 {
            return invalid("at least one palette swap row is required".into());
        }
        if self.map_layers == 0 || self.map_size.is_empty() {
            return invalid("map must have at least one layer and a non-zero size".into());
        }
        if self.max_polygon_points < 8 {
            return invalid(format!("max polygon points {} below 8", self.max_polygon_points));
        }
        if self.chunk_maintenance_interval == 0 || self.fixed_update_hz == 0 {
            return invalid("maintenance interval and update rate must be non-zero".into());
        }

        Ok(())
    }

    #[inline]
    pub fn max_batch_vertices(&self) -> usize {
        self.max_batch_quads as usize * 4
    }

    #[inline]
    pub fn max_batch_indices(&self) -> usize {
        self.max_batch_quads as usize * 6
    }

    #[inline]
    pub fn chunk_tiles(&self) -> usize {
        (self.chunk_width * self.chunk_height) as usize
    }

    /// Chunk columns of the padded, chunk-aligned grid.
    #[inline]
    pub fn map_chunks_x(&self) -> usize {
        self.map_size.width.div_ceil(self.chunk_width) as usize
    }

    /// Chunk rows of the padded, chunk-aligned grid.
    #[inline]
    pub fn map_chunks_y(&self) -> usize {
        self.map_size.height.div_ceil(self.chunk_height) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = HardwareConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_batch_vertices(), 2048);
        assert_eq!(cfg.max_batch_indices(), 3072);
        assert_eq!(cfg.chunk_tiles(), 256);
    }

    #[test]
    fn chunk_grid_is_padded() {
        let cfg = HardwareConfig { map_size: Size::new(17, 33), ..Default::default() };
        assert_eq!(cfg.map_chunks_x(), 2);
        assert_eq!(cfg.map_chunks_y(), 3);
    }

    #[test]
    fn non_power_of_two_bucket_rejected() {
        let cfg = HardwareConfig { max_batch_quads: 500, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidSize(_))));
    }

    #[test]
    fn chunk_larger_than_batch_rejected() {
        let cfg = HardwareConfig { max_batch_quads: 128, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_palette_rejected() {
        let cfg = HardwareConfig { max_palette_colors: 300, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
