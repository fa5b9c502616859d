use crate::coords::{Color32, Rect, Size};
use crate::error::{check_slot, EngineError, SlotKind};

const DEFAULT_COLORS: [Color32; 16] = [
    Color32::rgb(0x00, 0x00, 0x00),
    Color32::rgb(0x1d, 0x2b, 0x53),
    Color32::rgb(0x7e, 0x25, 0x53),
    Color32::rgb(0x00, 0x87, 0x51),
    Color32::rgb(0xab, 0x52, 0x36),
    Color32::rgb(0x5f, 0x57, 0x4f),
    Color32::rgb(0xc2, 0xc3, 0xc7),
    Color32::rgb(0xff, 0xf1, 0xe8),
    Color32::rgb(0xff, 0x00, 0x4d),
    Color32::rgb(0xff, 0xa3, 0x00),
    Color32::rgb(0xff, 0xec, 0x27),
    Color32::rgb(0x00, 0xe4, 0x36),
    Color32::rgb(0x29, 0xad, 0xff),
    Color32::rgb(0x83, 0x76, 0x9c),
    Color32::rgb(0xff, 0x77, 0xa8),
    Color32::rgb(0xff, 0xcc, 0xaa),
];

/// Indexed color table plus palette swap rows.
///
/// The palette owns the CPU copy of the system lookup texture:
/// - width = max colors, height = max swaps + 1
/// - row 0 is solid white (RGB draws multiply vertex color by it)
/// - row `s + 1` holds the resolved colors of swap `s`; swap 0 starts as identity
///
/// Edits update the pixels in place and grow a pending dirty region; the renderer
/// uploads that region at its next flush.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color32>,
    swaps: Vec<Vec<u8>>,
    pixels: Vec<u8>,
    dirty: Option<Rect>,
}

impl Palette {
    pub fn new(max_colors: usize, max_swaps: usize) -> Self {
        let max_colors = max_colors.clamp(1, 256);
        let max_swaps = max_swaps.max(1);

        let mut colors = vec![Color32::BLACK; max_colors];
        for (dst, src) in colors.iter_mut().zip(DEFAULT_COLORS) {
            *dst = src;
        }

        let identity: Vec<u8> = (0..max_colors).map(|i| i as u8).collect();
        let swaps = vec![identity; max_swaps];

        let mut palette = Self {
            colors,
            swaps,
            pixels: vec![255; max_colors * (max_swaps + 1) * 4],
            dirty: None,
        };
        for swap in 0..max_swaps {
            palette.rebuild_row(swap);
        }
        palette.dirty = None;
        palette
    }

    #[inline]
    pub fn max_colors(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn max_swaps(&self) -> usize {
        self.swaps.len()
    }

    /// Lookup texture dimensions.
    #[inline]
    pub fn lookup_size(&self) -> Size {
        Size::new(self.max_colors() as u32, self.max_swaps() as u32 + 1)
    }

    /// Full lookup texture, tightly packed RGBA8.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    pub fn color(&self, index: usize) -> Color32 {
        self.colors[index.min(self.colors.len() - 1)]
    }

    #[inline]
    pub fn colors(&self) -> &[Color32] {
        &self.colors
    }

    pub fn set_color(&mut self, index: usize, color: Color32) -> Result<(), EngineError> {
        check_slot(SlotKind::PaletteColor, index, self.max_colors())?;
        if self.colors[index] == color {
            return Ok(());
        }
        self.colors[index] = color;

        for swap in 0..self.swaps.len() {
            if self.swaps[swap].contains(&(index as u8)) {
                self.rebuild_row(swap);
            }
        }
        Ok(())
    }

    /// Replaces the leading colors; entries beyond the palette capacity are dropped.
    pub fn set_colors(&mut self, colors: &[Color32]) {
        if colors.len() > self.max_colors() {
            log::warn!(
                "palette load of {} colors clamped to {}",
                colors.len(),
                self.max_colors()
            );
        }
        let n = colors.len().min(self.max_colors());
        self.colors[..n].copy_from_slice(&colors[..n]);
        for swap in 0..self.swaps.len() {
            self.rebuild_row(swap);
        }
    }

    /// Sets swap row `swap` so that color `i` renders as `mapping[i]`.
    ///
    /// Colors past the end of `mapping` keep their identity mapping; mapping values
    /// outside the palette clamp to the last color.
    pub fn set_swap(&mut self, swap: usize, mapping: &[u8]) -> Result<(), EngineError> {
        check_slot(SlotKind::PaletteSwap, swap, self.max_swaps())?;

        let last = (self.max_colors() - 1) as u8;
        let row = &mut self.swaps[swap];
        for (i, dst) in row.iter_mut().enumerate() {
            *dst = match mapping.get(i) {
                Some(&m) => m.min(last),
                None => i as u8,
            };
        }
        self.rebuild_row(swap);
        Ok(())
    }

    #[inline]
    pub fn swap_entry(&self, swap: usize, index: usize) -> u8 {
        let row = &self.swaps[swap.min(self.swaps.len() - 1)];
        row[index.min(row.len() - 1)]
    }

    /// Returns and clears the pending upload region, in lookup-texture pixels.
    #[inline]
    pub fn take_dirty(&mut self) -> Option<Rect> {
        self.dirty.take()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Copies `region` out of the lookup texture as tightly packed RGBA8.
    pub fn region_rgba(&self, region: Rect) -> Vec<u8> {
        let width = self.max_colors();
        let mut out = Vec::with_capacity(region.width.max(0) as usize * region.height.max(0) as usize * 4);
        for y in region.y..region.bottom() {
            let start = (y as usize * width + region.x as usize) * 4;
            let end = start + region.width as usize * 4;
            out.extend_from_slice(&self.pixels[start..end]);
        }
        out
    }

    fn rebuild_row(&mut self, swap: usize) {
        let width = self.max_colors();
        let y = swap + 1;
        for x in 0..width {
            let color = self.colors[self.swaps[swap][x] as usize];
            let at = (y * width + x) * 4;
            self.pixels[at..at + 4].copy_from_slice(&color.to_array());
        }
        self.mark_dirty(Rect::new(0, y as i32, width as i32, 1));
    }

    fn mark_dirty(&mut self, region: Rect) {
        self.dirty = Some(match self.dirty {
            None => region,
            Some(d) => {
                let x0 = d.x.min(region.x);
                let y0 = d.y.min(region.y);
                let x1 = d.right().max(region.right());
                let y1 = d.bottom().max(region.bottom());
                Rect::new(x0, y0, x1 - x0, y1 - y0)
            }
        });
    }
}
