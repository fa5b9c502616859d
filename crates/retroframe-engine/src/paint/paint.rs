use crate::coords::Color32;

/// Ink for solid draws.
///
/// `Indexed` colors are resolved on the GPU through the active palette swap row, so
/// recoloring never touches vertex data. `Rgb` colors bypass the palette.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Paint {
    Indexed(u8),
    Rgb(Color32),
}

impl Paint {
    #[inline]
    pub const fn index(i: u8) -> Self {
        Paint::Indexed(i)
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Paint::Rgb(Color32::rgb(r, g, b))
    }

    #[inline]
    pub fn is_indexed(self) -> bool {
        matches!(self, Paint::Indexed(_))
    }
}

impl From<Color32> for Paint {
    fn from(c: Color32) -> Self {
        Paint::Rgb(c)
    }
}

impl From<u8> for Paint {
    fn from(i: u8) -> Self {
        Paint::Indexed(i)
    }
}
