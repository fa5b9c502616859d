use crate::coords::{Color32, Vec2};
use crate::render::FilterMode;

/// Post-processing effects known to the compositor.
///
/// `Pinhole` and `InvertedPinhole` are drawn as geometry when a buffer ends; every
/// other kind is applied by the present shader.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Scanlines,
    Noise,
    Desaturation,
    Curvature,
    Slide,
    Wipe,
    Shake,
    Zoom,
    Rotation,
    ColorFade,
    ColorTint,
    Negative,
    Pixelate,
    Pinhole,
    InvertedPinhole,
    Fizzle,
}

impl EffectKind {
    pub const COUNT: usize = 16;

    pub const ALL: [EffectKind; Self::COUNT] = [
        EffectKind::Scanlines,
        EffectKind::Noise,
        EffectKind::Desaturation,
        EffectKind::Curvature,
        EffectKind::Slide,
        EffectKind::Wipe,
        EffectKind::Shake,
        EffectKind::Zoom,
        EffectKind::Rotation,
        EffectKind::ColorFade,
        EffectKind::ColorTint,
        EffectKind::Negative,
        EffectKind::Pixelate,
        EffectKind::Pinhole,
        EffectKind::InvertedPinhole,
        EffectKind::Fizzle,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Drawn as geometry rather than by the present shader.
    #[inline]
    pub const fn is_render_time(self) -> bool {
        matches!(self, EffectKind::Pinhole | EffectKind::InvertedPinhole)
    }
}

/// Parameters of one effect. Zero intensity disables most effects.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EffectParam {
    pub intensity: f32,
    pub vector: Vec2,
    pub color: Color32,
}

impl Default for EffectParam {
    fn default() -> Self {
        Self { intensity: 0.0, vector: Vec2::zero(), color: Color32::BLACK }
    }
}

/// Full effect state of a front buffer.
///
/// Copied by value when a buffer ends so later edits only affect later buffers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EffectParams {
    params: [EffectParam; EffectKind::COUNT],
    /// Present shader slot; `None` selects the built-in one.
    pub shader: Option<usize>,
    /// Sampling filter used when this buffer is composited.
    pub filter: FilterMode,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            params: [EffectParam::default(); EffectKind::COUNT],
            shader: None,
            filter: FilterMode::Point,
        }
    }
}

impl EffectParams {
    #[inline]
    pub fn get(&self, kind: EffectKind) -> &EffectParam {
        &self.params[kind.index()]
    }

    pub fn set(&mut self, kind: EffectKind, param: EffectParam) {
        let param = EffectParam {
            intensity: if param.intensity.is_finite() { param.intensity } else { 0.0 },
            vector: if param.vector.is_finite() { param.vector } else { Vec2::zero() },
            color: param.color,
        };
        self.params[kind.index()] = param;
    }

    pub fn set_intensity(&mut self, kind: EffectKind, intensity: f32) {
        let mut p = *self.get(kind);
        p.intensity = intensity;
        self.set(kind, p);
    }

    /// Resets one effect to its disabled state.
    pub fn reset(&mut self, kind: EffectKind) {
        self.params[kind.index()] = EffectParam::default();
    }

    /// Resets every effect, the shader selector and the filter.
    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// True when some shader-applied effect is active.
    pub fn any_shader_effect(&self) -> bool {
        EffectKind::ALL
            .iter()
            .filter(|k| !k.is_render_time())
            .any(|&k| {
                let p = self.get(k);
                p.intensity != 0.0 || (k == EffectKind::Slide && p.vector != Vec2::zero())
            })
    }

    /// Two `vec4`s per effect: `[intensity, vector.x, vector.y, 0]` then the color.
    pub fn to_uniform_array(&self) -> [[f32; 4]; EffectKind::COUNT * 2] {
        let mut out = [[0.0; 4]; EffectKind::COUNT * 2];
        for (i, p) in self.params.iter().enumerate() {
            out[i * 2] = [p.intensity, p.vector.x, p.vector.y, 0.0];
            let c = p.color;
            out[i * 2 + 1] = [
                c.r as f32 / 255.0,
                c.g as f32 / 255.0,
                c.b as f32 / 255.0,
                c.a as f32 / 255.0,
            ];
        }
        out
    }
}
