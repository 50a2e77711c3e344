//! Colour configuration shared by simulations and generators.

mod lut;

pub use lut::{COLOR_LUT_SIZE, ColorLut, sample_lut};

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

pub const MAX_GRADIENT_STOPS: usize = 8;
const MIN_STOP_SPACING: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_linear(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn from_unit(rgb: [f32; 3]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        Self::rgb(q(rgb[0]), q(rgb[1]), q(rgb[2]))
    }

    pub fn hsv(self) -> (f32, f32, f32) {
        let c = self.to_linear();
        rgb_to_hsv([c[0], c[1], c[2]])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub position: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Solid,
    Rainbow,
    Gradient,
    Palette,
}

impl ColorMode {
    pub fn from_index(i: i32) -> Self {
        match i {
            1 => Self::Rainbow,
            2 => Self::Gradient,
            3 => Self::Palette,
            _ => Self::Solid,
        }
    }

    pub fn index(self) -> i32 {
        match self {
            Self::Solid => 0,
            Self::Rainbow => 1,
            Self::Gradient => 2,
            Self::Palette => 3,
        }
    }

    /// Modes that produce a hue distribution across agents.
    pub fn derives_hue(self) -> bool {
        matches!(self, Self::Solid | Self::Rainbow | Self::Gradient)
    }
}

/// Cosine palette `a + b * cos(2pi * (c * t + d))`, one coefficient set per channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub a: [f32; 3],
    pub b: [f32; 3],
    pub c: [f32; 3],
    pub d: [f32; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            a: [0.5, 0.5, 0.5],
            b: [0.5, 0.5, 0.5],
            c: [1.0, 1.0, 1.0],
            d: [0.0, 0.33, 0.67],
        }
    }
}

impl Palette {
    pub fn eval(&self, t: f32) -> [f32; 3] {
        std::array::from_fn(|i| {
            (self.a[i] + self.b[i] * (TAU * (self.c[i] * t + self.d[i])).cos()).clamp(0.0, 1.0)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorConfigRepr", into = "ColorConfigRepr")]
pub struct ColorConfig {
    pub mode: ColorMode,
    pub solid: Color,
    /// Degrees.
    pub rainbow_hue: f32,
    pub rainbow_range: f32,
    pub rainbow_sat: f32,
    pub rainbow_val: f32,
    pub gradient: Vec<GradientStop>,
    pub palette: Palette,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            mode: ColorMode::Solid,
            solid: Color::WHITE,
            rainbow_hue: 0.0,
            rainbow_range: 360.0,
            rainbow_sat: 1.0,
            rainbow_val: 1.0,
            gradient: default_gradient(),
            palette: Palette::default(),
        }
    }
}

impl ColorConfig {
    pub fn solid(color: Color) -> Self {
        Self {
            solid: color,
            ..Self::default()
        }
    }

    pub fn rainbow(hue: f32, range: f32) -> Self {
        Self {
            mode: ColorMode::Rainbow,
            rainbow_hue: hue,
            rainbow_range: range,
            ..Self::default()
        }
    }

    pub fn gradient(stops: Vec<GradientStop>) -> Self {
        let mut cfg = Self {
            mode: ColorMode::Gradient,
            gradient: stops,
            ..Self::default()
        };
        normalize_gradient(&mut cfg.gradient);
        cfg
    }

    /// Colour at `t` in [0, 1] for the active mode.
    pub fn eval(&self, t: f32) -> [f32; 3] {
        let t = t.clamp(0.0, 1.0);
        match self.mode {
            ColorMode::Solid => {
                let c = self.solid.to_linear();
                [c[0], c[1], c[2]]
            }
            ColorMode::Rainbow => {
                let hue = (self.rainbow_hue + t * self.rainbow_range).rem_euclid(360.0) / 360.0;
                hsv_to_rgb(hue, self.rainbow_sat, self.rainbow_val)
            }
            ColorMode::Gradient => gradient_eval(&self.gradient, t),
            ColorMode::Palette => self.palette.eval(t),
        }
    }

    /// Equality over the fields the current mode reads.
    pub fn same_output(&self, other: &Self) -> bool {
        if self.mode != other.mode {
            return false;
        }
        match self.mode {
            ColorMode::Solid => self.solid == other.solid,
            ColorMode::Rainbow => {
                self.rainbow_hue == other.rainbow_hue
                    && self.rainbow_range == other.rainbow_range
                    && self.rainbow_sat == other.rainbow_sat
                    && self.rainbow_val == other.rainbow_val
            }
            ColorMode::Gradient => self.gradient == other.gradient,
            ColorMode::Palette => self.palette == other.palette,
        }
    }
}

pub fn default_gradient() -> Vec<GradientStop> {
    vec![
        GradientStop {
            position: 0.0,
            color: Color::CYAN,
        },
        GradientStop {
            position: 1.0,
            color: Color::MAGENTA,
        },
    ]
}

/// Sorts stops, pins the endpoints, drops near-duplicates and caps the count.
/// Fewer than two surviving stops resets to the default gradient.
pub fn normalize_gradient(stops: &mut Vec<GradientStop>) {
    stops.retain(|s| s.position.is_finite());
    for s in stops.iter_mut() {
        s.position = s.position.clamp(0.0, 1.0);
    }
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    stops.dedup_by(|next, kept| (next.position - kept.position).abs() < MIN_STOP_SPACING);
    stops.truncate(MAX_GRADIENT_STOPS);
    if stops.len() < 2 {
        *stops = default_gradient();
        return;
    }
    stops[0].position = 0.0;
    let last = stops.len() - 1;
    stops[last].position = 1.0;
    // Pinning may have collapsed an interior stop onto an endpoint.
    if stops.len() > 2 && stops[1].position < MIN_STOP_SPACING {
        stops.remove(1);
    }
    let last = stops.len() - 1;
    if last > 1 && 1.0 - stops[last - 1].position < MIN_STOP_SPACING {
        stops.remove(last - 1);
    }
}

pub fn gradient_eval(stops: &[GradientStop], t: f32) -> [f32; 3] {
    let rgb = |c: Color| {
        let l = c.to_linear();
        [l[0], l[1], l[2]]
    };
    match stops {
        [] => [1.0, 1.0, 1.0],
        [only] => rgb(only.color),
        [first, .., last] => {
            if t <= first.position {
                return rgb(first.color);
            }
            if t >= last.position {
                return rgb(last.color);
            }
            let Some(pair) = stops
                .windows(2)
                .find(|w| w[0].position <= t && t <= w[1].position)
            else {
                return rgb(first.color);
            };
            let (a, b) = (pair[0], pair[1]);
            let range = b.position - a.position;
            if range <= 0.0 {
                return rgb(a.color);
            }
            let f = (t - a.position) / range;
            let (ca, cb) = (rgb(a.color), rgb(b.color));
            std::array::from_fn(|i| ca[i] + (cb[i] - ca[i]) * f)
        }
    }
}

/// Hue, saturation and value, all in [0, 1].
pub fn rgb_to_hsv(rgb: [f32; 3]) -> (f32, f32, f32) {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 1e-5 { delta / max } else { 0.0 };
    if delta < 1e-5 {
        return (0.0, s, max);
    }
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    ((h / 6.0).rem_euclid(1.0), s, max)
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h6 = h.rem_euclid(1.0) * 6.0;
    let c = v * s;
    let x = c * (1.0 - ((h6 % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Hue of agent `index` out of `total`.
///
/// A near-grey solid colour spreads hues evenly so species stay distinct.
pub fn agent_hue(cfg: &ColorConfig, index: usize, total: usize) -> f32 {
    let t = index as f32 / total.max(1) as f32;
    match cfg.mode {
        ColorMode::Solid => {
            let (h, s, _) = cfg.solid.hsv();
            if s < 0.1 { t } else { h }
        }
        ColorMode::Gradient => rgb_to_hsv(gradient_eval(&cfg.gradient, t)).0,
        ColorMode::Palette => rgb_to_hsv(cfg.palette.eval(t)).0,
        ColorMode::Rainbow => ((cfg.rainbow_hue + t * cfg.rainbow_range) / 360.0).rem_euclid(1.0),
    }
}

/// Saturation and value used when agents deposit colour.
pub fn saturation_value(cfg: &ColorConfig) -> (f32, f32) {
    match cfg.mode {
        ColorMode::Solid => {
            let (_, s, v) = cfg.solid.hsv();
            (s, v)
        }
        ColorMode::Palette => {
            let (_, s, v) = rgb_to_hsv(cfg.palette.eval(0.5));
            (s, v)
        }
        ColorMode::Rainbow | ColorMode::Gradient => (cfg.rainbow_sat, cfg.rainbow_val),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ColorConfigRepr {
    mode: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    solid: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rainbow_hue: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rainbow_range: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rainbow_sat: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rainbow_val: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradient_stop_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradient_stops: Option<Vec<GradientStop>>,
    #[serde(rename = "paletteAR", skip_serializing_if = "Option::is_none")]
    palette_ar: Option<f32>,
    #[serde(rename = "paletteAG", skip_serializing_if = "Option::is_none")]
    palette_ag: Option<f32>,
    #[serde(rename = "paletteAB", skip_serializing_if = "Option::is_none")]
    palette_ab: Option<f32>,
    #[serde(rename = "paletteBR", skip_serializing_if = "Option::is_none")]
    palette_br: Option<f32>,
    #[serde(rename = "paletteBG", skip_serializing_if = "Option::is_none")]
    palette_bg: Option<f32>,
    #[serde(rename = "paletteBB", skip_serializing_if = "Option::is_none")]
    palette_bb: Option<f32>,
    #[serde(rename = "paletteCR", skip_serializing_if = "Option::is_none")]
    palette_cr: Option<f32>,
    #[serde(rename = "paletteCG", skip_serializing_if = "Option::is_none")]
    palette_cg: Option<f32>,
    #[serde(rename = "paletteCB", skip_serializing_if = "Option::is_none")]
    palette_cb: Option<f32>,
    #[serde(rename = "paletteDR", skip_serializing_if = "Option::is_none")]
    palette_dr: Option<f32>,
    #[serde(rename = "paletteDG", skip_serializing_if = "Option::is_none")]
    palette_dg: Option<f32>,
    #[serde(rename = "paletteDB", skip_serializing_if = "Option::is_none")]
    palette_db: Option<f32>,
}

impl From<ColorConfig> for ColorConfigRepr {
    fn from(cfg: ColorConfig) -> Self {
        let mut repr = Self {
            mode: cfg.mode.index(),
            ..Self::default()
        };
        match cfg.mode {
            ColorMode::Solid => repr.solid = Some(cfg.solid),
            ColorMode::Rainbow => {
                repr.rainbow_hue = Some(cfg.rainbow_hue);
                repr.rainbow_range = Some(cfg.rainbow_range);
                repr.rainbow_sat = Some(cfg.rainbow_sat);
                repr.rainbow_val = Some(cfg.rainbow_val);
            }
            ColorMode::Gradient => {
                repr.gradient_stop_count = Some(cfg.gradient.len());
                repr.gradient_stops = Some(cfg.gradient);
            }
            ColorMode::Palette => {
                let p = cfg.palette;
                repr.palette_ar = Some(p.a[0]);
                repr.palette_ag = Some(p.a[1]);
                repr.palette_ab = Some(p.a[2]);
                repr.palette_br = Some(p.b[0]);
                repr.palette_bg = Some(p.b[1]);
                repr.palette_bb = Some(p.b[2]);
                repr.palette_cr = Some(p.c[0]);
                repr.palette_cg = Some(p.c[1]);
                repr.palette_cb = Some(p.c[2]);
                repr.palette_dr = Some(p.d[0]);
                repr.palette_dg = Some(p.d[1]);
                repr.palette_db = Some(p.d[2]);
            }
        }
        repr
    }
}

impl From<ColorConfigRepr> for ColorConfig {
    fn from(repr: ColorConfigRepr) -> Self {
        let d = Self::default();
        let pd = d.palette;
        let mut gradient = repr.gradient_stops.unwrap_or_default();
        if let Some(count) = repr.gradient_stop_count {
            gradient.truncate(count);
        }
        if repr.gradient_stop_count.unwrap_or(gradient.len()) < 2 {
            gradient.clear();
        }
        normalize_gradient(&mut gradient);
        Self {
            mode: ColorMode::from_index(repr.mode),
            solid: repr.solid.unwrap_or(d.solid),
            rainbow_hue: repr.rainbow_hue.unwrap_or(d.rainbow_hue),
            rainbow_range: repr.rainbow_range.unwrap_or(d.rainbow_range),
            rainbow_sat: repr.rainbow_sat.unwrap_or(d.rainbow_sat).clamp(0.0, 1.0),
            rainbow_val: repr.rainbow_val.unwrap_or(d.rainbow_val).clamp(0.0, 1.0),
            gradient,
            palette: Palette {
                a: [
                    repr.palette_ar.unwrap_or(pd.a[0]),
                    repr.palette_ag.unwrap_or(pd.a[1]),
                    repr.palette_ab.unwrap_or(pd.a[2]),
                ],
                b: [
                    repr.palette_br.unwrap_or(pd.b[0]),
                    repr.palette_bg.unwrap_or(pd.b[1]),
                    repr.palette_bb.unwrap_or(pd.b[2]),
                ],
                c: [
                    repr.palette_cr.unwrap_or(pd.c[0]),
                    repr.palette_cg.unwrap_or(pd.c[1]),
                    repr.palette_cb.unwrap_or(pd.c[2]),
                ],
                d: [
                    repr.palette_dr.unwrap_or(pd.d[0]),
                    repr.palette_dg.unwrap_or(pd.d[1]),
                    repr.palette_db.unwrap_or(pd.d[2]),
                ],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_round_trips_primaries() {
        for rgb in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 0.0]] {
            let (h, s, v) = rgb_to_hsv(rgb);
            let back = hsv_to_rgb(h, s, v);
            for c in 0..3 {
                assert!((back[c] - rgb[c]).abs() < 1e-5, "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn grey_solid_spreads_hues() {
        let cfg = ColorConfig::solid(Color::WHITE);
        assert_eq!(agent_hue(&cfg, 0, 4), 0.0);
        assert_eq!(agent_hue(&cfg, 2, 4), 0.5);
    }

    #[test]
    fn pinned_endpoints_drop_collapsed_neighbours() {
        let mut stops = vec![
            GradientStop { position: 0.2, color: Color::CYAN },
            GradientStop { position: 0.2005, color: Color::WHITE },
            GradientStop { position: 0.9, color: Color::MAGENTA },
        ];
        normalize_gradient(&mut stops);
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].position, 0.0);
        assert_eq!(stops[1].position, 1.0);
    }
}
