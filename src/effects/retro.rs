//! Low-fidelity, broken-signal and eighties-screen looks.

use super::{EffectFrame, Phase, TransformEffect, TransformEffectType, UniformWriter, effect_settings};
use crate::effect_config::EffectConfig;
use crate::gpu::TextureId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PixelationConfig {
    pub enabled: bool,
    /// Cells across the width; lower is blockier.
    pub cell_count: f32,
    /// Levels per channel; 0 disables posterizing.
    pub posterize_levels: i32,
    /// Only used together with posterizing.
    pub dither_scale: f32,
}

impl Default for PixelationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_count: 64.0,
            posterize_levels: 0,
            dither_scale: 1.0,
        }
    }
}

effect_settings!(PixelationConfig {
    cell_count: "cellCount" => 4.0, 256.0;
    dither_scale: "ditherScale" => 1.0, 8.0;
});

impl TransformEffect for PixelationConfig {
    const KIND: TransformEffectType = TransformEffectType::Pixelation;
    const SHADER: &'static str = "shaders/pixelation.fs";
    const UNIFORMS: &'static [&'static str] = &["cellCount", "posterizeLevels", "ditherScale"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.pixelation
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, _frame: &EffectFrame, _luts: &[TextureId]) {
        u.f32("cellCount", self.cell_count.max(1.0));
        u.i32("posterizeLevels", self.posterize_levels.clamp(0, 16));
        u.f32("ditherScale", self.dither_scale);
    }
}

/// Stacked signal-damage stages, each gated by its own switch or by a
/// zero intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlitchConfig {
    pub enabled: bool,
    pub crt_enabled: bool,
    pub curvature: f32,
    pub vignette_enabled: bool,
    /// 0 disables the analog stage.
    pub analog_intensity: f32,
    /// Channel offset in pixels.
    pub aberration: f32,
    /// 0 disables block displacement.
    pub block_threshold: f32,
    pub block_offset: f32,
    pub vhs_enabled: bool,
    pub tracking_bar_intensity: f32,
    pub scanline_noise_intensity: f32,
    pub color_drift_intensity: f32,
    pub scanline_amount: f32,
    pub noise_amount: f32,
    pub datamosh_enabled: bool,
    pub datamosh_intensity: f32,
    pub datamosh_min: f32,
    pub datamosh_max: f32,
    pub datamosh_speed: f32,
    pub datamosh_bands: f32,
    pub row_slice_enabled: bool,
    pub row_slice_intensity: f32,
    pub row_slice_burst_freq: f32,
    pub row_slice_burst_power: f32,
    pub row_slice_columns: f32,
    pub col_slice_enabled: bool,
    pub col_slice_intensity: f32,
    pub col_slice_burst_freq: f32,
    pub col_slice_burst_power: f32,
    pub col_slice_rows: f32,
    pub temporal_jitter_enabled: bool,
    pub temporal_jitter_amount: f32,
    pub temporal_jitter_gate: f32,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            crt_enabled: false,
            curvature: 0.1,
            vignette_enabled: true,
            analog_intensity: 0.0,
            aberration: 5.0,
            block_threshold: 0.0,
            block_offset: 0.2,
            vhs_enabled: false,
            tracking_bar_intensity: 0.02,
            scanline_noise_intensity: 0.01,
            color_drift_intensity: 1.0,
            scanline_amount: 0.1,
            noise_amount: 0.05,
            datamosh_enabled: false,
            datamosh_intensity: 1.0,
            datamosh_min: 6.0,
            datamosh_max: 64.0,
            datamosh_speed: 6.0,
            datamosh_bands: 8.0,
            row_slice_enabled: false,
            row_slice_intensity: 0.1,
            row_slice_burst_freq: 4.0,
            row_slice_burst_power: 7.0,
            row_slice_columns: 32.0,
            col_slice_enabled: false,
            col_slice_intensity: 0.1,
            col_slice_burst_freq: 4.0,
            col_slice_burst_power: 7.0,
            col_slice_rows: 32.0,
            temporal_jitter_enabled: false,
            temporal_jitter_amount: 0.02,
            temporal_jitter_gate: 0.3,
        }
    }
}

effect_settings!(GlitchConfig {
    analog_intensity: "analogIntensity" => 0.0, 1.0;
    block_threshold: "blockThreshold" => 0.0, 0.9;
    aberration: "aberration" => 0.0, 20.0;
    block_offset: "blockOffset" => 0.0, 0.5;
    datamosh_intensity: "datamoshIntensity" => 0.0, 1.0;
    datamosh_min: "datamoshMin" => 4.0, 32.0;
    datamosh_max: "datamoshMax" => 16.0, 128.0;
    row_slice_intensity: "rowSliceIntensity" => 0.0, 0.5;
    col_slice_intensity: "colSliceIntensity" => 0.0, 0.5;
    temporal_jitter_amount: "temporalJitterAmount" => 0.0, 0.1;
    temporal_jitter_gate: "temporalJitterGate" => 0.0, 1.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct GlitchState {
    time: Phase,
    frame: i32,
}

impl TransformEffect for GlitchConfig {
    const KIND: TransformEffectType = TransformEffectType::Glitch;
    const SHADER: &'static str = "shaders/glitch.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "time",
        "frame",
        "crtEnabled",
        "curvature",
        "vignetteEnabled",
        "analogIntensity",
        "aberration",
        "blockThreshold",
        "blockOffset",
        "vhsEnabled",
        "trackingBarIntensity",
        "scanlineNoiseIntensity",
        "colorDriftIntensity",
        "scanlineAmount",
        "noiseAmount",
        "datamoshEnabled",
        "datamoshIntensity",
        "datamoshRange",
        "datamoshSpeed",
        "datamoshBands",
        "rowSliceEnabled",
        "rowSlice",
        "colSliceEnabled",
        "colSlice",
        "temporalJitterEnabled",
        "temporalJitterAmount",
        "temporalJitterGate",
    ];
    type State = GlitchState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.glitch
    }

    fn setup(&self, s: &mut GlitchState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        s.frame = s.frame.wrapping_add(1);
        u.vec2("resolution", frame.resolution());
        u.f32("time", s.time.advance(1.0, frame.dt));
        u.i32("frame", s.frame);
        u.flag("crtEnabled", self.crt_enabled);
        u.f32("curvature", self.curvature);
        u.flag("vignetteEnabled", self.vignette_enabled);
        u.f32("analogIntensity", self.analog_intensity);
        u.f32("aberration", self.aberration);
        u.f32("blockThreshold", self.block_threshold);
        u.f32("blockOffset", self.block_offset);
        u.flag("vhsEnabled", self.vhs_enabled);
        u.f32("trackingBarIntensity", self.tracking_bar_intensity);
        u.f32("scanlineNoiseIntensity", self.scanline_noise_intensity);
        u.f32("colorDriftIntensity", self.color_drift_intensity);
        u.f32("scanlineAmount", self.scanline_amount);
        u.f32("noiseAmount", self.noise_amount);
        u.flag("datamoshEnabled", self.datamosh_enabled);
        u.f32("datamoshIntensity", self.datamosh_intensity);
        let lo = self.datamosh_min.min(self.datamosh_max);
        u.vec2("datamoshRange", [lo, self.datamosh_max.max(lo)]);
        u.f32("datamoshSpeed", self.datamosh_speed);
        u.f32("datamoshBands", self.datamosh_bands);
        u.flag("rowSliceEnabled", self.row_slice_enabled);
        u.vec4(
            "rowSlice",
            [
                self.row_slice_intensity,
                self.row_slice_burst_freq,
                self.row_slice_burst_power,
                self.row_slice_columns,
            ],
        );
        u.flag("colSliceEnabled", self.col_slice_enabled);
        u.vec4(
            "colSlice",
            [
                self.col_slice_intensity,
                self.col_slice_burst_freq,
                self.col_slice_burst_power,
                self.col_slice_rows,
            ],
        );
        u.flag("temporalJitterEnabled", self.temporal_jitter_enabled);
        u.f32("temporalJitterAmount", self.temporal_jitter_amount);
        u.f32("temporalJitterGate", self.temporal_jitter_gate);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum AsciiColorMode {
    #[default]
    Original,
    Mono,
    CrtGreen,
}

impl From<i32> for AsciiColorMode {
    fn from(i: i32) -> Self {
        match i {
            1 => Self::Mono,
            2 => Self::CrtGreen,
            _ => Self::Original,
        }
    }
}

impl From<AsciiColorMode> for i32 {
    fn from(m: AsciiColorMode) -> i32 {
        m as i32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AsciiArtConfig {
    pub enabled: bool,
    /// Cell size in pixels.
    pub cell_size: f32,
    pub color_mode: AsciiColorMode,
    pub foreground_r: f32,
    pub foreground_g: f32,
    pub foreground_b: f32,
    pub background_r: f32,
    pub background_g: f32,
    pub background_b: f32,
    pub invert: bool,
}

impl Default for AsciiArtConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 8.0,
            color_mode: AsciiColorMode::Original,
            foreground_r: 0.0,
            foreground_g: 1.0,
            foreground_b: 0.0,
            background_r: 0.0,
            background_g: 0.02,
            background_b: 0.0,
            invert: false,
        }
    }
}

effect_settings!(AsciiArtConfig {
    cell_size: "cellSize" => 4.0, 32.0;
});

impl TransformEffect for AsciiArtConfig {
    const KIND: TransformEffectType = TransformEffectType::AsciiArt;
    const SHADER: &'static str = "shaders/ascii_art.fs";
    const UNIFORMS: &'static [&'static str] =
        &["resolution", "cellSize", "colorMode", "foreground", "background", "invert"];
    type State = ();

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.ascii_art
    }

    fn setup(&self, _: &mut (), u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("cellSize", self.cell_size.max(1.0));
        u.i32("colorMode", self.color_mode.into());
        u.vec3("foreground", [self.foreground_r, self.foreground_g, self.foreground_b]);
        u.vec3("background", [self.background_r, self.background_g, self.background_b]);
        u.flag("invert", self.invert);
    }
}

/// Falling glyph columns over the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatrixRainConfig {
    pub enabled: bool,
    /// Glyph cell in pixels.
    pub cell_size: f32,
    pub rain_speed: f32,
    /// Glyphs per strip.
    pub trail_length: f32,
    /// Strips per column.
    pub faller_count: i32,
    pub overlay_intensity: f32,
    /// Glyph changes per second.
    pub refresh_rate: f32,
    pub lead_brightness: f32,
    /// Glyphs take the frame's colour and the gaps go black.
    pub sample_mode: bool,
}

impl Default for MatrixRainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: 12.0,
            rain_speed: 1.0,
            trail_length: 15.0,
            faller_count: 5,
            overlay_intensity: 0.8,
            refresh_rate: 1.0,
            lead_brightness: 1.5,
            sample_mode: false,
        }
    }
}

effect_settings!(MatrixRainConfig {
    rain_speed: "rainSpeed" => 0.1, 5.0;
    overlay_intensity: "overlayIntensity" => 0.0, 1.0;
    trail_length: "trailLength" => 5.0, 40.0;
    lead_brightness: "leadBrightness" => 0.5, 3.0;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixRainState {
    rain: Phase,
    glyphs: Phase,
}

impl TransformEffect for MatrixRainConfig {
    const KIND: TransformEffectType = TransformEffectType::MatrixRain;
    const SHADER: &'static str = "shaders/matrix_rain.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "cellSize",
        "trailLength",
        "fallerCount",
        "overlayIntensity",
        "leadBrightness",
        "rainTime",
        "glyphTime",
        "sampleMode",
    ];
    type State = MatrixRainState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.matrix_rain
    }

    fn setup(&self, s: &mut MatrixRainState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("cellSize", self.cell_size.clamp(4.0, 32.0));
        u.f32("trailLength", self.trail_length);
        u.i32("fallerCount", self.faller_count.clamp(1, 20));
        u.f32("overlayIntensity", self.overlay_intensity);
        u.f32("leadBrightness", self.lead_brightness);
        u.f32("rainTime", s.rain.advance(self.rain_speed, frame.dt));
        u.f32("glyphTime", s.glyphs.advance(self.refresh_rate, frame.dt));
        u.flag("sampleMode", self.sample_mode);
    }
}

/// Cosine-palette remap with a perspective neon grid below the horizon
/// and a striped sun above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthwaveConfig {
    pub enabled: bool,
    pub horizon_y: f32,
    pub color_mix: f32,
    pub palette_phase_r: f32,
    pub palette_phase_g: f32,
    pub palette_phase_b: f32,

    pub grid_spacing: f32,
    pub grid_thickness: f32,
    pub grid_opacity: f32,
    pub grid_glow: f32,
    pub grid_r: f32,
    pub grid_g: f32,
    pub grid_b: f32,

    pub stripe_count: f32,
    pub stripe_softness: f32,
    pub stripe_intensity: f32,
    pub sun_r: f32,
    pub sun_g: f32,
    pub sun_b: f32,

    pub horizon_intensity: f32,
    pub horizon_falloff: f32,
    pub horizon_r: f32,
    pub horizon_g: f32,
    pub horizon_b: f32,

    pub grid_scroll_speed: f32,
    pub stripe_scroll_speed: f32,
}

impl Default for SynthwaveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            horizon_y: 0.5,
            color_mix: 0.7,
            palette_phase_r: 0.5,
            palette_phase_g: 0.65,
            palette_phase_b: 0.2,
            grid_spacing: 8.0,
            grid_thickness: 0.03,
            grid_opacity: 0.5,
            grid_glow: 1.5,
            grid_r: 0.0,
            grid_g: 0.8,
            grid_b: 1.0,
            stripe_count: 8.0,
            stripe_softness: 0.1,
            stripe_intensity: 0.6,
            sun_r: 1.0,
            sun_g: 0.4,
            sun_b: 0.8,
            horizon_intensity: 0.3,
            horizon_falloff: 10.0,
            horizon_r: 1.0,
            horizon_g: 0.6,
            horizon_b: 0.0,
            grid_scroll_speed: 0.5,
            stripe_scroll_speed: 0.1,
        }
    }
}

effect_settings!(SynthwaveConfig {
    horizon_y: "horizonY" => 0.3, 0.7;
    color_mix: "colorMix" => 0.0, 1.0;
    palette_phase_r: "palettePhaseR" => 0.0, 1.0;
    palette_phase_g: "palettePhaseG" => 0.0, 1.0;
    palette_phase_b: "palettePhaseB" => 0.0, 1.0;
    grid_opacity: "gridOpacity" => 0.0, 1.0;
    grid_glow: "gridGlow" => 1.0, 3.0;
    stripe_intensity: "stripeIntensity" => 0.0, 1.0;
    horizon_intensity: "horizonIntensity" => 0.0, 1.0;
    grid_scroll_speed: "gridScrollSpeed" => 0.0, 2.0;
    stripe_scroll_speed: "stripeScrollSpeed" => 0.0, 0.5;
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SynthwaveState {
    grid: Phase,
    stripes: Phase,
}

impl TransformEffect for SynthwaveConfig {
    const KIND: TransformEffectType = TransformEffectType::Synthwave;
    const SHADER: &'static str = "shaders/synthwave.fs";
    const UNIFORMS: &'static [&'static str] = &[
        "resolution",
        "horizonY",
        "colorMix",
        "palettePhase",
        "gridSpacing",
        "gridThickness",
        "gridOpacity",
        "gridGlow",
        "gridColor",
        "stripeCount",
        "stripeSoftness",
        "stripeIntensity",
        "sunColor",
        "horizonIntensity",
        "horizonFalloff",
        "horizonColor",
        "gridTime",
        "stripeTime",
    ];
    type State = SynthwaveState;

    fn select(cfg: &EffectConfig) -> &Self {
        &cfg.synthwave
    }

    fn setup(&self, s: &mut SynthwaveState, u: &mut UniformWriter<'_>, frame: &EffectFrame, _luts: &[TextureId]) {
        u.vec2("resolution", frame.resolution());
        u.f32("horizonY", self.horizon_y);
        u.f32("colorMix", self.color_mix);
        u.vec3(
            "palettePhase",
            [self.palette_phase_r, self.palette_phase_g, self.palette_phase_b],
        );
        u.f32("gridSpacing", self.grid_spacing.max(1.0));
        u.f32("gridThickness", self.grid_thickness);
        u.f32("gridOpacity", self.grid_opacity);
        u.f32("gridGlow", self.grid_glow);
        u.vec3("gridColor", [self.grid_r, self.grid_g, self.grid_b]);
        u.f32("stripeCount", self.stripe_count.max(1.0));
        u.f32("stripeSoftness", self.stripe_softness);
        u.f32("stripeIntensity", self.stripe_intensity);
        u.vec3("sunColor", [self.sun_r, self.sun_g, self.sun_b]);
        u.f32("horizonIntensity", self.horizon_intensity);
        u.f32("horizonFalloff", self.horizon_falloff);
        u.vec3("horizonColor", [self.horizon_r, self.horizon_g, self.horizon_b]);
        u.f32("gridTime", s.grid.advance(self.grid_scroll_speed, frame.dt));
        u.f32("stripeTime", s.stripes.advance(self.stripe_scroll_speed, frame.dt));
    }
}
