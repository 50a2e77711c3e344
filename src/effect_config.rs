//! The whole tunable state of the pipeline.
//!
//! Presets carry the global scalars, the flow configs and the transform
//! order unconditionally; effect and simulation sub-configs only while
//! enabled. Loading starts from defaults, so a disabled effect always
//! comes back with default settings.

use crate::effects::*;
use crate::sim::{
    AttractorFlowConfig, BoidsConfig, CurlAdvectionConfig, CurlFlowConfig, CymaticsConfig,
    ParticleLifeConfig, PhysarumConfig,
};
use crate::transform_order::TransformOrderConfig;
use serde::{Deserialize, Serialize};

/// Group prefix of the global scalars in dotted param ids.
pub const GLOBAL_GROUP: &str = "effect";

macro_rules! effect_config {
    (
        effects { $($field:ident: $ty:ty => $kind:ident,)* }
        sims { $($sim:ident: $sty:ty => $sid:literal,)* }
    ) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(from = "EffectConfigRepr", into = "EffectConfigRepr")]
        pub struct EffectConfig {
            /// Seconds for the feedback trail to fade to half.
            pub half_life: f32,
            pub blur_scale: f32,
            /// Radial RGB spread in pixels.
            pub chromatic_offset: f32,
            pub feedback_desaturate: f32,
            /// Scales every motion term of the feedback stage.
            pub motion_scale: f32,
            pub flow_field: FlowFieldConfig,
            pub feedback_flow: FeedbackFlowConfig,
            pub procedural_warp: ProceduralWarpConfig,
            pub gamma: f32,
            pub clarity: f32,
            pub transform_order: TransformOrderConfig,
            $(pub $sim: $sty,)*
            $(pub $field: $ty,)*
        }

        impl Default for EffectConfig {
            fn default() -> Self {
                Self {
                    half_life: 0.5,
                    blur_scale: 1.0,
                    chromatic_offset: 0.0,
                    feedback_desaturate: 0.05,
                    motion_scale: 1.0,
                    flow_field: FlowFieldConfig::default(),
                    feedback_flow: FeedbackFlowConfig::default(),
                    procedural_warp: ProceduralWarpConfig::default(),
                    gamma: 1.0,
                    clarity: 0.0,
                    transform_order: TransformOrderConfig::default(),
                    $($sim: <$sty>::default(),)*
                    $($field: <$ty>::default(),)*
                }
            }
        }

        #[derive(Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        struct EffectConfigRepr {
            half_life: f32,
            blur_scale: f32,
            chromatic_offset: f32,
            feedback_desaturate: f32,
            motion_scale: f32,
            flow_field: FlowFieldConfig,
            feedback_flow: FeedbackFlowConfig,
            procedural_warp: ProceduralWarpConfig,
            gamma: f32,
            clarity: f32,
            transform_order: TransformOrderConfig,
            $(#[serde(skip_serializing_if = "Option::is_none")] $sim: Option<$sty>,)*
            $(#[serde(skip_serializing_if = "Option::is_none")] $field: Option<$ty>,)*
        }

        impl Default for EffectConfigRepr {
            fn default() -> Self {
                Self::from(EffectConfig::default())
            }
        }

        impl From<EffectConfig> for EffectConfigRepr {
            fn from(c: EffectConfig) -> Self {
                Self {
                    half_life: c.half_life,
                    blur_scale: c.blur_scale,
                    chromatic_offset: c.chromatic_offset,
                    feedback_desaturate: c.feedback_desaturate,
                    motion_scale: c.motion_scale,
                    flow_field: c.flow_field,
                    feedback_flow: c.feedback_flow,
                    procedural_warp: c.procedural_warp,
                    gamma: c.gamma,
                    clarity: c.clarity,
                    transform_order: c.transform_order,
                    $($sim: c.$sim.enabled.then_some(c.$sim),)*
                    $($field: c.$field.enabled.then_some(c.$field),)*
                }
            }
        }

        impl From<EffectConfigRepr> for EffectConfig {
            fn from(r: EffectConfigRepr) -> Self {
                let mut c = Self {
                    half_life: r.half_life,
                    blur_scale: r.blur_scale,
                    chromatic_offset: r.chromatic_offset,
                    feedback_desaturate: r.feedback_desaturate,
                    motion_scale: r.motion_scale,
                    flow_field: r.flow_field,
                    feedback_flow: r.feedback_flow,
                    procedural_warp: r.procedural_warp,
                    gamma: r.gamma,
                    clarity: r.clarity,
                    transform_order: r.transform_order,
                    $($sim: r.$sim.unwrap_or_default(),)*
                    $($field: r.$field.unwrap_or_default(),)*
                };
                c.clamp_to_ranges();
                c
            }
        }

        impl EffectConfig {
            pub fn settings(&self, kind: TransformEffectType) -> &dyn EffectSettings {
                match kind {
                    $(TransformEffectType::$kind => &self.$field,)*
                }
            }

            pub fn settings_mut(&mut self, kind: TransformEffectType) -> &mut dyn EffectSettings {
                match kind {
                    $(TransformEffectType::$kind => &mut self.$field,)*
                }
            }

            fn effect_params(&self, kind: TransformEffectType) -> &dyn ParamTable {
                match kind {
                    $(TransformEffectType::$kind => &self.$field,)*
                }
            }

            fn effect_params_mut(&mut self, kind: TransformEffectType) -> &mut dyn ParamTable {
                match kind {
                    $(TransformEffectType::$kind => &mut self.$field,)*
                }
            }

            /// Simulation group ids, in pipeline update order.
            pub const SIMULATION_IDS: &'static [&'static str] = &[$($sid),*];

            /// Returns false for an unknown simulation id.
            pub fn set_simulation_enabled(&mut self, id: &str, on: bool) -> bool {
                match id {
                    $($sid => {
                        self.$sim.enabled = on;
                        true
                    })*
                    _ => false,
                }
            }

            /// Params of one group: `effect`, a flow config, a simulation
            /// or a transform effect id.
            pub fn group(&self, group: &str) -> Option<&dyn ParamTable> {
                match group {
                    GLOBAL_GROUP => Some(self),
                    "flowField" => Some(&self.flow_field),
                    "feedbackFlow" => Some(&self.feedback_flow),
                    "proceduralWarp" => Some(&self.procedural_warp),
                    $($sid => Some(&self.$sim),)*
                    _ => TransformEffectType::parse(group).map(|k| self.effect_params(k)),
                }
            }

            pub fn group_mut(&mut self, group: &str) -> Option<&mut dyn ParamTable> {
                match group {
                    GLOBAL_GROUP => Some(self),
                    "flowField" => Some(&mut self.flow_field),
                    "feedbackFlow" => Some(&mut self.feedback_flow),
                    "proceduralWarp" => Some(&mut self.procedural_warp),
                    $($sid => Some(&mut self.$sim),)*
                    _ => TransformEffectType::parse(group).map(|k| self.effect_params_mut(k)),
                }
            }
        }
    };
}

effect_config! {
    effects {
        sine_warp: SineWarpConfig => SineWarp,
        kaleidoscope: KaleidoscopeConfig => Kaleidoscope,
        infinite_zoom: InfiniteZoomConfig => InfiniteZoom,
        radial_streak: RadialStreakConfig => RadialStreak,
        texture_warp: TextureWarpConfig => TextureWarp,
        voronoi: VoronoiConfig => Voronoi,
        wave_ripple: WaveRippleConfig => WaveRipple,
        mobius: MobiusConfig => Mobius,
        pixelation: PixelationConfig => Pixelation,
        glitch: GlitchConfig => Glitch,
        poincare_disk: PoincareDiskConfig => PoincareDisk,
        toon: ToonConfig => Toon,
        heightfield_relief: HeightfieldReliefConfig => HeightfieldRelief,
        gradient_flow: GradientFlowConfig => GradientFlow,
        droste_zoom: DrosteZoomConfig => DrosteZoom,
        kifs: KifsConfig => Kifs,
        lattice_fold: LatticeFoldConfig => LatticeFold,
        color_grade: ColorGradeConfig => ColorGrade,
        ascii_art: AsciiArtConfig => AsciiArt,
        oil_paint: OilPaintConfig => OilPaint,
        watercolor: WatercolorConfig => Watercolor,
        neon_glow: NeonGlowConfig => NeonGlow,
        radial_pulse: RadialPulseConfig => RadialPulse,
        false_color: FalseColorConfig => FalseColor,
        halftone: HalftoneConfig => Halftone,
        chladni_warp: ChladniWarpConfig => ChladniWarp,
        cross_hatching: CrossHatchingConfig => CrossHatching,
        palette_quantization: PaletteQuantizationConfig => PaletteQuantization,
        bokeh: BokehConfig => Bokeh,
        bloom: BloomConfig => Bloom,
        mandelbox: MandelboxConfig => Mandelbox,
        triangle_fold: TriangleFoldConfig => TriangleFold,
        domain_warp: DomainWarpConfig => DomainWarp,
        pencil_sketch: PencilSketchConfig => PencilSketch,
        impressionist: ImpressionistConfig => Impressionist,
        kuwahara: KuwaharaConfig => Kuwahara,
        ink_wash: InkWashConfig => InkWash,
        shake: ShakeConfig => Shake,
        radial_ifs: RadialIfsConfig => RadialIfs,
        constellation: ConstellationConfig => Constellation,
        plasma: PlasmaConfig => Plasma,
        interference: InterferenceConfig => Interference,
        solid_color: SolidColorConfig => SolidColor,
        scan_bars: ScanBarsConfig => ScanBars,
        muons: MuonsConfig => Muons,
        nebula: NebulaConfig => Nebula,
        phyllotaxis: PhyllotaxisConfig => Phyllotaxis,
        density_wave_spiral: DensityWaveSpiralConfig => DensityWaveSpiral,
        moire_interference: MoireInterferenceConfig => MoireInterference,
        matrix_rain: MatrixRainConfig => MatrixRain,
        disco_ball: DiscoBallConfig => DiscoBall,
        surface_warp: SurfaceWarpConfig => SurfaceWarp,
        interference_warp: InterferenceWarpConfig => InterferenceWarp,
        corridor_warp: CorridorWarpConfig => CorridorWarp,
        lego_bricks: LegoBricksConfig => LegoBricks,
        circuit_board: CircuitBoardConfig => CircuitBoard,
        synthwave: SynthwaveConfig => Synthwave,
        relativistic_doppler: RelativisticDopplerConfig => RelativisticDoppler,
        anamorphic_streak: AnamorphicStreakConfig => AnamorphicStreak,
        fireworks: FireworksConfig => Fireworks,
        filaments: FilamentsConfig => Filaments,
        slashes: SlashesConfig => Slashes,
        spectral_arcs: SpectralArcsConfig => SpectralArcs,
        pitch_spiral: PitchSpiralConfig => PitchSpiral,
        moire_generator: MoireGeneratorConfig => MoireGenerator,
    }
    sims {
        physarum: PhysarumConfig => "physarum",
        curl_flow: CurlFlowConfig => "curlFlow",
        curl_advection: CurlAdvectionConfig => "curlAdvection",
        attractor_flow: AttractorFlowConfig => "attractorFlow",
        boids: BoidsConfig => "boids",
        particle_life: ParticleLifeConfig => "particleLife",
        cymatics: CymaticsConfig => "cymatics",
    }
}

param_table!(EffectConfig {
    half_life: "halfLife" => 0.1, 2.0;
    blur_scale: "blurScale" => 0.0, 4.0;
    chromatic_offset: "chromaticOffset" => 0.0, 50.0;
    feedback_desaturate: "feedbackDesaturate" => 0.0, 0.2;
    motion_scale: "motionScale" => 0.01, 1.0;
    gamma: "gamma" => 0.5, 2.5;
    clarity: "clarity" => 0.0, 2.0;
});

/// A registered modulation target: dotted id plus static range.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub id: String,
    pub min: f32,
    pub max: f32,
}

impl EffectConfig {
    pub fn is_enabled(&self, kind: TransformEffectType) -> bool {
        self.settings(kind).enabled()
    }

    /// Whether `kind` contributes a pass this frame. Generators also need a
    /// positive `blendIntensity`.
    pub fn is_active(&self, kind: TransformEffectType) -> bool {
        let settings = self.settings(kind);
        settings.enabled()
            && (!kind.is_generator()
                || settings.param("blendIntensity").is_some_and(|i| i > 0.0))
    }

    /// Toggles an effect. A generator enabled for the first time moves to
    /// the end of the order so it draws over everything before it.
    pub fn set_effect_enabled(&mut self, kind: TransformEffectType, on: bool) {
        let was = self.is_enabled(kind);
        self.settings_mut(kind).set_enabled(on);
        if on && !was && kind.is_generator() {
            self.transform_order.move_to_end(kind);
        }
    }

    /// Enabled effects in processing order.
    pub fn enabled_transforms(&self) -> impl Iterator<Item = TransformEffectType> + '_ {
        self.transform_order.iter().filter(|&k| self.is_enabled(k))
    }

    /// Value of a dotted id such as `nebula.baseFreq` or
    /// `interference.lissajous.amplitude`.
    pub fn get_param(&self, id: &str) -> Option<f32> {
        let (group, field) = id.split_once('.')?;
        self.group(group)?.param(field)
    }

    pub fn get_param_mut(&mut self, id: &str) -> Option<&mut f32> {
        let (group, field) = id.split_once('.')?;
        self.group_mut(group)?.param_mut(field)
    }

    pub fn param_spec(&self, id: &str) -> Option<ParamSpec> {
        let (group, field) = id.split_once('.')?;
        self.group(group)?
            .param_specs()
            .iter()
            .find(|s| s.field == field)
            .copied()
    }

    fn groups(&self) -> Vec<(&'static str, &dyn ParamTable)> {
        let mut out: Vec<(&'static str, &dyn ParamTable)> = vec![
            (GLOBAL_GROUP, self),
            ("flowField", &self.flow_field),
            ("feedbackFlow", &self.feedback_flow),
            ("proceduralWarp", &self.procedural_warp),
        ];
        for &id in Self::SIMULATION_IDS {
            if let Some(g) = self.group(id) {
                out.push((id, g));
            }
        }
        for kind in TransformEffectType::ALL {
            out.push((kind.id(), self.effect_params(kind)));
        }
        out
    }

    /// Every modulatable param with its dotted id.
    pub fn params(&self) -> Vec<ParamInfo> {
        self.groups()
            .into_iter()
            .flat_map(|(group, table)| {
                table.param_specs().iter().map(move |s| ParamInfo {
                    id: format!("{group}.{}", s.field),
                    min: s.min,
                    max: s.max,
                })
            })
            .collect()
    }

    /// Pulls every registered param back into its documented range.
    pub fn clamp_to_ranges(&mut self) {
        for info in self.params() {
            if let Some(v) = self.get_param_mut(&info.id) {
                let clamped = v.clamp(info.min, info.max);
                if clamped != *v {
                    log::debug!("{} = {} clamped to {}", info.id, *v, clamped);
                    *v = clamped;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_ids_reach_nested_fields() {
        let mut cfg = EffectConfig::default();
        *cfg.get_param_mut("interference.lissajous.amplitude").expect("param exists") = 0.3;
        assert_eq!(cfg.interference.lissajous.amplitude, 0.3);
        assert_eq!(cfg.get_param("effect.halfLife"), Some(0.5));
        assert_eq!(cfg.get_param("physarum.sensorDistance"), Some(20.0));
        assert_eq!(cfg.get_param("Muons.brightness"), Some(1.0));
        assert_eq!(cfg.get_param("nope.x"), None);
        assert_eq!(cfg.get_param("halfLife"), None);
    }

    #[test]
    fn defaults_sit_inside_ranges() {
        let cfg = EffectConfig::default();
        let mut clamped = cfg.clone();
        clamped.clamp_to_ranges();
        assert_eq!(cfg, clamped);
    }

    #[test]
    fn generator_moves_to_end_on_first_enable() {
        let mut cfg = EffectConfig::default();
        cfg.set_effect_enabled(TransformEffectType::Plasma, true);
        let order = cfg.transform_order.as_slice();
        assert_eq!(order[order.len() - 1], TransformEffectType::Plasma);
        cfg.set_effect_enabled(TransformEffectType::Nebula, true);
        cfg.set_effect_enabled(TransformEffectType::Plasma, true);
        let order = cfg.transform_order.as_slice();
        assert_eq!(order[order.len() - 1], TransformEffectType::Nebula, "re-enable is a no-op");
    }
}
