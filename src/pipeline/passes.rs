use crate::effect_config::EffectConfig;
use crate::effects::Phase;
use crate::gpu::{Gpu, GpuError, ShaderProgram, TextureId};
use crate::sim::decay_factor;
use anyhow::Context;

/// Fixed passes of the feedback stage and output chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CorePass {
    Feedback,
    BlurH,
    BlurV,
    Chromatic,
    Clarity,
    Fxaa,
    Gamma,
    Copy,
}

impl CorePass {
    const ALL: [Self; 8] = [
        Self::Feedback,
        Self::BlurH,
        Self::BlurV,
        Self::Chromatic,
        Self::Clarity,
        Self::Fxaa,
        Self::Gamma,
        Self::Copy,
    ];

    fn shader(self) -> &'static str {
        match self {
            Self::Feedback => "shaders/feedback.fs",
            Self::BlurH => "shaders/blur_h.fs",
            Self::BlurV => "shaders/blur_v.fs",
            Self::Chromatic => "shaders/chromatic.fs",
            Self::Clarity => "shaders/clarity.fs",
            Self::Fxaa => "shaders/fxaa.fs",
            Self::Gamma => "shaders/gamma.fs",
            Self::Copy => "shaders/passthrough.fs",
        }
    }

    fn uniforms(self) -> &'static [&'static str] {
        match self {
            Self::Feedback => FEEDBACK_UNIFORMS,
            Self::BlurH => &["blurScale"],
            Self::BlurV => &["blurScale", "decayFactor"],
            Self::Chromatic => &["chromaticOffset"],
            Self::Clarity => &["clarity"],
            Self::Fxaa => &[],
            Self::Gamma => &["gamma"],
            Self::Copy => &[],
        }
    }
}

const FEEDBACK_UNIFORMS: &[&str] = &[
    "resolution",
    "desaturate",
    "zoomBase",
    "zoomRadial",
    "rotBase",
    "rotRadial",
    "dxBase",
    "dxRadial",
    "dyBase",
    "dyRadial",
    "center",
    "stretch",
    "zoomAngular",
    "zoomAngularFreq",
    "rotAngular",
    "rotAngularFreq",
    "dxAngular",
    "dxAngularFreq",
    "dyAngular",
    "dyAngularFreq",
    "flowStrength",
    "flowAngle",
    "flowScale",
    "flowThreshold",
    "warp",
    "warpTime",
    "warpScale",
];

pub(crate) struct CorePasses {
    programs: Vec<ShaderProgram>,
    warp_time: Phase,
}

impl CorePasses {
    pub fn new(gpu: &mut dyn Gpu) -> anyhow::Result<Self> {
        let mut programs = Vec::with_capacity(CorePass::ALL.len());
        for pass in CorePass::ALL {
            match ShaderProgram::fragment(gpu, pass.shader(), pass.uniforms()) {
                Ok(p) => programs.push(p),
                Err(err) => {
                    programs.into_iter().for_each(|p| p.release(gpu));
                    return Err(err).with_context(|| format!("load core pass {pass:?}"));
                }
            }
        }
        Ok(Self {
            programs,
            warp_time: Phase::default(),
        })
    }

    fn program(&self, pass: CorePass) -> &ShaderProgram {
        &self.programs[pass as usize]
    }

    /// Advances the procedural warp clock.
    pub fn advance(&mut self, cfg: &EffectConfig, dt: f32) {
        self.warp_time.advance(cfg.procedural_warp.warp_speed, dt);
    }

    /// Flow-field uniforms, every motion term scaled by `motionScale`.
    ///
    /// Identity-centred terms (zoom, stretch) scale their deviation from 1;
    /// rotation and angular terms are rates and also scale by `dt`.
    pub fn setup_feedback(&self, gpu: &mut dyn Gpu, cfg: &EffectConfig, dt: f32, res: [f32; 2]) {
        let p = self.program(CorePass::Feedback);
        let ms = cfg.motion_scale;
        let ff = &cfg.flow_field;
        let fb = &cfg.feedback_flow;
        let warp = &cfg.procedural_warp;

        p.set_vec2(gpu, "resolution", res);
        p.set_f32(gpu, "desaturate", cfg.feedback_desaturate);
        p.set_f32(gpu, "zoomBase", 1.0 + (ff.zoom_base - 1.0) * ms);
        p.set_f32(gpu, "zoomRadial", ff.zoom_radial * ms);
        p.set_f32(gpu, "rotBase", ff.rotation_speed * dt * ms);
        p.set_f32(gpu, "rotRadial", ff.rotation_speed_radial * dt * ms);
        p.set_f32(gpu, "dxBase", ff.dx_base * ms);
        p.set_f32(gpu, "dxRadial", ff.dx_radial * ms);
        p.set_f32(gpu, "dyBase", ff.dy_base * ms);
        p.set_f32(gpu, "dyRadial", ff.dy_radial * ms);
        p.set_vec2(gpu, "center", [ff.cx, ff.cy]);
        p.set_vec2(
            gpu,
            "stretch",
            [1.0 + (ff.sx - 1.0) * ms, 1.0 + (ff.sy - 1.0) * ms],
        );
        p.set_f32(gpu, "zoomAngular", ff.zoom_angular * dt * ms);
        p.set_i32(gpu, "zoomAngularFreq", ff.zoom_angular_freq);
        p.set_f32(gpu, "rotAngular", ff.rot_angular * dt * ms);
        p.set_i32(gpu, "rotAngularFreq", ff.rot_angular_freq);
        p.set_f32(gpu, "dxAngular", ff.dx_angular * dt * ms);
        p.set_i32(gpu, "dxAngularFreq", ff.dx_angular_freq);
        p.set_f32(gpu, "dyAngular", ff.dy_angular * dt * ms);
        p.set_i32(gpu, "dyAngularFreq", ff.dy_angular_freq);

        p.set_f32(gpu, "flowStrength", fb.strength * ms);
        p.set_f32(gpu, "flowAngle", fb.flow_angle.to_radians());
        p.set_f32(gpu, "flowScale", fb.scale);
        p.set_f32(gpu, "flowThreshold", fb.threshold);

        p.set_f32(gpu, "warp", warp.warp * ms);
        p.set_f32(gpu, "warpTime", self.warp_time.0);
        p.set_f32(gpu, "warpScale", 1.0 / warp.warp_scale.max(1e-3));
    }

    /// Blur passes; the vertical one applies the half-life decay, stretched
    /// when motion is slowed so trails last as long in image space.
    pub fn setup_blur(&self, gpu: &mut dyn Gpu, cfg: &EffectConfig, dt: f32) {
        let effective_half_life = cfg.half_life / cfg.motion_scale.max(0.01);
        self.program(CorePass::BlurH)
            .set_f32(gpu, "blurScale", cfg.blur_scale);
        let v = self.program(CorePass::BlurV);
        v.set_f32(gpu, "blurScale", cfg.blur_scale);
        v.set_f32(gpu, "decayFactor", decay_factor(dt, effective_half_life));
    }

    pub fn setup_output(&self, gpu: &mut dyn Gpu, cfg: &EffectConfig) {
        self.program(CorePass::Chromatic)
            .set_f32(gpu, "chromaticOffset", cfg.chromatic_offset);
        self.program(CorePass::Clarity)
            .set_f32(gpu, "clarity", cfg.clarity);
        self.program(CorePass::Gamma).set_f32(gpu, "gamma", cfg.gamma);
    }

    pub fn draw(
        &self,
        gpu: &mut dyn Gpu,
        pass: CorePass,
        input: TextureId,
        target: TextureId,
    ) -> Result<(), GpuError> {
        gpu.draw_fullscreen(self.program(pass).id(), input, target)
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        for p in self.programs {
            p.release(gpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::software::SoftwareGpu;

    #[test]
    fn warp_clock_accumulates_speed_times_dt() {
        let mut gpu = SoftwareGpu::new();
        let mut passes = CorePasses::new(&mut gpu).expect("core passes should load");
        let mut cfg = EffectConfig::default();
        cfg.procedural_warp.warp_speed = 1.5;
        for _ in 0..4 {
            passes.advance(&cfg, 0.25);
        }
        assert!((passes.warp_time.0 - 1.5).abs() < 1e-5);

        cfg.procedural_warp.warp_speed = 0.0;
        passes.advance(&cfg, 1.0);
        assert!((passes.warp_time.0 - 1.5).abs() < 1e-5, "zero speed should hold the clock");
        passes.release(&mut gpu);
        assert_eq!(gpu.live_programs(), 0);
    }
}
