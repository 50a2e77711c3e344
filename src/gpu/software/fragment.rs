//! Built-in fragment kernels, keyed by shader path.

use super::surface::{add, luma, mix, scale};
use super::{FragmentKernel, PassContext, Surface};
use crate::blend::EffectBlendMode;
use std::f32::consts::{PI, TAU};

pub fn kernel_for(path: &str) -> Option<FragmentKernel> {
    let name = path.strip_prefix("shaders/").unwrap_or(path);
    let kernel: FragmentKernel = match name {
        "passthrough.fs" | "trail_debug.fs" => passthrough,
        "feedback.fs" => feedback,
        "blur_h.fs" => blur_h,
        "blur_v.fs" => blur_v,
        "chromatic.fs" => chromatic,
        "effect_blend.fs" => effect_blend,
        "gamma.fs" => gamma,
        "fxaa.fs" => fxaa,
        "clarity.fs" => clarity,
        "bloom_prefilter.fs" => bloom_prefilter,
        "bloom_downsample.fs" => passthrough,
        "bloom_upsample.fs" => bloom_upsample,
        "bloom_composite.fs" => bloom_composite,
        "plasma.fs" => plasma,
        "solid_color.fs" => solid_color,
        "kaleidoscope.fs" => kaleidoscope,
        "kifs.fs" => kifs,
        "sine_warp.fs" => sine_warp,
        "infinite_zoom.fs" => infinite_zoom,
        "pixelation.fs" => pixelation,
        "toon.fs" => toon,
        "color_grade.fs" => color_grade,
        "anamorphic_streak_prefilter.fs" => bloom_prefilter,
        "anamorphic_streak_downsample.fs" => streak_downsample,
        "anamorphic_streak_upsample.fs" => streak_upsample,
        "anamorphic_streak_composite.fs" => streak_composite,
        "moire_interference.fs" => moire_interference,
        "surface_warp.fs" => surface_warp,
        "synthwave.fs" => synthwave,
        "spectral_arcs.fs" => spectral_arcs,
        "fireworks.fs" => fireworks,
        _ => return None,
    };
    Some(kernel)
}

fn shade(target: &mut Surface, mut f: impl FnMut(f32, f32) -> [f32; 4]) {
    let (w, h) = (target.width, target.height);
    for y in 0..h {
        let v = (y as f32 + 0.5) / h as f32;
        for x in 0..w {
            let u = (x as f32 + 0.5) / w as f32;
            let i = target.index(x, y);
            target.data[i] = f(u, v);
        }
    }
}

fn hash1(n: f32) -> f32 {
    ((n * 127.1).sin() * 43_758.547).fract().abs()
}

fn value_noise(x: f32, seed: f32) -> f32 {
    let i = x.floor();
    let f = x - i;
    let t = f * f * (3.0 - 2.0 * f);
    let a = hash1(i + seed * 57.0);
    let b = hash1(i + 1.0 + seed * 57.0);
    a + (b - a) * t
}

fn fbm(x: f32, seed: f32, octaves: i32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    let mut freq = 1.0;
    for _ in 0..octaves.clamp(1, 10) {
        sum += amp * (value_noise(x * freq, seed) * 2.0 - 1.0);
        freq *= 2.0;
        amp *= 0.5;
    }
    sum
}

fn rotate(p: [f32; 2], angle: f32) -> [f32; 2] {
    let (s, c) = angle.sin_cos();
    [p[0] * c - p[1] * s, p[0] * s + p[1] * c]
}

pub fn passthrough(ctx: &PassContext<'_>, target: &mut Surface) {
    shade(target, |u, v| ctx.input.sample(u, v));
}

/// Zoom/rotate/translate of last frame with radial and angular terms.
fn feedback(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let zoom_base = un.float("zoomBase", 1.0);
    let zoom_radial = un.float("zoomRadial", 0.0);
    let rot_base = un.float("rotBase", 0.0);
    let rot_radial = un.float("rotRadial", 0.0);
    let dx_base = un.float("dxBase", 0.0);
    let dx_radial = un.float("dxRadial", 0.0);
    let dy_base = un.float("dyBase", 0.0);
    let dy_radial = un.float("dyRadial", 0.0);
    let center = un.vec2("center", [0.5, 0.5]);
    let stretch = un.vec2("stretch", [1.0, 1.0]);
    let zoom_ang = un.float("zoomAngular", 0.0);
    let zoom_ang_freq = un.float("zoomAngularFreq", 2.0);
    let rot_ang = un.float("rotAngular", 0.0);
    let rot_ang_freq = un.float("rotAngularFreq", 2.0);
    let dx_ang = un.float("dxAngular", 0.0);
    let dx_ang_freq = un.float("dxAngularFreq", 2.0);
    let dy_ang = un.float("dyAngular", 0.0);
    let dy_ang_freq = un.float("dyAngularFreq", 2.0);
    let desaturate = un.float("desaturate", 0.0).clamp(0.0, 1.0);
    let warp = un.float("warp", 0.0);
    let warp_time = un.float("warpTime", 0.0);
    let warp_scale = un.float("warpScale", 1.0);
    let flow_strength = un.float("flowStrength", 0.0);
    let flow_angle = un.float("flowAngle", 0.0);
    let flow_scale = un.float("flowScale", 1.0).max(1.0);
    let flow_threshold = un.float("flowThreshold", 0.0);
    let res = un.vec2("resolution", [ctx.input.width as f32, ctx.input.height as f32]);
    let input = ctx.input;

    shade(target, |u, v| {
        let p = [u - center[0], v - center[1]];
        let r = (p[0] * p[0] + p[1] * p[1]).sqrt() * 2.0;
        let a = p[1].atan2(p[0]);
        let zoom = zoom_base + zoom_radial * r + zoom_ang * (a * zoom_ang_freq).sin();
        let rot = rot_base + rot_radial * r + rot_ang * (a * rot_ang_freq).sin();
        let dx = dx_base + dx_radial * r + dx_ang * (a * dx_ang_freq).sin();
        let dy = dy_base + dy_radial * r + dy_ang * (a * dy_ang_freq).sin();

        let q = rotate([p[0] * zoom * stretch[0], p[1] * zoom * stretch[1]], rot);
        let mut su = center[0] + q[0] - dx;
        let mut sv = center[1] + q[1] - dy;

        if warp > 0.0 {
            su += warp * 0.01 * (sv * warp_scale + warp_time).sin();
            sv += warp * 0.01 * (su * warp_scale * 1.3 + warp_time * 0.7).cos();
        }
        if flow_strength > 0.0 {
            let step = flow_scale / res[0].max(1.0);
            let step_v = flow_scale / res[1].max(1.0);
            let gx = luma(input.sample(su + step, sv)) - luma(input.sample(su - step, sv));
            let gy = luma(input.sample(su, sv + step_v)) - luma(input.sample(su, sv - step_v));
            if (gx * gx + gy * gy).sqrt() > flow_threshold {
                let g = rotate([gx, gy], flow_angle);
                su += g[0] * flow_strength / res[0].max(1.0);
                sv += g[1] * flow_strength / res[1].max(1.0);
            }
        }

        let c = input.sample(su, sv);
        if desaturate > 0.0 {
            let l = luma(c);
            mix(c, [l, l, l, c[3]], desaturate)
        } else {
            c
        }
    });
}

const GAUSS: [f32; 5] = [0.227_027, 0.194_594_6, 0.121_621_6, 0.054_054, 0.016_216];

fn blur(ctx: &PassContext<'_>, target: &mut Surface, dir: [f32; 2], decay: f32) {
    let radius = ctx.uniforms.float("blurScale", 1.0);
    let input = ctx.input;
    let texel = [1.0 / input.width as f32, 1.0 / input.height as f32];
    shade(target, |u, v| {
        let mut acc = scale(input.sample(u, v), GAUSS[0]);
        if radius > 0.0 {
            for (i, w) in GAUSS.iter().enumerate().skip(1) {
                let o = i as f32 * radius;
                let du = dir[0] * o * texel[0];
                let dv = dir[1] * o * texel[1];
                acc = add(acc, scale(input.sample(u + du, v + dv), *w));
                acc = add(acc, scale(input.sample(u - du, v - dv), *w));
            }
        } else {
            acc = input.sample(u, v);
        }
        let mut out = scale(acc, decay);
        out[3] = acc[3];
        out
    });
}

fn blur_h(ctx: &PassContext<'_>, target: &mut Surface) {
    blur(ctx, target, [1.0, 0.0], 1.0);
}

fn blur_v(ctx: &PassContext<'_>, target: &mut Surface) {
    let decay = ctx.uniforms.float("decayFactor", 1.0);
    blur(ctx, target, [0.0, 1.0], decay);
}

fn chromatic(ctx: &PassContext<'_>, target: &mut Surface) {
    let offset = ctx.uniforms.float("chromaticOffset", 0.0);
    let input = ctx.input;
    let texel = [1.0 / input.width as f32, 1.0 / input.height as f32];
    shade(target, |u, v| {
        let base = input.sample(u, v);
        if offset == 0.0 {
            return base;
        }
        let d = [u - 0.5, v - 0.5];
        let len = (d[0] * d[0] + d[1] * d[1]).sqrt().max(1e-6);
        let o = [d[0] / len * offset * texel[0], d[1] / len * offset * texel[1]];
        let r = input.sample(u + o[0], v + o[1])[0];
        let b = input.sample(u - o[0], v - o[1])[2];
        [r, base[1], b, base[3]]
    });
}

fn effect_blend(ctx: &PassContext<'_>, target: &mut Surface) {
    let intensity = ctx.uniforms.float("intensity", 1.0);
    let mode = EffectBlendMode::from_index(ctx.uniforms.int("blendMode", 0));
    let input = ctx.input;
    let Some(aux) = ctx.sampler("blendTexture") else {
        shade(target, |u, v| input.sample(u, v));
        return;
    };
    shade(target, |u, v| {
        let base = input.sample(u, v);
        let top = aux.sample(u, v);
        let rgb = mode.composite(
            [base[0], base[1], base[2]],
            [top[0], top[1], top[2]],
            intensity,
        );
        [rgb[0], rgb[1], rgb[2], base[3].max(top[3] * intensity.min(1.0))]
    });
}

fn gamma(ctx: &PassContext<'_>, target: &mut Surface) {
    let g = ctx.uniforms.float("gamma", 1.0).max(1e-3);
    let inv = 1.0 / g;
    let input = ctx.input;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        [
            c[0].max(0.0).powf(inv),
            c[1].max(0.0).powf(inv),
            c[2].max(0.0).powf(inv),
            c[3],
        ]
    });
}

fn fxaa(ctx: &PassContext<'_>, target: &mut Surface) {
    let input = ctx.input;
    let tx = 1.0 / input.width as f32;
    let ty = 1.0 / input.height as f32;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let n = input.sample(u, v - ty);
        let s = input.sample(u, v + ty);
        let e = input.sample(u + tx, v);
        let w = input.sample(u - tx, v);
        let lums = [luma(n), luma(s), luma(e), luma(w), luma(c)];
        let lo = lums.iter().copied().fold(f32::MAX, f32::min);
        let hi = lums.iter().copied().fold(f32::MIN, f32::max);
        let contrast = hi - lo;
        if contrast < (0.0312f32).max(hi * 0.125) {
            return c;
        }
        let avg = scale(add(add(n, s), add(e, w)), 0.25);
        let blend = (contrast / hi.max(1e-6)).clamp(0.0, 0.75) * 0.5;
        mix(c, avg, blend)
    });
}

fn clarity(ctx: &PassContext<'_>, target: &mut Surface) {
    let amount = ctx.uniforms.float("clarity", 0.0);
    let input = ctx.input;
    let tx = 2.0 / input.width as f32;
    let ty = 2.0 / input.height as f32;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let mut local = [0.0; 4];
        for (ox, oy) in [(-tx, -ty), (tx, -ty), (-tx, ty), (tx, ty)] {
            local = add(local, input.sample(u + ox, v + oy));
        }
        let local = scale(local, 0.25);
        let mut out = c;
        for ch in 0..3 {
            out[ch] = (c[ch] + amount * (c[ch] - local[ch])).max(0.0);
        }
        out
    });
}

fn bloom_prefilter(ctx: &PassContext<'_>, target: &mut Surface) {
    let threshold = ctx.uniforms.float("threshold", 0.8);
    let knee = ctx.uniforms.float("knee", 0.5).max(1e-4);
    let input = ctx.input;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let b = c[0].max(c[1]).max(c[2]);
        let soft = (b - threshold + knee).clamp(0.0, 2.0 * knee);
        let soft = soft * soft / (4.0 * knee);
        let contrib = soft.max(b - threshold) / b.max(1e-4);
        scale(c, contrib.max(0.0))
    });
}

fn bloom_upsample(ctx: &PassContext<'_>, target: &mut Surface) {
    let input = ctx.input;
    let base = ctx.sampler("baseMip");
    shade(target, |u, v| {
        let up = input.sample(u, v);
        match base {
            Some(b) => add(up, b.sample(u, v)),
            None => up,
        }
    });
}

fn bloom_composite(ctx: &PassContext<'_>, target: &mut Surface) {
    let intensity = ctx.uniforms.float("intensity", 0.5);
    let input = ctx.input;
    let bloom = ctx.sampler("bloomTexture");
    shade(target, |u, v| {
        let c = input.sample(u, v);
        match bloom {
            Some(b) => {
                let glow = scale(b.sample(u, v), intensity);
                [c[0] + glow[0], c[1] + glow[1], c[2] + glow[2], c[3]]
            }
            None => c,
        }
    });
}

/// Vertical lightning bolts coloured through `gradientLUT`.
fn plasma(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let bolts = un.int("boltCount", 3).max(1);
    let layers = un.int("layerCount", 1).max(1);
    let octaves = un.int("octaves", 6);
    let falloff = un.int("falloffType", 1);
    let anim = un.float("animPhase", 0.0);
    let drift_phase = un.float("driftPhase", 0.0);
    let drift = un.float("driftAmount", 0.0);
    let flicker_time = un.float("flickerTime", 0.0);
    let flicker = un.float("flickerAmount", 0.0);
    let displacement = un.float("displacement", 1.0);
    let glow_radius = un.float("glowRadius", 0.07).max(1e-3);
    let core = un.float("coreBrightness", 1.0);
    let lut = ctx.sampler("gradientLUT");

    shade(target, |u, v| {
        let mut rgb = [0.0f32; 3];
        for layer in 0..layers {
            let depth = 1.0 / (1.0 + layer as f32);
            for b in 0..bolts {
                let seed = b as f32 * 7.31 + layer as f32 * 3.17;
                let lane = (b as f32 + 0.5) / bolts as f32;
                let wander = drift * 0.15 * (drift_phase + seed).sin();
                let jag = fbm(v * 3.0 * (1.0 + layer as f32) + anim + seed, seed, octaves);
                let x = lane + wander + jag * displacement * 0.2;
                let d = (u - x).abs();
                let glow = match falloff {
                    0 => glow_radius / (d + glow_radius),
                    2 => (1.0 - d / (glow_radius * 3.0)).max(0.0),
                    _ => (-(d * d) / (glow_radius * glow_radius)).exp(),
                };
                let flick = 1.0 - flicker * 0.5 * (1.0 + (flicker_time * 17.0 + seed * 5.0).sin());
                let energy = glow * core * flick * depth;
                let color = match lut {
                    Some(l) => l.sample_1d(glow.clamp(0.0, 1.0)),
                    None => [1.0, 1.0, 1.0, 1.0],
                };
                for c in 0..3 {
                    rgb[c] += color[c] * energy;
                }
            }
        }
        [rgb[0].min(1.0), rgb[1].min(1.0), rgb[2].min(1.0), 1.0]
    });
}

fn solid_color(ctx: &PassContext<'_>, target: &mut Surface) {
    let color = ctx.uniforms.vec4("color", [1.0, 1.0, 1.0, 1.0]);
    shade(target, |_, _| color);
}

fn kaleidoscope(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let segments = un.int("segments", 6).max(1) as f32;
    let rotation = un.float("rotation", 0.0);
    let twist = un.float("twistAngle", 0.0);
    let smoothing = un.float("smoothing", 0.0).clamp(0.0, 0.5);
    let focal = un.vec2("focalOffset", [0.0, 0.0]);
    let input = ctx.input;
    let seg = TAU / segments;
    shade(target, |u, v| {
        let p = [u - 0.5 - focal[0], v - 0.5 - focal[1]];
        let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
        let mut a = p[1].atan2(p[0]) + rotation + twist * r;
        a = a.rem_euclid(seg);
        // Soft fold around the segment mid-line.
        let k = smoothing * seg;
        let x = a - seg * 0.5;
        let folded = (x * x + k * k).sqrt() - k;
        a = seg * 0.5 - folded;
        input.sample(0.5 + r * a.cos(), 0.5 + r * a.sin())
    });
}

fn kifs(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let iterations = un.int("iterations", 4).clamp(1, 12);
    let kscale = un.float("scale", 2.0);
    let offset = un.vec2("kifsOffset", [1.0, 1.0]);
    let rotation = un.float("rotation", 0.0);
    let twist = un.float("twist", 0.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let mut p = [(u - 0.5) * 2.0, (v - 0.5) * 2.0];
        for i in 0..iterations {
            p = [p[0].abs(), p[1].abs()];
            if p[0] < p[1] {
                p = [p[1], p[0]];
            }
            p = rotate(p, rotation + twist * i as f32);
            p = [
                p[0] * kscale - offset[0] * (kscale - 1.0),
                p[1] * kscale - offset[1] * (kscale - 1.0),
            ];
        }
        let fold = |x: f32| {
            let t = (x * 0.25 + 0.5).rem_euclid(2.0);
            if t > 1.0 { 2.0 - t } else { t }
        };
        input.sample(fold(p[0]), fold(p[1]))
    });
}

fn sine_warp(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let octaves = un.int("octaves", 4).clamp(1, 8);
    let strength = un.float("strength", 0.5);
    let time = un.float("time", 0.0);
    let octave_rotation = un.float("octaveRotation", 0.5);
    let radial = un.flag("radialMode");
    let input = ctx.input;
    shade(target, |u, v| {
        let mut p = [u - 0.5, v - 0.5];
        let mut freq = 2.0;
        let mut amp = strength * 0.05;
        for i in 0..octaves {
            let q = rotate(p, octave_rotation * i as f32);
            if radial {
                let r = (q[0] * q[0] + q[1] * q[1]).sqrt();
                let push = amp * (r * freq * PI + time).sin();
                let n = r.max(1e-5);
                p = [p[0] + q[0] / n * push, p[1] + q[1] / n * push];
            } else {
                p = [
                    p[0] + amp * (q[1] * freq * PI + time).sin(),
                    p[1] + amp * (q[0] * freq * PI + time * 1.1).cos(),
                ];
            }
            freq *= 2.0;
            amp *= 0.5;
        }
        input.sample(p[0] + 0.5, p[1] + 0.5)
    });
}

fn infinite_zoom(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let phase = un.float("zoomPhase", 0.0);
    let layers = un.int("layers", 4).clamp(1, 8);
    let spiral = un.float("spiralAngle", 0.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let p = [u - 0.5, v - 0.5];
        let mut acc = [0.0f32; 4];
        let mut total = 0.0f32;
        for l in 0..layers {
            let t = (l as f32 + phase.fract()) / layers as f32;
            let s = 2f32.powf(t * layers as f32 - layers as f32 * 0.5);
            let w = (t * PI).sin();
            let q = rotate([p[0] / s, p[1] / s], spiral * t);
            let c = input.sample_wrap(q[0] + 0.5, q[1] + 0.5);
            acc = add(acc, scale(c, w));
            total += w;
        }
        scale(acc, 1.0 / total.max(1e-5))
    });
}

fn pixelation(ctx: &PassContext<'_>, target: &mut Surface) {
    let cells = ctx.uniforms.float("cellCount", 64.0).max(1.0);
    let levels = ctx.uniforms.int("posterizeLevels", 0);
    let input = ctx.input;
    let aspect = input.height as f32 / input.width.max(1) as f32;
    let cells_y = (cells * aspect).max(1.0);
    shade(target, |u, v| {
        let cu = ((u * cells).floor() + 0.5) / cells;
        let cv = ((v * cells_y).floor() + 0.5) / cells_y;
        let mut c = input.sample(cu, cv);
        if levels > 1 {
            let l = levels as f32 - 1.0;
            for ch in 0..3 {
                c[ch] = (c[ch] * l).round() / l;
            }
        }
        c
    });
}

fn toon(ctx: &PassContext<'_>, target: &mut Surface) {
    let levels = ctx.uniforms.int("levels", 4).max(2) as f32;
    let edge_threshold = ctx.uniforms.float("edgeThreshold", 0.2);
    let edge_softness = ctx.uniforms.float("edgeSoftness", 0.05).max(1e-4);
    let input = ctx.input;
    let tx = 1.0 / input.width as f32;
    let ty = 1.0 / input.height as f32;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let l = luma(c);
        let q = (l * (levels - 1.0)).round() / (levels - 1.0);
        let k = if l > 1e-5 { q / l } else { 0.0 };
        let gx = luma(input.sample(u + tx, v)) - luma(input.sample(u - tx, v));
        let gy = luma(input.sample(u, v + ty)) - luma(input.sample(u, v - ty));
        let edge = ((gx * gx + gy * gy).sqrt() - edge_threshold) / edge_softness;
        let ink = 1.0 - edge.clamp(0.0, 1.0);
        [c[0] * k * ink, c[1] * k * ink, c[2] * k * ink, c[3]]
    });
}

fn color_grade(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let hue_shift = un.float("hueShift", 0.0);
    let saturation = un.float("saturation", 1.0);
    let brightness = un.float("brightness", 0.0);
    let contrast = un.float("contrast", 1.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let l = luma(c);
        let mut rgb = [c[0], c[1], c[2]];
        for ch in &mut rgb {
            *ch = l + (*ch - l) * saturation;
            *ch = (*ch - 0.5) * contrast + 0.5 + brightness;
        }
        if hue_shift != 0.0 {
            let (h, s, val) = crate::color::rgb_to_hsv(rgb);
            rgb = crate::color::hsv_to_rgb((h + hue_shift).rem_euclid(1.0), s, val);
        }
        [rgb[0].max(0.0), rgb[1].max(0.0), rgb[2].max(0.0), c[3]]
    });
}

/// Three horizontal taps `texelSize` apart.
fn streak_downsample(ctx: &PassContext<'_>, target: &mut Surface) {
    let texel = ctx.uniforms.float("texelSize", 0.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let sum = add(
            add(input.sample(u - texel, v), scale(input.sample(u, v), 2.0)),
            input.sample(u + texel, v),
        );
        scale(sum, 0.25)
    });
}

/// The wider level pulled up onto `highResTex`, weighted by `stretch`.
fn streak_upsample(ctx: &PassContext<'_>, target: &mut Surface) {
    let stretch = ctx.uniforms.float("stretch", 0.8);
    let input = ctx.input;
    let high = ctx.sampler("highResTex");
    shade(target, |u, v| {
        let low = scale(input.sample(u, v), stretch);
        match high {
            Some(h) => add(h.sample(u, v), low),
            None => low,
        }
    });
}

fn streak_composite(ctx: &PassContext<'_>, target: &mut Surface) {
    let intensity = ctx.uniforms.float("intensity", 0.5);
    let tint = ctx.uniforms.vec3("tint", [1.0, 1.0, 1.0]);
    let input = ctx.input;
    let streak = ctx.sampler("streakTexture");
    shade(target, |u, v| {
        let c = input.sample(u, v);
        match streak {
            Some(s) => {
                let g = s.sample(u, v);
                [
                    c[0] + g[0] * tint[0] * intensity,
                    c[1] + g[1] * tint[1] * intensity,
                    c[2] + g[2] * tint[2] * intensity,
                    c[3],
                ]
            }
            None => c,
        }
    });
}

/// Up to four rotated, rescaled copies of the input combined per channel.
fn moire_interference(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let angle = un.float("rotationAngle", 0.087);
    let scale_diff = un.float("scaleDiff", 1.02);
    let layers = un.int("layers", 2).clamp(2, 4);
    let mode = un.int("blendMode", 0);
    let center = un.vec2("center", [0.5, 0.5]);
    let accum = un.float("rotationAccum", 0.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let p = [u - center[0], v - center[1]];
        let mut out = input.sample_wrap(u, v);
        for i in 1..layers {
            let k = i as f32;
            let q = rotate(p, (angle + accum) * k);
            let s = scale_diff.powf(k);
            let c = input.sample_wrap(q[0] * s + center[0], q[1] * s + center[1]);
            for ch in 0..3 {
                out[ch] = match mode {
                    1 => out[ch].min(c[ch]),
                    2 => out[ch] + (c[ch] - out[ch]) / (k + 1.0),
                    3 => (out[ch] - c[ch]).abs(),
                    _ => out[ch] * c[ch],
                };
            }
        }
        out
    });
}

/// Displacement along a rotating axis, shaded by the wave slope.
fn surface_warp(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let intensity = un.float("intensity", 0.5);
    let angle = un.float("angle", 0.0) + un.float("rotation", 0.0);
    let scroll = un.float("scrollOffset", 0.0);
    let depth_shade = un.float("depthShade", 0.3);
    let input = ctx.input;
    let (sa, ca) = angle.sin_cos();
    shade(target, |u, v| {
        let across = (u - 0.5) * ca + (v - 0.5) * sa;
        let phase = across * TAU * 3.0 + scroll;
        let wave = phase.sin() * 0.5 + 0.35 * (phase * 2.1 + 1.3).sin();
        let shift = wave * intensity * 0.05;
        let c = input.sample(u - sa * shift, v + ca * shift);
        let slope = phase.cos();
        scale(c, 1.0 - depth_shade * 0.5 * (1.0 - slope))
    });
}

/// Scrolling perspective grid and striped sun over a palette-tinted frame.
fn synthwave(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let horizon = un.float("horizonY", 0.5);
    let color_mix = un.float("colorMix", 0.5);
    let spacing = un.float("gridSpacing", 8.0).max(1.0);
    let thickness = un.float("gridThickness", 0.05);
    let opacity = un.float("gridOpacity", 0.5);
    let grid_color = un.vec3("gridColor", [1.0, 0.0, 1.0]);
    let stripes = un.float("stripeCount", 8.0).max(1.0);
    let stripe_intensity = un.float("stripeIntensity", 0.5);
    let sun = un.vec3("sunColor", [1.0, 0.5, 0.2]);
    let glow = un.float("horizonIntensity", 0.5);
    let falloff = un.float("horizonFalloff", 10.0);
    let horizon_color = un.vec3("horizonColor", [1.0, 0.3, 0.6]);
    let grid_time = un.float("gridTime", 0.0);
    let stripe_time = un.float("stripeTime", 0.0);
    let input = ctx.input;
    shade(target, |u, v| {
        let c = input.sample(u, v);
        let l = luma(c);
        let tint = [l * grid_color[0], l * sun[1], l * horizon_color[2]];
        let mut rgb = [
            c[0] + (tint[0] - c[0]) * color_mix,
            c[1] + (tint[1] - c[1]) * color_mix,
            c[2] + (tint[2] - c[2]) * color_mix,
        ];
        let below = horizon - v;
        if below > 1e-3 {
            let depth = 1.0 / below;
            let gx = ((u - 0.5) * depth * spacing * 0.1).fract().abs();
            let gz = (depth * spacing * 0.05 + grid_time).fract();
            let line = [gx, 1.0 - gx, gz, 1.0 - gz]
                .into_iter()
                .fold(1.0f32, f32::min);
            let on = (1.0 - line / thickness.max(1e-4)).clamp(0.0, 1.0) * opacity;
            for ch in 0..3 {
                rgb[ch] += grid_color[ch] * on;
            }
        } else {
            let band = ((v + stripe_time) * stripes).fract();
            let lit = if band > 0.5 { stripe_intensity * l } else { 0.0 };
            for ch in 0..3 {
                rgb[ch] += sun[ch] * lit;
            }
        }
        let haze = glow * (-below.abs() * falloff).exp();
        for ch in 0..3 {
            rgb[ch] += horizon_color[ch] * haze;
        }
        [rgb[0], rgb[1], rgb[2], c[3]]
    });
}

/// Magnitude of the FFT bin nearest `freq`.
fn fft_at(fft: Option<&Surface>, freq: f32, sample_rate: f32, gain: f32, curve: f32) -> f32 {
    let Some(fft) = fft else { return 0.0 };
    let t = freq / (sample_rate * 0.5);
    if !(0.0..=1.0).contains(&t) {
        return 0.0;
    }
    (fft.sample_1d(t)[0] * gain).clamp(0.0, 1.0).powf(curve)
}

/// One ring per semitone with an arc that opens with its bin.
fn spectral_arcs(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let base = un.float("baseFreq", 220.0);
    let octaves = un.int("numOctaves", 8).clamp(1, 10);
    let gain = un.float("gain", 5.0);
    let curve = un.float("curve", 2.0);
    let sample_rate = un.float("sampleRate", 48_000.0);
    let ring_scale = un.float("ringScale", 2.5).max(0.1);
    let arc_width = un.float("arcWidth", 0.6);
    let glow = un.float("glowIntensity", 0.2);
    let falloff = un.float("glowFalloff", 40.0);
    let base_bright = un.float("baseBright", 0.1);
    let rotation = un.float("rotationAccum", 0.0);
    let fft = ctx.sampler("fftTexture");
    let lut = ctx.sampler("gradientLUT");
    let rings = (octaves * 12) as f32;
    let aspect = target.width as f32 / target.height.max(1) as f32;
    shade(target, |u, v| {
        let p = [(u - 0.5) * aspect, v - 0.5];
        let r = (p[0] * p[0] + p[1] * p[1]).sqrt() * ring_scale;
        let slot = (r * rings).floor();
        if slot >= rings {
            return [0.0, 0.0, 0.0, 1.0];
        }
        let freq = base * 2f32.powf(slot / 12.0);
        let mag = fft_at(fft, freq, sample_rate, gain, curve);
        let a = (p[1].atan2(p[0]) + rotation + hash1(slot) * TAU).rem_euclid(TAU) / TAU;
        let open = arc_width * mag;
        let ring_d = ((r * rings).fract() - 0.5).abs() / rings;
        let lit = if a < open { 1.0 } else { 0.0 };
        let energy = (base_bright + mag) * lit * glow / (ring_d * falloff + glow).max(1e-4);
        let color = match lut {
            Some(l) => l.sample_1d(slot / rings),
            None => [1.0, 1.0, 1.0, 1.0],
        };
        [
            (color[0] * energy).min(1.0),
            (color[1] * energy).min(1.0),
            (color[2] * energy).min(1.0),
            1.0,
        ]
    });
}

/// Decayed previous trail plus the particles of every live burst.
fn fireworks(ctx: &PassContext<'_>, target: &mut Surface) {
    let un = ctx.uniforms;
    let time = un.float("time", 0.0);
    let rate = un.float("burstRate", 1.5).max(1e-3);
    let bursts = un.int("maxBursts", 3).clamp(1, 8);
    let particles = un.int("particles", 60).clamp(16, 120);
    let spread = un.float("spreadArea", 0.5);
    let y_bias = un.float("yBias", 0.2);
    let radius = un.float("burstRadius", 0.6);
    let gravity = un.float("gravity", 0.8);
    let drag = un.float("dragRate", 2.0).max(1e-3);
    let size = un.float("particleSize", 0.008).max(1e-4);
    let glow = un.float("glowIntensity", 1.0);
    let decay = un.float("decayFactor", 0.95);
    let base = un.float("baseFreq", 55.0);
    let max_freq = un.float("maxFreq", 14_000.0).max(base);
    let gain = un.float("gain", 2.0);
    let curve = un.float("curve", 1.0);
    let base_bright = un.float("baseBright", 0.1);
    let sample_rate = un.float("sampleRate", 48_000.0);
    let fft = ctx.sampler("fftTexture");
    let lut = ctx.sampler("gradientLUT");
    let input = ctx.input;

    // Live particles in uv space, computed once per pass.
    let period = bursts as f32 / rate;
    let mut sparks: Vec<([f32; 2], f32, f32)> = Vec::new();
    for b in 0..bursts {
        let offset = b as f32 / rate;
        let local = (time - offset).rem_euclid(period);
        let cycle = ((time - offset) / period).floor();
        let seed = b as f32 * 13.7 + cycle * 3.1;
        let origin = [
            0.5 + (hash1(seed) - 0.5) * spread * 2.0,
            0.5 - y_bias + (hash1(seed + 1.0) - 0.5) * spread,
        ];
        let travel = (1.0 - (-drag * local).exp()) / drag;
        for i in 0..particles {
            let t = i as f32 / particles as f32;
            let freq = base * (max_freq / base).powf(t);
            let energy = base_bright + fft_at(fft, freq, sample_rate, gain, curve);
            let a = TAU * t + hash1(seed + i as f32) * 0.3;
            let speed = radius * (0.6 + 0.4 * hash1(seed * 2.0 + i as f32));
            let pos = [
                origin[0] + a.cos() * speed * travel,
                origin[1] + a.sin() * speed * travel + 0.5 * gravity * local * local * 0.2,
            ];
            let fade = (1.0 - local / period).max(0.0);
            sparks.push((pos, energy * fade, t));
        }
    }

    shade(target, |u, v| {
        let mut c = scale(input.sample(u, v), decay);
        for &(pos, energy, t) in &sparks {
            let d = ((u - pos[0]).powi(2) + (v - pos[1]).powi(2)).sqrt();
            if d > size * 6.0 {
                continue;
            }
            let k = glow * energy * size / (d + size);
            let color = match lut {
                Some(l) => l.sample_1d(t),
                None => [1.0, 1.0, 1.0, 1.0],
            };
            for ch in 0..3 {
                c[ch] += color[ch] * k;
            }
        }
        [c[0].min(1.0), c[1].min(1.0), c[2].min(1.0), 1.0]
    });
}
