//! Built-in compute kernels, keyed by shader path.
//!
//! Agent buffers use the 8-word [`AgentRecord`] layout. Kernels that both
//! sense and deposit work on the trail image in place, like imageLoad/
//! imageStore on the same unit.

use super::surface::{add, luma, scale};
use super::{ComputeContext, ComputeKernel, Surface};
use crate::color::{hsv_to_rgb, rgb_to_hsv};
use crate::sim::{AGENT_WORDS, AgentRecord, decode_agents, hash_float, hash_u32};
use std::f32::consts::{PI, TAU};

pub fn kernel_for(path: &str) -> Option<ComputeKernel> {
    let name = path.strip_prefix("shaders/").unwrap_or(path);
    let kernel: ComputeKernel = match name {
        "trail_diffusion.glsl" => trail_diffusion,
        "physarum_agents.glsl" => physarum,
        "curl_flow_agents.glsl" => curl_flow,
        "curl_advection.glsl" => curl_advection,
        "attractor_agents.glsl" => attractor,
        "boids_agents.glsl" => boids,
        "particle_life_agents.glsl" => particle_life,
        "cymatics.glsl" => cymatics,
        "spatial_hash_build.glsl" => spatial_hash,
        _ => return None,
    };
    Some(kernel)
}

pub fn noop(_ctx: &mut ComputeContext<'_>) {}

/// Writes agents back over the words they were decoded from.
fn store_agents(agents: &[AgentRecord], words: &mut [u32]) {
    for (agent, chunk) in agents.iter().zip(words.chunks_exact_mut(AGENT_WORDS)) {
        agent.write_words(chunk);
    }
}

fn deposit_color(hue: f32, sat: f32, val: f32, amount: f32) -> [f32; 4] {
    let rgb = hsv_to_rgb(hue.rem_euclid(1.0), sat, val);
    [rgb[0] * amount, rgb[1] * amount, rgb[2] * amount, amount]
}

/// Separable diffusion; the vertical pass applies decay.
fn trail_diffusion(ctx: &mut ComputeContext<'_>) {
    let direction = ctx.uniforms.int("direction", 0);
    let radius = ctx.uniforms.float("diffusionScale", 1.0).max(0.0);
    let decay = ctx.uniforms.float("decayFactor", 1.0);
    let Some(input) = ctx.sampler("inputMap").cloned() else {
        log::warn!("trail diffusion dispatched without inputMap");
        return;
    };
    let Some((id, mut out)) = ctx.take_image(0) else {
        return;
    };
    const WEIGHTS: [f32; 3] = [0.402_619_9, 0.244_201_3, 0.054_488_7];
    let (dx, dy) = if direction == 0 { (1, 0) } else { (0, 1) };
    for y in 0..out.height {
        for x in 0..out.width {
            let (xi, yi) = (x as i32, y as i32);
            let center = input.texel(xi, yi);
            let blurred = if radius > 0.0 {
                let step = radius.round().max(1.0) as i32;
                let mut acc = scale(center, WEIGHTS[0]);
                for (k, w) in WEIGHTS.iter().enumerate().skip(1) {
                    let o = k as i32 * step;
                    acc = add(acc, scale(input.texel_wrap(xi + dx * o, yi + dy * o), *w));
                    acc = add(acc, scale(input.texel_wrap(xi - dx * o, yi - dy * o), *w));
                }
                acc
            } else {
                center
            };
            out.put(x, y, scale(blurred, decay));
        }
    }
    ctx.restore_image(id, out);
}

fn wrap_pos(v: f32, max: f32) -> f32 {
    v.rem_euclid(max)
}

fn sense(trail: &Surface, accum: Option<&Surface>, blend: f32, x: f32, y: f32) -> [f32; 4] {
    let t = trail.texel_wrap(x as i32, y as i32);
    match accum {
        Some(a) if blend > 0.0 => {
            let u = x / trail.width as f32;
            let v = y / trail.height as f32;
            let c = a.sample(u.rem_euclid(1.0), v.rem_euclid(1.0));
            [
                t[0] + (c[0] - t[0]) * blend,
                t[1] + (c[1] - t[1]) * blend,
                t[2] + (c[2] - t[2]) * blend,
                t[3],
            ]
        }
        _ => t,
    }
}

fn hue_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(1.0);
    d.min(1.0 - d)
}

fn physarum(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let sensor_distance = un.float("sensorDistance", 20.0);
    let sensor_variance = un.float("sensorDistanceVariance", 0.0);
    let sensor_angle = un.float("sensorAngle", 0.5);
    let turning_angle = un.float("turningAngle", 0.3);
    let step_size = un.float("stepSize", 1.5);
    let deposit = un.float("depositAmount", 0.05);
    let walk_mode = un.int("walkMode", 0);
    let levy_alpha = un.float("levyAlpha", 1.5).max(0.1);
    let density_response = un.float("densityResponse", 1.5);
    let cauchy_scale = un.float("cauchyScale", 0.5);
    let exp_scale = un.float("expScale", 1.0);
    let gaussian_variance = un.float("gaussianVariance", 0.3);
    let sprint_factor = un.float("sprintFactor", 2.0);
    let gradient_boost = un.float("gradientBoost", 3.0);
    let accum_blend = un.float("accumSenseBlend", 0.0);
    let repulsion = un.float("repulsionStrength", 0.0);
    let sampling_exponent = un.float("samplingExponent", 0.0);
    let vector_steering = un.flag("vectorSteering");
    let bounds_mode = un.int("boundsMode", 0);
    let respawn = un.flag("respawnMode");
    let gravity = un.float("gravityStrength", 0.0).clamp(0.0, 1.0);
    let orbit_offset = un.float("orbitOffset", 0.0);
    let attractor_count = un.int("attractorCount", 0).max(0) as usize;
    let attractors = un.floats("attractors");
    let frame = un.int("frame", 0) as u32;
    let sv = un.vec2("saturationValue", [1.0, 1.0]);
    let accum = ctx.sampler("accumTexture").cloned();

    let Some((buf_id, mut words)) = ctx.take_buffer(0) else {
        return;
    };
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        ctx.restore_buffer(buf_id, words);
        return;
    };
    let (w, h) = (trail.width as f32, trail.height as f32);
    let homes: Vec<(f32, f32)> = attractors
        .chunks_exact(2)
        .take(attractor_count)
        .map(|p| (p[0] * w, p[1] * h))
        .collect();
    let mut agents = decode_agents(&words);

    for (i, agent) in agents.iter_mut().enumerate() {
        let seed = hash_u32(i as u32 ^ frame.wrapping_mul(0x9e37_79b9));
        let rnd = |k: u32| hash_float(seed.wrapping_add(k.wrapping_mul(0x85eb_ca6b)));
        let dist = sensor_distance * (1.0 + sensor_variance * (rnd(1) * 2.0 - 1.0)).max(0.0);
        let probe = |angle: f32| {
            let a = agent.vx + angle;
            let c = sense(
                &trail,
                accum.as_ref(),
                accum_blend,
                agent.x + a.cos() * dist,
                agent.y + a.sin() * dist,
            );
            let mut s = luma(c);
            if repulsion > 0.0 && s > 1e-5 {
                let (ch, _, _) = rgb_to_hsv([c[0], c[1], c[2]]);
                s *= 1.0 - repulsion * hue_distance(ch, agent.hue) * 2.0;
            }
            if sampling_exponent > 0.0 {
                s = s.max(0.0).powf(1.0 + sampling_exponent);
            }
            s
        };
        let left = probe(sensor_angle);
        let front = probe(0.0);
        let right = probe(-sensor_angle);

        let heading_before = agent.vx;
        if vector_steering {
            let total = left.abs() + front.abs() + right.abs();
            if total > 1e-6 {
                agent.vx += turning_angle * (left - right) / total;
            }
        } else if front > left && front > right {
            // keep heading
        } else if front < left && front < right {
            agent.vx += if rnd(2) < 0.5 { turning_angle } else { -turning_angle };
        } else if left > right {
            agent.vx += turning_angle;
        } else if right > left {
            agent.vx -= turning_angle;
        }

        if gravity > 0.0 {
            let (tx, ty) = nearest_home(&homes, agent.x, agent.y).unwrap_or((w * 0.5, h * 0.5));
            let toward = (ty - agent.y).atan2(tx - agent.x) + orbit_offset * agent.hue * TAU;
            let diff = (toward - agent.vx + PI).rem_euclid(TAU) - PI;
            agent.vx += diff * gravity;
        }

        let u = rnd(3).max(1e-4);
        let step = match walk_mode {
            1 => step_size * u.powf(-1.0 / levy_alpha).min(10.0),
            2 => step_size * (1.0 + (density_response - 1.0) * (1.0 - front.clamp(0.0, 1.0))),
            3 => step_size * (1.0 + cauchy_scale * (PI * (u - 0.5)).tan().abs()).min(10.0),
            4 => step_size * (-u.ln() * exp_scale).min(10.0),
            5 => {
                let g = (-2.0 * u.ln()).sqrt() * (TAU * rnd(4)).cos();
                step_size * (1.0 + gaussian_variance * g).max(0.0)
            }
            6 => step_size * (1.0 + sprint_factor * (agent.vx - heading_before).abs()),
            7 => step_size * (1.0 + (gradient_boost - 1.0) * (left - right).abs().clamp(0.0, 1.0)),
            _ => step_size,
        };

        agent.x += agent.vx.cos() * step;
        agent.y += agent.vx.sin() * step;

        let outside = agent.x < 0.0 || agent.y < 0.0 || agent.x >= w || agent.y >= h;
        if outside {
            match bounds_mode {
                1 => {
                    if agent.x < 0.0 || agent.x >= w {
                        agent.vx = PI - agent.vx;
                    }
                    if agent.y < 0.0 || agent.y >= h {
                        agent.vx = -agent.vx;
                    }
                    agent.x = agent.x.clamp(0.0, w - 1.0);
                    agent.y = agent.y.clamp(0.0, h - 1.0);
                }
                2 => {
                    let (tx, ty) = if homes.is_empty() {
                        (w * 0.5, h * 0.5)
                    } else {
                        homes[(rnd(5) * homes.len() as f32) as usize % homes.len()]
                    };
                    if respawn {
                        agent.x = tx;
                        agent.y = ty;
                    } else {
                        agent.x = agent.x.clamp(0.0, w - 1.0);
                        agent.y = agent.y.clamp(0.0, h - 1.0);
                        agent.vx = (ty - agent.y).atan2(tx - agent.x);
                    }
                }
                3 => {
                    agent.x = agent.x.clamp(0.0, w - 1.0);
                    agent.y = agent.y.clamp(0.0, h - 1.0);
                    agent.vx = rnd(6) * TAU;
                }
                4 => {
                    agent.x = rnd(7) * w;
                    agent.y = rnd(8) * h;
                }
                5 => {
                    agent.x = agent.x.clamp(0.0, w - 1.0);
                    agent.y = agent.y.clamp(0.0, h - 1.0);
                }
                _ => {
                    agent.x = wrap_pos(agent.x, w);
                    agent.y = wrap_pos(agent.y, h);
                }
            }
        }

        trail.add(
            agent.x as i32,
            agent.y as i32,
            deposit_color(agent.hue, sv[0], sv[1], deposit),
        );
    }

    store_agents(&agents, &mut words);
    ctx.restore_buffer(buf_id, words);
    ctx.restore_image(img_id, trail);
}

fn nearest_home(homes: &[(f32, f32)], x: f32, y: f32) -> Option<(f32, f32)> {
    homes
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = (a.0 - x).hypot(a.1 - y);
            let db = (b.0 - x).hypot(b.1 - y);
            da.total_cmp(&db)
        })
}

fn curl_flow(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let frequency = un.float("noiseFrequency", 0.005);
    let noise_time = un.float("noiseTime", 0.0);
    let momentum = un.float("momentum", 0.0).clamp(0.0, 0.99);
    let trail_influence = un.float("trailInfluence", 0.3);
    let accum_blend = un.float("accumSenseBlend", 0.0);
    let radius = un.float("gradientRadius", 4.0);
    let step_size = un.float("stepSize", 2.0);
    let respawn = un.float("respawnProbability", 0.0);
    let deposit = un.float("depositAmount", 0.1);
    let frame = un.int("frame", 0) as u32;
    let sv = un.vec2("saturationValue", [1.0, 1.0]);
    let noise = ctx.sampler("noiseTexture").cloned();
    let accum = ctx.sampler("accumTexture").cloned();

    let Some(noise) = noise else {
        log::warn!("curl flow dispatched without noiseTexture");
        return;
    };
    let Some((buf_id, mut words)) = ctx.take_buffer(0) else {
        return;
    };
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        ctx.restore_buffer(buf_id, words);
        return;
    };
    let (w, h) = (trail.width as f32, trail.height as f32);
    let mut agents = decode_agents(&words);
    let potential = |x: f32, y: f32| noise.sample_3d(x * frequency, y * frequency, noise_time)[0];
    let e = 1.0 / frequency.max(1e-5) * 0.01;

    for (i, agent) in agents.iter_mut().enumerate() {
        let dpdx = (potential(agent.x + e, agent.y) - potential(agent.x - e, agent.y)) / (2.0 * e);
        let dpdy = (potential(agent.x, agent.y + e) - potential(agent.x, agent.y - e)) / (2.0 * e);
        let mut vel = [dpdy, -dpdx];

        if trail_influence > 0.0 {
            let s = |x: f32, y: f32| luma(sense(&trail, accum.as_ref(), accum_blend, x, y));
            let gx = s(agent.x + radius, agent.y) - s(agent.x - radius, agent.y);
            let gy = s(agent.x, agent.y + radius) - s(agent.x, agent.y - radius);
            vel[0] += -gy * trail_influence * 50.0;
            vel[1] += gx * trail_influence * 50.0;
        }

        let len = vel[0].hypot(vel[1]).max(1e-6);
        let target = [vel[0] / len, vel[1] / len];
        agent.vx = agent.vx * momentum + target[0] * (1.0 - momentum);
        agent.vy = agent.vy * momentum + target[1] * (1.0 - momentum);
        let vlen = agent.vx.hypot(agent.vy).max(1e-6);
        agent.x = wrap_pos(agent.x + agent.vx / vlen * step_size, w);
        agent.y = wrap_pos(agent.y + agent.vy / vlen * step_size, h);

        let seed = hash_u32(i as u32 ^ frame.wrapping_mul(0x2c1b_3c6d));
        if respawn > 0.0 && hash_float(seed) < respawn {
            agent.x = hash_float(seed ^ 0x68e3_1da4) * w;
            agent.y = hash_float(seed ^ 0xb529_7a4d) * h;
        }
        trail.add(
            agent.x as i32,
            agent.y as i32,
            deposit_color(agent.hue, sv[0], sv[1], deposit),
        );
    }

    store_agents(&agents, &mut words);
    ctx.restore_buffer(buf_id, words);
    ctx.restore_image(img_id, trail);
}

/// Velocity (rg) + divergence (b) state, one step per dispatch.
fn curl_advection(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let steps = un.int("steps", 40).max(1) as f32;
    let advection_curl = un.float("advectionCurl", 0.2);
    let curl_scale = un.float("curlScale", -2.0);
    let laplacian_scale = un.float("laplacianScale", 0.05);
    let pressure_scale = un.float("pressureScale", -2.0);
    let divergence_scale = un.float("divergenceScale", -0.4);
    let divergence_update = un.float("divergenceUpdate", -0.03);
    let divergence_smoothing = un.float("divergenceSmoothing", 0.3);
    let self_amp = un.float("selfAmp", 1.0);
    let update_smoothing = un.float("updateSmoothing", 0.4).clamp(0.0, 1.0);
    let injection = un.float("injectionIntensity", 0.0);
    let injection_threshold = un.float("injectionThreshold", 0.1);
    let deposit = un.float("depositAmount", 0.05);
    let sv = un.vec2("saturationValue", [1.0, 1.0]);
    let Some(state) = ctx.sampler("stateTexture").cloned() else {
        log::warn!("curl advection dispatched without stateTexture");
        return;
    };
    let accum = ctx.sampler("accumTexture").cloned();
    let Some((state_id, mut next)) = ctx.take_image(0) else {
        return;
    };
    let trail = ctx.take_image(1);

    let (gw, gh) = (next.width as i32, next.height as i32);
    let at = |x: i32, y: i32| state.texel_wrap(x, y);
    let mut trail = trail;
    for y in 0..gh {
        for x in 0..gw {
            let c = at(x, y);
            let (n, s, e, wv) = (at(x, y - 1), at(x, y + 1), at(x + 1, y), at(x - 1, y));
            let curl = (e[1] - wv[1]) - (s[0] - n[0]);
            let div = (e[0] - wv[0]) + (s[1] - n[1]);
            let lap = [
                (n[0] + s[0] + e[0] + wv[0]) * 0.25 - c[0],
                (n[1] + s[1] + e[1] + wv[1]) * 0.25 - c[1],
            ];
            let grad_div = [e[2] - wv[2], s[2] - n[2]];

            // Semi-Lagrangian back-trace along the rotated velocity.
            let rot = advection_curl * curl;
            let (sn, cs) = rot.sin_cos();
            let v = [c[0] * cs - c[1] * sn, c[0] * sn + c[1] * cs];
            let back = state.sample_wrap(
                (x as f32 + 0.5 - v[0] * steps * 0.05) / gw as f32,
                (y as f32 + 0.5 - v[1] * steps * 0.05) / gh as f32,
            );

            let mut nv = [
                back[0] * self_amp + curl_scale * curl * 0.01 * -c[1]
                    + laplacian_scale * lap[0]
                    + pressure_scale * grad_div[0] * 0.01,
                back[1] * self_amp + curl_scale * curl * 0.01 * c[0]
                    + laplacian_scale * lap[1]
                    + pressure_scale * grad_div[1] * 0.01,
            ];
            if injection > 0.0 {
                if let Some(a) = accum.as_ref() {
                    let u = (x as f32 + 0.5) / gw as f32;
                    let vv = (y as f32 + 0.5) / gh as f32;
                    let l = luma(a.sample(u, vv));
                    if l > injection_threshold {
                        let du = 1.0 / gw as f32;
                        let gx = luma(a.sample(u + du, vv)) - luma(a.sample(u - du, vv));
                        let gy = luma(a.sample(u, vv + du)) - luma(a.sample(u, vv - du));
                        nv[0] += gx * injection;
                        nv[1] += gy * injection;
                    }
                }
            }
            let len = nv[0].hypot(nv[1]);
            if len > 1.0 {
                nv = [nv[0] / len, nv[1] / len];
            }
            let nd = c[2] + (divergence_scale * div + divergence_update - c[2]) * divergence_smoothing;
            let out = [
                c[0] + (nv[0] - c[0]) * update_smoothing,
                c[1] + (nv[1] - c[1]) * update_smoothing,
                nd,
                1.0,
            ];
            next.put(x as u32, y as u32, out);

            if let Some((_, t)) = trail.as_mut() {
                let speed = out[0].hypot(out[1]);
                let hue = out[1].atan2(out[0]) / TAU;
                let tx = (x as f32 + 0.5) / gw as f32 * t.width as f32;
                let ty = (y as f32 + 0.5) / gh as f32 * t.height as f32;
                t.add(tx as i32, ty as i32, deposit_color(hue, sv[0], sv[1], deposit * speed));
            }
        }
    }
    ctx.restore_image(state_id, next);
    if let Some((id, t)) = trail {
        ctx.restore_image(id, t);
    }
}

fn attractor_derivative(kind: i32, p: [f32; 3], un: &super::Uniforms<'_>) -> [f32; 3] {
    let [x, y, z] = p;
    match kind {
        1 => {
            let c = un.float("rosslerC", 5.7);
            [-y - z, x + 0.2 * y, 0.2 + z * (x - c)]
        }
        2 => {
            let (a, b, c, d, e, f) = (0.95, 0.7, 0.6, 3.5, 0.25, 0.1);
            [
                (z - b) * x - d * y,
                d * x + (z - b) * y,
                c + a * z - z * z * z / 3.0 - (x * x + y * y) * (1.0 + e * z) + f * z * x * x * x,
            ]
        }
        3 => {
            let b = un.float("thomasB", 0.208_186);
            [y.sin() - b * x, z.sin() - b * y, x.sin() - b * z]
        }
        4 => {
            let a = un.float("dadrasA", 3.0);
            let b = un.float("dadrasB", 2.7);
            let c = un.float("dadrasC", 1.7);
            let d = un.float("dadrasD", 2.0);
            let e = un.float("dadrasE", 9.0);
            [y - a * x + b * y * z, c * y - x * z + z, d * x * y - e * z]
        }
        _ => {
            let sigma = un.float("sigma", 10.0);
            let rho = un.float("rho", 28.0);
            let beta = un.float("beta", 8.0 / 3.0);
            [sigma * (y - x), x * (rho - z) - y, x * y - beta * z]
        }
    }
}

fn mat3_mul(m: &[f32; 9], p: [f32; 3]) -> [f32; 3] {
    [
        m[0] * p[0] + m[3] * p[1] + m[6] * p[2],
        m[1] * p[0] + m[4] * p[1] + m[7] * p[2],
        m[2] * p[0] + m[5] * p[1] + m[8] * p[2],
    ]
}

fn attractor(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let kind = un.int("attractorType", 0);
    let time_scale = un.float("timeScale", 0.01);
    let scale_world = un.float("attractorScale", 0.02);
    let center = un.vec2("center", [0.5, 0.5]);
    let rotation = un.mat3("rotationMatrix");
    let max_speed = un.float("maxSpeed", 50.0);
    let deposit = un.float("depositAmount", 0.1);
    let frame = un.int("frame", 0) as u32;
    let sv = un.vec2("saturationValue", [1.0, 1.0]);

    let Some((buf_id, mut words)) = ctx.take_buffer(0) else {
        return;
    };
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        ctx.restore_buffer(buf_id, words);
        return;
    };
    let (w, h) = (trail.width as f32, trail.height as f32);
    let mut agents = decode_agents(&words);
    for (i, agent) in agents.iter_mut().enumerate() {
        let p = [agent.x, agent.y, agent.z];
        let mut d = attractor_derivative(kind, p, &un);
        let speed = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        if speed > max_speed {
            let k = max_speed / speed;
            d = [d[0] * k, d[1] * k, d[2] * k];
        }
        agent.x += d[0] * time_scale;
        agent.y += d[1] * time_scale;
        agent.z += d[2] * time_scale;
        if !(agent.x.is_finite() && agent.y.is_finite() && agent.z.is_finite())
            || agent.x.abs().max(agent.y.abs()).max(agent.z.abs()) > 1000.0
        {
            let seed = hash_u32(i as u32 ^ frame);
            agent.x = 0.1 + hash_float(seed) - 0.5;
            agent.y = hash_float(seed ^ 0x1234_5678) - 0.5;
            agent.z = hash_float(seed ^ 0x8765_4321) - 0.5;
        }
        let q = mat3_mul(&rotation, [agent.x, agent.y, agent.z]);
        let sx = (center[0] + q[0] * scale_world * h / w) * w;
        let sy = (center[1] + q[1] * scale_world) * h;
        trail.add(sx as i32, sy as i32, deposit_color(agent.hue, sv[0], sv[1], deposit));
    }
    store_agents(&agents, &mut words);
    ctx.restore_buffer(buf_id, words);
    ctx.restore_image(img_id, trail);
}

struct Grid<'a> {
    offsets: &'a [u32],
    indices: &'a [u32],
    width: i32,
    height: i32,
    cell: f32,
}

impl Grid<'_> {
    /// Agent indices in cell (cx, cy); offsets hold inclusive cell ends.
    fn cell(&self, cx: i32, cy: i32) -> &[u32] {
        if cx < 0 || cy < 0 || cx >= self.width || cy >= self.height {
            return &[];
        }
        let c = (cy * self.width + cx) as usize;
        let end = self.offsets.get(c).copied().unwrap_or(0) as usize;
        let start = if c == 0 {
            0
        } else {
            self.offsets.get(c - 1).copied().unwrap_or(0) as usize
        };
        self.indices.get(start..end.min(self.indices.len())).unwrap_or(&[])
    }
}

fn boids(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let perception = un.float("perceptionRadius", 50.0);
    let separation_radius = un.float("separationRadius", 20.0);
    let w_coh = un.float("cohesionWeight", 1.0);
    let w_sep = un.float("separationWeight", 1.5);
    let w_ali = un.float("alignmentWeight", 1.0);
    let hue_affinity = un.float("hueAffinity", 1.0);
    let max_speed = un.float("maxSpeed", 4.0);
    let min_speed = un.float("minSpeed", 0.5);
    let deposit = un.float("depositAmount", 0.05);
    let grid_size = un.vec2("gridSize", [1.0, 1.0]);
    let cell_size = un.float("cellSize", 40.0).max(1.0);
    let sv = un.vec2("saturationValue", [1.0, 1.0]);

    let offsets = ctx.buffer(1).map(<[u32]>::to_vec).unwrap_or_default();
    let indices = ctx.buffer(2).map(<[u32]>::to_vec).unwrap_or_default();
    let Some((buf_id, mut words)) = ctx.take_buffer(0) else {
        return;
    };
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        ctx.restore_buffer(buf_id, words);
        return;
    };
    let (w, h) = (trail.width as f32, trail.height as f32);
    let snapshot = decode_agents(&words);
    let mut agents = snapshot.clone();
    let grid = Grid {
        offsets: &offsets,
        indices: &indices,
        width: grid_size[0] as i32,
        height: grid_size[1] as i32,
        cell: cell_size,
    };
    let reach = (perception / grid.cell).ceil() as i32;

    for (i, agent) in agents.iter_mut().enumerate() {
        let me = snapshot[i];
        let (cx, cy) = ((me.x / grid.cell) as i32, (me.y / grid.cell) as i32);
        let mut center = [0.0f32; 2];
        let mut avg_vel = [0.0f32; 2];
        let mut push = [0.0f32; 2];
        let mut weight_sum = 0.0f32;
        let mut count = 0u32;
        for gy in cy - reach..=cy + reach {
            for gx in cx - reach..=cx + reach {
                for &j in grid.cell(gx, gy) {
                    let j = j as usize;
                    if j == i || j >= snapshot.len() {
                        continue;
                    }
                    let o = snapshot[j];
                    let (dx, dy) = (o.x - me.x, o.y - me.y);
                    let d = dx.hypot(dy);
                    if d > perception || d <= 0.0 {
                        continue;
                    }
                    let affinity = (1.0 - hue_affinity * hue_distance(me.hue, o.hue) * 2.0).max(0.0);
                    center[0] += o.x * affinity;
                    center[1] += o.y * affinity;
                    weight_sum += affinity;
                    avg_vel[0] += o.vx;
                    avg_vel[1] += o.vy;
                    count += 1;
                    if d < separation_radius {
                        push[0] -= dx / (d * d);
                        push[1] -= dy / (d * d);
                    }
                }
            }
        }
        if count > 0 {
            if weight_sum > 1e-6 {
                agent.vx += (center[0] / weight_sum - me.x) * 0.01 * w_coh;
                agent.vy += (center[1] / weight_sum - me.y) * 0.01 * w_coh;
            }
            agent.vx += (avg_vel[0] / count as f32 - me.vx) * 0.05 * w_ali;
            agent.vy += (avg_vel[1] / count as f32 - me.vy) * 0.05 * w_ali;
            agent.vx += push[0] * w_sep;
            agent.vy += push[1] * w_sep;
        }
        let speed = agent.vx.hypot(agent.vy);
        let clamped = speed.clamp(min_speed, max_speed);
        if speed > 1e-6 {
            agent.vx *= clamped / speed;
            agent.vy *= clamped / speed;
        } else {
            agent.vx = min_speed;
        }
        agent.x = wrap_pos(agent.x + agent.vx, w);
        agent.y = wrap_pos(agent.y + agent.vy, h);
        trail.add(
            agent.x as i32,
            agent.y as i32,
            deposit_color(agent.hue, sv[0], sv[1], deposit),
        );
    }
    store_agents(&agents, &mut words);
    ctx.restore_buffer(buf_id, words);
    ctx.restore_image(img_id, trail);
}

fn particle_force(r: f32, a: f32, beta: f32) -> f32 {
    if r < beta {
        r / beta - 1.0
    } else if r < 1.0 {
        a * (1.0 - (2.0 * r - 1.0 - beta).abs() / (1.0 - beta))
    } else {
        0.0
    }
}

fn particle_life(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let species = un.int("speciesCount", 6).max(1) as usize;
    let matrix = un.floats("attractionMatrix").to_vec();
    let r_max = un.float("rMax", 0.3).max(1e-4);
    let force_factor = un.float("forceFactor", 0.5);
    let momentum = un.float("momentum", 0.8).clamp(0.0, 1.0);
    let beta = un.float("beta", 0.3).clamp(0.01, 0.99);
    let bounds = un.float("boundaryRadius", 1.0);
    let stiffness = un.float("boundaryStiffness", 1.0);
    let center = un.vec2("center", [0.5, 0.5]);
    let projection = un.float("projectionScale", 0.4);
    let rotation = un.mat3("rotationMatrix");
    let dt = un.float("timeStep", 1.0 / 60.0);
    let deposit = un.float("depositAmount", 0.1);
    let grid_size = un.vec2("gridSize", [1.0, 1.0]);
    let cell_size = un.float("cellSize", 40.0).max(1.0);
    let sv = un.vec2("saturationValue", [1.0, 1.0]);

    let offsets = ctx.buffer(1).map(<[u32]>::to_vec).unwrap_or_default();
    let indices = ctx.buffer(2).map(<[u32]>::to_vec).unwrap_or_default();
    let Some((buf_id, mut words)) = ctx.take_buffer(0) else {
        return;
    };
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        ctx.restore_buffer(buf_id, words);
        return;
    };
    let (w, h) = (trail.width as f32, trail.height as f32);
    let snapshot = decode_agents(&words);
    let mut agents = snapshot.clone();
    let grid = Grid {
        offsets: &offsets,
        indices: &indices,
        width: grid_size[0] as i32,
        height: grid_size[1] as i32,
        cell: cell_size,
    };
    // Hash positions are world xy mapped onto the screen.
    let reach = (r_max * 0.5 * w / grid.cell).ceil() as i32;

    for (i, agent) in agents.iter_mut().enumerate() {
        let me = snapshot[i];
        let si = (me.aux as usize).min(species - 1);
        let px = (me.x * 0.5 + 0.5) * w;
        let py = (me.y * 0.5 + 0.5) * h;
        let (cx, cy) = ((px / grid.cell) as i32, (py / grid.cell) as i32);
        let mut force = [0.0f32; 3];
        for gy in cy - reach..=cy + reach {
            for gx in cx - reach..=cx + reach {
                for &j in grid.cell(gx, gy) {
                    let j = j as usize;
                    if j == i || j >= snapshot.len() {
                        continue;
                    }
                    let o = snapshot[j];
                    let d = [o.x - me.x, o.y - me.y, o.z - me.z];
                    let dist = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
                    if dist <= 0.0 || dist >= r_max {
                        continue;
                    }
                    let sj = (o.aux as usize).min(species - 1);
                    let a = matrix.get(si * species + sj).copied().unwrap_or(0.0);
                    let f = particle_force(dist / r_max, a, beta);
                    for k in 0..3 {
                        force[k] += d[k] / dist * f;
                    }
                }
            }
        }
        let r = (me.x * me.x + me.y * me.y + me.z * me.z).sqrt();
        if r > bounds && r > 0.0 {
            let k = -stiffness * (r - bounds) / r;
            force[0] += me.x * k;
            force[1] += me.y * k;
            force[2] += me.z * k;
        }
        agent.vx = agent.vx * momentum + force[0] * r_max * force_factor * dt;
        agent.vy = agent.vy * momentum + force[1] * r_max * force_factor * dt;
        agent.vz = agent.vz * momentum + force[2] * r_max * force_factor * dt;
        agent.x += agent.vx * dt;
        agent.y += agent.vy * dt;
        agent.z += agent.vz * dt;

        let q = mat3_mul(&rotation, [agent.x, agent.y, agent.z]);
        let sx = (center[0] + q[0] * projection * h / w) * w;
        let sy = (center[1] + q[1] * projection) * h;
        trail.add(sx as i32, sy as i32, deposit_color(agent.hue, sv[0], sv[1], deposit));
    }
    store_agents(&agents, &mut words);
    ctx.restore_buffer(buf_id, words);
    ctx.restore_image(img_id, trail);
}

fn cymatics(ctx: &mut ComputeContext<'_>) {
    let un = ctx.uniforms;
    let wave_scale = un.float("waveScale", 10.0);
    let falloff = un.float("falloff", 1.0);
    let gain = un.float("visualGain", 2.0);
    let contours = un.int("contourCount", 0);
    let sources = un.floats("sources").to_vec();
    let write_index = un.int("writeIndex", 0);
    let boundaries = un.flag("boundaries");
    let reflection = un.float("reflectionGain", 1.0);
    let Some(wave) = ctx.sampler("waveformTexture").cloned() else {
        log::warn!("cymatics dispatched without waveformTexture");
        return;
    };
    let lut = ctx.sampler("colorLUT").cloned();
    let Some((img_id, mut trail)) = ctx.take_image(0) else {
        return;
    };
    let (w, h) = (trail.width, trail.height);
    let aspect = w as f32 / h as f32;
    let len = wave.width as i32;

    let sample_at = |d: f32| {
        let delay = (d * wave_scale * 10.0) as i32;
        let idx = (write_index - 1 - delay).rem_euclid(len.max(1));
        wave.texel(idx, 0)[0] / (1.0 + d * falloff * 4.0)
    };

    for y in 0..h {
        for x in 0..w {
            let u = (x as f32 + 0.5) / w as f32;
            let v = (y as f32 + 0.5) / h as f32;
            let mut field = 0.0f32;
            for pair in sources.chunks_exact(2) {
                let (sx, sy) = (pair[0], pair[1]);
                let d = ((u - sx) * aspect).hypot(v - sy);
                field += sample_at(d);
                if boundaries {
                    for (mx, my) in [(-sx, sy), (2.0 - sx, sy), (sx, -sy), (sx, 2.0 - sy)] {
                        let dm = ((u - mx) * aspect).hypot(v - my);
                        field += sample_at(dm) * reflection;
                    }
                }
            }
            let mut value = field * gain;
            if contours > 0 {
                value = (value * contours as f32 * PI).sin();
            }
            let intensity = value.abs().tanh();
            let t = (value * 0.5 + 0.5).clamp(0.0, 1.0);
            let color = match lut.as_ref() {
                Some(l) => l.sample_1d(t),
                None => [1.0, 1.0, 1.0, 1.0],
            };
            let idx = trail.index(x, y);
            let prev = trail.data[idx];
            let c = scale(color, intensity);
            trail.data[idx] = [
                prev[0].max(c[0]),
                prev[1].max(c[1]),
                prev[2].max(c[2]),
                prev[3].max(intensity),
            ];
        }
    }
    ctx.restore_image(img_id, trail);
}

/// Passes: 0 clear, 1 count, 2 prefix sum, 3 scatter.
fn spatial_hash(ctx: &mut ComputeContext<'_>) {
    let pass = ctx.uniforms.int("pass", 0);
    let total_cells = ctx.uniforms.int("totalCells", 0).max(0) as usize;
    match pass {
        0 => {
            let Some((id, mut counts)) = ctx.take_buffer(0) else {
                return;
            };
            for c in counts.iter_mut().take(total_cells) {
                *c = 0;
            }
            ctx.restore_buffer(id, counts);
        }
        1 | 3 => {
            let res = ctx.uniforms.vec2("resolution", [1.0, 1.0]);
            let cell = ctx.uniforms.float("cellSize", 40.0).max(1.0);
            let grid = ctx.uniforms.vec2("gridSize", [1.0, 1.0]);
            let agent_count = ctx.uniforms.int("agentCount", 0).max(0) as usize;
            let stride = ctx.uniforms.int("agentStride", AGENT_WORDS as i32).max(1) as usize;
            let offset = ctx.uniforms.int("positionOffset", 0).max(0) as usize;
            let world = ctx.uniforms.flag("worldSpace");
            let Some(agents) = ctx.buffer(0).map(<[u32]>::to_vec) else {
                return;
            };
            let (gw, gh) = (grid[0] as i32, grid[1] as i32);
            let cell_of = |i: usize| -> Option<usize> {
                let base = i * stride + offset;
                let x = f32::from_bits(*agents.get(base)?);
                let y = f32::from_bits(*agents.get(base + 1)?);
                let (px, py) = if world {
                    ((x * 0.5 + 0.5) * res[0], (y * 0.5 + 0.5) * res[1])
                } else {
                    (x, y)
                };
                let cx = ((px / cell) as i32).clamp(0, gw - 1);
                let cy = ((py / cell) as i32).clamp(0, gh - 1);
                Some((cy * gw + cx) as usize)
            };
            if pass == 1 {
                let Some((id, mut counts)) = ctx.take_buffer(1) else {
                    return;
                };
                for i in 0..agent_count {
                    if let Some(c) = cell_of(i) {
                        if let Some(slot) = counts.get_mut(c) {
                            *slot += 1;
                        }
                    }
                }
                ctx.restore_buffer(id, counts);
            } else {
                let Some((off_id, mut offsets)) = ctx.take_buffer(1) else {
                    return;
                };
                let Some((idx_id, mut sorted)) = ctx.take_buffer(2) else {
                    ctx.restore_buffer(off_id, offsets);
                    return;
                };
                for i in 0..agent_count {
                    if let Some(c) = cell_of(i) {
                        if let Some(slot) = offsets.get_mut(c) {
                            *slot = slot.saturating_sub(1);
                            if let Some(dst) = sorted.get_mut(*slot as usize) {
                                *dst = i as u32;
                            }
                        }
                    }
                }
                ctx.restore_buffer(off_id, offsets);
                ctx.restore_buffer(idx_id, sorted);
            }
        }
        2 => {
            let counts = ctx.buffer(0).map(<[u32]>::to_vec).unwrap_or_default();
            let Some((id, mut offsets)) = ctx.take_buffer(1) else {
                return;
            };
            let mut running = 0u32;
            for (c, slot) in offsets.iter_mut().enumerate().take(total_cells) {
                running += counts.get(c).copied().unwrap_or(0);
                *slot = running;
            }
            ctx.restore_buffer(id, offsets);
        }
        other => log::warn!("spatial hash: unknown pass {other}"),
    }
}
