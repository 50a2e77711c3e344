use feedback_synth::color::{ColorConfig, agent_hue};
use feedback_synth::gpu::software::SoftwareGpu;
use feedback_synth::gpu::Gpu;
use feedback_synth::sim::{
    AgentRecord, Boids, BoidsConfig, Physarum, PhysarumConfig, Simulation, SpatialHash, TrailMap,
    cell_size_for, encode_agents,
};

#[test]
fn agent_count_change_reseeds_exactly_once() {
    let mut gpu = SoftwareGpu::new();
    let mut cfg = PhysarumConfig {
        agent_count: 500,
        ..PhysarumConfig::default()
    };
    let mut sim = Physarum::new(&mut gpu, 64, 36, &cfg).expect("physarum init should succeed");
    assert!(!sim.apply_config(&mut gpu, &cfg).any(), "same config is a no-op");

    cfg.agent_count = 800;
    let change = sim.apply_config(&mut gpu, &cfg);
    assert!(change.reallocated && change.reseeded && change.trails_cleared);
    assert_eq!(sim.agent_count(), 800);
    assert!(!sim.apply_config(&mut gpu, &cfg).any(), "second apply must not reseed again");

    cfg.step_size += 0.5;
    assert!(!sim.apply_config(&mut gpu, &cfg).any(), "tuning a param keeps the agents");
    sim.release(&mut gpu);
}

#[test]
fn rainbow_hues_wrap_without_going_backwards() {
    let cfg = ColorConfig::rainbow(90.0, 360.0);
    let n = 100;
    let hues: Vec<f32> = (0..n).map(|i| agent_hue(&cfg, i, n)).collect();
    assert!((hues[0] - 0.25).abs() < 1e-6, "first agent sits at the start hue");
    for pair in hues.windows(2) {
        let step = (pair[1] - pair[0]).rem_euclid(1.0);
        assert!(step < 0.5, "hue must advance modulo wrap: {} -> {}", pair[0], pair[1]);
    }
    assert!(hues.iter().all(|h| (0.0..1.0).contains(h)));
    let wraps = hues.windows(2).filter(|p| p[1] < p[0]).count();
    assert_eq!(wraps, 1, "a full range wraps exactly once");
}

fn seeded_trail(gpu: &mut SoftwareGpu) -> TrailMap {
    let trail = TrailMap::new(gpu, 16, 16).expect("trail init should succeed");
    let data: Vec<[f32; 4]> = (0..256)
        .map(|i| {
            let v = (i % 17) as f32 / 16.0;
            [v, 1.0 - v, 0.5, 1.0]
        })
        .collect();
    gpu.upload_texture(trail.texture(), &data)
        .expect("upload should succeed");
    trail
}

#[test]
fn trail_decay_is_framerate_independent() {
    let mut gpu = SoftwareGpu::new();
    let mut halves = seeded_trail(&mut gpu);
    let mut whole = seeded_trail(&mut gpu);
    let dt = 1.0 / 30.0;

    for _ in 0..2 {
        halves
            .process(&mut gpu, dt / 2.0, 0.5, 0)
            .expect("trail pass should succeed");
    }
    whole
        .process(&mut gpu, dt, 0.5, 0)
        .expect("trail pass should succeed");

    let a = gpu.read_texture(halves.texture()).expect("readback should succeed");
    let b = gpu.read_texture(whole.texture()).expect("readback should succeed");
    for (pa, pb) in a.iter().zip(&b) {
        for c in 0..3 {
            assert!(
                (pa[c] - pb[c]).abs() <= 4.0 * f32::EPSILON,
                "half steps {} vs full step {}",
                pa[c],
                pb[c]
            );
        }
    }
    halves.release(&mut gpu);
    whole.release(&mut gpu);
}

#[test]
fn coprime_window_gets_a_small_grid() {
    let mut gpu = SoftwareGpu::new();
    assert_eq!(cell_size_for(1024, 1007), 40);
    let hash = SpatialHash::new(&mut gpu, 1000, 1024, 1007).expect("hash init should succeed");
    assert_eq!(hash.cell_size(), 40);
    assert_eq!(hash.grid_size(), (26, 26));
    assert!(hash.total_cells() < 1024, "cell count fits one prefix-sum group");
    hash.release(&mut gpu);
}

#[test]
fn hash_buckets_every_agent_into_its_cell() {
    let mut gpu = SoftwareGpu::new();
    let (w, h) = (320, 240);
    let mut hash = SpatialHash::new(&mut gpu, 64, w, h).expect("hash init should succeed");
    let cell = hash.cell_size() as f32;
    let grid = hash.grid_size();

    let mut rng = fastrand::Rng::with_seed(7);
    let agents: Vec<AgentRecord> = (0..300)
        .map(|_| AgentRecord {
            x: rng.f32() * w as f32,
            y: rng.f32() * h as f32,
            ..AgentRecord::default()
        })
        .collect();
    let buffer = gpu
        .create_buffer(&encode_agents(&agents))
        .expect("buffer should allocate");
    hash.build(&mut gpu, buffer, agents.len(), false)
        .expect("build should succeed");

    let offsets = gpu.read_buffer(hash.offsets()).expect("offsets should read");
    let sorted = gpu.read_buffer(hash.sorted()).expect("indices should read");
    assert_eq!(offsets[hash.total_cells() - 1] as usize, agents.len());

    let mut seen = vec![false; agents.len()];
    for c in 0..hash.total_cells() {
        let start = if c == 0 { 0 } else { offsets[c - 1] as usize };
        for &idx in &sorted[start..offsets[c] as usize] {
            let a = agents[idx as usize];
            let (cx, cy) = ((a.x / cell) as usize, (a.y / cell) as usize);
            assert_eq!(cy * grid.0 as usize + cx, c, "agent {idx} filed under the wrong cell");
            seen[idx as usize] = true;
        }
    }
    assert!(seen.iter().all(|s| *s), "every agent is indexed once");
    gpu.destroy_buffer(buffer);
    hash.release(&mut gpu);
}

#[test]
fn boids_resize_rebuilds_the_grid() {
    let mut gpu = SoftwareGpu::new();
    let cfg = BoidsConfig {
        enabled: true,
        agent_count: 200,
        ..BoidsConfig::default()
    };
    let mut sim = Boids::new(&mut gpu, 1280, 720, &cfg).expect("boids init should succeed");
    assert_eq!(sim.spatial_hash().cell_size(), 80);
    sim.resize(&mut gpu, 1920, 1080).expect("resize should succeed");
    assert_eq!(sim.spatial_hash().cell_size(), 60);
    assert_eq!(sim.trail_map().size(), (1920, 1080));
    assert_eq!(sim.agent_count(), 200);
    sim.release(&mut gpu);
}
