use crate::gpu::TextureFormat;

/// CPU-side texture storage. All formats are kept as RGBA f32; the declared
/// format only matters for clamping on write.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
    pub data: Vec<[f32; 4]>,
}

impl Surface {
    pub fn new(width: u32, height: u32, depth: u32, format: TextureFormat) -> Self {
        let len = width as usize * height as usize * depth.max(1) as usize;
        Self {
            width,
            height,
            depth: depth.max(1),
            format,
            data: vec![[0.0; 4]; len],
        }
    }

    pub fn fill(&mut self, color: [f32; 4]) {
        self.data.fill(color);
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn texel(&self, x: i32, y: i32) -> [f32; 4] {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn texel_wrap(&self, x: i32, y: i32) -> [f32; 4] {
        let x = x.rem_euclid(self.width as i32) as u32;
        let y = y.rem_euclid(self.height as i32) as u32;
        self.data[self.index(x, y)]
    }

    #[inline]
    pub fn put(&mut self, x: u32, y: u32, value: [f32; 4]) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.data[i] = self.quantize(value);
        }
    }

    #[inline]
    pub fn add(&mut self, x: i32, y: i32, value: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = self.index(x as u32, y as u32);
        let px = &mut self.data[i];
        for c in 0..4 {
            px[c] += value[c];
        }
    }

    fn quantize(&self, mut v: [f32; 4]) -> [f32; 4] {
        if self.format == TextureFormat::Rgba8 {
            for c in &mut v {
                *c = (c.clamp(0.0, 1.0) * 255.0).round() / 255.0;
            }
        }
        v
    }

    /// Bilinear sample with clamp-to-edge addressing; `u`, `v` in [0, 1].
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);
        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);
        bilerp(a, b, c, d, tx, ty)
    }

    /// Bilinear sample with repeat addressing.
    pub fn sample_wrap(&self, u: f32, v: f32) -> [f32; 4] {
        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i32, y0 as i32);
        let a = self.texel_wrap(x0, y0);
        let b = self.texel_wrap(x0 + 1, y0);
        let c = self.texel_wrap(x0, y0 + 1);
        let d = self.texel_wrap(x0 + 1, y0 + 1);
        bilerp(a, b, c, d, tx, ty)
    }

    /// Linear sample along a 1-pixel-tall texture (LUTs, FFT, waveform).
    pub fn sample_1d(&self, t: f32) -> [f32; 4] {
        self.sample(t, 0.5)
    }

    /// Trilinear sample of a volume with repeat addressing.
    pub fn sample_3d(&self, u: f32, v: f32, w: f32) -> [f32; 4] {
        let (wd, ht, dp) = (self.width as i32, self.height as i32, self.depth as i32);
        let fx = u * wd as f32 - 0.5;
        let fy = v * ht as f32 - 0.5;
        let fz = w * dp as f32 - 0.5;
        let (x0, y0, z0) = (fx.floor(), fy.floor(), fz.floor());
        let (tx, ty, tz) = (fx - x0, fy - y0, fz - z0);
        let (x0, y0, z0) = (x0 as i32, y0 as i32, z0 as i32);
        let at = |x: i32, y: i32, z: i32| {
            let x = x.rem_euclid(wd) as usize;
            let y = y.rem_euclid(ht) as usize;
            let z = z.rem_euclid(dp) as usize;
            self.data[(z * ht as usize + y) * wd as usize + x]
        };
        let lo = bilerp(
            at(x0, y0, z0),
            at(x0 + 1, y0, z0),
            at(x0, y0 + 1, z0),
            at(x0 + 1, y0 + 1, z0),
            tx,
            ty,
        );
        let hi = bilerp(
            at(x0, y0, z0 + 1),
            at(x0 + 1, y0, z0 + 1),
            at(x0, y0 + 1, z0 + 1),
            at(x0 + 1, y0 + 1, z0 + 1),
            tx,
            ty,
        );
        mix(lo, hi, tz)
    }

    pub fn max_channel(&self) -> f32 {
        self.data
            .iter()
            .flat_map(|px| px[..3].iter().copied())
            .fold(0.0f32, f32::max)
    }
}

#[inline]
pub fn mix(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[inline]
fn bilerp(a: [f32; 4], b: [f32; 4], c: [f32; 4], d: [f32; 4], tx: f32, ty: f32) -> [f32; 4] {
    mix(mix(a, b, tx), mix(c, d, tx), ty)
}

#[inline]
pub fn luma(c: [f32; 4]) -> f32 {
    0.299 * c[0] + 0.587 * c[1] + 0.114 * c[2]
}

#[inline]
pub fn scale(c: [f32; 4], s: f32) -> [f32; 4] {
    [c[0] * s, c[1] * s, c[2] * s, c[3] * s]
}

#[inline]
pub fn add(a: [f32; 4], b: [f32; 4]) -> [f32; 4] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
}
