use crate::gpu::{Gpu, TextureDesc, TextureId};
use anyhow::anyhow;

/// Screen-sized surfaces owned by the pipeline.
///
/// All share the window size except `half`, which is half of it on each axis.
#[derive(Debug)]
pub(crate) struct RenderTargets {
    pub width: u32,
    pub height: u32,
    pub accumulator: TextureId,
    pub ping_pong: [TextureId; 2],
    /// Post-transform snapshot of the previous output chain.
    pub output: TextureId,
    /// Generator output before compositing.
    pub scratch: TextureId,
    pub half: [TextureId; 2],
}

pub fn half_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

impl RenderTargets {
    pub fn new(gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("render targets need a non-empty size, got {width}x{height}"));
        }
        let (hw, hh) = half_size(width, height);
        let mut descs = [TextureDesc::screen(width, height); 7];
        descs[5] = TextureDesc::screen(hw, hh);
        descs[6] = TextureDesc::screen(hw, hh);

        let mut made = Vec::with_capacity(descs.len());
        for desc in descs {
            match gpu.create_texture(desc) {
                Ok(t) => made.push(t),
                Err(err) => {
                    for t in made {
                        gpu.destroy_texture(t);
                    }
                    return Err(anyhow::Error::new(err)
                        .context(format!("allocate {width}x{height} render targets")));
                }
            }
        }
        for &t in &made {
            gpu.clear_texture(t, [0.0; 4]);
        }
        log::debug!("render targets allocated at {width}x{height}");
        Ok(Self {
            width,
            height,
            accumulator: made[0],
            ping_pong: [made[1], made[2]],
            output: made[3],
            scratch: made[4],
            half: [made[5], made[6]],
        })
    }

    pub fn all(&self) -> [TextureId; 7] {
        [
            self.accumulator,
            self.ping_pong[0],
            self.ping_pong[1],
            self.output,
            self.scratch,
            self.half[0],
            self.half[1],
        ]
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        for t in self.all() {
            gpu.destroy_texture(t);
        }
    }
}

/// Read/write cursor over the ping-pong pair.
///
/// A pass reads [`PingPong::source`] and writes [`PingPong::target`]; the
/// two never coincide.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PingPong {
    source: TextureId,
    pair: [TextureId; 2],
    write: usize,
}

impl PingPong {
    pub fn start(source: TextureId, pair: [TextureId; 2]) -> Self {
        Self {
            source,
            pair,
            write: 0,
        }
    }

    pub fn source(&self) -> TextureId {
        self.source
    }

    pub fn target(&self) -> TextureId {
        self.pair[self.write]
    }

    /// Makes the last target the next source.
    pub fn swap(&mut self) {
        self.source = self.pair[self.write];
        self.write ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_never_aliases() {
        let mut pp = PingPong::start(TextureId(0), [TextureId(1), TextureId(2)]);
        for _ in 0..9 {
            assert_ne!(pp.source(), pp.target());
            pp.swap();
        }
        assert_eq!(half_size(1, 1), (1, 1));
    }
}
