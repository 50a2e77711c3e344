use super::{AGENT_WORDS, AGENT_WORKGROUP};
use crate::gpu::{
    Barriers, BufferBinding, BufferId, ComputeDispatch, Gpu, GpuError, ShaderProgram, UniformValue,
    group_count,
};
use anyhow::Context;

const SPATIAL_HASH_SHADER: &str = "shaders/spatial_hash_build.glsl";
const MIN_CELL: u32 = 40;
const MAX_CELL: u32 = 80;

/// Largest common divisor of `width` and `height` in `[40, 80]`, or 40
/// when the two share none in that band.
pub fn cell_size_for(width: u32, height: u32) -> u32 {
    (MIN_CELL..=MAX_CELL)
        .rev()
        .find(|d| width % d == 0 && height % d == 0)
        .unwrap_or(MIN_CELL)
}

fn grid_dims(width: u32, height: u32, cell: u32) -> (u32, u32) {
    (width.div_ceil(cell).max(1), height.div_ceil(cell).max(1))
}

/// Uniform-grid bucket index over agent positions, rebuilt every frame.
///
/// After [`SpatialHash::build`], `offsets[c]` is the exclusive end of cell
/// `c` inside `sorted`; the cell starts at `offsets[c - 1]` (or 0).
#[derive(Debug)]
pub struct SpatialHash {
    program: ShaderProgram,
    counts: BufferId,
    offsets: BufferId,
    sorted: BufferId,
    capacity: usize,
    cell_size: u32,
    grid: (u32, u32),
    width: u32,
    height: u32,
}

impl SpatialHash {
    pub fn new(gpu: &mut dyn Gpu, max_agents: usize, width: u32, height: u32) -> anyhow::Result<Self> {
        let program = ShaderProgram::compute(
            gpu,
            SPATIAL_HASH_SHADER,
            &[
                "pass",
                "totalCells",
                "resolution",
                "cellSize",
                "gridSize",
                "agentCount",
                "agentStride",
                "positionOffset",
                "worldSpace",
            ],
        )
        .context("spatial hash program")?;
        let cell_size = cell_size_for(width, height);
        let grid = grid_dims(width, height, cell_size);
        let total = (grid.0 * grid.1) as usize;
        let buffers = alloc_buffers(gpu, total, max_agents);
        let (counts, offsets, sorted) = match buffers {
            Ok(b) => b,
            Err(err) => {
                program.release(gpu);
                return Err(err).context("spatial hash buffers");
            }
        };
        log::info!(
            "spatial hash {}x{} grid (cell {cell_size}px) for {max_agents} agents",
            grid.0,
            grid.1
        );
        Ok(Self {
            program,
            counts,
            offsets,
            sorted,
            capacity: max_agents,
            cell_size,
            grid,
            width,
            height,
        })
    }

    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn grid_size(&self) -> (u32, u32) {
        self.grid
    }

    pub fn total_cells(&self) -> usize {
        (self.grid.0 * self.grid.1) as usize
    }

    pub fn offsets(&self) -> BufferId {
        self.offsets
    }

    pub fn sorted(&self) -> BufferId {
        self.sorted
    }

    /// Grows the sorted-index buffer to hold `agents` entries.
    pub fn ensure_capacity(&mut self, gpu: &mut dyn Gpu, agents: usize) -> Result<(), GpuError> {
        if agents <= self.capacity {
            return Ok(());
        }
        let sorted = gpu.create_buffer(&vec![0; agents])?;
        gpu.destroy_buffer(self.sorted);
        self.sorted = sorted;
        self.capacity = agents;
        Ok(())
    }

    /// Reallocates the cell buffers only when the grid dimensions change.
    pub fn resize(&mut self, gpu: &mut dyn Gpu, width: u32, height: u32) -> anyhow::Result<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        let cell_size = cell_size_for(width, height);
        let grid = grid_dims(width, height, cell_size);
        if grid != self.grid {
            let (counts, offsets, sorted) =
                alloc_buffers(gpu, (grid.0 * grid.1) as usize, self.capacity)
                    .with_context(|| format!("spatial hash resize to {width}x{height}"))?;
            self.free_buffers(gpu);
            self.counts = counts;
            self.offsets = offsets;
            self.sorted = sorted;
            log::info!("spatial hash resized to {}x{} grid", grid.0, grid.1);
        }
        self.cell_size = cell_size;
        self.grid = grid;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Clear, count, prefix sum, scatter, prefix sum. `world_space` maps
    /// positions from [-1, 1] onto the screen before bucketing.
    pub fn build(
        &mut self,
        gpu: &mut dyn Gpu,
        agents: BufferId,
        agent_count: usize,
        world_space: bool,
    ) -> Result<(), GpuError> {
        if agent_count == 0 {
            return Ok(());
        }
        self.ensure_capacity(gpu, agent_count)?;
        let total = self.total_cells();
        let p = &self.program;
        p.set_i32(gpu, "totalCells", total as i32);
        p.set_vec2(gpu, "resolution", [self.width as f32, self.height as f32]);
        p.set_f32(gpu, "cellSize", self.cell_size as f32);
        p.set(
            gpu,
            "gridSize",
            UniformValue::IVec2([self.grid.0 as i32, self.grid.1 as i32]),
        );
        p.set_i32(gpu, "agentCount", agent_count as i32);
        p.set_i32(gpu, "agentStride", AGENT_WORDS as i32);
        p.set_i32(gpu, "positionOffset", 0);
        p.set_i32(gpu, "worldSpace", i32::from(world_space));

        let cell_groups = group_count(total as u32, AGENT_WORKGROUP);
        let agent_groups = group_count(agent_count as u32, AGENT_WORKGROUP);
        let bind = |binding: u32, buffer: BufferId| BufferBinding { binding, buffer };
        let passes: [(i32, u32, Vec<BufferBinding>); 5] = [
            (0, cell_groups, vec![bind(0, self.counts)]),
            (1, agent_groups, vec![bind(0, agents), bind(1, self.counts)]),
            (2, 1, vec![bind(0, self.counts), bind(1, self.offsets)]),
            (
                3,
                agent_groups,
                vec![bind(0, agents), bind(1, self.offsets), bind(2, self.sorted)],
            ),
            (2, 1, vec![bind(0, self.counts), bind(1, self.offsets)]),
        ];
        for (pass, groups, buffers) in &passes {
            self.program.set_i32(gpu, "pass", *pass);
            gpu.dispatch_compute(&ComputeDispatch {
                program: self.program.id(),
                groups: [*groups, 1, 1],
                images: &[],
                buffers,
            })?;
            gpu.memory_barrier(Barriers::SHADER_STORAGE);
        }
        Ok(())
    }

    fn free_buffers(&mut self, gpu: &mut dyn Gpu) {
        gpu.destroy_buffer(self.counts);
        gpu.destroy_buffer(self.offsets);
        gpu.destroy_buffer(self.sorted);
    }

    pub fn release(mut self, gpu: &mut dyn Gpu) {
        self.free_buffers(gpu);
        self.program.release(gpu);
    }
}

fn alloc_buffers(
    gpu: &mut dyn Gpu,
    cells: usize,
    agents: usize,
) -> Result<(BufferId, BufferId, BufferId), GpuError> {
    let counts = gpu.create_buffer(&vec![0; cells])?;
    let offsets = match gpu.create_buffer(&vec![0; cells]) {
        Ok(b) => b,
        Err(err) => {
            gpu.destroy_buffer(counts);
            return Err(err);
        }
    };
    match gpu.create_buffer(&vec![0; agents.max(1)]) {
        Ok(sorted) => Ok((counts, offsets, sorted)),
        Err(err) => {
            gpu.destroy_buffer(counts);
            gpu.destroy_buffer(offsets);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_resolutions_get_aligned_cells() {
        assert_eq!(cell_size_for(1920, 1080), 60);
        assert_eq!(cell_size_for(1280, 720), 80);
    }

    #[test]
    fn coprime_dimensions_fall_back_to_lower_bound() {
        assert_eq!(cell_size_for(1024, 1007), 40);
        assert_eq!(grid_dims(1024, 1007, 40), (26, 26));
    }
}
