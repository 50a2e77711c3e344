//! CPU reference implementation of [`Gpu`].
//!
//! Shader paths resolve to built-in kernels (see [`fragment`] and
//! [`compute`]). Paths without a kernel fall back to a passthrough so the
//! pipeline can be exercised end to end with the full effect catalogue.

pub mod compute;
pub mod fragment;
mod surface;

pub use surface::{Surface, luma, mix};

use crate::gpu::{
    Barriers, BufferId, ComputeDispatch, DrawBlend, Gpu, GpuError, ImageAccess, ImageBinding,
    BufferBinding, NO_UNIFORM, ProgramId, TextureDesc, TextureId, UniformValue,
};
use std::collections::HashSet;

pub type FragmentKernel = fn(&PassContext<'_>, &mut Surface);
pub type ComputeKernel = fn(&mut ComputeContext<'_>);

#[derive(Clone, Copy)]
enum Kernel {
    Fragment(FragmentKernel),
    Compute(ComputeKernel),
}

struct Program {
    path: String,
    kernel: Kernel,
    names: Vec<String>,
    values: Vec<Option<UniformValue>>,
}

impl Program {
    fn value(&self, name: &str) -> Option<&UniformValue> {
        let idx = self.names.iter().position(|n| n == name)?;
        self.values[idx].as_ref()
    }

    fn sampler_ids(&self) -> Vec<TextureId> {
        self.values
            .iter()
            .filter_map(|v| v.as_ref().and_then(UniformValue::as_texture))
            .collect()
    }
}

/// Read-only uniform view handed to kernels.
#[derive(Clone, Copy)]
pub struct Uniforms<'a> {
    program: &'a Program,
}

impl<'a> Uniforms<'a> {
    pub fn get(&self, name: &str) -> Option<&'a UniformValue> {
        self.program.value(name)
    }

    pub fn float(&self, name: &str, default: f32) -> f32 {
        self.get(name).and_then(UniformValue::as_f32).unwrap_or(default)
    }

    pub fn int(&self, name: &str, default: i32) -> i32 {
        self.get(name).and_then(UniformValue::as_i32).unwrap_or(default)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.int(name, 0) != 0
    }

    pub fn vec2(&self, name: &str, default: [f32; 2]) -> [f32; 2] {
        self.get(name).and_then(UniformValue::as_vec2).unwrap_or(default)
    }

    pub fn vec3(&self, name: &str, default: [f32; 3]) -> [f32; 3] {
        self.get(name).and_then(UniformValue::as_vec3).unwrap_or(default)
    }

    pub fn vec4(&self, name: &str, default: [f32; 4]) -> [f32; 4] {
        self.get(name).and_then(UniformValue::as_vec4).unwrap_or(default)
    }

    pub fn mat3(&self, name: &str) -> [f32; 9] {
        match self.get(name) {
            Some(UniformValue::Mat3(m)) => *m,
            _ => [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn floats(&self, name: &str) -> &'a [f32] {
        match self.get(name) {
            Some(UniformValue::FloatArray(v)) => v.as_slice(),
            _ => &[],
        }
    }
}

/// Inputs of a fragment kernel; the target is passed separately.
pub struct PassContext<'a> {
    pub input: &'a Surface,
    pub uniforms: Uniforms<'a>,
    textures: &'a [Option<Surface>],
}

impl<'a> PassContext<'a> {
    pub fn sampler(&self, name: &str) -> Option<&'a Surface> {
        let id = self.uniforms.get(name)?.as_texture()?;
        self.textures.get(id.0 as usize)?.as_ref()
    }
}

/// State of a compute dispatch. Images and buffers are taken out of the
/// device while a kernel works on them and restored afterwards.
pub struct ComputeContext<'a> {
    pub groups: [u32; 3],
    pub uniforms: Uniforms<'a>,
    textures: &'a mut Vec<Option<Surface>>,
    buffers: &'a mut Vec<Option<Vec<u32>>>,
    images: &'a [ImageBinding],
    buffer_bindings: &'a [BufferBinding],
}

impl ComputeContext<'_> {
    pub fn sampler(&self, name: &str) -> Option<&Surface> {
        let id = self.uniforms.get(name)?.as_texture()?;
        self.textures.get(id.0 as usize)?.as_ref()
    }

    pub fn image(&self, unit: u32) -> Option<&Surface> {
        let binding = self.images.iter().find(|b| b.unit == unit)?;
        self.textures.get(binding.texture.0 as usize)?.as_ref()
    }

    pub fn take_image(&mut self, unit: u32) -> Option<(TextureId, Surface)> {
        let binding = *self.images.iter().find(|b| b.unit == unit)?;
        let surface = self.textures.get_mut(binding.texture.0 as usize)?.take()?;
        Some((binding.texture, surface))
    }

    pub fn restore_image(&mut self, id: TextureId, surface: Surface) {
        if let Some(slot) = self.textures.get_mut(id.0 as usize) {
            *slot = Some(surface);
        }
    }

    pub fn take_buffer(&mut self, binding: u32) -> Option<(BufferId, Vec<u32>)> {
        let b = *self.buffer_bindings.iter().find(|b| b.binding == binding)?;
        let words = self.buffers.get_mut(b.buffer.0 as usize)?.take()?;
        Some((b.buffer, words))
    }

    pub fn restore_buffer(&mut self, id: BufferId, words: Vec<u32>) {
        if let Some(slot) = self.buffers.get_mut(id.0 as usize) {
            *slot = Some(words);
        }
    }

    pub fn buffer(&self, binding: u32) -> Option<&[u32]> {
        let b = self.buffer_bindings.iter().find(|b| b.binding == binding)?;
        self.buffers.get(b.buffer.0 as usize)?.as_deref()
    }
}

/// One recorded draw or dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    pub label: String,
    pub program: Option<ProgramId>,
    pub reads: Vec<TextureId>,
    pub writes: Vec<TextureId>,
}

impl PassRecord {
    pub fn aliases(&self) -> bool {
        self.writes.iter().any(|w| self.reads.contains(w))
    }
}

pub struct SoftwareGpu {
    compute_supported: bool,
    programs: Vec<Option<Program>>,
    textures: Vec<Option<Surface>>,
    buffers: Vec<Option<Vec<u32>>>,
    failing_shaders: HashSet<String>,
    hidden_uniforms: HashSet<(String, String)>,
    allocation_limit: Option<usize>,
    tracing: bool,
    trace: Vec<PassRecord>,
    barriers: Vec<Barriers>,
}

impl Default for SoftwareGpu {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareGpu {
    pub fn new() -> Self {
        Self {
            compute_supported: true,
            programs: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
            failing_shaders: HashSet::new(),
            hidden_uniforms: HashSet::new(),
            allocation_limit: None,
            tracing: false,
            trace: Vec::new(),
            barriers: Vec::new(),
        }
    }

    pub fn set_compute_supported(&mut self, supported: bool) {
        self.compute_supported = supported;
    }

    /// Makes every later load of `path` fail.
    pub fn fail_shader(&mut self, path: &str) {
        self.failing_shaders.insert(path.to_string());
    }

    /// Makes `uniform_location(program of path, name)` report a missing uniform.
    pub fn hide_uniform(&mut self, path: &str, name: &str) {
        self.hidden_uniforms
            .insert((path.to_string(), name.to_string()));
    }

    /// Texture creations larger than `texels` fail with an allocation error.
    pub fn set_allocation_limit(&mut self, texels: Option<usize>) {
        self.allocation_limit = texels;
    }

    pub fn set_tracing(&mut self, on: bool) {
        self.tracing = on;
        if !on {
            self.trace.clear();
            self.barriers.clear();
        }
    }

    pub fn take_trace(&mut self) -> Vec<PassRecord> {
        std::mem::take(&mut self.trace)
    }

    pub fn take_barriers(&mut self) -> Vec<Barriers> {
        std::mem::take(&mut self.barriers)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.iter().filter(|p| p.is_some()).count()
    }

    pub fn program_path(&self, program: ProgramId) -> Option<&str> {
        self.programs
            .get(program.0 as usize)?
            .as_ref()
            .map(|p| p.path.as_str())
    }

    pub fn surface(&self, texture: TextureId) -> Option<&Surface> {
        self.textures.get(texture.0 as usize)?.as_ref()
    }

    fn load(&mut self, path: &str, kernel: Kernel) -> Result<ProgramId, GpuError> {
        if self.failing_shaders.contains(path) {
            return Err(GpuError::ShaderLoad {
                path: path.to_string(),
                message: "compile failed".to_string(),
            });
        }
        let program = Program {
            path: path.to_string(),
            kernel,
            names: Vec::new(),
            values: Vec::new(),
        };
        let id = match self.programs.iter().position(Option::is_none) {
            Some(free) => {
                self.programs[free] = Some(program);
                free
            }
            None => {
                self.programs.push(Some(program));
                self.programs.len() - 1
            }
        };
        log::debug!("loaded program {id} from {path}");
        Ok(ProgramId(id as u32))
    }

    fn surface_ref(&self, id: TextureId) -> Result<&Surface, GpuError> {
        self.textures
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(GpuError::UnknownTexture(id))
    }

    fn record(&mut self, record: PassRecord) {
        if record.aliases() {
            log::warn!(
                "pass '{}' reads and writes the same texture {:?}",
                record.label,
                record.writes
            );
        }
        if self.tracing {
            self.trace.push(record);
        }
    }
}

fn alloc_slot<T>(slots: &mut Vec<Option<T>>, value: T) -> u32 {
    match slots.iter().position(Option::is_none) {
        Some(free) => {
            slots[free] = Some(value);
            free as u32
        }
        None => {
            slots.push(Some(value));
            (slots.len() - 1) as u32
        }
    }
}

impl Gpu for SoftwareGpu {
    fn supports_compute(&self) -> bool {
        self.compute_supported
    }

    fn load_shader(&mut self, path: &str) -> Result<ProgramId, GpuError> {
        let kernel = fragment::kernel_for(path).unwrap_or_else(|| {
            log::debug!("no software kernel for {path}; using passthrough");
            fragment::passthrough
        });
        self.load(path, Kernel::Fragment(kernel))
    }

    fn load_compute(&mut self, path: &str) -> Result<ProgramId, GpuError> {
        if !self.compute_supported {
            return Err(GpuError::ComputeUnsupported);
        }
        let kernel = compute::kernel_for(path).unwrap_or_else(|| {
            log::debug!("no software kernel for {path}; dispatches are no-ops");
            compute::noop
        });
        self.load(path, Kernel::Compute(kernel))
    }

    fn unload_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0 as usize) {
            *slot = None;
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> i32 {
        let Some(Some(p)) = self.programs.get_mut(program.0 as usize) else {
            return NO_UNIFORM;
        };
        if self
            .hidden_uniforms
            .contains(&(p.path.clone(), name.to_string()))
        {
            return NO_UNIFORM;
        }
        if let Some(idx) = p.names.iter().position(|n| n == name) {
            return idx as i32;
        }
        p.names.push(name.to_string());
        p.values.push(None);
        (p.names.len() - 1) as i32
    }

    fn set_uniform(&mut self, program: ProgramId, location: i32, value: UniformValue) {
        if location < 0 {
            return;
        }
        if let Some(Some(p)) = self.programs.get_mut(program.0 as usize) {
            if let Some(slot) = p.values.get_mut(location as usize) {
                *slot = Some(value);
            }
        }
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureId, GpuError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::Allocation {
                width: desc.width,
                height: desc.height,
                message: "zero-sized surface".to_string(),
            });
        }
        if let Some(limit) = self.allocation_limit {
            if desc.texel_count() > limit {
                return Err(GpuError::Allocation {
                    width: desc.width,
                    height: desc.height,
                    message: format!("exceeds limit of {limit} texels"),
                });
            }
        }
        let surface = Surface::new(desc.width, desc.height, desc.depth, desc.format);
        Ok(TextureId(alloc_slot(&mut self.textures, surface)))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(texture.0 as usize) {
            *slot = None;
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.surface(texture).map(|s| (s.width, s.height))
    }

    fn clear_texture(&mut self, texture: TextureId, color: [f32; 4]) {
        if let Some(Some(s)) = self.textures.get_mut(texture.0 as usize) {
            s.fill(color);
        }
    }

    fn upload_texture(&mut self, texture: TextureId, data: &[[f32; 4]]) -> Result<(), GpuError> {
        let Some(Some(s)) = self.textures.get_mut(texture.0 as usize) else {
            return Err(GpuError::UnknownTexture(texture));
        };
        if s.data.len() != data.len() {
            return Err(GpuError::SizeMismatch {
                expected: s.data.len(),
                actual: data.len(),
            });
        }
        s.data.copy_from_slice(data);
        Ok(())
    }

    fn read_texture(&self, texture: TextureId) -> Result<Vec<[f32; 4]>, GpuError> {
        Ok(self.surface_ref(texture)?.data.clone())
    }

    fn create_buffer(&mut self, words: &[u32]) -> Result<BufferId, GpuError> {
        Ok(BufferId(alloc_slot(&mut self.buffers, words.to_vec())))
    }

    fn update_buffer(&mut self, buffer: BufferId, words: &[u32]) -> Result<(), GpuError> {
        let Some(Some(b)) = self.buffers.get_mut(buffer.0 as usize) else {
            return Err(GpuError::UnknownBuffer(buffer));
        };
        b.clear();
        b.extend_from_slice(words);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferId) -> Result<Vec<u32>, GpuError> {
        self.buffers
            .get(buffer.0 as usize)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(GpuError::UnknownBuffer(buffer))
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
    }

    fn draw_fullscreen(
        &mut self,
        program: ProgramId,
        input: TextureId,
        target: TextureId,
    ) -> Result<(), GpuError> {
        let Some(Some(p)) = self.programs.get(program.0 as usize) else {
            return Err(GpuError::UnknownProgram(program));
        };
        let Kernel::Fragment(kernel) = p.kernel else {
            return Err(GpuError::UnknownProgram(program));
        };
        let mut reads = vec![input];
        reads.extend(p.sampler_ids());
        let label = p.path.clone();

        let mut out = self
            .textures
            .get_mut(target.0 as usize)
            .and_then(Option::take)
            .ok_or(GpuError::UnknownTexture(target))?;
        if reads.contains(&target) {
            // Feedback loop: the kernel sees the pre-pass contents.
            self.textures[target.0 as usize] = Some(out.clone());
        }
        let result = match self.textures.get(input.0 as usize).and_then(Option::as_ref) {
            Some(input_surface) => {
                let ctx = PassContext {
                    input: input_surface,
                    uniforms: Uniforms { program: p },
                    textures: &self.textures,
                };
                kernel(&ctx, &mut out);
                Ok(())
            }
            None => Err(GpuError::UnknownTexture(input)),
        };
        self.textures[target.0 as usize] = Some(out);
        result?;

        self.record(PassRecord {
            label,
            program: Some(program),
            reads,
            writes: vec![target],
        });
        Ok(())
    }

    fn draw_texture(
        &mut self,
        src: TextureId,
        target: TextureId,
        blend: DrawBlend,
    ) -> Result<(), GpuError> {
        let source = self.surface_ref(src)?.clone();
        let Some(Some(dst)) = self.textures.get_mut(target.0 as usize) else {
            return Err(GpuError::UnknownTexture(target));
        };
        let (w, h) = (dst.width, dst.height);
        for y in 0..h {
            for x in 0..w {
                let u = (x as f32 + 0.5) / w as f32;
                let v = (y as f32 + 0.5) / h as f32;
                let s = source.sample(u, v);
                let i = dst.index(x, y);
                dst.data[i] = blend_pixel(dst.data[i], s, blend);
            }
        }
        self.record(PassRecord {
            label: "draw_texture".to_string(),
            program: None,
            reads: vec![src],
            writes: vec![target],
        });
        Ok(())
    }

    fn fill_rect(
        &mut self,
        target: TextureId,
        rect: [f32; 4],
        color: [f32; 4],
        blend: DrawBlend,
    ) -> Result<(), GpuError> {
        let Some(Some(dst)) = self.textures.get_mut(target.0 as usize) else {
            return Err(GpuError::UnknownTexture(target));
        };
        let x0 = rect[0].max(0.0) as u32;
        let y0 = rect[1].max(0.0) as u32;
        let x1 = ((rect[0] + rect[2]).max(0.0) as u32).min(dst.width);
        let y1 = ((rect[1] + rect[3]).max(0.0) as u32).min(dst.height);
        for y in y0..y1 {
            for x in x0..x1 {
                let i = dst.index(x, y);
                dst.data[i] = blend_pixel(dst.data[i], color, blend);
            }
        }
        Ok(())
    }

    fn dispatch_compute(&mut self, dispatch: &ComputeDispatch<'_>) -> Result<(), GpuError> {
        if !self.compute_supported {
            return Err(GpuError::ComputeUnsupported);
        }
        let Some(Some(p)) = self.programs.get(dispatch.program.0 as usize) else {
            return Err(GpuError::UnknownProgram(dispatch.program));
        };
        let Kernel::Compute(kernel) = p.kernel else {
            return Err(GpuError::UnknownProgram(dispatch.program));
        };
        let reads = p.sampler_ids();
        let writes: Vec<TextureId> = dispatch
            .images
            .iter()
            .filter(|b| b.access != ImageAccess::Read)
            .map(|b| b.texture)
            .collect();
        let label = p.path.clone();
        {
            let mut ctx = ComputeContext {
                groups: dispatch.groups,
                uniforms: Uniforms { program: p },
                textures: &mut self.textures,
                buffers: &mut self.buffers,
                images: dispatch.images,
                buffer_bindings: dispatch.buffers,
            };
            kernel(&mut ctx);
        }
        self.record(PassRecord {
            label,
            program: Some(dispatch.program),
            reads,
            writes,
        });
        Ok(())
    }

    fn memory_barrier(&mut self, barriers: Barriers) {
        if self.tracing {
            self.barriers.push(barriers);
        }
    }
}

fn blend_pixel(dst: [f32; 4], src: [f32; 4], blend: DrawBlend) -> [f32; 4] {
    match blend {
        DrawBlend::Replace => src,
        DrawBlend::Additive => [dst[0] + src[0], dst[1] + src[1], dst[2] + src[2], dst[3].max(src[3])],
        DrawBlend::Alpha => {
            let a = src[3].clamp(0.0, 1.0);
            [
                dst[0] + (src[0] - dst[0]) * a,
                dst[1] + (src[1] - dst[1]) * a,
                dst[2] + (src[2] - dst[2]) * a,
                dst[3].max(a),
            ]
        }
    }
}
