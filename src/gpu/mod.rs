//! GPU seam used by every pass in the pipeline.
//!
//! Effects and simulations never talk to a graphics API directly: they load
//! programs by path, push uniforms through cached locations and issue
//! full-screen draws or compute dispatches against opaque handles. The
//! [`software::SoftwareGpu`] backend implements the trait on the CPU.

mod program;
pub mod software;

pub use program::ShaderProgram;

use std::fmt;
use std::ops::BitOr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Uniform location returned for names a program does not declare.
pub const NO_UNIFORM: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba32F,
    Rgba16F,
    Rg16F,
    Rgba8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TextureFormat,
}

impl TextureDesc {
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 1,
            format: TextureFormat::Rgba32F,
        }
    }

    pub fn with_format(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            depth: 1,
            format,
        }
    }

    pub fn volume(size: u32, format: TextureFormat) -> Self {
        Self {
            width: size,
            height: size,
            depth: size,
            format,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth.max(1) as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec2([i32; 2]),
    /// Column-major 3x3.
    Mat3([f32; 9]),
    FloatArray(Vec<f32>),
    /// Sampler bound by uniform name (slots >= 1; slot 0 is the pass input).
    Texture(TextureId),
}

impl UniformValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn as_vec2(&self) -> Option<[f32; 2]> {
        match self {
            Self::Vec2(v) => Some(*v),
            Self::IVec2([x, y]) => Some([*x as f32, *y as f32]),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<[f32; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec4(&self) -> Option<[f32; 4]> {
        match self {
            Self::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<TextureId> {
        match self {
            Self::Texture(t) => Some(*t),
            _ => None,
        }
    }
}

/// Memory barrier bits issued after compute passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Barriers(u8);

impl Barriers {
    pub const NONE: Self = Self(0);
    pub const IMAGE_ACCESS: Self = Self(1);
    pub const TEXTURE_FETCH: Self = Self(2);
    pub const SHADER_STORAGE: Self = Self(4);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Barriers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawBlend {
    Replace,
    Additive,
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBinding {
    pub unit: u32,
    pub texture: TextureId,
    pub access: ImageAccess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub binding: u32,
    pub buffer: BufferId,
}

#[derive(Debug, Clone)]
pub struct ComputeDispatch<'a> {
    pub program: ProgramId,
    pub groups: [u32; 3],
    pub images: &'a [ImageBinding],
    pub buffers: &'a [BufferBinding],
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    ShaderLoad { path: String, message: String },
    ComputeUnsupported,
    UnknownProgram(ProgramId),
    UnknownTexture(TextureId),
    UnknownBuffer(BufferId),
    Allocation { width: u32, height: u32, message: String },
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShaderLoad { path, message } => {
                write!(f, "failed to load shader '{path}': {message}")
            }
            Self::ComputeUnsupported => write!(f, "compute shaders are not supported"),
            Self::UnknownProgram(id) => write!(f, "unknown program {}", id.0),
            Self::UnknownTexture(id) => write!(f, "unknown texture {}", id.0),
            Self::UnknownBuffer(id) => write!(f, "unknown buffer {}", id.0),
            Self::Allocation {
                width,
                height,
                message,
            } => write!(f, "surface allocation {width}x{height} failed: {message}"),
            Self::SizeMismatch { expected, actual } => {
                write!(f, "data size mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for GpuError {}

/// The rendering device every pass goes through.
pub trait Gpu {
    fn supports_compute(&self) -> bool;

    fn load_shader(&mut self, path: &str) -> Result<ProgramId, GpuError>;
    fn load_compute(&mut self, path: &str) -> Result<ProgramId, GpuError>;
    fn unload_program(&mut self, program: ProgramId);

    /// Returns [`NO_UNIFORM`] when the program does not declare `name`.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> i32;
    /// Writes to location [`NO_UNIFORM`] are ignored.
    fn set_uniform(&mut self, program: ProgramId, location: i32, value: UniformValue);

    fn create_texture(&mut self, desc: TextureDesc) -> Result<TextureId, GpuError>;
    fn destroy_texture(&mut self, texture: TextureId);
    fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)>;
    fn clear_texture(&mut self, texture: TextureId, color: [f32; 4]);
    /// `data` is tightly packed RGBA rows covering the whole texture.
    fn upload_texture(&mut self, texture: TextureId, data: &[[f32; 4]]) -> Result<(), GpuError>;
    fn read_texture(&self, texture: TextureId) -> Result<Vec<[f32; 4]>, GpuError>;

    fn create_buffer(&mut self, words: &[u32]) -> Result<BufferId, GpuError>;
    fn update_buffer(&mut self, buffer: BufferId, words: &[u32]) -> Result<(), GpuError>;
    fn read_buffer(&self, buffer: BufferId) -> Result<Vec<u32>, GpuError>;
    fn destroy_buffer(&mut self, buffer: BufferId);

    /// One full-screen pass: `input` on slot 0, rendering into `target`.
    fn draw_fullscreen(
        &mut self,
        program: ProgramId,
        input: TextureId,
        target: TextureId,
    ) -> Result<(), GpuError>;
    /// Stretches `src` over `target`.
    fn draw_texture(
        &mut self,
        src: TextureId,
        target: TextureId,
        blend: DrawBlend,
    ) -> Result<(), GpuError>;
    /// Pixel-space rectangle `[x, y, w, h]`.
    fn fill_rect(
        &mut self,
        target: TextureId,
        rect: [f32; 4],
        color: [f32; 4],
        blend: DrawBlend,
    ) -> Result<(), GpuError>;

    fn dispatch_compute(&mut self, dispatch: &ComputeDispatch<'_>) -> Result<(), GpuError>;
    fn memory_barrier(&mut self, barriers: Barriers);
}

/// Binds a sampler and returns whether the program declares it.
pub fn bind_sampler(gpu: &mut dyn Gpu, program: ProgramId, name: &str, texture: TextureId) -> bool {
    let loc = gpu.uniform_location(program, name);
    gpu.set_uniform(program, loc, UniformValue::Texture(texture));
    loc != NO_UNIFORM
}

/// Number of work groups needed to cover `count` items.
pub fn group_count(count: u32, local_size: u32) -> u32 {
    count.div_ceil(local_size.max(1))
}
