use super::{Gpu, GpuError, NO_UNIFORM, ProgramId, TextureId, UniformValue};

/// A loaded program with its uniform locations resolved once at load time.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    path: &'static str,
    locations: Vec<(&'static str, i32)>,
}

impl ShaderProgram {
    pub fn fragment(
        gpu: &mut dyn Gpu,
        path: &'static str,
        uniforms: &[&'static str],
    ) -> Result<Self, GpuError> {
        let id = gpu.load_shader(path)?;
        Ok(Self::resolve(gpu, id, path, uniforms))
    }

    pub fn compute(
        gpu: &mut dyn Gpu,
        path: &'static str,
        uniforms: &[&'static str],
    ) -> Result<Self, GpuError> {
        let id = gpu.load_compute(path)?;
        Ok(Self::resolve(gpu, id, path, uniforms))
    }

    fn resolve(gpu: &mut dyn Gpu, id: ProgramId, path: &'static str, uniforms: &[&'static str]) -> Self {
        let locations = uniforms
            .iter()
            .map(|name| {
                let loc = gpu.uniform_location(id, name);
                if loc == NO_UNIFORM {
                    log::debug!("{path}: uniform '{name}' not found");
                }
                (*name, loc)
            })
            .collect();
        Self {
            id,
            path,
            locations,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn location(&self, name: &str) -> Option<i32> {
        self.locations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, loc)| *loc)
    }

    /// Names outside the cached set are resolved on the spot.
    pub fn set(&self, gpu: &mut dyn Gpu, name: &str, value: UniformValue) {
        let loc = match self.location(name) {
            Some(loc) => loc,
            None => gpu.uniform_location(self.id, name),
        };
        gpu.set_uniform(self.id, loc, value);
    }

    pub fn set_f32(&self, gpu: &mut dyn Gpu, name: &str, v: f32) {
        self.set(gpu, name, UniformValue::Float(v));
    }

    pub fn set_i32(&self, gpu: &mut dyn Gpu, name: &str, v: i32) {
        self.set(gpu, name, UniformValue::Int(v));
    }

    pub fn set_vec2(&self, gpu: &mut dyn Gpu, name: &str, v: [f32; 2]) {
        self.set(gpu, name, UniformValue::Vec2(v));
    }

    pub fn set_vec3(&self, gpu: &mut dyn Gpu, name: &str, v: [f32; 3]) {
        self.set(gpu, name, UniformValue::Vec3(v));
    }

    pub fn set_vec4(&self, gpu: &mut dyn Gpu, name: &str, v: [f32; 4]) {
        self.set(gpu, name, UniformValue::Vec4(v));
    }

    pub fn set_texture(&self, gpu: &mut dyn Gpu, name: &str, texture: TextureId) {
        self.set(gpu, name, UniformValue::Texture(texture));
    }

    pub fn release(self, gpu: &mut dyn Gpu) {
        gpu.unload_program(self.id);
    }
}
