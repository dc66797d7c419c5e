//! Lights
//!
//! World-side light descriptions and the GPU-ready layout for spot shadow
//! casters. Positions and directions are plain arrays matching the GPU
//! layouts.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use umbra_shader::{uniforms, Program};

use crate::device::{ProgramExt, RenderDevice};

/// Maximum spot shadow casters per frame
///
/// Bounds the shadow map array depth; when more lights cast shadows, the
/// farthest are dropped.
pub const MAX_SPOT_SHADOWS: usize = 8;

/// Light variant with its shape parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    /// Cone light; `angle` is the cone half-angle in radians, `blur`
    /// the penumbra fraction at the cone edge
    Spot { angle: f32, blur: f32 },
}

/// World-side light description
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Stable identifier
    pub id: u32,
    pub kind: LightKind,
    /// World position
    pub position: [f32; 3],
    /// Euler rotation in radians (pitch, yaw, roll)
    pub rotation: [f32; 3],
    /// Emitter size, drives the soft shadow penumbra
    pub size: f32,
    /// Linear color
    pub color: [f32; 3],
    pub intensity: f32,
    /// Attenuation range
    pub falloff: f32,
    /// Whether this light casts shadows
    pub shadowed: bool,
}

impl Light {
    fn with_kind(id: u32, kind: LightKind) -> Self {
        Self {
            id,
            kind,
            position: [0.0; 3],
            rotation: [0.0; 3],
            size: 1.0,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            falloff: 10.0,
            shadowed: false,
        }
    }

    pub fn directional(id: u32) -> Self {
        Self::with_kind(id, LightKind::Directional)
    }

    pub fn point(id: u32) -> Self {
        Self::with_kind(id, LightKind::Point)
    }

    pub fn spot(id: u32, angle: f32, blur: f32) -> Self {
        Self::with_kind(id, LightKind::Spot { angle, blur })
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_color(mut self, color: [f32; 3], intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = falloff.max(0.0);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size.max(0.0);
        self
    }

    pub fn with_shadows(mut self, shadowed: bool) -> Self {
        self.shadowed = shadowed;
        self
    }

    /// Forward direction from the Euler rotation; zero rotation faces -Z
    pub fn direction(&self) -> [f32; 3] {
        let pitch = self.rotation[0];
        let yaw = self.rotation[1];
        normalize([
            yaw.sin() * pitch.cos(),
            -pitch.sin(),
            -yaw.cos() * pitch.cos(),
        ])
    }

    pub fn is_spot(&self) -> bool {
        matches!(self.kind, LightKind::Spot { .. })
    }

    pub fn casts_shadows(&self) -> bool {
        self.shadowed
    }

    /// Write this light's parameters into the program's light uniforms.
    /// Each variant touches only the slots it shades with; slots the
    /// program did not resolve are skipped at the device boundary.
    pub fn write_shading_uniforms(&self, device: &mut dyn RenderDevice, program: &Program) {
        program.set_vec3(device, uniforms::LIGHT_COLOR, self.color);
        program.set_f32(device, uniforms::LIGHT_INTENSITY, self.intensity);
        match self.kind {
            LightKind::Directional => {
                program.set_vec3(device, uniforms::LIGHT_DIRECTION, self.direction());
            }
            LightKind::Point => {
                program.set_vec3(device, uniforms::LIGHT_POSITION, self.position);
                program.set_f32(device, uniforms::LIGHT_FALLOFF, self.falloff);
            }
            LightKind::Spot { angle, blur } => {
                program.set_vec3(device, uniforms::LIGHT_POSITION, self.position);
                program.set_vec3(device, uniforms::LIGHT_DIRECTION, self.direction());
                program.set_f32(device, uniforms::LIGHT_FALLOFF, self.falloff);
                program.set_f32(device, uniforms::LIGHT_SPOT_ANGLE, angle);
                program.set_f32(device, uniforms::LIGHT_SPOT_BLUR, blur);
            }
        }
    }
}

/// Normalize a vector, returning it unchanged when near zero
pub fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    if len_sq < 1e-12 {
        return v;
    }
    let inv = 1.0 / len_sq.sqrt();
    [v[0] * inv, v[1] * inv, v[2] * inv]
}

/// Squared distance between two points; enough for ordering comparisons
pub fn distance_squared(a: [f32; 3], b: [f32; 3]) -> f32 {
    let d = [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    d[0] * d[0] + d[1] * d[1] + d[2] * d[2]
}

/// GPU-ready spot shadow caster (std140 compatible, 64 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct GpuSpotShadow {
    pub position: [f32; 3],
    /// Cone half-angle in radians
    pub spot_angle: f32,
    pub direction: [f32; 3],
    pub spot_blur: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub falloff: f32,
    /// Target layer in the shadow map array
    pub layer: u32,
    pub _padding: [f32; 2],
}

impl GpuSpotShadow {
    /// Size in bytes
    pub const SIZE: usize = 64;

    /// Build from a spot light; `layer` is the shadow map array slice.
    /// Returns `None` for non-spot lights.
    pub fn new(light: &Light, layer: u32) -> Option<Self> {
        match light.kind {
            LightKind::Spot { angle, blur } => Some(Self {
                position: light.position,
                spot_angle: angle,
                direction: light.direction(),
                spot_blur: blur,
                color: light.color,
                intensity: light.intensity,
                falloff: light.falloff,
                layer,
                _padding: [0.0; 2],
            }),
            _ => None,
        }
    }
}
