//! Effect settings
//!
//! Serializable configuration for the render effects, validated and
//! clamped before resources are sized from it.

use serde::{Deserialize, Serialize};

use crate::device::CullFace;
use crate::light::MAX_SPOT_SHADOWS;
use crate::resource::{AddressMode, FilterMode, TextureFormat};

/// Global render target configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Base render resolution in pixels
    pub base_width: u32,
    pub base_height: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            base_width: 1920,
            base_height: 1080,
        }
    }
}

/// Shadow effect configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShadowSettings {
    /// Shadow map resolution as a fraction of the base resolution
    pub resolution_scale: f32,

    /// Array layers in the spot shadow map, one per caster
    pub spot_layers: u32,

    /// Face culled while rendering casters
    pub cull_face: CullFace,

    /// Depth attachment format
    pub depth_format: TextureFormat,

    /// Color attachment format (stores moments for filtering)
    pub color_format: TextureFormat,

    /// Filter for shadow map sampling
    pub filter: FilterMode,

    /// Address mode for shadow map sampling
    pub address_mode: AddressMode,

    /// Clear color for the moments attachment
    pub clear_color: [f32; 4],
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution_scale: 0.5,
            spot_layers: 2,
            cull_face: CullFace::Back,
            depth_format: TextureFormat::Depth32Float,
            color_format: TextureFormat::Rgba16Float,
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
            clear_color: [0.0, 0.0, 0.0, 0.0],
        }
    }
}

impl ShadowSettings {
    /// Full-resolution shadow maps
    pub fn full_resolution() -> Self {
        Self {
            resolution_scale: 1.0,
            ..Default::default()
        }
    }

    /// Set the caster layer count
    pub fn with_spot_layers(mut self, layers: u32) -> Self {
        self.spot_layers = layers;
        self
    }

    /// Set the culled face
    pub fn with_cull_face(mut self, face: CullFace) -> Self {
        self.cull_face = face;
        self
    }

    /// Clamp values to valid ranges and repair format mismatches
    pub fn validate(&mut self) {
        self.resolution_scale = self.resolution_scale.clamp(0.05, 1.0);
        self.spot_layers = self.spot_layers.clamp(1, MAX_SPOT_SHADOWS as u32);
        if !self.depth_format.is_depth() {
            self.depth_format = TextureFormat::Depth32Float;
        }
        if self.color_format.is_depth() {
            self.color_format = TextureFormat::Rgba16Float;
        }
    }

    /// Shadow map dimensions for a base resolution, never below 1x1
    pub fn scaled_size(&self, render: &RenderSettings) -> (u32, u32) {
        let width = (render.base_width as f32 * self.resolution_scale) as u32;
        let height = (render.base_height as f32 * self.resolution_scale) as u32;
        (width.max(1), height.max(1))
    }
}
