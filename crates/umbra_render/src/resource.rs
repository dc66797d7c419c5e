//! Render resources
//!
//! Backend-neutral descriptions of the GPU resources the effects own:
//! textures, samplers, and framebuffer attachments.

use serde::{Deserialize, Serialize};

/// Texture format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    R8Unorm,
    R16Float,
    R32Float,
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    Depth24Plus,
    Depth32Float,
}

impl TextureFormat {
    /// Check if this is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth24Plus | Self::Depth32Float)
    }

    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::R8Unorm => 1,
            Self::R16Float => 2,
            Self::R32Float | Self::Rgba8Unorm | Self::Depth24Plus | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Sampler filter mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampler address mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Texture descriptor
///
/// Layered targets use `layers > 1`; the backend binds them as 2D arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureDesc {
    /// Debug label
    pub label: String,
    /// Size in pixels
    pub width: u32,
    pub height: u32,
    /// Array layer count
    pub layers: u32,
    /// Mip level count
    pub mip_level_count: u32,
    /// Format
    pub format: TextureFormat,
    /// Minification filter
    pub min_filter: FilterMode,
    /// Magnification filter
    pub mag_filter: FilterMode,
    /// Address mode for all coordinates
    pub address_mode: AddressMode,
}

impl Default for TextureDesc {
    fn default() -> Self {
        Self {
            label: String::new(),
            width: 1,
            height: 1,
            layers: 1,
            mip_level_count: 1,
            format: TextureFormat::Rgba8Unorm,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
        }
    }
}

impl TextureDesc {
    /// Estimated memory footprint in bytes
    pub fn size_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize * self.format.bytes_per_pixel()
    }
}

/// Framebuffer attachment point
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentPoint {
    Depth,
    Color(u32),
}
