//! Canonical uniform names
//!
//! The shared naming contract between the program layer and the shader
//! sources. Registration helpers on `Program` pull from these tables
//! instead of scattering string literals through effect code.

// Mesh transforms
pub const MODEL: &str = "uModel";
/// Inverse transpose of the model matrix
pub const MODEL_NORMAL: &str = "uModel_Normal";
/// Previous-frame model matrix, for motion vectors
pub const MODEL_PREVIOUS: &str = "uModel_Previous";

// Material toggles and parameters
pub const ENABLE_DIFFUSE_TEXTURE: &str = "uEnableDiffuseTexture";
pub const DIFFUSE_TEXTURE_UNIT: &str = "uDiffuseTextureUnit";
pub const DIFFUSE_COLOR: &str = "uDiffuseColor";
pub const EMISSION: &str = "uEmission";
pub const ENABLE_SPECULAR_TEXTURE: &str = "uEnableSpecularTexture";
pub const SPECULAR_TEXTURE_UNIT: &str = "uSpecularTextureUnit";
pub const SPECULAR_COLOR: &str = "uSpecularColor";
pub const SPECULAR_SHININESS: &str = "uSpecularShininess";
pub const ENABLE_NORMAL_TEXTURE: &str = "uEnableNormalTexture";
pub const NORMAL_TEXTURE_UNIT: &str = "uNormalTextureUnit";
pub const ENABLE_DISPLACEMENT_TEXTURE: &str = "uEnableDisplacementTexture";
pub const DISPLACEMENT_TEXTURE_UNIT: &str = "uDisplacementTextureUnit";
pub const DISPLACEMENT_STRENGTH: &str = "uDisplacementStrength";
pub const ENABLE_PARALLAX_TEXTURE: &str = "uEnableParallaxTexture";
pub const PARALLAX_TEXTURE_UNIT: &str = "uParallaxTextureUnit";

// Skinning
pub const ENABLE_SKINNING: &str = "uEnableSkinning";
pub const BONE_MATRICES: &str = "uBoneMatrices";

// Light parameters
pub const LIGHT_POSITION: &str = "uLightPosition";
pub const LIGHT_DIRECTION: &str = "uLightDirection";
pub const LIGHT_COLOR: &str = "uLightColor";
pub const LIGHT_INTENSITY: &str = "uLightIntensity";
pub const LIGHT_FALLOFF: &str = "uLightFalloff";
pub const LIGHT_SPOT_ANGLE: &str = "uLightSpotAngle";
pub const LIGHT_SPOT_BLUR: &str = "uLightSpotBlur";

/// Prefix for indexed texture samplers; see [`sampler_name`]
pub const SAMPLER_PREFIX: &str = "sampler";

/// Uniform set registered by [`Program::enable_mesh_loading`]
///
/// [`Program::enable_mesh_loading`]: crate::program::Program::enable_mesh_loading
pub const MESH_LOADING: &[&str] = &[
    MODEL,
    MODEL_NORMAL,
    MODEL_PREVIOUS,
    ENABLE_DIFFUSE_TEXTURE,
    DIFFUSE_TEXTURE_UNIT,
    DIFFUSE_COLOR,
    EMISSION,
    ENABLE_SPECULAR_TEXTURE,
    SPECULAR_TEXTURE_UNIT,
    SPECULAR_COLOR,
    SPECULAR_SHININESS,
    ENABLE_NORMAL_TEXTURE,
    NORMAL_TEXTURE_UNIT,
    ENABLE_DISPLACEMENT_TEXTURE,
    DISPLACEMENT_TEXTURE_UNIT,
    DISPLACEMENT_STRENGTH,
    ENABLE_PARALLAX_TEXTURE,
    PARALLAX_TEXTURE_UNIT,
    ENABLE_SKINNING,
    BONE_MATRICES,
];

/// Uniform set registered by [`Program::enable_light_calculation`]
///
/// [`Program::enable_light_calculation`]: crate::program::Program::enable_light_calculation
pub const LIGHT_CALCULATION: &[&str] = &[
    LIGHT_POSITION,
    LIGHT_DIRECTION,
    LIGHT_COLOR,
    LIGHT_INTENSITY,
    LIGHT_FALLOFF,
    LIGHT_SPOT_ANGLE,
    LIGHT_SPOT_BLUR,
];

/// Conventional name for the indexed sampler uniforms
pub fn sampler_name(index: usize) -> String {
    format!("{}{}", SAMPLER_PREFIX, index)
}
