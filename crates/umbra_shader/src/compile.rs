//! Stage compilation
//!
//! The [`StageCompiler`] seam turns one stage descriptor into a compiled
//! stage. The production implementation is naga-backed: WGSL and GLSL
//! front ends, IR validation, SPIR-V emission, and reflection of uniform
//! names and compute workgroup size.
//!
//! Geometry stages sit outside naga's IR model. They are preprocessed
//! (version header plus define directives) and carried as raw GLSL for the
//! backend to consume; uniform reflection for a geometry pipeline comes
//! from its naga-compiled companion stages.

use std::fs;
use std::path::{Path, PathBuf};

use naga::back::spv;
use naga::front::{glsl, wgsl};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use thiserror::Error;

use crate::stage::{SourceLanguage, StageDescriptor, StageKind};

/// Compile failure for a single stage
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to read shader source {0:?}: {1}")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("{kind} stage {path:?}: parse error: {message}")]
    Parse {
        kind: StageKind,
        path: PathBuf,
        message: String,
    },

    #[error("{kind} stage {path:?}: validation failed: {message}")]
    Validation {
        kind: StageKind,
        path: PathBuf,
        message: String,
    },

    #[error("{kind} stage {path:?}: no matching entry point")]
    MissingEntryPoint { kind: StageKind, path: PathBuf },

    #[error("{kind} stage {path:?}: SPIR-V emission failed: {message}")]
    Emit {
        kind: StageKind,
        path: PathBuf,
        message: String,
    },

    #[error("wgsl stage {0:?}: preprocessor defines require a GLSL source")]
    DefinesUnsupported(PathBuf),
}

/// Uniform-capable global reflected from a compiled stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBinding {
    /// Variable name as declared in the source
    pub name: String,
    /// Explicit (group, binding) pair, when the source declares one
    pub location: Option<(u32, u32)>,
}

/// Compiled artifact for one stage
#[derive(Debug, Clone)]
pub enum StageArtifact {
    /// SPIR-V words emitted by naga
    SpirV(Vec<u32>),
    /// Preprocessed GLSL carried verbatim (stages outside naga's IR model)
    RawGlsl(String),
}

impl StageArtifact {
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::SpirV(words) => words.len() * 4,
            Self::RawGlsl(source) => source.len(),
        }
    }

    pub fn as_spirv(&self) -> Option<&[u32]> {
        match self {
            Self::SpirV(words) => Some(words),
            Self::RawGlsl(_) => None,
        }
    }

    pub fn as_raw_glsl(&self) -> Option<&str> {
        match self {
            Self::SpirV(_) => None,
            Self::RawGlsl(source) => Some(source),
        }
    }
}

/// One compiled shader stage
#[derive(Debug, Clone)]
pub struct CompiledStage {
    pub kind: StageKind,
    pub artifact: StageArtifact,
    /// Uniform-capable globals reflected from the stage
    pub uniforms: Vec<UniformBinding>,
    /// Dispatch granularity, compute stages only
    pub workgroup_size: Option<[u32; 3]>,
}

/// Compiles one shader-stage source file against a shading-language
/// version.
///
/// The error value is the construction-abort signal: [`Program::build`]
/// stops at the first failing stage.
///
/// [`Program::build`]: crate::program::Program::build
pub trait StageCompiler: Send + Sync {
    fn compile(&self, desc: &StageDescriptor, glsl_version: u32) -> Result<CompiledStage, StageError>;
}

/// naga-backed stage compiler
///
/// WGSL sources parse through `front::wgsl`; GLSL sources through
/// `front::glsl`, with the descriptor's defines fed to the GLSL
/// preprocessor. Validated modules emit SPIR-V as the compiled artifact.
#[derive(Debug, Default)]
pub struct NagaStageCompiler;

impl NagaStageCompiler {
    pub fn new() -> Self {
        Self
    }

    fn read_source(path: &Path) -> Result<String, StageError> {
        fs::read_to_string(path).map_err(|e| StageError::FileRead(path.to_path_buf(), e))
    }

    fn parse_wgsl(desc: &StageDescriptor, source: &str) -> Result<naga::Module, StageError> {
        if !desc.defines.is_empty() {
            return Err(StageError::DefinesUnsupported(desc.path.clone()));
        }
        wgsl::parse_str(source).map_err(|e| StageError::Parse {
            kind: desc.kind,
            path: desc.path.clone(),
            message: format!("{:?}", e),
        })
    }

    fn parse_glsl(
        desc: &StageDescriptor,
        source: &str,
        stage: naga::ShaderStage,
        glsl_version: u32,
    ) -> Result<naga::Module, StageError> {
        let prepared = Self::with_version_header(source, glsl_version);
        let mut options = glsl::Options {
            stage,
            defines: Default::default(),
        };
        for define in &desc.defines {
            options
                .defines
                .insert(define.name.clone(), define.value.clone().unwrap_or_default());
        }
        let mut frontend = glsl::Frontend::default();
        frontend.parse(&options, &prepared).map_err(|e| StageError::Parse {
            kind: desc.kind,
            path: desc.path.clone(),
            message: format!("{:?}", e),
        })
    }

    /// GLSL compiles against the declared language version; inject the
    /// header when the source does not carry its own.
    fn with_version_header(source: &str, glsl_version: u32) -> String {
        if source.trim_start().starts_with("#version") {
            source.to_string()
        } else {
            format!("#version {}\n{}", glsl_version, source)
        }
    }

    /// Preprocess a raw stage: `#version` must stay on the first line, so
    /// define directives are inserted right after it.
    fn preprocess_raw(desc: &StageDescriptor, source: &str, glsl_version: u32) -> String {
        let source = Self::with_version_header(source, glsl_version);
        let header = desc.defines_header();
        if header.is_empty() {
            return source;
        }
        match source.find('\n') {
            Some(pos) => format!("{}\n{}{}", &source[..pos], header, &source[pos + 1..]),
            None => format!("{}\n{}", source, header),
        }
    }

    /// Uniform-capable globals: uniform buffers plus opaque handles
    /// (samplers and images). Loose GLSL uniforms reflect without an
    /// explicit binding.
    fn reflect_uniforms(module: &naga::Module) -> Vec<UniformBinding> {
        let mut uniforms = Vec::new();
        for (_, gv) in module.global_variables.iter() {
            let uniform_capable = matches!(
                gv.space,
                naga::AddressSpace::Uniform | naga::AddressSpace::Handle
            );
            if !uniform_capable {
                continue;
            }
            if let Some(name) = &gv.name {
                uniforms.push(UniformBinding {
                    name: name.clone(),
                    location: gv.binding.as_ref().map(|b| (b.group, b.binding)),
                });
            }
        }
        uniforms
    }
}

impl StageCompiler for NagaStageCompiler {
    fn compile(&self, desc: &StageDescriptor, glsl_version: u32) -> Result<CompiledStage, StageError> {
        let source = Self::read_source(&desc.path)?;

        let ir_stage = match desc.kind.naga_stage() {
            Some(stage) => stage,
            None => {
                // Geometry: preprocess only, no IR round trip.
                return Ok(CompiledStage {
                    kind: desc.kind,
                    artifact: StageArtifact::RawGlsl(Self::preprocess_raw(desc, &source, glsl_version)),
                    uniforms: Vec::new(),
                    workgroup_size: None,
                });
            }
        };

        let module = match desc.language() {
            SourceLanguage::Wgsl => Self::parse_wgsl(desc, &source)?,
            SourceLanguage::Glsl => Self::parse_glsl(desc, &source, ir_stage, glsl_version)?,
        };

        if !module.entry_points.iter().any(|ep| ep.stage == ir_stage) {
            return Err(StageError::MissingEntryPoint {
                kind: desc.kind,
                path: desc.path.clone(),
            });
        }

        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        let info = validator.validate(&module).map_err(|e| StageError::Validation {
            kind: desc.kind,
            path: desc.path.clone(),
            message: format!("{:?}", e),
        })?;

        let spv_options = spv::Options {
            lang_version: (1, 0),
            flags: spv::WriterFlags::empty(),
            zero_initialize_workgroup_memory: spv::ZeroInitializeWorkgroupMemoryMode::None,
            ..Default::default()
        };
        let spirv = spv::write_vec(&module, &info, &spv_options, None).map_err(|e| {
            StageError::Emit {
                kind: desc.kind,
                path: desc.path.clone(),
                message: format!("{:?}", e),
            }
        })?;

        let uniforms = Self::reflect_uniforms(&module);
        let workgroup_size = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Compute)
            .map(|ep| ep.workgroup_size);

        Ok(CompiledStage {
            kind: desc.kind,
            artifact: StageArtifact::SpirV(spirv),
            uniforms,
            workgroup_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::ShaderDefine;
    use std::path::PathBuf;

    const TEST_VERTEX_WGSL: &str = r#"
@group(0) @binding(0) var<uniform> uModel: mat4x4<f32>;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return uModel * vec4<f32>(position, 1.0);
}
"#;

    const TEST_COMPUTE_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read_write> data: array<f32>;

@compute @workgroup_size(8, 8, 1)
fn cs_main(@builtin(global_invocation_id) id: vec3<u32>) {
    data[id.x] = f32(id.x);
}
"#;

    const TEST_FRAGMENT_GLSL: &str = r#"#version 450
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(1.0, 0.0, 0.0, 1.0);
}
"#;

    const TEST_GEOMETRY_GLSL: &str = r#"layout(triangles) in;
layout(triangle_strip, max_vertices = 3) out;

void main() {
    for (int i = 0; i < 3; i++) {
        gl_Position = gl_in[i].gl_Position;
        EmitVertex();
    }
    EndPrimitive();
}
"#;

    fn write_stage(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_compile_wgsl_vertex() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "mesh.wgsl", TEST_VERTEX_WGSL);

        let compiled = NagaStageCompiler::new()
            .compile(&StageDescriptor::new(StageKind::Vertex, path), 450)
            .unwrap();

        assert_eq!(compiled.kind, StageKind::Vertex);
        assert!(compiled.artifact.as_spirv().is_some_and(|words| !words.is_empty()));
        assert!(compiled.uniforms.iter().any(|u| u.name == "uModel"));
        assert_eq!(compiled.workgroup_size, None);
    }

    #[test]
    fn test_compile_reflects_explicit_binding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "mesh.wgsl", TEST_VERTEX_WGSL);

        let compiled = NagaStageCompiler::new()
            .compile(&StageDescriptor::new(StageKind::Vertex, path), 450)
            .unwrap();

        let binding = compiled.uniforms.iter().find(|u| u.name == "uModel").unwrap();
        assert_eq!(binding.location, Some((0, 0)));
    }

    #[test]
    fn test_compile_glsl_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "flat.frag", TEST_FRAGMENT_GLSL);

        let compiled = NagaStageCompiler::new()
            .compile(&StageDescriptor::new(StageKind::Fragment, path), 450)
            .unwrap();

        assert!(compiled.artifact.as_spirv().is_some());
    }

    #[test]
    fn test_compile_compute_reports_workgroup_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "fill.wgsl", TEST_COMPUTE_WGSL);

        let compiled = NagaStageCompiler::new()
            .compile(&StageDescriptor::new(StageKind::Compute, path), 450)
            .unwrap();

        assert_eq!(compiled.workgroup_size, Some([8, 8, 1]));
    }

    #[test]
    fn test_compile_malformed_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "broken.wgsl", "@vertex fn vs_main( {");

        let result = NagaStageCompiler::new().compile(&StageDescriptor::new(StageKind::Vertex, path), 450);

        assert!(matches!(result, Err(StageError::Parse { .. })));
    }

    #[test]
    fn test_compile_missing_file_fails() {
        let result = NagaStageCompiler::new().compile(
            &StageDescriptor::new(StageKind::Vertex, "/nonexistent/mesh.wgsl"),
            450,
        );

        assert!(matches!(result, Err(StageError::FileRead(..))));
    }

    #[test]
    fn test_compile_wrong_entry_point_kind_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "mesh.wgsl", TEST_VERTEX_WGSL);

        let result = NagaStageCompiler::new().compile(&StageDescriptor::new(StageKind::Fragment, path), 450);

        assert!(matches!(result, Err(StageError::MissingEntryPoint { .. })));
    }

    #[test]
    fn test_wgsl_rejects_defines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "mesh.wgsl", TEST_VERTEX_WGSL);

        let desc = StageDescriptor::new(StageKind::Vertex, path)
            .with_defines(vec![ShaderDefine::new("SHADOWS")]);
        let result = NagaStageCompiler::new().compile(&desc, 450);

        assert!(matches!(result, Err(StageError::DefinesUnsupported(_))));
    }

    #[test]
    fn test_geometry_passthrough_preprocesses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_stage(&dir, "layers.geom", TEST_GEOMETRY_GLSL);

        let desc = StageDescriptor::new(StageKind::Geometry, path)
            .with_defines(vec![ShaderDefine::with_value("LAYER_COUNT", "2")]);
        let compiled = NagaStageCompiler::new().compile(&desc, 450).unwrap();

        let source = compiled.artifact.as_raw_glsl().unwrap();
        let mut lines = source.lines();
        assert_eq!(lines.next(), Some("#version 450"));
        assert_eq!(lines.next(), Some("#define LAYER_COUNT 2"));
        assert!(source.contains("EmitVertex"));
        assert!(compiled.uniforms.is_empty());
    }

    #[test]
    fn test_geometry_keeps_existing_version_header() {
        let dir = tempfile::tempdir().unwrap();
        let source = format!("#version 330\n{}", TEST_GEOMETRY_GLSL);
        let path = write_stage(&dir, "layers.geom", &source);

        let compiled = NagaStageCompiler::new()
            .compile(&StageDescriptor::new(StageKind::Geometry, path), 450)
            .unwrap();

        let out = compiled.artifact.as_raw_glsl().unwrap();
        assert!(out.starts_with("#version 330"));
        assert!(!out.contains("#version 450"));
    }
}
