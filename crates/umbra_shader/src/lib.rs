//! # Umbra Shader
//!
//! GPU program construction for the Umbra renderer:
//!
//! - **Stage descriptors** with preprocessor define sets
//! - **Compilation** through naga front ends (WGSL and GLSL), with
//!   validation and SPIR-V emission
//! - **Linking** with cross-stage checks and a driver-style info log
//! - **Uniform cache** mapping names to binding slots, with fail-soft
//!   lookups
//! - **Canonical uniform tables** shared with the shader sources
//!
//! ## Architecture
//!
//! ```text
//! StageDescriptor --> StageCompiler --> CompiledStage --> Program
//!                          |                                 |
//!                          v                                 v
//!                    naga front ends                  uniform cache
//!                                                          |
//!                                                          v
//!                                                   DiagnosticsSink
//! ```
//!
//! Programs are built by a [`ProgramLoader`], which owns the compiler, the
//! shading-language version, and the source directory, and offers the
//! pipeline shapes the render effects use.
//!
//! ## Example
//!
//! ```no_run
//! use umbra_shader::{LoaderConfig, ProgramLoader, StageDescriptor, StageKind};
//!
//! let loader = ProgramLoader::new(LoaderConfig::default());
//! let mut program = loader.create_program(&[
//!     StageDescriptor::new(StageKind::Vertex, "mesh.vert"),
//!     StageDescriptor::new(StageKind::Fragment, "mesh.frag"),
//! ]);
//! program.enable_mesh_loading();
//! let slot = program.uniform(umbra_shader::uniforms::MODEL);
//! # let _ = slot;
//! ```

pub mod compile;
pub mod diag;
pub mod program;
pub mod stage;
pub mod uniforms;

pub use compile::{
    CompiledStage, NagaStageCompiler, StageArtifact, StageCompiler, StageError, UniformBinding,
};
pub use diag::{DiagnosticsSink, LogSink, SharedSink};
pub use program::{BuildOutcome, Program, ProgramHandle, UniformSlot};
pub use stage::{ShaderDefine, SourceLanguage, StageDescriptor, StageKind};

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Program loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Base directory stage source paths resolve against
    pub source_dir: PathBuf,
    /// Shading-language version GLSL sources compile against
    pub glsl_version: u32,
    /// Shared vertex stage prepended by the geometry pipeline shape
    pub base_vertex_stage: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("shaders"),
            glsl_version: 450,
            base_vertex_stage: PathBuf::from("base_mesh.vert"),
        }
    }
}

/// Factory turning stage lists into [`Program`]s.
///
/// The loader owns the stage compiler, the diagnostics sink shared with
/// every program it builds, and the configuration. Construction is
/// fail-soft end to end: `create_program` always returns a program, with
/// failures recorded on its [`BuildOutcome`].
pub struct ProgramLoader {
    config: LoaderConfig,
    compiler: Box<dyn StageCompiler>,
    sink: SharedSink,
}

impl ProgramLoader {
    /// Loader with the naga-backed compiler and the `log`-facade sink
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_compiler(config, Box::new(NagaStageCompiler::new()), Arc::new(LogSink))
    }

    /// Loader with explicit collaborators
    pub fn with_compiler(config: LoaderConfig, compiler: Box<dyn StageCompiler>, sink: SharedSink) -> Self {
        Self {
            config,
            compiler,
            sink,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Shading-language version programs are built against
    pub fn glsl_version(&self) -> u32 {
        self.config.glsl_version
    }

    /// Build a program from an explicit stage list
    pub fn create_program(&self, pipeline: &[StageDescriptor]) -> Program {
        let resolved: Vec<StageDescriptor> = pipeline
            .iter()
            .map(|desc| desc.resolved(&self.config.source_dir))
            .collect();
        Program::build(
            self.compiler.as_ref(),
            self.config.glsl_version,
            &resolved,
            Arc::clone(&self.sink),
        )
    }

    /// Geometry pipeline shape: the shared base mesh vertex stage plus the
    /// caller's stages.
    ///
    /// The base stage carries the mesh transforms, so programs built this
    /// way resolve the mesh-loading uniform set.
    pub fn create_program_geometry(&self, pipeline: &[StageDescriptor]) -> Program {
        let mut stages = Vec::with_capacity(pipeline.len() + 1);
        stages.push(StageDescriptor::new(
            StageKind::Vertex,
            self.config.base_vertex_stage.clone(),
        ));
        stages.extend_from_slice(pipeline);
        self.create_program(&stages)
    }

    /// Compute pipeline shape: a single compute stage
    pub fn create_program_compute(&self, path: impl Into<PathBuf>) -> Program {
        self.create_program(&[StageDescriptor::new(StageKind::Compute, path)])
    }
}
