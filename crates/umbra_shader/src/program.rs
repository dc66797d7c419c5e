//! Linked GPU programs
//!
//! A [`Program`] owns a driver-style handle, the link result for its stage
//! pipeline, and a uniform name-to-slot cache. Construction is fail-soft:
//! compile and link failures are logged through the diagnostics sink and
//! recorded on the program, which stays safe to hold, bind, and query.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::compile::{CompiledStage, StageCompiler, StageError};
use crate::diag::DiagnosticsSink;
use crate::stage::{StageDescriptor, StageKind};
use crate::uniforms;

const LINK_ERROR_TAG: &str = "[ ERROR ] Program Linking";
const LINK_INFO_TAG: &str = "[ INFO ] Program Linking";
const MISSING_UNIFORM_TAG: &str = "Missing Uniform";

/// Drivers pad the info log with a short status line even on success;
/// anything longer is a real diagnostic.
const TRIVIAL_LINK_LOG_LEN: usize = 11;

/// Opaque GPU program identity.
///
/// Minted before compilation, like the driver-issued name it models, so a
/// failed build still owns a distinct identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(u64);

impl ProgramHandle {
    pub fn raw(&self) -> u64 {
        self.0
    }

    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Resolved binding slot for a uniform name.
///
/// [`NOT_FOUND`](Self::NOT_FOUND) is distinguishable from every valid
/// slot; setting a uniform through it is a no-op at the device boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformSlot(i32);

impl UniformSlot {
    /// Sentinel for names the program does not declare
    pub const NOT_FOUND: Self = Self(-1);

    pub fn index(&self) -> i32 {
        self.0
    }

    pub fn is_found(&self) -> bool {
        self.0 >= 0
    }
}

/// Outcome of program construction
#[derive(Debug)]
pub enum BuildOutcome {
    /// All stages compiled and the link log was trivial
    Linked,
    /// A stage failed to compile; linking was not attempted
    CompileFailed(StageError),
    /// Cross-stage checks produced a meaningful link log
    LinkFailed { log: String },
}

impl BuildOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked)
    }
}

enum BuildFailure {
    Compile(StageError),
    Link { log: String },
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile(e) => write!(f, "{}", e),
            Self::Link { log } => f.write_str(log.trim_end()),
        }
    }
}

struct LinkedData {
    table: HashMap<String, UniformSlot>,
    workgroup_size: Option<[u32; 3]>,
}

/// A linked, executable pipeline of shader stages
pub struct Program {
    handle: ProgramHandle,
    glsl_version: u32,
    uniforms: HashMap<String, UniformSlot>,
    link_table: HashMap<String, UniformSlot>,
    workgroup_size: Option<[u32; 3]>,
    outcome: BuildOutcome,
    sink: Arc<dyn DiagnosticsSink>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("handle", &self.handle)
            .field("outcome", &self.outcome)
            .field("registered", &self.uniforms.len())
            .finish_non_exhaustive()
    }
}

impl Program {
    /// Compile and link a stage pipeline.
    ///
    /// Failures are caught here, logged through the sink, and recorded as
    /// the program's [`BuildOutcome`]. The returned program is then
    /// non-functional but safe: registrations cache `NOT_FOUND` and
    /// lookups stay well defined.
    pub fn build(
        compiler: &dyn StageCompiler,
        glsl_version: u32,
        pipeline: &[StageDescriptor],
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let mut program = Self {
            handle: ProgramHandle::next(),
            glsl_version,
            uniforms: HashMap::new(),
            link_table: HashMap::new(),
            workgroup_size: None,
            outcome: BuildOutcome::Linked,
            sink,
        };

        match Self::compile_and_link(compiler, glsl_version, pipeline) {
            Ok(linked) => {
                program.link_table = linked.table;
                program.workgroup_size = linked.workgroup_size;
                program.sink.log_info(2, LINK_INFO_TAG, "SUCCESS");
            }
            Err(failure) => {
                program
                    .sink
                    .log_error(LINK_ERROR_TAG, &format!("FAILED\n{}", failure));
                program.outcome = match failure {
                    BuildFailure::Compile(e) => BuildOutcome::CompileFailed(e),
                    BuildFailure::Link { log } => BuildOutcome::LinkFailed { log },
                };
            }
        }

        program
    }

    fn compile_and_link(
        compiler: &dyn StageCompiler,
        glsl_version: u32,
        pipeline: &[StageDescriptor],
    ) -> Result<LinkedData, BuildFailure> {
        let mut stages = Vec::with_capacity(pipeline.len());
        for desc in pipeline {
            let stage = compiler
                .compile(desc, glsl_version)
                .map_err(BuildFailure::Compile)?;
            stages.push(stage);
        }

        let log = Self::link_log(&stages);
        if log.trim().len() > TRIVIAL_LINK_LOG_LEN {
            return Err(BuildFailure::Link { log });
        }

        // Slots are assigned in stage order, first declaration wins.
        let mut table = HashMap::new();
        let mut next_slot = 0i32;
        for stage in &stages {
            for uniform in &stage.uniforms {
                if !table.contains_key(&uniform.name) {
                    table.insert(uniform.name.clone(), UniformSlot(next_slot));
                    next_slot += 1;
                }
            }
        }

        let workgroup_size = stages.iter().find_map(|s| s.workgroup_size);

        Ok(LinkedData {
            table,
            workgroup_size,
        })
    }

    /// Cross-stage checks standing in for the driver's link step. An empty
    /// log is a successful link.
    fn link_log(stages: &[CompiledStage]) -> String {
        let mut log = String::new();

        if stages.is_empty() {
            let _ = writeln!(log, "cannot link an empty pipeline");
        }

        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].iter().any(|s| s.kind == stage.kind) {
                let _ = writeln!(log, "duplicate {} stage in pipeline", stage.kind);
            }
        }

        let has_compute = stages.iter().any(|s| s.kind == StageKind::Compute);
        if has_compute && stages.len() > 1 {
            let _ = writeln!(log, "compute stage cannot be combined with raster stages");
        }

        let mut bound: HashMap<(u32, u32), &str> = HashMap::new();
        for stage in stages {
            for uniform in &stage.uniforms {
                if let Some(location) = uniform.location {
                    match bound.get(&location) {
                        Some(existing) if *existing != uniform.name.as_str() => {
                            let _ = writeln!(
                                log,
                                "binding {:?} bound to both '{}' and '{}'",
                                location, existing, uniform.name
                            );
                        }
                        _ => {
                            bound.insert(location, &uniform.name);
                        }
                    }
                }
            }
        }

        log
    }

    /// Driver-issued identity; valid to pass around even when the build
    /// failed
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Shading-language version this program's sources were built against
    pub fn glsl_version(&self) -> u32 {
        self.glsl_version
    }

    /// Construction outcome
    pub fn outcome(&self) -> &BuildOutcome {
        &self.outcome
    }

    /// Dispatch granularity; `None` unless the pipeline linked with a
    /// compute stage
    pub fn workgroup_size(&self) -> Option<[u32; 3]> {
        self.workgroup_size
    }

    /// Resolve `name` against the linked program and cache the slot.
    ///
    /// Re-registering a name replaces its slot. Names the program does not
    /// declare cache as `NOT_FOUND` without a diagnostic, mirroring the
    /// driver's silent -1.
    pub fn add_uniform(&mut self, name: &str) {
        let slot = self
            .link_table
            .get(name)
            .copied()
            .unwrap_or(UniformSlot::NOT_FOUND);
        self.uniforms.insert(name.to_string(), slot);
    }

    /// Cached slot for `name`.
    ///
    /// Unregistered names report one diagnostic per call and return
    /// `NOT_FOUND`.
    pub fn uniform(&self, name: &str) -> UniformSlot {
        match self.uniforms.get(name) {
            Some(slot) => *slot,
            None => {
                self.sink
                    .log_error(MISSING_UNIFORM_TAG, &format!("\"{}\"", name));
                UniformSlot::NOT_FOUND
            }
        }
    }

    /// Cached slot for the conventional indexed sampler name
    pub fn sampler_uniform(&self, index: usize) -> UniformSlot {
        self.uniform(&uniforms::sampler_name(index))
    }

    /// Register the per-mesh transform, material, and skinning uniform set
    pub fn enable_mesh_loading(&mut self) {
        for name in uniforms::MESH_LOADING {
            self.add_uniform(name);
        }
    }

    /// Register the light parameter uniform set
    pub fn enable_light_calculation(&mut self) {
        for name in uniforms::LIGHT_CALCULATION {
            self.add_uniform(name);
        }
    }

    /// Register `count` indexed sampler uniforms
    pub fn enable_samplers(&mut self, count: usize) {
        for index in 0..count {
            self.add_uniform(&uniforms::sampler_name(index));
        }
    }

    /// Number of registered uniform names
    pub fn registered_uniforms(&self) -> usize {
        self.uniforms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{StageArtifact, UniformBinding};
    use crate::diag::test_support::RecordingSink;

    /// Compiler double resolving stages from an in-memory table keyed by
    /// file name
    struct StubCompiler {
        stages: Vec<(&'static str, CompiledStage)>,
    }

    impl StageCompiler for StubCompiler {
        fn compile(&self, desc: &StageDescriptor, _glsl_version: u32) -> Result<CompiledStage, StageError> {
            let file = desc
                .path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            self.stages
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(_, stage)| stage.clone())
                .ok_or_else(|| StageError::Parse {
                    kind: desc.kind,
                    path: desc.path.clone(),
                    message: "unknown test stage".to_string(),
                })
        }
    }

    fn stage(kind: StageKind, uniform_names: &[&str]) -> CompiledStage {
        CompiledStage {
            kind,
            artifact: StageArtifact::SpirV(vec![0x0723_0203]),
            uniforms: uniform_names
                .iter()
                .map(|name| UniformBinding {
                    name: name.to_string(),
                    location: None,
                })
                .collect(),
            workgroup_size: if kind == StageKind::Compute {
                Some([8, 8, 1])
            } else {
                None
            },
        }
    }

    fn located(kind: StageKind, bindings: &[(&str, (u32, u32))]) -> CompiledStage {
        CompiledStage {
            kind,
            artifact: StageArtifact::SpirV(vec![0x0723_0203]),
            uniforms: bindings
                .iter()
                .map(|(name, location)| UniformBinding {
                    name: name.to_string(),
                    location: Some(*location),
                })
                .collect(),
            workgroup_size: None,
        }
    }

    fn mesh_pipeline() -> (StubCompiler, Vec<StageDescriptor>) {
        let compiler = StubCompiler {
            stages: vec![
                ("mesh.vert", stage(StageKind::Vertex, &["uModel", "uModel_Normal"])),
                ("mesh.frag", stage(StageKind::Fragment, &["uDiffuseColor", "sampler0"])),
            ],
        };
        let pipeline = vec![
            StageDescriptor::new(StageKind::Vertex, "mesh.vert"),
            StageDescriptor::new(StageKind::Fragment, "mesh.frag"),
        ];
        (compiler, pipeline)
    }

    fn build_mesh_program(sink: Arc<RecordingSink>) -> Program {
        let (compiler, pipeline) = mesh_pipeline();
        Program::build(&compiler, 450, &pipeline, sink)
    }

    #[test]
    fn test_build_links_and_logs_success() {
        let sink = Arc::new(RecordingSink::default());
        let program = build_mesh_program(sink.clone());

        assert!(program.outcome().is_linked());
        let infos = sink.infos.lock();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0], (2, LINK_INFO_TAG.to_string(), "SUCCESS".to_string()));
    }

    #[test]
    fn test_handles_are_distinct_even_for_failed_builds() {
        let sink = Arc::new(RecordingSink::default());
        let good = build_mesh_program(sink.clone());
        let bad = Program::build(
            &StubCompiler { stages: vec![] },
            450,
            &[StageDescriptor::new(StageKind::Vertex, "missing.vert")],
            sink,
        );

        assert!(!bad.outcome().is_linked());
        assert_ne!(good.handle(), bad.handle());
    }

    #[test]
    fn test_registered_uniform_resolves_to_its_slot() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink.clone());

        program.add_uniform("uModel");
        let slot = program.uniform("uModel");

        assert!(slot.is_found());
        assert_eq!(program.uniform("uModel"), slot);
        assert!(sink.errors.lock().is_empty());
    }

    #[test]
    fn test_slots_follow_stage_declaration_order() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink);

        program.add_uniform("uModel");
        program.add_uniform("uDiffuseColor");

        assert_eq!(program.uniform("uModel").index(), 0);
        assert_eq!(program.uniform("uDiffuseColor").index(), 2);
    }

    #[test]
    fn test_unregistered_lookup_logs_every_call() {
        let sink = Arc::new(RecordingSink::default());
        let program = build_mesh_program(sink.clone());

        assert_eq!(program.uniform("uMissing"), UniformSlot::NOT_FOUND);
        assert_eq!(program.uniform("uMissing"), UniformSlot::NOT_FOUND);

        let errors = sink.errors.lock();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, MISSING_UNIFORM_TAG);
        assert!(errors[0].1.contains("uMissing"));
    }

    #[test]
    fn test_registering_undeclared_name_is_silent() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink.clone());

        program.add_uniform("uGhost");

        assert_eq!(program.uniform("uGhost"), UniformSlot::NOT_FOUND);
        assert!(sink.errors.lock().is_empty());
    }

    #[test]
    fn test_reregistration_replaces_the_slot() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink);

        program.add_uniform("uModel");
        program.add_uniform("uModel");

        assert_eq!(program.registered_uniforms(), 1);
        assert!(program.uniform("uModel").is_found());
    }

    #[test]
    fn test_compile_failure_is_logged_and_survivable() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = Program::build(
            &StubCompiler { stages: vec![] },
            450,
            &[StageDescriptor::new(StageKind::Vertex, "missing.vert")],
            sink.clone(),
        );

        assert!(matches!(program.outcome(), BuildOutcome::CompileFailed(_)));
        let errors = sink.errors.lock();
        assert_eq!(errors[0].0, LINK_ERROR_TAG);
        assert!(errors[0].1.starts_with("FAILED\n"));
        drop(errors);

        // Nonfunctional but inert: registration caches NOT_FOUND.
        program.add_uniform("uModel");
        assert_eq!(program.uniform("uModel"), UniformSlot::NOT_FOUND);
    }

    #[test]
    fn test_duplicate_stage_kind_fails_link() {
        let compiler = StubCompiler {
            stages: vec![
                ("a.vert", stage(StageKind::Vertex, &[])),
                ("b.vert", stage(StageKind::Vertex, &[])),
            ],
        };
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(
            &compiler,
            450,
            &[
                StageDescriptor::new(StageKind::Vertex, "a.vert"),
                StageDescriptor::new(StageKind::Vertex, "b.vert"),
            ],
            sink,
        );

        match program.outcome() {
            BuildOutcome::LinkFailed { log } => assert!(log.contains("duplicate vertex stage")),
            other => panic!("expected link failure, got {:?}", other),
        }
    }

    #[test]
    fn test_compute_mixed_with_raster_fails_link() {
        let compiler = StubCompiler {
            stages: vec![
                ("a.vert", stage(StageKind::Vertex, &[])),
                ("a.comp", stage(StageKind::Compute, &[])),
            ],
        };
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(
            &compiler,
            450,
            &[
                StageDescriptor::new(StageKind::Vertex, "a.vert"),
                StageDescriptor::new(StageKind::Compute, "a.comp"),
            ],
            sink,
        );

        assert!(matches!(program.outcome(), BuildOutcome::LinkFailed { .. }));
        assert_eq!(program.workgroup_size(), None);
    }

    #[test]
    fn test_conflicting_bindings_fail_link() {
        let compiler = StubCompiler {
            stages: vec![
                ("a.vert", located(StageKind::Vertex, &[("uModel", (0, 0))])),
                ("a.frag", located(StageKind::Fragment, &[("uColor", (0, 0))])),
            ],
        };
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(
            &compiler,
            450,
            &[
                StageDescriptor::new(StageKind::Vertex, "a.vert"),
                StageDescriptor::new(StageKind::Fragment, "a.frag"),
            ],
            sink,
        );

        match program.outcome() {
            BuildOutcome::LinkFailed { log } => assert!(log.contains("bound to both")),
            other => panic!("expected link failure, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_binding_with_same_name_links() {
        let compiler = StubCompiler {
            stages: vec![
                ("a.vert", located(StageKind::Vertex, &[("uModel", (0, 0))])),
                ("a.frag", located(StageKind::Fragment, &[("uModel", (0, 0))])),
            ],
        };
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(
            &compiler,
            450,
            &[
                StageDescriptor::new(StageKind::Vertex, "a.vert"),
                StageDescriptor::new(StageKind::Fragment, "a.frag"),
            ],
            sink,
        );

        assert!(program.outcome().is_linked());
    }

    #[test]
    fn test_empty_pipeline_fails_link() {
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(&StubCompiler { stages: vec![] }, 450, &[], sink);

        assert!(matches!(program.outcome(), BuildOutcome::LinkFailed { .. }));
    }

    #[test]
    fn test_workgroup_size_reported_for_compute_pipelines() {
        let compiler = StubCompiler {
            stages: vec![("fill.comp", stage(StageKind::Compute, &[]))],
        };
        let sink = Arc::new(RecordingSink::default());
        let program = Program::build(
            &compiler,
            450,
            &[StageDescriptor::new(StageKind::Compute, "fill.comp")],
            sink,
        );

        assert!(program.outcome().is_linked());
        assert_eq!(program.workgroup_size(), Some([8, 8, 1]));
    }

    #[test]
    fn test_enable_mesh_loading_registers_the_full_set() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink);

        program.enable_mesh_loading();

        assert_eq!(program.registered_uniforms(), uniforms::MESH_LOADING.len());
        assert!(program.uniform("uModel").is_found());
        // Declared by no stage in this pipeline but still registered.
        assert_eq!(program.uniform("uBoneMatrices"), UniformSlot::NOT_FOUND);
    }

    #[test]
    fn test_enable_samplers_registers_indexed_names() {
        let sink = Arc::new(RecordingSink::default());
        let mut program = build_mesh_program(sink.clone());

        program.enable_samplers(2);

        assert!(program.sampler_uniform(0).is_found());
        assert_eq!(program.sampler_uniform(1), UniformSlot::NOT_FOUND);
        assert!(sink.errors.lock().is_empty());
    }
}
