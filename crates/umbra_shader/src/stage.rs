//! Shader stage descriptors
//!
//! A pipeline is an ordered list of stage descriptors; each names the stage
//! kind, the source file, and an optional preprocessor define set. The
//! source language is chosen by file extension.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Shader stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Geometry,
    Fragment,
    Compute,
}

impl StageKind {
    /// naga IR stage, for the kinds naga models
    pub fn naga_stage(&self) -> Option<naga::ShaderStage> {
        match self {
            Self::Vertex => Some(naga::ShaderStage::Vertex),
            Self::Fragment => Some(naga::ShaderStage::Fragment),
            Self::Compute => Some(naga::ShaderStage::Compute),
            Self::Geometry => None,
        }
    }

    /// Lowercase name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source language of a stage file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Wgsl,
    Glsl,
}

impl SourceLanguage {
    /// Detect from the source path; GLSL is the engine default
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some("wgsl") => Self::Wgsl,
            _ => Self::Glsl,
        }
    }
}

/// Shader preprocessor define
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDefine {
    /// Define name
    pub name: String,
    /// Optional value (None = just defined, Some = value)
    pub value: Option<String>,
}

impl ShaderDefine {
    /// Create a simple define (no value)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create a define with a value
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Convert to a preprocessor directive
    pub fn to_directive(&self) -> String {
        if let Some(value) = &self.value {
            format!("#define {} {}", self.name, value)
        } else {
            format!("#define {}", self.name)
        }
    }
}

/// One stage of a shader pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDescriptor {
    /// Stage kind
    pub kind: StageKind,
    /// Source file path, resolved by the loader against its base directory
    pub path: PathBuf,
    /// Preprocessor defines applied before compilation
    pub defines: Vec<ShaderDefine>,
}

impl StageDescriptor {
    /// Descriptor with no defines
    pub fn new(kind: StageKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            defines: Vec::new(),
        }
    }

    /// Attach a define set
    pub fn with_defines(mut self, defines: Vec<ShaderDefine>) -> Self {
        self.defines = defines;
        self
    }

    /// Source language from the path extension
    pub fn language(&self) -> SourceLanguage {
        SourceLanguage::from_path(&self.path)
    }

    /// Preprocessor header for the define set, one directive per line
    pub fn defines_header(&self) -> String {
        let mut header = String::new();
        for define in &self.defines {
            header.push_str(&define.to_directive());
            header.push('\n');
        }
        header
    }

    /// Re-root a relative source path onto a base directory
    pub(crate) fn resolved(&self, base: &Path) -> Self {
        if self.path.is_absolute() {
            self.clone()
        } else {
            let mut resolved = self.clone();
            resolved.path = base.join(&self.path);
            resolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_without_value() {
        let define = ShaderDefine::new("SHADOWS");
        assert_eq!(define.to_directive(), "#define SHADOWS");
    }

    #[test]
    fn test_directive_with_value() {
        let define = ShaderDefine::with_value("LAYER_COUNT", "2");
        assert_eq!(define.to_directive(), "#define LAYER_COUNT 2");
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("mesh.wgsl")),
            SourceLanguage::Wgsl
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("shadow_spot.frag")),
            SourceLanguage::Glsl
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("shadow_spot.geom")),
            SourceLanguage::Glsl
        );
    }

    #[test]
    fn test_defines_header() {
        let desc = StageDescriptor::new(StageKind::Fragment, "shadow_spot.frag").with_defines(vec![
            ShaderDefine::new("SHADOWS"),
            ShaderDefine::with_value("LAYER_COUNT", "2"),
        ]);
        assert_eq!(desc.defines_header(), "#define SHADOWS\n#define LAYER_COUNT 2\n");
    }

    #[test]
    fn test_resolved_joins_relative_paths() {
        let desc = StageDescriptor::new(StageKind::Vertex, "base_mesh.vert");
        let resolved = desc.resolved(Path::new("shaders"));
        assert_eq!(resolved.path, Path::new("shaders/base_mesh.vert"));
    }

    #[test]
    fn test_resolved_keeps_absolute_paths() {
        let desc = StageDescriptor::new(StageKind::Vertex, "/tmp/base_mesh.vert");
        let resolved = desc.resolved(Path::new("shaders"));
        assert_eq!(resolved.path, Path::new("/tmp/base_mesh.vert"));
    }
}
