//! Scene submission seam
//!
//! Effects do not walk the world themselves; they hand the bound program
//! and a topology to a [`Scene`], which submits its meshes through the
//! device.

use umbra_shader::Program;

use crate::device::{RenderDevice, Topology};

/// World-side mesh submission
pub trait Scene {
    /// Draw every mesh relevant to `program` with the given topology.
    ///
    /// The program is already bound; implementations set per-mesh uniforms
    /// through it and issue draws on the device.
    fn render_meshes(&mut self, device: &mut dyn RenderDevice, topology: Topology, program: &Program);
}

/// Scene with nothing in it
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyScene;

impl Scene for EmptyScene {
    fn render_meshes(&mut self, _device: &mut dyn RenderDevice, _topology: Topology, _program: &Program) {}
}
