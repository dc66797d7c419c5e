//! Render device abstraction
//!
//! The [`RenderDevice`] trait is the seam between effects and the graphics
//! backend: resource creation, raster state, clears, program binding, and
//! draw submission. Effects drive it; backends implement it.
//!
//! [`RecordingDevice`] is the headless implementation. It mints sequential
//! resource ids and keeps the full call stream as [`DeviceOp`]s, which is
//! what the effect tests assert against.

use serde::{Deserialize, Serialize};

use umbra_shader::{Program, ProgramHandle, UniformSlot};

use crate::resource::{AttachmentPoint, TextureDesc};

/// Opaque texture identity minted by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Opaque framebuffer identity minted by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u64);

/// Face culled during rasterization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullFace {
    Front,
    Back,
}

/// Primitive topology for draw submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    Triangles,
    TriangleStrip,
}

/// Backend seam the effects render through
pub trait RenderDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId;

    fn create_framebuffer(
        &mut self,
        label: &str,
        attachments: &[(AttachmentPoint, TextureId)],
    ) -> FramebufferId;

    fn delete_texture(&mut self, id: TextureId);

    fn delete_framebuffer(&mut self, id: FramebufferId);

    fn delete_program(&mut self, handle: ProgramHandle);

    /// Bind a framebuffer for drawing, restricted to the given color
    /// targets
    fn bind_framebuffer_draw(&mut self, framebuffer: FramebufferId, targets: &[AttachmentPoint]);

    /// `None` disables face culling
    fn set_cull_face(&mut self, face: Option<CullFace>);

    fn set_depth_state(&mut self, write: bool, test: bool);

    fn clear(&mut self, color: [f32; 4], clear_depth: bool);

    fn set_viewport(&mut self, width: u32, height: u32);

    fn bind_program(&mut self, handle: ProgramHandle);

    fn set_uniform_i32(&mut self, slot: UniformSlot, value: i32);

    fn set_uniform_f32(&mut self, slot: UniformSlot, value: f32);

    fn set_uniform_vec3(&mut self, slot: UniformSlot, value: [f32; 3]);

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32);
}

/// Device-facing operations on [`Program`]
pub trait ProgramExt {
    /// Activate the program on the device
    fn bind(&self, device: &mut dyn RenderDevice);

    /// Set an integer uniform through the cache; unresolved slots are
    /// skipped at the device boundary
    fn set_i32(&self, device: &mut dyn RenderDevice, name: &str, value: i32);

    /// Set a float uniform through the cache; unresolved slots are skipped
    /// at the device boundary
    fn set_f32(&self, device: &mut dyn RenderDevice, name: &str, value: f32);

    /// Set a three-component vector uniform through the cache; unresolved
    /// slots are skipped at the device boundary
    fn set_vec3(&self, device: &mut dyn RenderDevice, name: &str, value: [f32; 3]);
}

impl ProgramExt for Program {
    fn bind(&self, device: &mut dyn RenderDevice) {
        device.bind_program(self.handle());
    }

    fn set_i32(&self, device: &mut dyn RenderDevice, name: &str, value: i32) {
        let slot = self.uniform(name);
        if slot.is_found() {
            device.set_uniform_i32(slot, value);
        }
    }

    fn set_f32(&self, device: &mut dyn RenderDevice, name: &str, value: f32) {
        let slot = self.uniform(name);
        if slot.is_found() {
            device.set_uniform_f32(slot, value);
        }
    }

    fn set_vec3(&self, device: &mut dyn RenderDevice, name: &str, value: [f32; 3]) {
        let slot = self.uniform(name);
        if slot.is_found() {
            device.set_uniform_vec3(slot, value);
        }
    }
}

/// One recorded device call
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceOp {
    CreateTexture {
        id: TextureId,
        desc: TextureDesc,
    },
    CreateFramebuffer {
        id: FramebufferId,
        label: String,
        attachments: Vec<(AttachmentPoint, TextureId)>,
    },
    DeleteTexture {
        id: TextureId,
    },
    DeleteFramebuffer {
        id: FramebufferId,
    },
    DeleteProgram {
        handle: ProgramHandle,
    },
    BindFramebufferDraw {
        framebuffer: FramebufferId,
        targets: Vec<AttachmentPoint>,
    },
    SetCullFace {
        face: Option<CullFace>,
    },
    SetDepthState {
        write: bool,
        test: bool,
    },
    Clear {
        color: [f32; 4],
        depth: bool,
    },
    SetViewport {
        width: u32,
        height: u32,
    },
    BindProgram {
        handle: ProgramHandle,
    },
    SetUniformI32 {
        slot: UniformSlot,
        value: i32,
    },
    SetUniformF32 {
        slot: UniformSlot,
        value: f32,
    },
    SetUniformVec3 {
        slot: UniformSlot,
        value: [f32; 3],
    },
    DrawArrays {
        topology: Topology,
        first: u32,
        count: u32,
    },
}

/// Headless device recording the call stream
#[derive(Debug, Default)]
pub struct RecordingDevice {
    ops: Vec<DeviceOp>,
    next_id: u64,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls in submission order
    pub fn ops(&self) -> &[DeviceOp] {
        &self.ops
    }

    /// Drop the recorded calls, keeping minted ids stable
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    fn mint(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for RecordingDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureId {
        let id = TextureId(self.mint());
        self.ops.push(DeviceOp::CreateTexture {
            id,
            desc: desc.clone(),
        });
        id
    }

    fn create_framebuffer(
        &mut self,
        label: &str,
        attachments: &[(AttachmentPoint, TextureId)],
    ) -> FramebufferId {
        let id = FramebufferId(self.mint());
        self.ops.push(DeviceOp::CreateFramebuffer {
            id,
            label: label.to_string(),
            attachments: attachments.to_vec(),
        });
        id
    }

    fn delete_texture(&mut self, id: TextureId) {
        self.ops.push(DeviceOp::DeleteTexture { id });
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.ops.push(DeviceOp::DeleteFramebuffer { id });
    }

    fn delete_program(&mut self, handle: ProgramHandle) {
        self.ops.push(DeviceOp::DeleteProgram { handle });
    }

    fn bind_framebuffer_draw(&mut self, framebuffer: FramebufferId, targets: &[AttachmentPoint]) {
        self.ops.push(DeviceOp::BindFramebufferDraw {
            framebuffer,
            targets: targets.to_vec(),
        });
    }

    fn set_cull_face(&mut self, face: Option<CullFace>) {
        self.ops.push(DeviceOp::SetCullFace { face });
    }

    fn set_depth_state(&mut self, write: bool, test: bool) {
        self.ops.push(DeviceOp::SetDepthState { write, test });
    }

    fn clear(&mut self, color: [f32; 4], clear_depth: bool) {
        self.ops.push(DeviceOp::Clear {
            color,
            depth: clear_depth,
        });
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.ops.push(DeviceOp::SetViewport { width, height });
    }

    fn bind_program(&mut self, handle: ProgramHandle) {
        self.ops.push(DeviceOp::BindProgram { handle });
    }

    fn set_uniform_i32(&mut self, slot: UniformSlot, value: i32) {
        self.ops.push(DeviceOp::SetUniformI32 { slot, value });
    }

    fn set_uniform_f32(&mut self, slot: UniformSlot, value: f32) {
        self.ops.push(DeviceOp::SetUniformF32 { slot, value });
    }

    fn set_uniform_vec3(&mut self, slot: UniformSlot, value: [f32; 3]) {
        self.ops.push(DeviceOp::SetUniformVec3 { slot, value });
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        self.ops.push(DeviceOp::DrawArrays {
            topology,
            first,
            count,
        });
    }
}
