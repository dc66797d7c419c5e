//! # Umbra Render
//!
//! Render effects for the Umbra renderer:
//!
//! - **Device abstraction**: backend seam for resources, raster state, and
//!   draw submission, plus a recording implementation for headless use
//! - **Effect lifecycle**: load / render / unload / reload as an explicit
//!   state machine around [`RenderEffect`] implementations
//! - **Shadow mapping**: layered spot shadow maps drawn by a single
//!   geometry-stage program
//! - **Lights**: world-side light descriptions and GPU-ready caster data
//!
//! ## Architecture
//!
//! ```text
//! EffectHost<E>
//!     |  load: programs -> buffers     reload: unload -> load
//!     v
//! RenderEffect (ShadowEffect, ...)
//!     |                |
//!     v                v
//! ProgramLoader   RenderDevice <- Scene mesh submission
//! ```
//!
//! Effects never talk to a graphics API directly; everything flows through
//! [`RenderDevice`], which keeps the crate backend-neutral and the effects
//! testable against the recorded call stream.

pub mod device;
pub mod effect;
pub mod light;
pub mod resource;
pub mod scene;
pub mod settings;
pub mod shadow;

pub use device::{
    CullFace, DeviceOp, FramebufferId, ProgramExt, RecordingDevice, RenderDevice, TextureId,
    Topology,
};
pub use effect::{EffectError, EffectHost, EffectState, RenderEffect};
pub use light::{GpuSpotShadow, Light, LightKind, MAX_SPOT_SHADOWS};
pub use resource::{AddressMode, AttachmentPoint, FilterMode, TextureDesc, TextureFormat};
pub use scene::{EmptyScene, Scene};
pub use settings::{RenderSettings, ShadowSettings};
pub use shadow::ShadowEffect;
