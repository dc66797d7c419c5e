//! Render effect lifecycle
//!
//! A render effect owns GPU programs and framebuffer-backed resources and
//! draws one pass of the frame. [`RenderEffect`] is the implementation
//! seam; [`EffectHost`] wraps an effect in an explicit lifecycle state
//! machine, so acquisition order, idempotent loading, and
//! release-before-reacquire are enforced in one place instead of inside
//! every effect.

use thiserror::Error;

use umbra_shader::ProgramLoader;

use crate::device::RenderDevice;
use crate::scene::Scene;

/// Failures surfaced by the effect lifecycle
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("effect '{0}' is not loaded")]
    NotLoaded(String),

    #[error("effect '{effect}': invalid settings: {reason}")]
    InvalidSettings { effect: String, reason: String },
}

/// Lifecycle state of a hosted effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Unloaded,
    Loaded,
}

/// One rendering pass with its own programs and buffers
pub trait RenderEffect {
    /// Stable name used in diagnostics and resource labels
    fn name(&self) -> &str;

    /// Build this effect's GPU programs through the loader.
    ///
    /// Program construction is fail-soft: failures are recorded on the
    /// programs and logged through the loader's sink, never propagated.
    fn load_programs(&mut self, loader: &ProgramLoader);

    /// Acquire framebuffers and textures. Runs after `load_programs`.
    fn load_buffers(&mut self, device: &mut dyn RenderDevice) -> Result<(), EffectError>;

    /// Draw the pass
    fn render(&mut self, device: &mut dyn RenderDevice, scene: &mut dyn Scene)
        -> Result<(), EffectError>;

    /// Release every GPU resource this effect acquired, programs included
    fn unload(&mut self, device: &mut dyn RenderDevice);
}

/// Lifecycle wrapper enforcing load/render/unload ordering
pub struct EffectHost<E: RenderEffect> {
    effect: E,
    state: EffectState,
}

impl<E: RenderEffect> EffectHost<E> {
    pub fn new(effect: E) -> Self {
        Self {
            effect,
            state: EffectState::Unloaded,
        }
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    /// Mutable access for settings changes; call [`reload`](Self::reload)
    /// afterwards for changes that affect GPU resources
    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    /// Programs first, then buffers. Loading an already loaded effect is a
    /// no-op. When buffer acquisition fails, the programs acquired before
    /// it are released again, so a failed load holds nothing.
    pub fn load(
        &mut self,
        loader: &ProgramLoader,
        device: &mut dyn RenderDevice,
    ) -> Result<(), EffectError> {
        if self.state == EffectState::Loaded {
            return Ok(());
        }
        self.effect.load_programs(loader);
        if let Err(e) = self.effect.load_buffers(device) {
            self.effect.unload(device);
            return Err(e);
        }
        self.state = EffectState::Loaded;
        log::debug!("effect '{}' loaded", self.effect.name());
        Ok(())
    }

    /// Release resources. Unloading an unloaded effect is a no-op.
    pub fn unload(&mut self, device: &mut dyn RenderDevice) {
        if self.state == EffectState::Unloaded {
            return;
        }
        self.effect.unload(device);
        self.state = EffectState::Unloaded;
        log::debug!("effect '{}' unloaded", self.effect.name());
    }

    /// Full release then reacquire, for display-mode and settings changes
    pub fn reload(
        &mut self,
        loader: &ProgramLoader,
        device: &mut dyn RenderDevice,
    ) -> Result<(), EffectError> {
        self.unload(device);
        self.load(loader, device)
    }

    /// Render the effect; fails if it is not loaded
    pub fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &mut dyn Scene,
    ) -> Result<(), EffectError> {
        if self.state != EffectState::Loaded {
            return Err(EffectError::NotLoaded(self.effect.name().to_string()));
        }
        self.effect.render(device, scene)
    }
}
