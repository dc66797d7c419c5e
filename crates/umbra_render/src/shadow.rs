//! Spot shadow mapping
//!
//! Renders shadow-casting spot lights into a layered shadow map, one
//! array slice per caster. A single geometry-stage program fans the scene
//! out across the layers, so casters cost one submission pass instead of
//! one pass each.
//!
//! The effect owns a depth array for the shadow test and a color array
//! holding filterable moments, bound together as the "Shadow - Spot"
//! framebuffer.

use umbra_shader::{Program, ProgramLoader, ShaderDefine, StageDescriptor, StageKind};

use crate::device::{FramebufferId, ProgramExt, RenderDevice, TextureId, Topology};
use crate::effect::{EffectError, RenderEffect};
use crate::light::{distance_squared, GpuSpotShadow, Light};
use crate::resource::{AttachmentPoint, TextureDesc};
use crate::scene::Scene;
use crate::settings::{RenderSettings, ShadowSettings};

const FRAMEBUFFER_LABEL: &str = "Shadow - Spot";
const SPOT_GEOMETRY_STAGE: &str = "shadow_spot.geom";
const SPOT_FRAGMENT_STAGE: &str = "shadow_spot.frag";

/// Define handed to the geometry stage; must match the array bound in the
/// shader source
const LAYER_COUNT_DEFINE: &str = "LAYER_COUNT";

struct ShadowResources {
    depth: TextureId,
    color: TextureId,
    framebuffer: FramebufferId,
    width: u32,
    height: u32,
}

/// Layered spot shadow map effect
pub struct ShadowEffect {
    render_settings: RenderSettings,
    settings: ShadowSettings,
    spot_program: Option<Program>,
    resources: Option<ShadowResources>,
    casters: Vec<GpuSpotShadow>,
}

impl ShadowEffect {
    pub fn new(render_settings: RenderSettings, mut settings: ShadowSettings) -> Self {
        settings.validate();
        Self {
            render_settings,
            settings,
            spot_program: None,
            resources: None,
            casters: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Replace the settings; takes effect on the next (re)load
    pub fn set_settings(&mut self, mut settings: ShadowSettings) {
        settings.validate();
        self.settings = settings;
    }

    pub fn spot_program(&self) -> Option<&Program> {
        self.spot_program.as_ref()
    }

    /// Shadow map dimensions derived from the base resolution
    pub fn resolution(&self) -> (u32, u32) {
        self.settings.scaled_size(&self.render_settings)
    }

    /// Select shadow-casting spot lights for the frame and assign shadow
    /// map layers. When more lights cast shadows than the map has layers,
    /// the ones nearest `view_position` win.
    pub fn select_casters(&mut self, lights: &[Light], view_position: [f32; 3]) -> usize {
        let mut candidates: Vec<&Light> = lights
            .iter()
            .filter(|light| light.is_spot() && light.casts_shadows())
            .collect();
        candidates.sort_by(|a, b| {
            let dist_a = distance_squared(a.position, view_position);
            let dist_b = distance_squared(b.position, view_position);
            dist_a.partial_cmp(&dist_b).unwrap_or(core::cmp::Ordering::Equal)
        });

        self.casters.clear();
        for light in candidates.into_iter().take(self.settings.spot_layers as usize) {
            if let Some(caster) = GpuSpotShadow::new(light, self.casters.len() as u32) {
                self.casters.push(caster);
            }
        }
        self.casters.len()
    }

    /// Casters selected for the current frame, in layer order
    pub fn casters(&self) -> &[GpuSpotShadow] {
        &self.casters
    }

    /// Raw caster bytes for uniform buffer upload
    pub fn caster_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.casters)
    }

    fn not_loaded(&self) -> EffectError {
        EffectError::NotLoaded(self.name().to_string())
    }
}

impl RenderEffect for ShadowEffect {
    fn name(&self) -> &str {
        "shadow"
    }

    fn load_programs(&mut self, loader: &ProgramLoader) {
        let layers = self.settings.spot_layers.to_string();
        let mut program = loader.create_program_geometry(&[
            StageDescriptor::new(StageKind::Geometry, SPOT_GEOMETRY_STAGE)
                .with_defines(vec![ShaderDefine::with_value(LAYER_COUNT_DEFINE, layers)]),
            StageDescriptor::new(StageKind::Fragment, SPOT_FRAGMENT_STAGE),
        ]);
        program.enable_mesh_loading();
        if !program.outcome().is_linked() {
            log::warn!("Shadow: spot program failed to build, pass output will be unusable");
        }
        self.spot_program = Some(program);
    }

    fn load_buffers(&mut self, device: &mut dyn RenderDevice) -> Result<(), EffectError> {
        if self.render_settings.base_width == 0 || self.render_settings.base_height == 0 {
            return Err(EffectError::InvalidSettings {
                effect: self.name().to_string(),
                reason: "base resolution is zero".to_string(),
            });
        }
        self.settings.validate();

        let (width, height) = self.resolution();
        let depth = device.create_texture(&TextureDesc {
            label: format!("{} (depth)", FRAMEBUFFER_LABEL),
            width,
            height,
            layers: self.settings.spot_layers,
            mip_level_count: 1,
            format: self.settings.depth_format,
            min_filter: self.settings.filter,
            mag_filter: self.settings.filter,
            address_mode: self.settings.address_mode,
        });
        let color = device.create_texture(&TextureDesc {
            label: format!("{} (moments)", FRAMEBUFFER_LABEL),
            width,
            height,
            layers: self.settings.spot_layers,
            mip_level_count: 1,
            format: self.settings.color_format,
            min_filter: self.settings.filter,
            mag_filter: self.settings.filter,
            address_mode: self.settings.address_mode,
        });
        let framebuffer = device.create_framebuffer(
            FRAMEBUFFER_LABEL,
            &[
                (AttachmentPoint::Depth, depth),
                (AttachmentPoint::Color(0), color),
            ],
        );

        self.resources = Some(ShadowResources {
            depth,
            color,
            framebuffer,
            width,
            height,
        });
        Ok(())
    }

    fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        scene: &mut dyn Scene,
    ) -> Result<(), EffectError> {
        let resources = match &self.resources {
            Some(resources) => resources,
            None => return Err(self.not_loaded()),
        };
        let program = match &self.spot_program {
            Some(program) => program,
            None => return Err(self.not_loaded()),
        };

        device.set_cull_face(Some(self.settings.cull_face));
        device.bind_framebuffer_draw(resources.framebuffer, &[AttachmentPoint::Color(0)]);
        device.set_depth_state(true, true);
        device.clear(self.settings.clear_color, true);
        device.set_viewport(resources.width, resources.height);
        program.bind(device);
        scene.render_meshes(device, Topology::Triangles, program);
        Ok(())
    }

    fn unload(&mut self, device: &mut dyn RenderDevice) {
        if let Some(resources) = self.resources.take() {
            device.delete_framebuffer(resources.framebuffer);
            device.delete_texture(resources.color);
            device.delete_texture(resources.depth);
        }
        if let Some(program) = self.spot_program.take() {
            device.delete_program(program.handle());
        }
    }
}
