use crate::builtins::{BuiltinRefs, read_mat4, register_builtins};
use framespace_device::RenderDevice;
use framespace_shader_data::ShaderDataStore;
use framespace_state::{StateBlock, StateStack};
use glam::Mat4;

/// Owns the frame-state core for one renderer instance: the scoped state
/// stack, the shader data store with its built-ins, and the frame clock.
///
/// Exactly one thread drives a context; per-frame recovery is `begin_frame`
/// starting from the baseline again.
pub struct FrameContext {
    states: StateStack,
    data: ShaderDataStore,
    refs: BuiltinRefs,
    time: f32,
    pulse: f32,
}

impl FrameContext {
    pub fn new() -> Self {
        let mut data = ShaderDataStore::new();
        let refs = register_builtins(&mut data);
        Self {
            states: StateStack::new(),
            data,
            refs,
            time: 0.0,
            pulse: 0.0,
        }
    }

    /// Start a frame: reset device state to the baseline, advance the clock,
    /// and drop the model transform back to identity.
    ///
    /// `pulse` is the fractional part of accumulated time, a 0..1 sawtooth
    /// for cheap periodic effects.
    pub fn begin_frame(&mut self, device: &mut dyn RenderDevice, dt: f32) {
        let _span = tracing::info_span!("begin_frame", dt).entered();
        self.states.reset(device);

        self.time += dt;
        self.pulse += dt;
        self.pulse -= self.pulse.floor();
        self.data.set_value(self.refs.time, self.time);
        self.data.set_value(self.refs.pulse, self.pulse);
        self.data
            .set_value(self.refs.model_to_world, Mat4::IDENTITY.to_cols_array_2d());
    }

    /// Update the view slots from the current surface size.
    pub fn set_view(&mut self, width: f32, height: f32) {
        self.data.set_value(self.refs.view_size, [width, height]);
        self.data
            .set_value(self.refs.view_centre, [width * 0.5, height * 0.5]);
    }

    /// Install the camera transforms; derived products update immediately.
    pub fn set_camera(&mut self, world_to_camera: Mat4, camera_to_clip: Mat4) {
        self.data
            .set_value(self.refs.world_to_camera, world_to_camera.to_cols_array_2d());
        self.data
            .set_value(self.refs.camera_to_clip, camera_to_clip.to_cols_array_2d());
    }

    /// Install the current model transform.
    pub fn set_model_transform(&mut self, model_to_world: Mat4) {
        self.data
            .set_value(self.refs.model_to_world, model_to_world.to_cols_array_2d());
    }

    /// The derived model-to-clip product, as draw calls consume it.
    pub fn model_to_clip(&self) -> Mat4 {
        read_mat4(&self.data, self.refs.model_to_clip)
    }

    /// Run a drawing scope: push, apply the layer's state block, run the
    /// body, pop. State is restored exactly however the body mutated it.
    pub fn scoped<R>(
        &mut self,
        device: &mut dyn RenderDevice,
        label: &str,
        block: &StateBlock,
        body: impl FnOnce(&mut Self, &mut dyn RenderDevice) -> R,
    ) -> R {
        self.states.push_scope(label);
        self.states.apply_block(device, block);
        let result = body(self, device);
        self.states.pop_scope(device, label);
        result
    }

    pub fn states(&self) -> &StateStack {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut StateStack {
        &mut self.states
    }

    pub fn data(&self) -> &ShaderDataStore {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ShaderDataStore {
        &mut self.data
    }

    pub fn builtins(&self) -> &BuiltinRefs {
        &self.refs
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn pulse(&self) -> f32 {
        self.pulse
    }
}

impl Default for FrameContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framespace_device::{
        BlendFactor, CompareFunc, CullMode, DeviceCall, RecordingDevice,
    };
    use framespace_quadstream::{QuadMesh, StreamStrategy, VertexAttr, VertexLayout};
    use framespace_state::StateChange;
    use serde_json::json;

    #[test]
    fn begin_frame_advances_clock_and_wraps_pulse() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        ctx.begin_frame(&mut device, 0.75);
        ctx.begin_frame(&mut device, 0.75);
        assert_eq!(ctx.time(), 1.5);
        assert!((ctx.pulse() - 0.5).abs() < 1e-6);
        let refs = *ctx.builtins();
        assert_eq!(ctx.data().value::<f32>(refs.time), 1.5);
    }

    #[test]
    fn begin_frame_restores_model_transform() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        ctx.set_model_transform(Mat4::from_translation(glam::Vec3::X));
        ctx.begin_frame(&mut device, 0.016);
        assert_eq!(ctx.model_to_clip(), Mat4::IDENTITY);
    }

    #[test]
    fn camera_drives_model_to_clip() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        ctx.begin_frame(&mut device, 0.016);
        let view = Mat4::from_rotation_x(0.3);
        let proj = Mat4::orthographic_rh(0.0, 320.0, 480.0, 0.0, -1.0, 1.0);
        let model = Mat4::from_scale(glam::Vec3::splat(2.0));
        ctx.set_camera(view, proj);
        ctx.set_model_transform(model);
        assert_eq!(ctx.model_to_clip(), proj * view * model);
    }

    #[test]
    fn scoped_layer_applies_block_and_restores() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        ctx.begin_frame(&mut device, 0.016);

        let block = StateBlock::from_value(&json!({
            "cullMode": "none",
            "depthWrite": false,
            "blend": ["add", "sourceAlpha", "invSourceAlpha"],
        }))
        .unwrap();

        ctx.scoped(&mut device, "particles", &block, |ctx, device| {
            assert_eq!(ctx.states().cull_mode(), Some(CullMode::None));
            assert_eq!(ctx.states().depth_write(), Some(false));
            assert_eq!(ctx.states().blend_enabled(), Some(true));
            // Bodies may mutate further; restore still covers it.
            ctx.states_mut()
                .apply(device, StateChange::DepthCompare(CompareFunc::Always));
        });

        assert_eq!(ctx.states().cull_mode(), Some(CullMode::Back));
        assert_eq!(ctx.states().depth_write(), Some(true));
        assert_eq!(ctx.states().blend_enabled(), Some(false));
        assert_eq!(ctx.states().depth_compare(), Some(CompareFunc::Less));
        assert_eq!(
            ctx.states().blend_func(),
            Some((BlendFactor::One, BlendFactor::Zero))
        );
    }

    #[test]
    fn nested_scopes_compose() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        ctx.begin_frame(&mut device, 0.016);

        let outer = StateBlock::from_value(&json!({ "cullMode": "front" })).unwrap();
        let inner = StateBlock::from_value(&json!({ "cullMode": "none" })).unwrap();

        ctx.scoped(&mut device, "outer", &outer, |ctx, device| {
            ctx.scoped(device, "inner", &inner, |ctx, _| {
                assert_eq!(ctx.states().cull_mode(), Some(CullMode::None));
            });
            assert_eq!(ctx.states().cull_mode(), Some(CullMode::Front));
        });
        assert_eq!(ctx.states().cull_mode(), Some(CullMode::Back));
    }

    /// A frame in miniature: reset, camera, a blended layer streaming quads.
    #[test]
    fn frame_walkthrough_orders_device_calls() {
        let mut device = RecordingDevice::new();
        let mut ctx = FrameContext::new();
        let layout = VertexLayout::new([
            VertexAttr::new("position", 12),
            VertexAttr::new("colour", 16),
        ]);
        let mut mesh =
            QuadMesh::new(&mut device, 64, &layout, StreamStrategy::MappedRing).unwrap();

        ctx.begin_frame(&mut device, 0.016);
        ctx.set_view(320.0, 240.0);
        ctx.set_camera(
            Mat4::IDENTITY,
            Mat4::orthographic_rh(0.0, 320.0, 240.0, 0.0, -1.0, 1.0),
        );
        device.drain_calls();

        let additive = StateBlock::from_value(&json!({
            "blend": ["add", "sourceAlpha", "one"],
            "depthWrite": false,
        }))
        .unwrap();
        ctx.scoped(&mut device, "sparks", &additive, |_, device| {
            let region = mesh.request(device, 16);
            let produced = region.quads;
            region.bytes.fill(0x11);
            mesh.commit(device, produced);
        });

        let calls = device.calls();
        let draw_at = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::DrawIndexed { .. }))
            .expect("layer body issued a draw");
        let blend_at = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::SetBlend(b) if b.enabled))
            .expect("layer block enabled blending");
        // Blend state is in place before the draw; restore comes after.
        assert!(blend_at < draw_at);
        let restore_at = calls
            .iter()
            .rposition(|c| matches!(c, DeviceCall::SetBlend(b) if !b.enabled))
            .expect("pop restored the opaque blend state");
        assert!(restore_at > draw_at);

        mesh.destroy(&mut device);
    }
}
