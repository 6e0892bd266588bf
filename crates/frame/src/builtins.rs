//! Built-in shader data: the transform chain and view/time slots every frame
//! sets or reads.
//!
//! Base slots are set directly by the frame loop (camera transforms, view
//! size, time); derived slots recompute through registered update functions.
//! Matrices cross the byte store as column arrays (`[[f32; 4]; 4]`).

use framespace_common::DataKind;
use framespace_shader_data::config::{config_float, config_vec2};
use framespace_shader_data::{ShaderDataStore, SlotRef};
use glam::{Mat3, Mat4, Vec2};

/// Refs to every built-in slot, resolved once at registration.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRefs {
    pub model_to_world: SlotRef,
    pub world_to_camera: SlotRef,
    pub camera_to_clip: SlotRef,
    /// Derived: world_to_camera · model_to_world.
    pub model_to_camera: SlotRef,
    /// Derived: camera_to_clip · world_to_camera.
    pub world_to_clip: SlotRef,
    /// Derived: camera_to_clip · world_to_camera · model_to_world.
    pub model_to_clip: SlotRef,
    pub view_size: SlotRef,
    pub view_centre: SlotRef,
    pub view_offset: SlotRef,
    pub device_orient: SlotRef,
    /// Derived: view size in device-oriented axes.
    pub oriented_view_size: SlotRef,
    pub time: SlotRef,
    pub pulse: SlotRef,
    pub pointer: SlotRef,
}

pub(crate) type Mat4Array = [[f32; 4]; 4];
pub(crate) type Mat3Array = [[f32; 3]; 3];

pub(crate) fn write_mat4(out: &mut [u8], m: Mat4) {
    out.copy_from_slice(bytemuck::bytes_of(&m.to_cols_array_2d()));
}

pub(crate) fn read_mat4(store: &ShaderDataStore, slot: SlotRef) -> Mat4 {
    Mat4::from_cols_array_2d(&store.value::<Mat4Array>(slot))
}

/// Register the built-in slots, prime their values, and wire the derived
/// transform chain. Call once per store, before the first frame.
pub fn register_builtins(store: &mut ShaderDataStore) -> BuiltinRefs {
    let refs = BuiltinRefs {
        model_to_world: store.add_slot("modelToWorld"),
        world_to_camera: store.add_slot("worldToCamera"),
        camera_to_clip: store.add_slot("cameraToClip"),
        model_to_camera: store.add_slot("modelToCamera"),
        world_to_clip: store.add_slot("worldToClip"),
        model_to_clip: store.add_slot("modelToClip"),
        view_size: store.add_slot("viewSize"),
        view_centre: store.add_slot("viewCentre"),
        view_offset: store.add_slot("viewOffset"),
        device_orient: store.add_slot("deviceOrient"),
        oriented_view_size: store.add_slot("orientedViewSize"),
        time: store.add_slot("time"),
        pulse: store.add_slot("pulse"),
        pointer: store.add_slot("pointer"),
    };

    let identity = Mat4::IDENTITY.to_cols_array_2d();
    for slot in [
        refs.model_to_world,
        refs.world_to_camera,
        refs.camera_to_clip,
        refs.model_to_camera,
        refs.world_to_clip,
        refs.model_to_clip,
    ] {
        store.set_kind(slot, DataKind::Mat4);
        store.set_value(slot, identity);
    }

    for slot in [refs.view_size, refs.view_centre, refs.view_offset, refs.pointer] {
        store.set_kind(slot, DataKind::Vec2);
        store.set_value(slot, [0.0f32; 2]);
    }
    store.set_kind(refs.device_orient, DataKind::Mat3);
    store.set_value(refs.device_orient, Mat3::IDENTITY.to_cols_array_2d());
    store.set_kind(refs.oriented_view_size, DataKind::Vec2);
    store.set_value(refs.oriented_view_size, [0.0f32; 2]);

    for slot in [refs.time, refs.pulse] {
        store.set_kind(slot, DataKind::Float);
        store.set_value(slot, 0.0f32);
    }

    let (model_to_world, world_to_camera, camera_to_clip) = (
        refs.model_to_world,
        refs.world_to_camera,
        refs.camera_to_clip,
    );
    store.register_update(
        refs.model_to_camera,
        &[model_to_world, world_to_camera],
        move |s, out| {
            let m = read_mat4(s, world_to_camera) * read_mat4(s, model_to_world);
            write_mat4(out, m);
        },
    );
    store.register_update(
        refs.world_to_clip,
        &[world_to_camera, camera_to_clip],
        move |s, out| {
            let m = read_mat4(s, camera_to_clip) * read_mat4(s, world_to_camera);
            write_mat4(out, m);
        },
    );
    store.register_update(
        refs.model_to_clip,
        &[model_to_world, world_to_camera, camera_to_clip],
        move |s, out| {
            let m = read_mat4(s, camera_to_clip)
                * read_mat4(s, world_to_camera)
                * read_mat4(s, model_to_world);
            write_mat4(out, m);
        },
    );

    let (view_size, device_orient) = (refs.view_size, refs.device_orient);
    store.register_update(
        refs.oriented_view_size,
        &[view_size, device_orient],
        move |s, out| {
            let size = Vec2::from(s.value::<[f32; 2]>(view_size));
            let orient = Mat3::from_cols_array_2d(&s.value::<Mat3Array>(device_orient));
            let oriented = Vec2::new(
                size.dot(Vec2::new(orient.x_axis.x.abs(), orient.y_axis.x.abs())),
                size.dot(Vec2::new(orient.x_axis.y.abs(), orient.y_axis.y.abs())),
            );
            out.copy_from_slice(bytemuck::bytes_of(&oriented.to_array()));
        },
    );

    for slot in [refs.view_size, refs.view_centre, refs.view_offset, refs.pointer] {
        store.register_config(slot, config_vec2);
    }
    store.register_config(refs.time, config_float);
    store.register_config(refs.pulse, config_float);

    refs
}
