use crate::studio::camera::{OrbitCameraState, UiInteractionState, orbit_camera_system, update_camera_viewport};
use crate::studio::catalog::load_initial_state;
use crate::studio::layout::SplitterState;
use crate::studio::sync::{TextureSyncState, arm_rebuild_on_edit, run_texture_rebuild};
use crate::studio::ui::{StatusLine, ui_system};
use crate::studio::viewer::{
    MeshRegistry, ModelLoadPhase, begin_model_load, finalize_model_instance, poll_model_load,
    setup_viewer,
};
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin, WindowResolution};
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};

pub fn run() {
    let (active_model, design_surface) = load_initial_state();
    App::new()
        .insert_resource(active_model)
        .insert_resource(design_surface)
        .insert_resource(OrbitCameraState::default())
        .insert_resource(UiInteractionState::default())
        .insert_resource(SplitterState::default())
        .insert_resource(TextureSyncState::default())
        .insert_resource(MeshRegistry::default())
        .insert_resource(ModelLoadPhase::default())
        .insert_resource(StatusLine::default())
        .insert_resource(ClearColor(Color::WHITE))
        .insert_resource(GlobalAmbientLight {
            color: Color::WHITE,
            brightness: 300.0,
            affects_lightmapped_meshes: true,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Print Studio".to_string(),
                resolution: WindowResolution::new(1400, 900),
                present_mode: PresentMode::AutoVsync,
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_systems(Startup, setup_viewer)
        .add_systems(Startup, begin_model_load)
        .add_systems(Update, poll_model_load)
        .add_systems(Update, finalize_model_instance)
        .add_systems(Update, update_camera_viewport)
        .add_systems(Update, orbit_camera_system)
        .add_systems(Update, arm_rebuild_on_edit)
        .add_systems(Update, run_texture_rebuild.after(arm_rebuild_on_edit))
        .add_systems(EguiPrimaryContextPass, ui_system)
        .run();
}
