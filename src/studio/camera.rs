use crate::studio::layout::SplitAxis;
use crate::studio::viewer::ViewerCamera;
use crate::studio::{INITIAL_MAX_DISTANCE, INITIAL_MIN_DISTANCE, MAX_POLAR_DEG, MIN_POLAR_DEG};
use bevy::camera::Viewport;
use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, Window};

/// Orbit state for the product camera. Panning is not supported: the
/// target stays wherever the model was centered.
#[derive(Resource)]
pub struct OrbitCameraState {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCameraState {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: INITIAL_MIN_DISTANCE,
            yaw: 0.0,
            pitch: 0.0,
            min_distance: INITIAL_MIN_DISTANCE,
            max_distance: INITIAL_MAX_DISTANCE,
        }
    }
}

/// Pitch band equivalent to a polar angle of [60, 106] degrees from +Y.
pub fn pitch_limits() -> (f32, f32) {
    (
        (90.0 - MAX_POLAR_DEG).to_radians(),
        (90.0 - MIN_POLAR_DEG).to_radians(),
    )
}

impl OrbitCameraState {
    /// Derives yaw/pitch/distance from a camera position looking at the
    /// origin, clamping into the allowed orbit band and zoom bounds.
    pub fn from_position(position: Vec3, min_distance: f32, max_distance: f32) -> Self {
        let length = position.length().max(f32::EPSILON);
        let (min_pitch, max_pitch) = pitch_limits();
        Self {
            target: Vec3::ZERO,
            distance: length.clamp(min_distance, max_distance),
            yaw: position.x.atan2(position.z),
            pitch: (position.y / length).asin().clamp(min_pitch, max_pitch),
            min_distance,
            max_distance,
        }
    }
}

/// Offset from target to camera for the given orbit angles, unit distance,
/// Y-up. Yaw 0 / pitch 0 places the camera on +Z.
pub fn camera_offset(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        pitch.cos() * yaw.sin(),
        pitch.sin(),
        pitch.cos() * yaw.cos(),
    )
}

/// What the egui pass reserved this frame, consumed by the viewport and
/// orbit systems.
#[derive(Resource)]
pub struct UiInteractionState {
    pub wants_pointer_input: bool,
    pub axis: SplitAxis,
    /// Editor pane plus splitter, in logical pixels along the split axis.
    pub editor_reserved_px: f32,
}

impl Default for UiInteractionState {
    fn default() -> Self {
        Self {
            wants_pointer_input: false,
            axis: SplitAxis::Row,
            editor_reserved_px: 0.0,
        }
    }
}

/// Keeps the 3D render viewport matched to the viewer pane, both on window
/// resizes and on splitter drags. Bevy recomputes the projection aspect
/// from the viewport, so camera state never goes stale between a resize
/// and the next render tick.
pub fn update_camera_viewport(
    windows: Query<&Window, With<PrimaryWindow>>,
    ui_state: Res<UiInteractionState>,
    mut camera_query: Query<&mut Camera, With<ViewerCamera>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let physical_width = window.physical_width();
    let physical_height = window.physical_height();
    if physical_width == 0 || physical_height == 0 {
        return;
    }

    let reserved = (ui_state.editor_reserved_px.max(0.0) * window.scale_factor()) as u32;
    let viewport = match ui_state.axis {
        SplitAxis::Row => {
            let width = physical_width.saturating_sub(reserved).max(1);
            Viewport {
                physical_position: UVec2::ZERO,
                physical_size: UVec2::new(width, physical_height),
                depth: 0.0..1.0,
            }
        }
        SplitAxis::Column => {
            let height = physical_height.saturating_sub(reserved).max(1);
            Viewport {
                physical_position: UVec2::ZERO,
                physical_size: UVec2::new(physical_width, height),
                depth: 0.0..1.0,
            }
        }
    };

    for mut camera in &mut camera_query {
        camera.viewport = Some(viewport.clone());
    }
}

pub fn orbit_camera_system(
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    ui_state: Res<UiInteractionState>,
    mut orbit: ResMut<OrbitCameraState>,
    mut camera_query: Query<&mut Transform, With<ViewerCamera>>,
) {
    let pointer_in_window = windows
        .single()
        .ok()
        .and_then(|w| w.cursor_position())
        .is_some();
    let can_orbit = pointer_in_window && !ui_state.wants_pointer_input;

    if can_orbit {
        let delta = mouse_motion.delta;
        if mouse_buttons.pressed(MouseButton::Left) && delta.length_squared() > 0.0 {
            let (min_pitch, max_pitch) = pitch_limits();
            orbit.yaw -= delta.x * 0.006;
            orbit.pitch = (orbit.pitch + delta.y * 0.006).clamp(min_pitch, max_pitch);
        }

        let scroll = mouse_scroll.delta.y;
        if scroll.abs() > f32::EPSILON {
            let zoom_factor = (1.0 - scroll * 0.10).clamp(0.2, 5.0);
            orbit.distance =
                (orbit.distance * zoom_factor).clamp(orbit.min_distance, orbit.max_distance);
        }
    }

    let position = orbit.target + camera_offset(orbit.yaw, orbit.pitch) * orbit.distance;
    for mut transform in &mut camera_query {
        *transform = Transform::from_translation(position).looking_at(orbit.target, Vec3::Y);
    }
}
