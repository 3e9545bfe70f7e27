use crate::studio::camera::OrbitCameraState;
use crate::studio::catalog::{ActiveModel, PartKind};
use crate::studio::error::LoadFailure;
use crate::studio::ui::StatusLine;
use crate::studio::{
    DEFAULT_CAMERA_POSITION, DEFAULT_MAX_DISTANCE, DEFAULT_MIN_DISTANCE, DEFAULT_ROTATION_DEG,
    FALLBACK_CAMERA_Z, INITIAL_MAX_DISTANCE, INITIAL_MIN_DISTANCE,
};
use bevy::asset::LoadState;
use bevy::camera::ClearColorConfig;
use bevy::camera::primitives::Aabb;
use bevy::camera::visibility::RenderLayers;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy_egui::PrimaryEguiContext;
use std::collections::HashMap;

#[derive(Component)]
pub struct ViewerCamera;

/// Root entity of the currently displayed product model (loaded scene or
/// fallback cylinder).
#[derive(Component)]
pub struct ModelRoot;

/// Typed mapping from printable part to the mesh entity whose material
/// receives that part's design texture. Rebuilt on every (re)load.
#[derive(Resource, Default)]
pub struct MeshRegistry {
    pub surfaces: HashMap<PartKind, Entity>,
}

#[derive(Resource, Default)]
pub enum ModelLoadPhase {
    #[default]
    Idle,
    Loading(Handle<Gltf>),
    /// Scene spawned, waiting for its entities to exist so they can be
    /// registered and centered.
    Instantiating(Entity),
    Ready(Entity),
    Fallback(Entity),
}

pub fn default_surface_material() -> StandardMaterial {
    StandardMaterial {
        base_color: Color::WHITE,
        metallic: 0.3,
        perceptual_roughness: 0.4,
        ..Default::default()
    }
}

pub fn setup_viewer(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 0.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
        ViewerCamera,
    ));
    commands.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..Default::default()
        },
        RenderLayers::layer(31),
        PrimaryEguiContext,
    ));

    // Product-shot light rig: key, fill, top and front.
    commands.spawn((
        DirectionalLight {
            illuminance: 12_000.0,
            shadows_enabled: true,
            ..Default::default()
        },
        Transform::from_xyz(10.0, 10.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 5_000.0,
            ..Default::default()
        },
        Transform::from_xyz(-10.0, 0.0, -10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 3_000.0,
            ..Default::default()
        },
        Transform::from_xyz(0.0, 10.0, 0.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..Default::default()
        },
        Transform::from_xyz(0.0, 0.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

pub fn spawn_fallback_model(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    registry: &mut MeshRegistry,
    orbit: &mut OrbitCameraState,
    part: PartKind,
) -> Entity {
    let mesh = meshes.add(Cylinder::new(9.0, 15.0));
    let material = materials.add(default_surface_material());
    let root = commands
        .spawn((
            Mesh3d(mesh),
            MeshMaterial3d(material),
            Transform::default(),
            ModelRoot,
        ))
        .id();

    registry.surfaces.clear();
    registry.surfaces.insert(part, root);
    *orbit = OrbitCameraState::from_position(
        Vec3::new(0.0, 0.0, FALLBACK_CAMERA_Z),
        INITIAL_MIN_DISTANCE,
        INITIAL_MAX_DISTANCE,
    );
    root
}

pub fn begin_model_load(
    active: Res<ActiveModel>,
    asset_server: Res<AssetServer>,
    mut phase: ResMut<ModelLoadPhase>,
    mut status: ResMut<StatusLine>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<MeshRegistry>,
    mut orbit: ResMut<OrbitCameraState>,
) {
    if active.config.glb_path.trim().is_empty() {
        let failure = LoadFailure::MissingPath;
        error!("model load failed: {failure}");
        let root = spawn_fallback_model(
            &mut commands,
            &mut meshes,
            &mut materials,
            &mut registry,
            &mut orbit,
            active.part,
        );
        status.0 = "Fallback model (no asset path configured)".to_string();
        *phase = ModelLoadPhase::Fallback(root);
        return;
    }

    let handle: Handle<Gltf> = asset_server.load(active.config.glb_path.clone());
    status.0 = format!("Loading {}", active.config.glb_path);
    *phase = ModelLoadPhase::Loading(handle);
}

pub fn poll_model_load(
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    active: Res<ActiveModel>,
    existing_roots: Query<Entity, With<ModelRoot>>,
    mut phase: ResMut<ModelLoadPhase>,
    mut status: ResMut<StatusLine>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<MeshRegistry>,
    mut orbit: ResMut<OrbitCameraState>,
) {
    let ModelLoadPhase::Loading(handle) = &*phase else {
        return;
    };

    match asset_server.load_state(handle) {
        LoadState::Loaded => {
            let Some(gltf) = gltfs.get(handle) else {
                return;
            };
            let scene = gltf
                .default_scene
                .clone()
                .or_else(|| gltf.scenes.first().cloned());
            let Some(scene) = scene else {
                let failure = LoadFailure::Asset {
                    path: active.config.glb_path.clone(),
                    reason: "asset contains no scenes".to_string(),
                };
                error!("model load failed: {failure}");
                for root in &existing_roots {
                    commands.entity(root).despawn();
                }
                let root = spawn_fallback_model(
                    &mut commands,
                    &mut meshes,
                    &mut materials,
                    &mut registry,
                    &mut orbit,
                    active.part,
                );
                status.0 = "Fallback model (asset has no scenes)".to_string();
                *phase = ModelLoadPhase::Fallback(root);
                return;
            };

            for root in &existing_roots {
                commands.entity(root).despawn();
            }
            let root = commands
                .spawn((SceneRoot(scene), Transform::default(), ModelRoot))
                .id();
            status.0 = "Instantiating model".to_string();
            *phase = ModelLoadPhase::Instantiating(root);
        }
        LoadState::Failed(err) => {
            let failure = LoadFailure::Asset {
                path: active.config.glb_path.clone(),
                reason: err.to_string(),
            };
            error!("model load failed: {failure}");
            for root in &existing_roots {
                commands.entity(root).despawn();
            }
            let root = spawn_fallback_model(
                &mut commands,
                &mut meshes,
                &mut materials,
                &mut registry,
                &mut orbit,
                active.part,
            );
            status.0 = "Fallback model (asset load failed)".to_string();
            *phase = ModelLoadPhase::Fallback(root);
        }
        _ => {}
    }
}

struct MeshNode {
    entity: Entity,
    name: Option<String>,
}

/// Once the spawned scene's mesh entities exist, registers the configured
/// part surfaces, fills in missing materials and centers the model.
pub fn finalize_model_instance(
    active: Res<ActiveModel>,
    children: Query<&Children>,
    names: Query<&Name>,
    mesh_entities: Query<(), With<Mesh3d>>,
    aabbs: Query<&Aabb>,
    local_transforms: Query<&Transform, (Without<ModelRoot>, Without<ViewerCamera>)>,
    bare_meshes: Query<(), (With<Mesh3d>, Without<MeshMaterial3d<StandardMaterial>>)>,
    mut root_transforms: Query<&mut Transform, With<ModelRoot>>,
    mut phase: ResMut<ModelLoadPhase>,
    mut status: ResMut<StatusLine>,
    mut commands: Commands,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut registry: ResMut<MeshRegistry>,
    mut orbit: ResMut<OrbitCameraState>,
) {
    let ModelLoadPhase::Instantiating(root) = *phase else {
        return;
    };

    // Depth-first walk carrying the nearest ancestor name and the transform
    // accumulated from the root, so mesh primitives inherit their node's
    // name and bounds land in root-local space.
    let mut mesh_nodes: Vec<MeshNode> = Vec::new();
    let mut bounds_min = Vec3::splat(f32::MAX);
    let mut bounds_max = Vec3::splat(f32::MIN);
    let mut stack: Vec<(Entity, Option<String>, Transform)> = Vec::new();

    if let Ok(direct) = children.get(root) {
        for &child in direct {
            stack.push((child, None, Transform::IDENTITY));
        }
    }

    while let Some((entity, inherited, parent_acc)) = stack.pop() {
        let name = names
            .get(entity)
            .ok()
            .map(|n| n.as_str().to_string())
            .or(inherited);
        let acc = match local_transforms.get(entity) {
            Ok(local) => parent_acc.mul_transform(*local),
            Err(_) => parent_acc,
        };

        if mesh_entities.contains(entity) {
            if let Ok(aabb) = aabbs.get(entity) {
                let center = Vec3::from(aabb.center);
                let half = Vec3::from(aabb.half_extents);
                for corner in aabb_corners(center, half) {
                    let p = acc.transform_point(corner);
                    bounds_min = bounds_min.min(p);
                    bounds_max = bounds_max.max(p);
                }
            }
            mesh_nodes.push(MeshNode {
                entity,
                name: name.clone(),
            });
        }

        if let Ok(grandchildren) = children.get(entity) {
            for &child in grandchildren {
                stack.push((child, name.clone(), acc));
            }
        }
    }

    // Scene instantiation and bounds computation lag the spawn by a frame
    // or two; try again next frame.
    if mesh_nodes.is_empty() || !mesh_nodes.iter().all(|n| aabbs.contains(n.entity)) {
        return;
    }

    registry.surfaces.clear();
    for part in &active.config.parts {
        let found = mesh_nodes
            .iter()
            .find(|n| n.name.as_deref() == Some(part.mesh_node.as_str()));
        match found {
            Some(node) => {
                registry.surfaces.insert(part.kind, node.entity);
            }
            None => {
                let failure = LoadFailure::NodeNotFound {
                    node: part.mesh_node.clone(),
                    part: part.kind,
                };
                error!("{failure}");
                status.0 = format!("Part {:?} has no mesh in this asset", part.kind);
            }
        }
    }

    for node in &mesh_nodes {
        if bare_meshes.contains(node.entity) {
            commands
                .entity(node.entity)
                .insert(MeshMaterial3d(materials.add(default_surface_material())));
        }
    }

    let scale = active.config.scale;
    let center = (bounds_min + bounds_max) * 0.5;
    let rotation_deg = active
        .config
        .initial_rotation_deg
        .unwrap_or(DEFAULT_ROTATION_DEG);
    if let Ok(mut transform) = root_transforms.get_mut(root) {
        *transform = Transform {
            translation: -center * scale,
            rotation: Quat::from_rotation_y(rotation_deg.to_radians()),
            scale: Vec3::splat(scale),
        };
    }

    let camera_position = active
        .config
        .camera_position
        .map(Vec3::from)
        .unwrap_or(Vec3::from_array(DEFAULT_CAMERA_POSITION));
    *orbit = OrbitCameraState::from_position(
        camera_position,
        active.config.min_distance.unwrap_or(DEFAULT_MIN_DISTANCE),
        active.config.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE),
    );

    info!(
        meshes = mesh_nodes.len(),
        registered = registry.surfaces.len(),
        "model ready"
    );
    status.0 = format!(
        "Model ready ({} meshes, {} printable)",
        mesh_nodes.len(),
        registry.surfaces.len()
    );
    *phase = ModelLoadPhase::Ready(root);
}

fn aabb_corners(center: Vec3, half: Vec3) -> [Vec3; 8] {
    [
        center + Vec3::new(-half.x, -half.y, -half.z),
        center + Vec3::new(half.x, -half.y, -half.z),
        center + Vec3::new(-half.x, half.y, -half.z),
        center + Vec3::new(half.x, half.y, -half.z),
        center + Vec3::new(-half.x, -half.y, half.z),
        center + Vec3::new(half.x, -half.y, half.z),
        center + Vec3::new(-half.x, half.y, half.z),
        center + Vec3::new(half.x, half.y, half.z),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::FALLBACK_CAMERA_Z;
    use approx::assert_relative_eq;
    use bevy::ecs::system::SystemState;

    #[test]
    fn fallback_registers_paint_surface_and_resets_camera() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world.init_resource::<MeshRegistry>();
        world.insert_resource(OrbitCameraState::default());

        let root = {
            let mut state: SystemState<(
                Commands,
                ResMut<Assets<Mesh>>,
                ResMut<Assets<StandardMaterial>>,
                ResMut<MeshRegistry>,
                ResMut<OrbitCameraState>,
            )> = SystemState::new(&mut world);
            let (mut commands, mut meshes, mut materials, mut registry, mut orbit) =
                state.get_mut(&mut world);
            let root = spawn_fallback_model(
                &mut commands,
                &mut meshes,
                &mut materials,
                &mut registry,
                &mut orbit,
                PartKind::Outer,
            );
            state.apply(&mut world);
            root
        };

        let registry = world.resource::<MeshRegistry>();
        assert_eq!(registry.surfaces.get(&PartKind::Outer), Some(&root));

        let orbit = world.resource::<OrbitCameraState>();
        assert_relative_eq!(orbit.distance, FALLBACK_CAMERA_Z);
        assert_eq!(orbit.target, Vec3::ZERO);
        assert_relative_eq!(orbit.yaw, 0.0);
        assert_relative_eq!(orbit.pitch, 0.0);

        let entity = world.entity(root);
        assert!(entity.contains::<Mesh3d>());
        assert!(entity.contains::<MeshMaterial3d<StandardMaterial>>());
        assert!(entity.contains::<ModelRoot>());
    }

    #[test]
    fn aabb_corners_span_the_box() {
        let corners = aabb_corners(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(0.5));
        let min = corners.iter().copied().reduce(Vec3::min).unwrap();
        let max = corners.iter().copied().reduce(Vec3::max).unwrap();
        assert_eq!(min, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(max, Vec3::new(1.5, 2.5, 3.5));
    }
}
