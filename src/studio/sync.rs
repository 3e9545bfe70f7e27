use crate::studio::raster::{raster_multiplier, rasterize};
use crate::studio::surface::DesignSurface;
use crate::studio::ui::StatusLine;
use crate::studio::viewer::MeshRegistry;
use crate::studio::{DEBOUNCE_MILLIS, RASTER_REFERENCE_WIDTH};
use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageFilterMode, ImageSampler, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;
use image::RgbaImage;
use std::time::Duration;

/// wgpu guarantees support up to 16x.
pub const MAX_ANISOTROPY: u16 = 16;

/// Re-armable quiet-period timer: every trigger resets the countdown, so a
/// burst of edits collapses into a single expiry.
pub struct Debounce {
    timer: Timer,
    armed: bool,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            timer: Timer::new(delay, TimerMode::Once),
            armed: false,
        }
    }

    pub fn trigger(&mut self) {
        self.timer.reset();
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Advances the countdown; returns true exactly once per quiet period.
    pub fn tick(&mut self, delta: Duration) -> bool {
        if !self.armed {
            return false;
        }
        if self.timer.tick(delta).is_finished() {
            self.armed = false;
            return true;
        }
        false
    }
}

#[derive(Resource)]
pub struct TextureSyncState {
    pub debounce: Debounce,
    /// Guards the rebuild body against re-entry.
    pub in_progress: bool,
    /// The texture currently assigned to the paint surface; removed from
    /// `Assets<Image>` before its replacement is installed.
    pub installed: Option<Handle<Image>>,
    pub rebuilds: u64,
}

impl Default for TextureSyncState {
    fn default() -> Self {
        Self {
            debounce: Debounce::new(Duration::from_millis(DEBOUNCE_MILLIS)),
            in_progress: false,
            installed: None,
            rebuilds: 0,
        }
    }
}

/// Converts design-surface edits into debounce triggers.
pub fn arm_rebuild_on_edit(
    mut surface: ResMut<DesignSurface>,
    mut sync: ResMut<TextureSyncState>,
) {
    if surface.changed {
        surface.changed = false;
        sync.debounce.trigger();
    }
}

/// Wraps the rasterized design in a GPU texture: sRGB (display-referred
/// input), linear filtering with maximum anisotropy.
pub fn design_texture(bitmap: RgbaImage) -> Image {
    let (width, height) = bitmap.dimensions();
    let mut image = Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        bitmap.into_raw(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD,
    );
    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        mag_filter: ImageFilterMode::Linear,
        min_filter: ImageFilterMode::Linear,
        mipmap_filter: ImageFilterMode::Linear,
        anisotropy_clamp: MAX_ANISOTROPY,
        ..ImageSamplerDescriptor::default()
    });
    image
}

/// Releases the previously installed texture before adding the new one.
/// Skipping the removal would leak one GPU texture per rebuild.
pub fn install_texture(
    images: &mut Assets<Image>,
    slot: &mut Option<Handle<Image>>,
    texture: Image,
) -> Handle<Image> {
    if let Some(old) = slot.take() {
        images.remove(&old);
    }
    let handle = images.add(texture);
    *slot = Some(handle.clone());
    handle
}

pub fn run_texture_rebuild(
    time: Res<Time>,
    mut sync: ResMut<TextureSyncState>,
    surface: Res<DesignSurface>,
    registry: Res<MeshRegistry>,
    windows: Query<&Window, With<PrimaryWindow>>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut status: ResMut<StatusLine>,
) {
    if !sync.debounce.tick(time.delta()) {
        return;
    }
    if sync.in_progress {
        // Should not happen with a synchronous body; re-arm rather than drop
        // the edit.
        sync.debounce.trigger();
        return;
    }
    sync.in_progress = true;

    let Some(&paint_entity) = registry.surfaces.get(&surface.part) else {
        warn!(part = ?surface.part, "texture sync skipped: no mesh registered for active part");
        sync.in_progress = false;
        return;
    };
    let Ok(material_handle) = material_handles.get(paint_entity) else {
        warn!(part = ?surface.part, "texture sync skipped: paint surface has no material");
        sync.in_progress = false;
        return;
    };

    let viewport_width = windows
        .single()
        .map(|w| w.width())
        .unwrap_or(RASTER_REFERENCE_WIDTH);
    let multiplier = raster_multiplier(viewport_width);
    let bitmap = rasterize(&surface, multiplier);
    let texture = design_texture(bitmap);
    let handle = install_texture(&mut images, &mut sync.installed, texture);

    if let Some(material) = materials.get_mut(&material_handle.0) {
        material.base_color_texture = Some(handle);
    }

    sync.rebuilds += 1;
    status.0 = format!("Design texture updated (x{multiplier:.2})");
    debug!(rebuilds = sync.rebuilds, multiplier, "rebuilt design texture");
    sync.in_progress = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn burst_of_edits_fires_exactly_once_after_the_quiet_period() {
        let mut debounce = Debounce::new(ms(DEBOUNCE_MILLIS));
        let mut fires = 0;

        // 10 edits, 20 ms apart: all inside the quiet window.
        for _ in 0..10 {
            debounce.trigger();
            if debounce.tick(ms(20)) {
                fires += 1;
            }
        }
        assert_eq!(fires, 0, "nothing may fire while edits keep arriving");

        // Quiet period elapses 300 ms after the last edit, not before.
        assert!(!debounce.tick(ms(299 - 20)));
        assert!(debounce.tick(ms(21)));
        fires += 1;
        assert_eq!(fires, 1);

        // And nothing afterwards until the next trigger.
        assert!(!debounce.tick(ms(1000)));
    }

    #[test]
    fn untriggered_debounce_never_fires() {
        let mut debounce = Debounce::new(ms(DEBOUNCE_MILLIS));
        assert!(!debounce.tick(ms(10_000)));
        assert!(!debounce.is_armed());
    }

    #[test]
    fn retrigger_after_fire_works() {
        let mut debounce = Debounce::new(ms(DEBOUNCE_MILLIS));
        debounce.trigger();
        assert!(debounce.tick(ms(301)));
        debounce.trigger();
        assert!(!debounce.tick(ms(100)));
        assert!(debounce.tick(ms(250)));
    }

    fn white_texture(side: u32) -> Image {
        design_texture(RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn installing_a_texture_releases_the_previous_one() {
        let mut images = Assets::<Image>::default();
        let mut slot = None;

        let first = install_texture(&mut images, &mut slot, white_texture(4));
        assert!(images.contains(&first));

        let second = install_texture(&mut images, &mut slot, white_texture(4));
        assert!(!images.contains(&first), "old texture must be disposed");
        assert!(images.contains(&second));
        assert_eq!(slot, Some(second));
    }

    #[test]
    fn no_textures_accumulate_across_many_rebuilds() {
        let mut images = Assets::<Image>::default();
        let mut slot = None;
        for _ in 0..20 {
            install_texture(&mut images, &mut slot, white_texture(2));
        }
        assert_eq!(images.iter().count(), 1);
    }

    #[test]
    fn design_texture_is_srgb_with_max_anisotropy() {
        let image = white_texture(8);
        assert_eq!(image.texture_descriptor.format, TextureFormat::Rgba8UnormSrgb);
        match &image.sampler {
            ImageSampler::Descriptor(desc) => assert_eq!(desc.anisotropy_clamp, MAX_ANISOTROPY),
            other => panic!("expected descriptor sampler, got {other:?}"),
        }
    }
}
