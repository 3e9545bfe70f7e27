use crate::studio::catalog::{PartConfig, PartKind};
use bevy::math::Vec2;
use bevy::prelude::Resource;
use uuid::Uuid;

pub const SAFE_ZONE_STROKE_COLOR: [u8; 4] = [239, 68, 68, 255];
pub const SAFE_ZONE_STROKE_WIDTH: f32 = 0.4;
pub const SAFE_ZONE_DASH: (f32, f32) = (15.0, 10.0);
pub const DEFAULT_GUIDE_COLOR: [u8; 4] = [37, 99, 235, 128];
pub const DEFAULT_FILL_COLOR: [u8; 4] = [37, 99, 235, 255];
pub const GUIDE_STROKE_WIDTH: f32 = 1.0;

/// Margin-inset rectangle guaranteed not to be cut off by manufacturing
/// trim, in canvas pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeZone {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

pub fn safe_zone(config: &PartConfig) -> SafeZone {
    let m = &config.margins;
    SafeZone {
        left: m.left,
        top: m.top,
        width: config.canvas_width - (m.left + m.right),
        height: config.canvas_height - (m.top + m.bottom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: [u8; 4],
    pub width: f32,
    /// Dash/gap lengths; `None` draws a solid stroke.
    pub dash: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
}

#[derive(Debug, Clone)]
pub struct DesignObject {
    pub id: Uuid,
    pub shape: Shape,
    pub fill: Option<[u8; 4]>,
    pub stroke: Option<Stroke>,
    pub visible: bool,
    pub selectable: bool,
    pub exclude_from_export: bool,
}

impl DesignObject {
    pub fn filled(shape: Shape, fill: [u8; 4]) -> Self {
        Self {
            id: Uuid::new_v4(),
            shape,
            fill: Some(fill),
            stroke: None,
            visible: true,
            selectable: true,
            exclude_from_export: false,
        }
    }

    /// Helper overlays (safe zone, guides): never exported, never hit-tested.
    fn overlay(shape: Shape, stroke: Stroke, visible: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            shape,
            fill: None,
            stroke: Some(stroke),
            visible,
            selectable: false,
            exclude_from_export: true,
        }
    }

    pub fn bounds(&self) -> (Vec2, Vec2) {
        match self.shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => (Vec2::new(x, y), Vec2::new(x + width, y + height)),
            Shape::Ellipse { cx, cy, rx, ry } => {
                (Vec2::new(cx - rx, cy - ry), Vec2::new(cx + rx, cy + ry))
            }
            Shape::Line { x1, y1, x2, y2 } => (
                Vec2::new(x1.min(x2), y1.min(y2)),
                Vec2::new(x1.max(x2), y1.max(y2)),
            ),
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        match self.shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => point.x >= x && point.x <= x + width && point.y >= y && point.y <= y + height,
            Shape::Ellipse { cx, cy, rx, ry } => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - cx) / rx;
                let dy = (point.y - cy) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Line { .. } => false,
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match &mut self.shape {
            Shape::Rect { x, y, .. } => {
                *x += delta.x;
                *y += delta.y;
            }
            Shape::Ellipse { cx, cy, .. } => {
                *cx += delta.x;
                *cy += delta.y;
            }
            Shape::Line { x1, y1, x2, y2 } => {
                *x1 += delta.x;
                *y1 += delta.y;
                *x2 += delta.x;
                *y2 += delta.y;
            }
        }
    }
}

fn guide_color_bytes(config: &PartConfig) -> [u8; 4] {
    match config.guide_color {
        Some(rgba) => {
            let mut out = [0u8; 4];
            for (slot, channel) in out.iter_mut().zip(rgba) {
                *slot = (channel * 255.0).round().clamp(0.0, 255.0) as u8;
            }
            out
        }
        None => DEFAULT_GUIDE_COLOR,
    }
}

/// The 2D print-design canvas for the active part: user-placed objects
/// plus the three non-exported overlays.
#[derive(Resource)]
pub struct DesignSurface {
    pub part: PartKind,
    pub config: PartConfig,
    pub objects: Vec<DesignObject>,
    pub selected: Option<Uuid>,
    pub safe_zone_visible: bool,
    pub guides_visible: bool,
    /// Set on every user edit; consumed by the texture sync debounce.
    pub changed: bool,
    pub fill_color: [u8; 4],
    safe_zone_id: Uuid,
    v_guide_id: Uuid,
    h_guide_id: Uuid,
}

impl DesignSurface {
    pub fn new(part: PartKind, config: PartConfig) -> Self {
        let zone = safe_zone(&config);
        let safe_rect = DesignObject::overlay(
            Shape::Rect {
                x: zone.left,
                y: zone.top,
                width: zone.width,
                height: zone.height,
            },
            Stroke {
                color: SAFE_ZONE_STROKE_COLOR,
                width: SAFE_ZONE_STROKE_WIDTH,
                dash: Some(SAFE_ZONE_DASH),
            },
            true,
        );

        let guide_stroke = Stroke {
            color: guide_color_bytes(&config),
            width: GUIDE_STROKE_WIDTH,
            dash: None,
        };
        let v_guide = DesignObject::overlay(
            Shape::Line {
                x1: config.canvas_width / 2.0,
                y1: 0.0,
                x2: config.canvas_width / 2.0,
                y2: config.canvas_height,
            },
            guide_stroke,
            false,
        );
        let h_guide = DesignObject::overlay(
            Shape::Line {
                x1: 0.0,
                y1: config.canvas_height / 2.0,
                x2: config.canvas_width,
                y2: config.canvas_height / 2.0,
            },
            guide_stroke,
            false,
        );

        let safe_zone_id = safe_rect.id;
        let v_guide_id = v_guide.id;
        let h_guide_id = h_guide.id;

        Self {
            part,
            config,
            objects: vec![safe_rect, v_guide, h_guide],
            selected: None,
            safe_zone_visible: true,
            guides_visible: false,
            changed: false,
            fill_color: DEFAULT_FILL_COLOR,
            safe_zone_id,
            v_guide_id,
            h_guide_id,
        }
    }

    pub fn toggle_safe_zone(&mut self) {
        self.safe_zone_visible = !self.safe_zone_visible;
        let visible = self.safe_zone_visible;
        self.set_visible(self.safe_zone_id, visible);
    }

    pub fn toggle_guides(&mut self) {
        self.guides_visible = !self.guides_visible;
        let visible = self.guides_visible;
        self.set_visible(self.v_guide_id, visible);
        self.set_visible(self.h_guide_id, visible);
    }

    fn set_visible(&mut self, id: Uuid, visible: bool) {
        if let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) {
            obj.visible = visible;
        }
    }

    pub fn add_rect(&mut self) {
        let width = self.config.canvas_width * 0.25;
        let height = self.config.canvas_height * 0.25;
        let shape = Shape::Rect {
            x: (self.config.canvas_width - width) / 2.0,
            y: (self.config.canvas_height - height) / 2.0,
            width,
            height,
        };
        self.push_user_object(DesignObject::filled(shape, self.fill_color));
    }

    pub fn add_ellipse(&mut self) {
        let shape = Shape::Ellipse {
            cx: self.config.canvas_width / 2.0,
            cy: self.config.canvas_height / 2.0,
            rx: self.config.canvas_width * 0.125,
            ry: self.config.canvas_height * 0.125,
        };
        self.push_user_object(DesignObject::filled(shape, self.fill_color));
    }

    fn push_user_object(&mut self, object: DesignObject) {
        self.selected = Some(object.id);
        self.objects.push(object);
        self.changed = true;
    }

    /// Topmost visible, selectable object under `point`, if any.
    pub fn hit_test(&self, point: Vec2) -> Option<Uuid> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.visible && o.selectable && o.contains(point))
            .map(|o| o.id)
    }

    pub fn select_at(&mut self, point: Vec2) {
        self.selected = self.hit_test(point);
    }

    pub fn move_selected(&mut self, delta: Vec2) -> bool {
        let Some(id) = self.selected else {
            return false;
        };
        if delta == Vec2::ZERO {
            return false;
        }
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        obj.translate(delta);
        self.changed = true;
        true
    }

    pub fn remove_selected(&mut self) {
        let Some(id) = self.selected.take() else {
            return;
        };
        self.objects.retain(|o| o.id != id || !o.selectable);
        self.changed = true;
    }

    pub fn set_fill_color(&mut self, color: [u8; 4]) {
        if self.fill_color == color {
            return;
        }
        self.fill_color = color;
        if let Some(id) = self.selected
            && let Some(obj) = self.objects.iter_mut().find(|o| o.id == id)
        {
            obj.fill = Some(color);
            self.changed = true;
        }
    }

    pub fn selected_object(&self) -> Option<&DesignObject> {
        let id = self.selected?;
        self.objects.iter().find(|o| o.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::catalog::default_outer_part;
    use approx::assert_relative_eq;

    fn surface() -> DesignSurface {
        DesignSurface::new(PartKind::Outer, default_outer_part())
    }

    #[test]
    fn safe_zone_interior_is_canvas_minus_margins() {
        let part = default_outer_part();
        let zone = safe_zone(&part);
        assert_relative_eq!(zone.left, part.margins.left);
        assert_relative_eq!(zone.top, part.margins.top);
        assert_relative_eq!(
            zone.width,
            part.canvas_width - part.margins.left - part.margins.right
        );
        assert_relative_eq!(
            zone.height,
            part.canvas_height - part.margins.top - part.margins.bottom
        );
        assert!(zone.width > 0.0 && zone.height > 0.0);
    }

    #[test]
    fn safe_zone_toggle_is_an_involution() {
        let mut s = surface();
        let initial: Vec<bool> = s.objects.iter().map(|o| o.visible).collect();
        s.toggle_safe_zone();
        assert!(!s.safe_zone_visible);
        s.toggle_safe_zone();
        assert!(s.safe_zone_visible);
        let after: Vec<bool> = s.objects.iter().map(|o| o.visible).collect();
        assert_eq!(initial, after);

        // Further toggle pairs stay idempotent.
        for _ in 0..3 {
            s.toggle_safe_zone();
            s.toggle_safe_zone();
        }
        assert!(s.safe_zone_visible);
    }

    #[test]
    fn guides_start_hidden_and_toggle_together() {
        let mut s = surface();
        assert!(!s.guides_visible);
        s.toggle_guides();
        let visible_lines = s
            .objects
            .iter()
            .filter(|o| matches!(o.shape, Shape::Line { .. }) && o.visible)
            .count();
        assert_eq!(visible_lines, 2);
    }

    #[test]
    fn overlays_are_not_selectable_and_never_exported() {
        let s = surface();
        assert_eq!(s.objects.len(), 3);
        assert!(s.objects.iter().all(|o| !o.selectable && o.exclude_from_export));
        // A click dead center hits nothing even though the overlays are there.
        let center = Vec2::new(s.config.canvas_width / 2.0, s.config.canvas_height / 2.0);
        assert_eq!(s.hit_test(center), None);
    }

    #[test]
    fn hit_test_returns_topmost_user_object() {
        let mut s = surface();
        s.add_rect();
        let first = s.selected.expect("rect selected");
        s.add_ellipse();
        let second = s.selected.expect("ellipse selected");
        assert_ne!(first, second);

        let center = Vec2::new(s.config.canvas_width / 2.0, s.config.canvas_height / 2.0);
        assert_eq!(s.hit_test(center), Some(second));
    }

    #[test]
    fn edits_mark_the_surface_changed() {
        let mut s = surface();
        assert!(!s.changed);
        s.add_rect();
        assert!(s.changed);
        s.changed = false;

        assert!(s.move_selected(Vec2::new(5.0, -3.0)));
        assert!(s.changed);
        s.changed = false;

        s.remove_selected();
        assert!(s.changed);
        assert_eq!(s.objects.len(), 3);
    }

    #[test]
    fn toggling_overlays_does_not_arm_a_rebuild() {
        let mut s = surface();
        s.toggle_safe_zone();
        s.toggle_guides();
        assert!(!s.changed);
    }

    #[test]
    fn move_without_selection_is_a_noop() {
        let mut s = surface();
        assert!(!s.move_selected(Vec2::new(10.0, 10.0)));
        assert!(!s.changed);
    }
}
