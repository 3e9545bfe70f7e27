use crate::studio::{EDITOR_SCALE_MAX, EDITOR_SCALE_MIN, MIN_PANE_PX, SPLITTER_THICKNESS_PX};
use bevy::prelude::Resource;

const DEFAULT_VIEWER_FRACTION: f32 = 0.55;

/// Split direction, responsive to the window shape the way the original
/// layout followed the container's flex direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitAxis {
    #[default]
    Row,
    Column,
}

pub fn split_axis(width: f32, height: f32) -> SplitAxis {
    if width >= height {
        SplitAxis::Row
    } else {
        SplitAxis::Column
    }
}

/// Drag state for the divider between the 3D viewport and the 2D editor.
/// idle -> dragging -> idle; the editor pane size at drag start is latched
/// as the base for the visual scale factor.
#[derive(Resource)]
pub struct SplitterState {
    pub viewer_px: Option<f32>,
    pub dragging: bool,
    pub base_editor_px: Option<f32>,
    pub editor_scale: f32,
}

impl Default for SplitterState {
    fn default() -> Self {
        Self {
            viewer_px: None,
            dragging: false,
            base_editor_px: None,
            editor_scale: 1.0,
        }
    }
}

impl SplitterState {
    pub fn begin_drag(&mut self, editor_px: f32) {
        self.dragging = true;
        self.base_editor_px = Some(editor_px.max(1.0));
    }

    pub fn drag_to(&mut self, pointer: f32, total: f32) {
        if !self.dragging {
            return;
        }
        let viewer = clamp_viewer_px(pointer, total);
        self.viewer_px = Some(viewer);
        if let Some(base) = self.base_editor_px {
            self.editor_scale = editor_scale(editor_px(viewer, total), base);
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.base_editor_px = None;
    }

    /// Current viewer pane size, re-clamped against the current total so a
    /// window resize cannot leave either pane below the minimum.
    pub fn viewer_px_or_default(&self, total: f32) -> f32 {
        let viewer = self
            .viewer_px
            .unwrap_or(total * DEFAULT_VIEWER_FRACTION);
        clamp_viewer_px(viewer, total)
    }
}

/// Clamps a drag position so both panes keep the minimum size.
pub fn clamp_viewer_px(pointer: f32, total: f32) -> f32 {
    let max = (total - MIN_PANE_PX - SPLITTER_THICKNESS_PX).max(MIN_PANE_PX);
    pointer.clamp(MIN_PANE_PX, max)
}

pub fn editor_px(viewer_px: f32, total: f32) -> f32 {
    (total - viewer_px - SPLITTER_THICKNESS_PX).max(0.0)
}

/// Uniform paint scale for the 2D editor so it shrinks to fit without
/// reflowing its canvas coordinate system.
pub fn editor_scale(editor_px: f32, base_px: f32) -> f32 {
    if base_px <= 0.0 {
        return EDITOR_SCALE_MAX;
    }
    (editor_px / base_px).clamp(EDITOR_SCALE_MIN, EDITOR_SCALE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1400.0, 900.0, SplitAxis::Row)]
    #[case(900.0, 900.0, SplitAxis::Row)]
    #[case(700.0, 1200.0, SplitAxis::Column)]
    fn axis_follows_window_shape(#[case] w: f32, #[case] h: f32, #[case] expected: SplitAxis) {
        assert_eq!(split_axis(w, h), expected);
    }

    #[test]
    fn drag_clamps_both_panes_to_the_minimum() {
        let total = 1400.0;
        // Far past the left edge: viewer pane pinned to the minimum.
        assert_relative_eq!(clamp_viewer_px(-500.0, total), MIN_PANE_PX);
        // Far past the right edge: editor pane keeps its minimum.
        let viewer = clamp_viewer_px(5000.0, total);
        assert_relative_eq!(editor_px(viewer, total), MIN_PANE_PX);
    }

    #[test]
    fn editor_scale_is_clamped_to_the_allowed_range() {
        assert_relative_eq!(editor_scale(200.0, 1000.0), EDITOR_SCALE_MIN);
        assert_relative_eq!(editor_scale(2000.0, 1000.0), EDITOR_SCALE_MAX);
        assert_relative_eq!(editor_scale(700.0, 1000.0), 0.7);
    }

    #[test]
    fn drag_state_machine_round_trips() {
        let mut splitter = SplitterState::default();
        assert!(!splitter.dragging);

        // Movement while idle does nothing.
        splitter.drag_to(400.0, 1400.0);
        assert_eq!(splitter.viewer_px, None);

        splitter.begin_drag(600.0);
        assert!(splitter.dragging);
        splitter.drag_to(900.0, 1400.0);
        assert_relative_eq!(splitter.viewer_px.unwrap(), 900.0);
        let expected = editor_px(900.0, 1400.0) / 600.0;
        assert_relative_eq!(splitter.editor_scale, expected.clamp(0.4, 1.0));

        splitter.end_drag();
        assert!(!splitter.dragging);
        assert_eq!(splitter.base_editor_px, None);
        // The chosen split survives the drag ending.
        assert_relative_eq!(splitter.viewer_px.unwrap(), 900.0);
    }

    #[test]
    fn scale_never_leaves_range_no_matter_how_far_the_drag_goes() {
        let mut splitter = SplitterState::default();
        splitter.begin_drag(500.0);
        for pointer in [-10_000.0, -1.0, 0.0, 700.0, 10_000.0] {
            splitter.drag_to(pointer, 1400.0);
            assert!(splitter.editor_scale >= EDITOR_SCALE_MIN);
            assert!(splitter.editor_scale <= EDITOR_SCALE_MAX);
        }
    }

    #[test]
    fn stored_viewer_size_is_reclamped_after_a_window_resize() {
        let mut splitter = SplitterState::default();
        splitter.begin_drag(600.0);
        splitter.drag_to(1000.0, 1400.0);
        splitter.end_drag();
        // Window shrank: the editor pane must win back its minimum.
        let viewer = splitter.viewer_px_or_default(800.0);
        assert_relative_eq!(editor_px(viewer, 800.0), MIN_PANE_PX);
    }
}
