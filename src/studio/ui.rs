use crate::studio::camera::UiInteractionState;
use crate::studio::layout::{SplitAxis, SplitterState, editor_px, split_axis};
use crate::studio::surface::{DesignObject, DesignSurface, Shape};
use crate::studio::SPLITTER_THICKNESS_PX;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiContexts, egui};

/// Last significant event, shown in the top bar.
#[derive(Resource, Default)]
pub struct StatusLine(pub String);

pub fn ui_system(
    mut contexts: EguiContexts,
    mut surface: ResMut<DesignSurface>,
    mut splitter: ResMut<SplitterState>,
    mut ui_state: ResMut<UiInteractionState>,
    status: Res<StatusLine>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let top_bar = egui::TopBottomPanel::top("studio_top_bar").show(ctx, |ui| {
        ui.horizontal_wrapped(|ui| {
            ui.heading("Print Studio");
            ui.separator();
            ui.label(format!(
                "{} / {:?}",
                surface.config.mesh_node, surface.part
            ));
            ui.separator();
            ui.label(&status.0);
            ui.separator();
            ui.small("Viewport: LMB drag rotates, wheel zooms.");
        });
    });
    let top_height = top_bar.response.rect.height();

    let axis = windows
        .single()
        .map(|w| split_axis(w.width(), w.height()))
        .unwrap_or_default();
    let screen = ctx.screen_rect();
    let total = match axis {
        SplitAxis::Row => screen.width(),
        SplitAxis::Column => screen.height() - top_height,
    };
    let viewer = splitter.viewer_px_or_default(total);
    let editor = editor_px(viewer, total);
    let scale = splitter.editor_scale;

    match axis {
        SplitAxis::Row => {
            egui::SidePanel::right("design_editor")
                .exact_width(editor)
                .resizable(false)
                .show(ctx, |ui| editor_panel_ui(ui, &mut surface, scale));
            egui::SidePanel::right("design_splitter")
                .exact_width(SPLITTER_THICKNESS_PX)
                .resizable(false)
                .show(ctx, |ui| {
                    splitter_handle_ui(ui, &mut splitter, axis, total, top_height, editor);
                });
        }
        SplitAxis::Column => {
            egui::TopBottomPanel::bottom("design_editor")
                .exact_height(editor)
                .resizable(false)
                .show(ctx, |ui| editor_panel_ui(ui, &mut surface, scale));
            egui::TopBottomPanel::bottom("design_splitter")
                .exact_height(SPLITTER_THICKNESS_PX)
                .resizable(false)
                .show(ctx, |ui| {
                    splitter_handle_ui(ui, &mut splitter, axis, total, top_height, editor);
                });
        }
    }

    ui_state.wants_pointer_input = ctx.wants_pointer_input();
    ui_state.axis = axis;
    ui_state.editor_reserved_px = editor + SPLITTER_THICKNESS_PX;
}

fn splitter_handle_ui(
    ui: &mut egui::Ui,
    splitter: &mut SplitterState,
    axis: SplitAxis,
    total: f32,
    top_height: f32,
    editor: f32,
) {
    let rect = ui.max_rect();
    let response = ui
        .allocate_rect(rect, egui::Sense::drag())
        .on_hover_cursor(match axis {
            SplitAxis::Row => egui::CursorIcon::ResizeHorizontal,
            SplitAxis::Column => egui::CursorIcon::ResizeVertical,
        });

    let color = if response.hovered() || splitter.dragging {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.noninteractive.bg_fill
    };
    ui.painter().rect_filled(rect, 2.0, color);

    if response.drag_started() {
        splitter.begin_drag(editor);
    }
    if splitter.dragging
        && let Some(pos) = response.interact_pointer_pos()
    {
        // egui keeps delivering the drag even when the pointer races off
        // the handle, so a fast drag still terminates correctly.
        let pointer = match axis {
            SplitAxis::Row => pos.x,
            SplitAxis::Column => pos.y - top_height,
        };
        splitter.drag_to(pointer, total);
    }
    if response.drag_stopped() {
        splitter.end_drag();
    }
}

fn editor_panel_ui(ui: &mut egui::Ui, surface: &mut DesignSurface, scale: f32) {
    ui.horizontal_wrapped(|ui| {
        if ui.button("Rectangle").clicked() {
            surface.add_rect();
        }
        if ui.button("Ellipse").clicked() {
            surface.add_ellipse();
        }
        if ui
            .add_enabled(surface.selected.is_some(), egui::Button::new("Delete"))
            .clicked()
        {
            surface.remove_selected();
        }
        ui.separator();
        let mut fill = surface.fill_color;
        if ui.color_edit_button_srgba_unmultiplied(&mut fill).changed() {
            surface.set_fill_color(fill);
        }
        ui.separator();
        if ui
            .selectable_label(surface.safe_zone_visible, "Safe zone")
            .clicked()
        {
            surface.toggle_safe_zone();
        }
        if ui
            .selectable_label(surface.guides_visible, "Guides")
            .clicked()
        {
            surface.toggle_guides();
        }
    });
    ui.separator();

    egui::ScrollArea::both().show(ui, |ui| {
        draw_canvas(ui, surface, scale);
    });
}

fn draw_canvas(ui: &mut egui::Ui, surface: &mut DesignSurface, scale: f32) {
    let size = egui::vec2(
        surface.config.canvas_width * scale,
        surface.config.canvas_height * scale,
    );
    let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
    let origin = response.rect.min;

    painter.rect_filled(response.rect, 0.0, egui::Color32::WHITE);
    for object in surface.objects.iter().filter(|o| o.visible) {
        paint_object(&painter, origin, scale, object);
    }

    if let Some(selected) = surface.selected_object() {
        let (min, max) = selected.bounds();
        let rect = egui::Rect::from_min_max(
            origin + egui::vec2(min.x, min.y) * scale,
            origin + egui::vec2(max.x, max.y) * scale,
        );
        painter.rect_stroke(
            rect.expand(2.0),
            2.0,
            egui::Stroke::new(1.0, egui::Color32::from_rgb(37, 99, 235)),
            egui::StrokeKind::Middle,
        );
    }

    let canvas_pos = |pos: egui::Pos2| {
        let local = (pos - origin) / scale;
        Vec2::new(local.x, local.y)
    };

    if response.clicked()
        && let Some(pos) = response.interact_pointer_pos()
    {
        surface.select_at(canvas_pos(pos));
    }
    if response.drag_started()
        && let Some(pos) = response.interact_pointer_pos()
    {
        surface.select_at(canvas_pos(pos));
    }
    if response.dragged() {
        let delta = response.drag_delta() / scale;
        surface.move_selected(Vec2::new(delta.x, delta.y));
    }
}

fn paint_object(painter: &egui::Painter, origin: egui::Pos2, scale: f32, object: &DesignObject) {
    match object.shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
        } => {
            let rect = egui::Rect::from_min_size(
                origin + egui::vec2(x, y) * scale,
                egui::vec2(width, height) * scale,
            );
            if let Some(fill) = object.fill {
                painter.rect_filled(rect, 0.0, color32(fill));
            }
            if let Some(stroke) = object.stroke {
                let egui_stroke = egui::Stroke::new(stroke.width * scale, color32(stroke.color));
                match stroke.dash {
                    Some((dash, gap)) => {
                        let corners = [
                            rect.left_top(),
                            rect.right_top(),
                            rect.right_bottom(),
                            rect.left_bottom(),
                            rect.left_top(),
                        ];
                        for edge in corners.windows(2) {
                            painter.extend(egui::Shape::dashed_line(
                                edge,
                                egui_stroke,
                                dash * scale,
                                gap * scale,
                            ));
                        }
                    }
                    None => {
                        painter.rect_stroke(rect, 0.0, egui_stroke, egui::StrokeKind::Middle);
                    }
                }
            }
        }
        Shape::Ellipse { cx, cy, rx, ry } => {
            let center = origin + egui::vec2(cx, cy) * scale;
            let radius = egui::vec2(rx, ry) * scale;
            if let Some(fill) = object.fill {
                painter.add(egui::Shape::ellipse_filled(center, radius, color32(fill)));
            }
            if let Some(stroke) = object.stroke {
                painter.add(egui::Shape::ellipse_stroke(
                    center,
                    radius,
                    egui::Stroke::new(stroke.width * scale, color32(stroke.color)),
                ));
            }
        }
        Shape::Line { x1, y1, x2, y2 } => {
            if let Some(stroke) = object.stroke {
                let from = origin + egui::vec2(x1, y1) * scale;
                let to = origin + egui::vec2(x2, y2) * scale;
                let egui_stroke = egui::Stroke::new(stroke.width * scale, color32(stroke.color));
                match stroke.dash {
                    Some((dash, gap)) => painter.extend(egui::Shape::dashed_line(
                        &[from, to],
                        egui_stroke,
                        dash * scale,
                        gap * scale,
                    )),
                    None => {
                        painter.line_segment([from, to], egui_stroke);
                    }
                }
            }
        }
    }
}

fn color32(rgba: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(rgba[0], rgba[1], rgba[2], rgba[3])
}
