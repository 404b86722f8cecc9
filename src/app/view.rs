use std::collections::{HashMap, HashSet};

use eframe::egui::epaint::StrokeKind;
use eframe::egui::{
    self, Align2, Color32, FontId, PointerButton, Pos2, Rect, Sense, Stroke, Ui, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::api::ClusterNode;
use crate::detail::ExpandAction;
use crate::graph::{self, GraphNode, NodeKind};
use crate::layout::{CENTER, CHILD_SLOT_LIMIT};
use crate::util::{format_count, truncate_label};

use super::ViewModel;
use super::render_utils::{
    blend_color, dim_color, draw_background, screen_to_world, world_to_screen,
};

pub(in crate::app) fn fuzzy_match_score(
    matcher: &SkimMatcherV2,
    text: &str,
    query: &str,
) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

impl ViewModel {
    /// Rebuilds the node/edge lists from the current overview and drill-down
    /// state. Child rings are appended after the overview ring, so children
    /// draw on top of (and hit-test before) their parents.
    pub(in crate::app) fn rebuild_graph(&mut self) {
        let (mut nodes, mut edges) =
            graph::layout_root(&self.overview.categories, self.overview.totals);

        let parents: Vec<(String, Pos2, usize)> = nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Category(data) => self
                    .expanded_categories
                    .get(&data.category_id)
                    .map(|&limit| (data.category_id.clone(), node.center(), limit)),
                _ => None,
            })
            .collect();

        for (category_id, parent_center, shown_limit) in parents {
            let clusters: Vec<ClusterNode> = self
                .overview
                .constellation
                .nodes
                .iter()
                .filter(|node| node.category_id == category_id)
                .cloned()
                .collect();

            let (child_nodes, child_edges) =
                graph::layout_children(parent_center, &category_id, &clusters, shown_limit);
            nodes.extend(child_nodes);
            edges.extend(child_edges);
        }

        // Cross-links between clusters that both made it onto a ring.
        let shown_clusters: HashSet<i64> = nodes
            .iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Cluster(data) => Some(data.cluster_id),
                _ => None,
            })
            .collect();
        for link in &self.overview.constellation.links {
            if link.source != link.target
                && shown_clusters.contains(&link.source)
                && shown_clusters.contains(&link.target)
            {
                edges.push(graph::GraphEdge {
                    source: graph::cluster_node_id(link.source),
                    target: graph::cluster_node_id(link.target),
                    style: graph::link_edge_style(link.weight),
                });
            }
        }

        self.nodes = nodes;
        self.edges = edges;
        self.graph_dirty = false;
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_graph();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        let pan = self.pan;
        let zoom = self.zoom;

        let screen_rects: Vec<Rect> = self
            .nodes
            .iter()
            .map(|node| {
                Rect::from_min_size(world_to_screen(rect, pan, zoom, node.pos), node.size * zoom)
            })
            .collect();

        let mut screen_center_by_id: HashMap<&str, Pos2> =
            HashMap::with_capacity(self.nodes.len());
        for (node, screen_rect) in self.nodes.iter().zip(&screen_rects) {
            screen_center_by_id.insert(node.id.as_str(), screen_rect.center());
        }

        let edge_width_scale = zoom.sqrt();
        for edge in &self.edges {
            let (Some(&start), Some(&end)) = (
                screen_center_by_id.get(edge.source.as_str()),
                screen_center_by_id.get(edge.target.as_str()),
            ) else {
                continue;
            };

            painter.line_segment(
                [start, end],
                Stroke::new(
                    (edge.style.width * edge_width_scale).clamp(0.5, 4.0),
                    edge.style.color,
                ),
            );
        }

        let pointer = ui.input(|input| input.pointer.hover_pos());
        // Children are appended after their parents, so the last hit wins.
        let hovered = pointer
            .and_then(|pointer| screen_rects.iter().rposition(|r| r.contains(pointer)));

        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let matcher = SkimMatcherV2::default();
        let filters = self.store.filters();
        let search = filters.search.trim();
        let search_active = !search.is_empty();
        let filter_active = !filters.categories.is_empty() || !filters.clusters.is_empty();

        let node_matches = |node: &GraphNode| -> bool {
            match &node.kind {
                NodeKind::Root(_) | NodeKind::More(_) => true,
                NodeKind::Category(data) => {
                    let filter_ok = !filter_active
                        || filters.categories.iter().any(|id| id == &data.category_id);
                    let search_ok = !search_active
                        || fuzzy_match_score(&matcher, &data.name, search).is_some();
                    filter_ok && search_ok
                }
                NodeKind::Cluster(data) => {
                    let filter_ok = !filter_active
                        || filters.clusters.contains(&data.cluster_id)
                        || filters.categories.iter().any(|id| id == &data.category_id);
                    let search_ok = !search_active
                        || fuzzy_match_score(&matcher, &data.name, search).is_some();
                    filter_ok && search_ok
                }
            }
        };

        for (index, node) in self.nodes.iter().enumerate() {
            let screen_rect = screen_rects[index];
            if !rect.intersects(screen_rect) {
                continue;
            }

            let is_hovered = hovered == Some(index);
            let is_selected = matches!(
                &node.kind,
                NodeKind::Cluster(data) if self.selected_cluster == Some(data.cluster_id)
            );
            let dimmed = !node_matches(node);

            let accent = if dimmed {
                dim_color(node.color(), 0.45)
            } else {
                node.color()
            };
            let fill = blend_color(
                Color32::from_rgb(30, 36, 44),
                accent,
                if dimmed { 0.08 } else { 0.18 },
            );
            let corner = 8.0 * zoom.clamp(0.5, 1.5);

            painter.rect_filled(screen_rect, corner, fill);
            let stroke_width = if is_selected {
                2.6
            } else if is_hovered {
                2.0
            } else {
                1.2
            };
            let stroke_color = if is_hovered {
                blend_color(accent, Color32::WHITE, 0.35)
            } else {
                accent
            };
            painter.rect_stroke(
                screen_rect,
                corner,
                Stroke::new(stroke_width, stroke_color),
                StrokeKind::Inside,
            );

            if screen_rect.height() < 16.0 {
                continue;
            }

            let text_color = if dimmed {
                Color32::from_gray(120)
            } else {
                Color32::from_gray(235)
            };
            let title_font = FontId::proportional((15.0 * zoom).clamp(10.0, 22.0));
            let detail_font = FontId::proportional((12.0 * zoom).clamp(8.0, 17.0));
            let show_details = screen_rect.height() >= 44.0;
            let line_step = screen_rect.height() * 0.22;

            match &node.kind {
                NodeKind::Root(data) => {
                    painter.text(
                        screen_rect.center() - vec2(0.0, line_step),
                        Align2::CENTER_CENTER,
                        format!("{} Interviews", node.icon()),
                        title_font,
                        text_color,
                    );
                    if show_details {
                        painter.text(
                            screen_rect.center(),
                            Align2::CENTER_CENTER,
                            format!("{} questions", format_count(data.total_questions)),
                            detail_font.clone(),
                            text_color,
                        );
                        painter.text(
                            screen_rect.center() + vec2(0.0, line_step),
                            Align2::CENTER_CENTER,
                            format!(
                                "{} clusters in {} categories",
                                format_count(data.total_clusters),
                                data.total_categories
                            ),
                            detail_font,
                            text_color,
                        );
                    }
                }
                NodeKind::Category(data) => {
                    painter.text(
                        screen_rect.center() - vec2(0.0, line_step),
                        Align2::CENTER_CENTER,
                        format!("{} {}", node.icon(), truncate_label(&data.name, 18)),
                        title_font,
                        text_color,
                    );
                    if show_details {
                        painter.text(
                            screen_rect.center(),
                            Align2::CENTER_CENTER,
                            format!("{} questions", format_count(data.questions_count)),
                            detail_font.clone(),
                            text_color,
                        );
                        let clusters_line = if data.percentage > 0.0 {
                            format!("{} clusters, {:.1}%", data.clusters_count, data.percentage)
                        } else {
                            format!("{} clusters", data.clusters_count)
                        };
                        painter.text(
                            screen_rect.center() + vec2(0.0, line_step),
                            Align2::CENTER_CENTER,
                            clusters_line,
                            detail_font,
                            text_color,
                        );
                    }
                }
                NodeKind::Cluster(data) => {
                    let title_offset = if show_details {
                        vec2(0.0, line_step * 0.6)
                    } else {
                        vec2(0.0, 0.0)
                    };
                    painter.text(
                        screen_rect.center() - title_offset,
                        Align2::CENTER_CENTER,
                        format!("{} {}", node.icon(), truncate_label(&data.name, 20)),
                        title_font,
                        text_color,
                    );
                    if show_details {
                        painter.text(
                            screen_rect.center() + title_offset,
                            Align2::CENTER_CENTER,
                            format!("{} questions", format_count(data.questions_count)),
                            detail_font,
                            text_color,
                        );
                    }
                }
                NodeKind::More(data) => {
                    painter.text(
                        screen_rect.center(),
                        Align2::CENTER_CENTER,
                        format!("{} {} more", node.icon(), data.hidden_count),
                        title_font,
                        text_color,
                    );
                }
            }
        }

        if response.clicked_by(PointerButton::Primary) {
            let clicked = hovered
                .and_then(|index| self.nodes.get(index))
                .map(|node| node.kind.clone());

            match clicked {
                Some(NodeKind::Category(data)) => self.toggle_category_drilldown(&data.category_id),
                Some(NodeKind::Cluster(data)) => self.select_cluster(data.cluster_id),
                Some(NodeKind::More(data)) => self.reveal_more_children(&data.category_id),
                Some(NodeKind::Root(_)) | None => self.selected_cluster = None,
            }
        }
    }

    pub(in crate::app) fn handle_graph_zoom(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.2, 3.5);
        self.pan = pointer - rect.center() - ((world_before - CENTER) * self.zoom);
    }

    pub(in crate::app) fn handle_graph_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Drilling into a category also selects it as a filter, so the graph
    /// and the sidebar stay in agreement about what is active.
    pub(in crate::app) fn toggle_category_drilldown(&mut self, category_id: &str) {
        if self.expanded_categories.remove(category_id).is_some() {
            self.set_category_checked(category_id, false);
        } else {
            self.expanded_categories
                .insert(category_id.to_string(), CHILD_SLOT_LIMIT);
            self.set_category_checked(category_id, true);
        }
        self.graph_dirty = true;
    }

    pub(in crate::app) fn reveal_more_children(&mut self, category_id: &str) {
        if let Some(shown_limit) = self.expanded_categories.get_mut(category_id) {
            *shown_limit += CHILD_SLOT_LIMIT;
            self.graph_dirty = true;
        }
    }

    pub(in crate::app) fn select_cluster(&mut self, cluster_id: i64) {
        self.selected_cluster = Some(cluster_id);
        if self.detail.expand(cluster_id) == ExpandAction::NeedsFetch {
            self.spawn_detail_fetch(cluster_id);
        }
    }
}
