use eframe::egui::{Color32, Pos2, Vec2};

use crate::api::{Category, ClusterNode, Totals};
use crate::layout::{
    centered_position, ring_position, slot_angle, CATEGORY_RADIUS, CATEGORY_SIZE, CENTER,
    CHILD_RADIUS, CHILD_SIZE, ROOT_SIZE,
};

pub const ROOT_ID: &str = "interviews-root";

pub fn category_node_id(category_id: &str) -> String {
    format!("category-{category_id}")
}

pub fn cluster_node_id(cluster_id: i64) -> String {
    format!("cluster-{cluster_id}")
}

pub fn more_node_id(category_id: &str) -> String {
    format!("more-{category_id}")
}

#[derive(Clone, Debug, PartialEq)]
pub struct RootData {
    pub total_questions: u64,
    pub total_clusters: u64,
    pub total_categories: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryData {
    pub category_id: String,
    pub name: String,
    pub questions_count: u64,
    pub clusters_count: u64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterData {
    pub cluster_id: i64,
    pub category_id: String,
    pub name: String,
    pub questions_count: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoreData {
    pub category_id: String,
    pub hidden_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Root(RootData),
    Category(CategoryData),
    Cluster(ClusterData),
    More(MoreData),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: String,
    /// Top-left corner in world space; the node is centered on its layout
    /// point, so the center is `pos + size / 2`.
    pub pos: Pos2,
    pub size: Vec2,
    pub kind: NodeKind,
}

impl GraphNode {
    pub fn center(&self) -> Pos2 {
        self.pos + self.size / 2.0
    }

    pub fn color(&self) -> Color32 {
        match &self.kind {
            NodeKind::Root(_) => Color32::from_rgb(97, 218, 251),
            NodeKind::Category(data) => category_color(&data.category_id),
            NodeKind::Cluster(data) => category_color(&data.category_id),
            NodeKind::More(_) => Color32::from_rgb(158, 158, 158),
        }
    }

    pub fn icon(&self) -> &'static str {
        match &self.kind {
            NodeKind::Root(_) => "🌌",
            NodeKind::Category(data) => category_icon(&data.category_id),
            NodeKind::Cluster(_) => "🏷",
            NodeKind::More(_) => "⋯",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub width: f32,
    pub color: Color32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub style: EdgeStyle,
}

// #61dafb at 0.6 opacity, matching the original constellation styling.
fn root_edge_style() -> EdgeStyle {
    EdgeStyle {
        width: 2.0,
        color: Color32::from_rgba_unmultiplied(97, 218, 251, 153),
    }
}

fn child_edge_style() -> EdgeStyle {
    EdgeStyle {
        width: 1.2,
        color: Color32::from_rgba_unmultiplied(97, 218, 251, 110),
    }
}

/// Cross-link between clusters that share questions; width tracks the link
/// weight.
pub fn link_edge_style(weight: f64) -> EdgeStyle {
    EdgeStyle {
        width: (0.6 + (weight as f32 * 0.8)).clamp(0.6, 2.4),
        color: Color32::from_rgba_unmultiplied(140, 160, 180, 70),
    }
}

pub fn category_color(category_id: &str) -> Color32 {
    match category_id {
        "javascript_core" => Color32::from_rgb(0xf7, 0xdf, 0x1e),
        "react" => Color32::from_rgb(0x61, 0xda, 0xfb),
        "typescript" => Color32::from_rgb(0x31, 0x78, 0xc6),
        "soft_skills" => Color32::from_rgb(0xff, 0x6b, 0x6b),
        "алгоритмы" => Color32::from_rgb(0xdc, 0x14, 0x3c),
        "сеть" => Color32::from_rgb(0xff, 0x6b, 0x35),
        "верстка" => Color32::from_rgb(0xe9, 0x1e, 0x63),
        "браузеры" => Color32::from_rgb(0x9c, 0x27, 0xb0),
        "архитектура" => Color32::from_rgb(0x67, 0x3a, 0xb7),
        "инструменты" => Color32::from_rgb(0x3f, 0x51, 0xb5),
        "производительность" => Color32::from_rgb(0x00, 0xbc, 0xd4),
        "тестирование" => Color32::from_rgb(0x4c, 0xaf, 0x50),
        _ => Color32::from_rgb(0x9e, 0x9e, 0x9e),
    }
}

pub fn category_icon(category_id: &str) -> &'static str {
    match category_id {
        "javascript_core" => "⚡",
        "react" => "⚛",
        "typescript" => "🔷",
        "soft_skills" => "👥",
        "алгоритмы" => "🧮",
        "сеть" => "🌐",
        "верстка" => "🎨",
        "браузеры" => "🌍",
        "архитектура" => "🏗",
        "инструменты" => "🛠",
        "производительность" => "🚀",
        "тестирование" => "🧪",
        _ => "📝",
    }
}

/// Builds the overview graph: one root node at the center and one node per
/// category on the surrounding ring, most populous category at the top and
/// the rest clockwise by descending question count (ties keep input order).
/// An empty category list yields just the root and no edges.
pub fn layout_root(categories: &[Category], totals: Totals) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut nodes = Vec::with_capacity(categories.len() + 1);
    let mut edges = Vec::with_capacity(categories.len());

    nodes.push(GraphNode {
        id: ROOT_ID.to_string(),
        pos: centered_position(CENTER, ROOT_SIZE),
        size: ROOT_SIZE,
        kind: NodeKind::Root(RootData {
            total_questions: totals.questions,
            total_clusters: totals.clusters,
            total_categories: totals.categories,
        }),
    });

    let mut ordered: Vec<&Category> = categories.iter().collect();
    ordered.sort_by(|a, b| b.questions_count.cmp(&a.questions_count));

    let count = ordered.len();
    for (index, category) in ordered.into_iter().enumerate() {
        let node_id = category_node_id(&category.id);
        let angle = slot_angle(index, count);

        nodes.push(GraphNode {
            id: node_id.clone(),
            pos: ring_position(CENTER, CATEGORY_RADIUS, angle, CATEGORY_SIZE),
            size: CATEGORY_SIZE,
            kind: NodeKind::Category(CategoryData {
                category_id: category.id.clone(),
                name: category.name.clone(),
                questions_count: category.questions_count,
                clusters_count: category.clusters_count,
                percentage: category.percentage,
            }),
        });

        edges.push(GraphEdge {
            source: ROOT_ID.to_string(),
            target: node_id,
            style: root_edge_style(),
        });
    }

    (nodes, edges)
}

/// Places up to `shown_limit` of a category's clusters on a smaller ring
/// around the parent's center, again by descending question count. When the
/// category has more clusters than fit, the final slot becomes a summary
/// node carrying the hidden remainder.
pub fn layout_children(
    parent_center: Pos2,
    parent_category_id: &str,
    clusters: &[ClusterNode],
    shown_limit: usize,
) -> (Vec<GraphNode>, Vec<GraphEdge>) {
    let mut ordered: Vec<&ClusterNode> = clusters.iter().collect();
    ordered.sort_by(|a, b| b.questions_count.cmp(&a.questions_count));

    let overflowing = ordered.len() > shown_limit;
    let shown = if overflowing {
        shown_limit
    } else {
        ordered.len()
    };
    let slot_count = if overflowing { shown + 1 } else { shown };

    let parent_node_id = category_node_id(parent_category_id);
    let mut nodes = Vec::with_capacity(slot_count);
    let mut edges = Vec::with_capacity(slot_count);

    for (index, cluster) in ordered.iter().take(shown).enumerate() {
        let node_id = cluster_node_id(cluster.id);
        let angle = slot_angle(index, slot_count);

        nodes.push(GraphNode {
            id: node_id.clone(),
            pos: ring_position(parent_center, CHILD_RADIUS, angle, CHILD_SIZE),
            size: CHILD_SIZE,
            kind: NodeKind::Cluster(ClusterData {
                cluster_id: cluster.id,
                category_id: parent_category_id.to_string(),
                name: cluster.name.clone(),
                questions_count: cluster.questions_count,
            }),
        });

        edges.push(GraphEdge {
            source: parent_node_id.clone(),
            target: node_id,
            style: child_edge_style(),
        });
    }

    if overflowing {
        let node_id = more_node_id(parent_category_id);
        let angle = slot_angle(slot_count - 1, slot_count);

        nodes.push(GraphNode {
            id: node_id.clone(),
            pos: ring_position(parent_center, CHILD_RADIUS, angle, CHILD_SIZE),
            size: CHILD_SIZE,
            kind: NodeKind::More(MoreData {
                category_id: parent_category_id.to_string(),
                hidden_count: ordered.len() - shown,
            }),
        });

        edges.push(GraphEdge {
            source: parent_node_id,
            target: node_id,
            style: child_edge_style(),
        });
    }

    (nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CHILD_SLOT_LIMIT;

    const TOLERANCE: f32 = 1e-3;

    fn category(id: &str, questions: u64) -> Category {
        Category {
            id: id.to_string(),
            name: id.to_string(),
            questions_count: questions,
            clusters_count: 0,
            percentage: 0.0,
        }
    }

    fn cluster(id: i64, questions: u64) -> ClusterNode {
        ClusterNode {
            id,
            name: format!("cluster-{id}"),
            category_id: "react".to_string(),
            category_name: "React".to_string(),
            questions_count: questions,
            keywords: Vec::new(),
            example_question: None,
            interview_penetration: None,
            top_companies: None,
        }
    }

    #[test]
    fn most_populous_category_lands_at_top_center() {
        let categories = vec![
            category("a", 30),
            category("b", 100),
            category("c", 10),
            category("d", 50),
        ];
        let (nodes, _) = layout_root(&categories, Totals::default());

        let top = nodes
            .iter()
            .find(|node| node.id == "category-b")
            .expect("category-b placed");
        let center = top.center();
        assert!((center.x - CENTER.x).abs() < TOLERANCE);
        assert!((center.y - (CENTER.y - CATEGORY_RADIUS)).abs() < TOLERANCE);
    }

    #[test]
    fn one_root_edge_per_category_and_nothing_else() {
        let categories = (0..7)
            .map(|i| category(&format!("cat{i}"), 100 - i))
            .collect::<Vec<_>>();
        let (nodes, edges) = layout_root(&categories, Totals::default());

        assert_eq!(nodes.len(), 8);
        assert_eq!(edges.len(), 7);
        assert!(edges.iter().all(|edge| edge.source == ROOT_ID));
        assert!(edges
            .iter()
            .all(|edge| edge.target.starts_with("category-")));
    }

    #[test]
    fn empty_category_list_yields_root_only() {
        let (nodes, edges) = layout_root(&[], Totals::default());
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0].kind, NodeKind::Root(_)));
        assert!(edges.is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let categories = vec![category("first", 50), category("second", 50)];
        let (nodes, _) = layout_root(&categories, Totals::default());
        assert_eq!(nodes[1].id, "category-first");
        assert_eq!(nodes[2].id, "category-second");
    }

    #[test]
    fn children_fit_without_summary_node() {
        let clusters = (1..=5).map(|id| cluster(id, 10 * id as u64)).collect::<Vec<_>>();
        let (nodes, edges) = layout_children(CENTER, "react", &clusters, CHILD_SLOT_LIMIT);

        assert_eq!(nodes.len(), 5);
        assert_eq!(edges.len(), 5);
        assert!(nodes
            .iter()
            .all(|node| matches!(node.kind, NodeKind::Cluster(_))));
        assert!(edges.iter().all(|edge| edge.source == "category-react"));
        // Most populous cluster occupies the top slot.
        assert_eq!(nodes[0].id, "cluster-5");
    }

    #[test]
    fn overflow_folds_into_summary_slot() {
        let clusters = (1..=20).map(|id| cluster(id, id as u64)).collect::<Vec<_>>();
        let (nodes, edges) = layout_children(CENTER, "react", &clusters, CHILD_SLOT_LIMIT);

        assert_eq!(nodes.len(), CHILD_SLOT_LIMIT + 1);
        assert_eq!(edges.len(), CHILD_SLOT_LIMIT + 1);
        let summary = nodes.last().unwrap();
        match &summary.kind {
            NodeKind::More(data) => {
                assert_eq!(data.hidden_count, 20 - CHILD_SLOT_LIMIT);
                assert_eq!(data.category_id, "react");
            }
            other => panic!("expected summary node, got {other:?}"),
        }
    }

    #[test]
    fn link_edge_width_is_clamped() {
        assert_eq!(link_edge_style(0.0).width, 0.6);
        assert_eq!(link_edge_style(100.0).width, 2.4);
        let mid = link_edge_style(1.0).width;
        assert!(mid > 0.6 && mid < 2.4);
    }

    #[test]
    fn cluster_nodes_reference_the_parent_category() {
        let clusters = vec![cluster(7, 3)];
        let (nodes, _) = layout_children(CENTER, "react", &clusters, CHILD_SLOT_LIMIT);
        match &nodes[0].kind {
            NodeKind::Cluster(data) => assert_eq!(data.category_id, "react"),
            other => panic!("expected cluster node, got {other:?}"),
        }
    }
}
