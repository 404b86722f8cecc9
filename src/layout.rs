use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{pos2, Pos2, Vec2};

/// World-space origin of the root node.
pub const CENTER: Pos2 = Pos2::new(800.0, 500.0);

pub const ROOT_SIZE: Vec2 = Vec2::new(300.0, 200.0);
pub const CATEGORY_RADIUS: f32 = 520.0;
pub const CATEGORY_SIZE: Vec2 = Vec2::new(200.0, 120.0);
pub const CHILD_RADIUS: f32 = 260.0;
pub const CHILD_SIZE: Vec2 = Vec2::new(170.0, 84.0);

/// How many cluster children a category ring shows before the remainder is
/// folded into a single summary slot.
pub const CHILD_SLOT_LIMIT: usize = 12;

/// Angle of slot `index` out of `count` evenly spaced slots. Slot zero sits
/// at top center and subsequent slots proceed clockwise.
pub fn slot_angle(index: usize, count: usize) -> f32 {
    (index as f32 / count.max(1) as f32) * TAU - FRAC_PI_2
}

/// Top-left corner for a node of `size` whose center lies on the circle of
/// `radius` around `center` at `angle`.
pub fn ring_position(center: Pos2, radius: f32, angle: f32, size: Vec2) -> Pos2 {
    pos2(
        center.x + angle.cos() * radius - size.x / 2.0,
        center.y + angle.sin() * radius - size.y / 2.0,
    )
}

/// Top-left corner for a node of `size` centered on `center`.
pub fn centered_position(center: Pos2, size: Vec2) -> Pos2 {
    pos2(center.x - size.x / 2.0, center.y - size.y / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-3;

    #[test]
    fn first_slot_points_straight_up() {
        assert!((slot_angle(0, 4) + FRAC_PI_2).abs() < TOLERANCE);
        assert!((slot_angle(0, 13) + FRAC_PI_2).abs() < TOLERANCE);
    }

    #[test]
    fn slots_divide_the_full_circle() {
        let step = slot_angle(1, 4) - slot_angle(0, 4);
        assert!((step - TAU / 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn ring_position_centers_the_footprint() {
        let size = Vec2::new(200.0, 120.0);
        let top = ring_position(CENTER, CATEGORY_RADIUS, slot_angle(0, 4), size);

        // Slot zero lands directly above the center, so the node center is
        // (cx, cy - R).
        assert!((top.x + size.x / 2.0 - CENTER.x).abs() < TOLERANCE);
        assert!((top.y + size.y / 2.0 - (CENTER.y - CATEGORY_RADIUS)).abs() < TOLERANCE);
    }

    #[test]
    fn quarter_turn_lands_to_the_right() {
        let size = Vec2::new(10.0, 10.0);
        let east = ring_position(CENTER, 100.0, slot_angle(1, 4), size);
        assert!((east.x + size.x / 2.0 - (CENTER.x + 100.0)).abs() < TOLERANCE);
        assert!((east.y + size.y / 2.0 - CENTER.y).abs() < TOLERANCE);
    }

    #[test]
    fn centered_position_offsets_by_half_size() {
        let pos = centered_position(CENTER, ROOT_SIZE);
        assert!((pos.x - (CENTER.x - 150.0)).abs() < TOLERANCE);
        assert!((pos.y - (CENTER.y - 100.0)).abs() < TOLERANCE);
    }
}
