//! Formation planning.
//!
//! Turns an anchor, a facing and a unit count into one target slot per unit.
//! The same function backs the drag preview and the committed order, so the
//! positions a player sees are exactly the ones the units walk to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::arena::UnitId;
use crate::config::FormationTuning;
use crate::error::BattleError;
use crate::math::{heading, place_offset, Vec2};

/// Shape of a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormationKind {
    /// Staggered shield wall, wide and shallow.
    #[default]
    Line,
    /// Arrowhead with the apex at the anchor.
    Wedge,
    /// Block centred on the anchor.
    Square,
    /// Ring around the anchor.
    Circle,
}

impl FormationKind {
    /// All kinds in cycling order.
    pub const ALL: [Self; 4] = [Self::Line, Self::Wedge, Self::Square, Self::Circle];

    /// The kind after this one in cycling order.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Line => Self::Wedge,
            Self::Wedge => Self::Square,
            Self::Square => Self::Circle,
            Self::Circle => Self::Line,
        }
    }
}

impl fmt::Display for FormationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Line => "line",
            Self::Wedge => "wedge",
            Self::Square => "square",
            Self::Circle => "circle",
        };
        f.write_str(name)
    }
}

impl FromStr for FormationKind {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BattleError::InvalidConfig {
                field: "formation",
                message: format!("unknown formation '{s}'"),
            })
    }
}

/// Compute `count` formation slots around `anchor`.
///
/// Offsets are laid out in the formation's own frame (lateral across the
/// facing, depth along it) and then rotated by `facing`. The result is
/// index-aligned: slot `i` belongs to the `i`-th unit of a stable ordering.
#[must_use]
pub fn plan_formation(
    anchor: Vec2,
    facing: f32,
    count: usize,
    kind: FormationKind,
    spacing: f32,
) -> Vec<Vec2> {
    let sp = spacing;
    let mut slots = Vec::with_capacity(count);
    if count == 0 {
        return slots;
    }
    let n = count as f32;

    match kind {
        FormationKind::Line => {
            let cols = count.min(4.max((count * 7).div_ceil(10)));
            for i in 0..count {
                let (row, col) = (i / cols, i % cols);
                let stagger = if row % 2 == 1 { sp * 0.4 } else { 0.0 };
                let lateral = (col as f32 - (cols - 1) as f32 / 2.0) * sp + stagger;
                let depth = row as f32 * sp * 0.8;
                slots.push(place_offset(anchor, lateral, depth, facing));
            }
        }
        FormationKind::Wedge => {
            let mut row = 0usize;
            while slots.len() < count {
                let in_row = (2 * row + 1).min(count - slots.len());
                for j in 0..in_row {
                    let lateral = (j as f32 - (in_row - 1) as f32 / 2.0) * sp;
                    let depth = row as f32 * sp * 0.9;
                    slots.push(place_offset(anchor, lateral, depth, facing));
                }
                row += 1;
            }
        }
        FormationKind::Square => {
            let cols = (n.sqrt().ceil() as usize).max(1);
            let rows = count.div_ceil(cols);
            for i in 0..count {
                let (row, col) = (i / cols, i % cols);
                let lateral = (col as f32 - (cols - 1) as f32 / 2.0) * sp;
                let depth = (row as f32 - (rows - 1) as f32 / 2.0) * sp;
                slots.push(place_offset(anchor, lateral, depth, facing));
            }
        }
        FormationKind::Circle => {
            let radius = (n * sp * 0.12).max(1.5);
            for i in 0..count {
                let angle = i as f32 / n * std::f32::consts::TAU + facing;
                slots.push(anchor + Vec2::new(angle.cos(), angle.sin()) * radius);
            }
        }
    }
    slots
}

/// Square deployment grid used when an army or reinforcement squad enters the field.
///
/// Rows grow along `+z` from `anchor`. Jitter is applied by the caller.
#[must_use]
pub fn deployment_slots(anchor: Vec2, count: usize, spacing: f32) -> Vec<Vec2> {
    let cols = ((count as f32).sqrt().ceil() as usize).max(1);
    (0..count)
        .map(|i| {
            let (row, col) = (i / cols, i % cols);
            anchor
                + Vec2::new(
                    (col as f32 - cols as f32 / 2.0) * spacing,
                    row as f32 * spacing,
                )
        })
        .collect()
}

/// A formation move order before it is handed to units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationOrder {
    /// Where the formation is centred (or where its apex sits).
    pub anchor: Vec2,
    /// Explicit facing from a drag gesture. Without one the formation is laid
    /// out unrotated and every unit faces the anchor from where it stands.
    pub facing: Option<f32>,
    /// Formation shape.
    pub kind: FormationKind,
    /// Distance between neighbouring slots.
    pub spacing: f32,
}

impl FormationOrder {
    /// Order at `anchor` with default spacing and no explicit facing.
    #[must_use]
    pub fn at(anchor: Vec2, kind: FormationKind, tuning: &FormationTuning) -> Self {
        Self {
            anchor,
            facing: None,
            kind,
            spacing: tuning.spacing,
        }
    }

    /// Order from a drag gesture.
    ///
    /// The anchor is the drag start and the facing points along the drag.
    /// Longer drags spread the formation out, within the configured bounds.
    #[must_use]
    pub fn from_drag(
        start: Vec2,
        end: Vec2,
        count: usize,
        kind: FormationKind,
        tuning: &FormationTuning,
    ) -> Self {
        let len = start.distance(end);
        let spacing = (len / count.max(1) as f32 * 2.0)
            .clamp(tuning.min_drag_spacing, tuning.max_drag_spacing);
        Self {
            anchor: start,
            facing: Some(heading(start, end)),
            kind,
            spacing,
        }
    }

    /// Slot positions for `count` units.
    #[must_use]
    pub fn slots(&self, count: usize) -> Vec<Vec2> {
        plan_formation(
            self.anchor,
            self.facing.unwrap_or(0.0),
            count,
            self.kind,
            self.spacing,
        )
    }

    /// Pair each unit with its slot.
    ///
    /// Units are sorted by handle first so repeated orders to the same
    /// selection give every unit the same slot.
    #[must_use]
    pub fn assign(&self, units: &[UnitId]) -> Vec<(UnitId, Vec2)> {
        let mut ordered = units.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        let slots = self.slots(ordered.len());
        ordered.into_iter().zip(slots).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    const EPS: f32 = 1e-4;

    fn assert_distinct(slots: &[Vec2]) {
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                assert!(a.distance(*b) > EPS, "coincident slots {a} and {b}");
            }
        }
    }

    #[test]
    fn test_every_kind_gives_n_distinct_slots() {
        for kind in FormationKind::ALL {
            for n in [1, 2, 3, 7, 10, 25, 64] {
                let slots = plan_formation(Vec2::new(3.0, -2.0), 0.4, n, kind, 1.0);
                assert_eq!(slots.len(), n, "{kind} with {n}");
                assert_distinct(&slots);
            }
        }
    }

    #[test]
    fn test_zero_units() {
        for kind in FormationKind::ALL {
            assert!(plan_formation(Vec2::ZERO, 0.0, 0, kind, 1.0).is_empty());
        }
    }

    #[test]
    fn test_idempotent() {
        let a = plan_formation(Vec2::new(1.0, 1.0), 1.2, 17, FormationKind::Wedge, 1.3);
        let b = plan_formation(Vec2::new(1.0, 1.0), 1.2, 17, FormationKind::Wedge, 1.3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_rows_and_stagger() {
        // 10 units: cols = max(4, ceil(7)) = 7
        let slots = plan_formation(Vec2::ZERO, 0.0, 10, FormationKind::Line, 1.0);
        assert!((slots[0].x + 3.0).abs() < EPS);
        assert!((slots[6].x - 3.0).abs() < EPS);
        // Second row is set back and shifted sideways
        assert!((slots[7].y - 0.8).abs() < EPS);
        assert!((slots[7].x - (-3.0 + 0.4)).abs() < EPS);
    }

    #[test]
    fn test_line_column_counts() {
        // Ranks hold min(n, max(4, ceil(0.7 n))) units
        for (n, cols) in [(3, 3), (9, 7), (20, 14)] {
            let slots = plan_formation(Vec2::ZERO, 0.0, n, FormationKind::Line, 1.0);
            let front = slots.iter().filter(|p| p.y.abs() < EPS).count();
            let ranks = slots
                .iter()
                .map(|p| (p.y / 0.8).round() as usize)
                .max()
                .unwrap()
                + 1;
            assert_eq!(front, cols, "{n} units");
            assert_eq!(ranks, n.div_ceil(cols), "{n} units");
        }
    }

    #[test]
    fn test_wedge_row_sizes() {
        let slots = plan_formation(Vec2::ZERO, 0.0, 9, FormationKind::Wedge, 1.0);
        // Apex at the anchor
        assert!(slots[0].length() < EPS);
        // Rows of 1, 3, 5
        assert!(slots[1..4].iter().all(|p| (p.y - 0.9).abs() < EPS));
        assert!(slots[4..9].iter().all(|p| (p.y - 1.8).abs() < EPS));
    }

    #[test]
    fn test_square_is_centred() {
        let slots = plan_formation(Vec2::new(5.0, 5.0), 0.0, 9, FormationKind::Square, 2.0);
        let centroid = slots.iter().copied().sum::<Vec2>() / 9.0;
        assert!((centroid - Vec2::new(5.0, 5.0)).length() < EPS);
    }

    #[test]
    fn test_circle_radius() {
        let small = plan_formation(Vec2::ZERO, 0.0, 4, FormationKind::Circle, 1.0);
        assert!(small.iter().all(|p| (p.length() - 1.5).abs() < EPS));

        let large = plan_formation(Vec2::ZERO, 0.0, 50, FormationKind::Circle, 1.0);
        assert!(large.iter().all(|p| (p.length() - 6.0).abs() < EPS));
    }

    #[test]
    fn test_rotation_preserves_shape() {
        let base = plan_formation(Vec2::ZERO, 0.0, 12, FormationKind::Square, 1.0);
        let turned = plan_formation(Vec2::ZERO, 1.1, 12, FormationKind::Square, 1.0);
        for i in 0..12 {
            for j in 0..12 {
                let d0 = base[i].distance(base[j]);
                let d1 = turned[i].distance(turned[j]);
                assert!((d0 - d1).abs() < EPS);
            }
        }
    }

    #[test]
    fn test_cycle_order() {
        let mut kind = FormationKind::Line;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(kind);
            kind = kind.next();
        }
        assert_eq!(kind, FormationKind::Line);
        assert_eq!(seen, FormationKind::ALL.to_vec());
        assert_eq!("Wedge".parse::<FormationKind>(), Ok(FormationKind::Wedge));
        assert!("blob".parse::<FormationKind>().is_err());
    }

    #[test]
    fn test_drag_order_spacing_and_facing() {
        let tuning = FormationTuning::default();
        let start = Vec2::new(0.0, 0.0);

        let short =
            FormationOrder::from_drag(start, Vec2::new(0.0, 1.0), 10, FormationKind::Line, &tuning);
        assert_eq!(short.spacing, tuning.min_drag_spacing);
        assert!(short.facing.unwrap().abs() < EPS);

        let long =
            FormationOrder::from_drag(start, Vec2::new(100.0, 0.0), 10, FormationKind::Line, &tuning);
        assert_eq!(long.spacing, tuning.max_drag_spacing);

        let mid =
            FormationOrder::from_drag(start, Vec2::new(0.0, -5.0), 10, FormationKind::Line, &tuning);
        assert!((mid.spacing - 1.0).abs() < EPS);
        assert!((mid.facing.unwrap().abs() - std::f32::consts::PI).abs() < EPS);
    }

    #[test]
    fn test_assign_is_stable_under_input_order() {
        let mut arena = Arena::new();
        let ids: Vec<_> = (0..6).map(|i| arena.insert(i)).collect();
        let order =
            FormationOrder::at(Vec2::ZERO, FormationKind::Square, &FormationTuning::default());

        let forward = order.assign(&ids);
        let mut reversed_ids = ids.clone();
        reversed_ids.reverse();
        let reversed = order.assign(&reversed_ids);
        assert_eq!(forward, reversed);
        assert_eq!(forward.len(), 6);
    }

    #[test]
    fn test_deployment_grid() {
        let slots = deployment_slots(Vec2::new(0.0, -30.0), 9, 1.5);
        assert_eq!(slots.len(), 9);
        assert_distinct(&slots);
        assert!((slots[0] - Vec2::new(-2.25, -30.0)).length() < EPS);
        assert!((slots[8] - Vec2::new(0.75, -27.0)).length() < EPS);
    }
}
