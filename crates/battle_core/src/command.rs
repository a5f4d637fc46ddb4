//! Player command dispatch.
//!
//! Input decoding happens elsewhere; this module receives decoded
//! [`PlayerIntent`]s and turns them into selection changes and unit orders
//! for one team. Move orders go through the formation planner, and the same
//! planning backs [`CommandDispatcher::preview_move`] and
//! [`CommandDispatcher::preview_drag`], so a previewed formation is exactly
//! where the units end up.
//!
//! Orders to an empty selection are silently dropped. Dead units fall out of
//! the selection before every intent is handled.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::archetype::Team;
use crate::arena::UnitId;
use crate::error::{BattleError, Result};
use crate::formation::{FormationKind, FormationOrder};
use crate::math::{heading, Vec2};
use crate::simulation::Simulation;
use crate::snapshot::{BattlePhase, SelectionSummary};

/// Number of control groups, bound to keys 1 to 9.
pub const CONTROL_GROUPS: usize = 9;

/// A decoded player action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerIntent {
    /// Click on a unit, or on empty ground when `unit` is `None`.
    Select {
        /// Unit under the cursor.
        unit: Option<UnitId>,
        /// Add to the selection instead of replacing it.
        additive: bool,
    },
    /// Drag-box selection over a world-space rectangle.
    SelectBox {
        /// One corner of the box.
        corner_a: Vec2,
        /// The opposite corner.
        corner_b: Vec2,
        /// Add to the selection instead of replacing it.
        additive: bool,
    },
    /// Select every live unit of the team.
    SelectAll,
    /// Select one squad.
    SelectSquad(u32),
    /// Select the next squad in id order.
    CycleSquad,
    /// Drop the selection.
    ClearSelection,
    /// Store the selection in a control group (1 to 9).
    SaveGroup(u8),
    /// Select the live members of a control group (1 to 9).
    RecallGroup(u8),
    /// Move the selection to `target` in the current formation.
    Move {
        /// Formation anchor.
        target: Vec2,
        /// Leave guard mode untouched instead of clearing it.
        keep_guard: bool,
    },
    /// Move with an explicit facing and width taken from a drag gesture.
    DragMove {
        /// Drag start, used as the anchor.
        start: Vec2,
        /// Drag end; sets facing and spread.
        end: Vec2,
        /// Leave guard mode untouched instead of clearing it.
        keep_guard: bool,
    },
    /// Stop in place.
    Hold,
    /// Flip guard mode on every selected unit.
    ToggleGuard,
    /// Set guard mode on every selected unit.
    SetGuard(bool),
    /// Switch to the next formation kind.
    CycleFormation,
    /// Switch to a specific formation kind.
    SetFormation(FormationKind),
}

/// Selection and order state for one controlling team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDispatcher {
    team: Team,
    selection: Vec<UnitId>,
    groups: [Vec<UnitId>; CONTROL_GROUPS],
    formation: FormationKind,
    squad_cursor: Option<u32>,
}

impl CommandDispatcher {
    /// Dispatcher for `team` with nothing selected.
    #[must_use]
    pub fn new(team: Team) -> Self {
        Self {
            team,
            selection: Vec::new(),
            groups: Default::default(),
            formation: FormationKind::default(),
            squad_cursor: None,
        }
    }

    /// The team this dispatcher commands.
    #[must_use]
    pub const fn team(&self) -> Team {
        self.team
    }

    /// Selected units, in the order they were picked.
    #[must_use]
    pub fn selection(&self) -> &[UnitId] {
        &self.selection
    }

    /// Formation used by the next move order.
    #[must_use]
    pub const fn formation(&self) -> FormationKind {
        self.formation
    }

    /// Members stored in a control group.
    pub fn group(&self, group: u8) -> Result<&[UnitId]> {
        Ok(&self.groups[group_slot(group)?])
    }

    /// Handle one intent.
    ///
    /// Fails only when the intent names something that does not exist: an
    /// unknown unit handle or a control group outside 1 to 9.
    pub fn dispatch(&mut self, sim: &mut Simulation, intent: PlayerIntent) -> Result<()> {
        self.prune(sim);

        match intent {
            PlayerIntent::Select { unit, additive } => {
                if let Some(id) = unit {
                    sim.unit(id)?;
                }
                let mut picked = if additive {
                    self.selection.clone()
                } else {
                    Vec::new()
                };
                picked.extend(unit.filter(|&id| self.is_own_live(sim, id)));
                self.replace_selection(sim, picked);
            }
            PlayerIntent::SelectBox {
                corner_a,
                corner_b,
                additive,
            } => {
                let (min, max) = (corner_a.min(corner_b), corner_a.max(corner_b));
                let mut picked = if additive {
                    self.selection.clone()
                } else {
                    Vec::new()
                };
                picked.extend(self.own_live(sim).filter(|id| {
                    sim.unit(*id).is_ok_and(|u| {
                        let p = u.position;
                        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
                    })
                }));
                self.replace_selection(sim, picked);
            }
            PlayerIntent::SelectAll => {
                let all = self.own_live(sim).collect();
                self.replace_selection(sim, all);
            }
            PlayerIntent::SelectSquad(squad) => {
                self.select_squad(sim, squad);
            }
            PlayerIntent::CycleSquad => {
                if let Some(squad) = self.next_squad(sim) {
                    self.select_squad(sim, squad);
                }
            }
            PlayerIntent::ClearSelection => {
                self.replace_selection(sim, Vec::new());
            }
            PlayerIntent::SaveGroup(group) => {
                let slot = group_slot(group)?;
                self.groups[slot] = self.selection.clone();
                debug!(group, size = self.selection.len(), "Control group saved");
            }
            PlayerIntent::RecallGroup(group) => {
                let slot = group_slot(group)?;
                let members: Vec<UnitId> = self.groups[slot]
                    .iter()
                    .copied()
                    .filter(|&id| self.is_own_live(sim, id))
                    .collect();
                if !members.is_empty() {
                    self.replace_selection(sim, members);
                }
            }
            PlayerIntent::Move { target, keep_guard } => {
                let order = FormationOrder::at(target, self.formation, &sim.config().formation);
                self.issue_move(sim, order, keep_guard);
            }
            PlayerIntent::DragMove {
                start,
                end,
                keep_guard,
            } => {
                let order = FormationOrder::from_drag(
                    start,
                    end,
                    self.selection.len(),
                    self.formation,
                    &sim.config().formation,
                );
                self.issue_move(sim, order, keep_guard);
            }
            PlayerIntent::Hold => {
                for &id in &self.selection {
                    if let Ok(unit) = sim.unit_mut(id) {
                        unit.hold();
                    }
                }
            }
            PlayerIntent::ToggleGuard => {
                for &id in &self.selection {
                    if let Ok(unit) = sim.unit_mut(id) {
                        let guarding = !unit.is_guarding;
                        unit.set_guard(guarding);
                    }
                }
            }
            PlayerIntent::SetGuard(guarding) => {
                for &id in &self.selection {
                    if let Ok(unit) = sim.unit_mut(id) {
                        unit.set_guard(guarding);
                    }
                }
            }
            PlayerIntent::CycleFormation => {
                self.formation = self.formation.next();
                debug!(formation = %self.formation, "Formation changed");
            }
            PlayerIntent::SetFormation(kind) => {
                self.formation = kind;
                debug!(formation = %self.formation, "Formation changed");
            }
        }
        Ok(())
    }

    /// Where the selection would stand after a plain move to `target`.
    ///
    /// Slots are returned in handle order of the selected units.
    #[must_use]
    pub fn preview_move(&self, sim: &Simulation, target: Vec2) -> Vec<Vec2> {
        let order = FormationOrder::at(target, self.formation, &sim.config().formation);
        self.plan(sim, order).into_iter().map(|(_, slot)| slot).collect()
    }

    /// Where the selection would stand after a drag from `start` to `end`.
    #[must_use]
    pub fn preview_drag(&self, sim: &Simulation, start: Vec2, end: Vec2) -> Vec<Vec2> {
        let order = FormationOrder::from_drag(
            start,
            end,
            self.live_selection(sim).len(),
            self.formation,
            &sim.config().formation,
        );
        self.plan(sim, order).into_iter().map(|(_, slot)| slot).collect()
    }

    /// Mean position of the live selected units.
    #[must_use]
    pub fn selection_centroid(&self, sim: &Simulation) -> Option<Vec2> {
        let positions: Vec<Vec2> = self
            .live_selection(sim)
            .iter()
            .filter_map(|&id| sim.unit(id).ok().map(|u| u.position))
            .collect();
        if positions.is_empty() {
            return None;
        }
        Some(positions.iter().copied().sum::<Vec2>() / positions.len() as f32)
    }

    /// Counts and health of the live selected units.
    #[must_use]
    pub fn selection_summary(&self, sim: &Simulation) -> SelectionSummary {
        SelectionSummary::from_units(
            self.live_selection(sim)
                .iter()
                .filter_map(|&id| sim.unit(id).ok()),
        )
    }

    fn issue_move(&mut self, sim: &mut Simulation, order: FormationOrder, keep_guard: bool) {
        if self.selection.is_empty() {
            return;
        }
        let anchor = order.anchor;
        let assignments = self.plan(sim, order);
        debug!(
            team = %self.team,
            units = assignments.len(),
            formation = %order.kind,
            anchor = ?anchor,
            "Move order"
        );

        for (id, slot) in assignments {
            let Ok(unit) = sim.unit_mut(id) else {
                continue;
            };
            let rest_facing = order
                .facing
                .unwrap_or_else(|| heading(unit.position, anchor));
            unit.order_move(slot, Some(rest_facing), keep_guard);
        }
    }

    /// Pair live selected units with their clamped formation slots.
    fn plan(&self, sim: &Simulation, mut order: FormationOrder) -> Vec<(UnitId, Vec2)> {
        let deploying = sim.phase() == BattlePhase::Deployment;
        let territory = sim.config().territory;
        if deploying {
            order.anchor.y = territory.clamp_z(self.team, order.anchor.y);
        }

        order
            .assign(&self.live_selection(sim))
            .into_iter()
            .map(|(id, mut slot)| {
                if deploying {
                    slot.y = territory.clamp_z(self.team, slot.y);
                }
                (id, sim.context().clamp_to_field(slot))
            })
            .collect()
    }

    fn select_squad(&mut self, sim: &mut Simulation, squad: u32) {
        let members: Vec<UnitId> = self
            .own_live(sim)
            .filter(|&id| sim.unit(id).is_ok_and(|u| u.squad_id == squad))
            .collect();
        self.squad_cursor = Some(squad);
        self.replace_selection(sim, members);
    }

    /// The squad after the cursor among squads with live members, wrapping.
    fn next_squad(&self, sim: &Simulation) -> Option<u32> {
        let mut squads: Vec<u32> = self
            .own_live(sim)
            .filter_map(|id| sim.unit(id).ok().map(|u| u.squad_id))
            .collect();
        squads.sort_unstable();
        squads.dedup();

        match self.squad_cursor {
            Some(current) => squads
                .iter()
                .copied()
                .find(|&s| s > current)
                .or_else(|| squads.first().copied()),
            None => squads.first().copied(),
        }
    }

    fn replace_selection(&mut self, sim: &mut Simulation, mut picked: Vec<UnitId>) {
        let mut seen = std::collections::HashSet::with_capacity(picked.len());
        picked.retain(|id| seen.insert(*id));

        for &id in &self.selection {
            if let Ok(unit) = sim.unit_mut(id) {
                unit.is_selected = false;
            }
        }
        for &id in &picked {
            if let Ok(unit) = sim.unit_mut(id) {
                unit.is_selected = true;
            }
        }
        self.selection = picked;
    }

    /// Drop dead and removed units from the selection.
    fn prune(&mut self, sim: &mut Simulation) {
        let before = self.selection.len();
        let team = self.team;
        self.selection.retain(|&id| match sim.unit(id) {
            Ok(unit) => unit.team == team && unit.is_alive(),
            Err(_) => false,
        });
        if self.selection.len() != before {
            debug!(dropped = before - self.selection.len(), "Pruned selection");
        }
    }

    fn live_selection(&self, sim: &Simulation) -> Vec<UnitId> {
        self.selection
            .iter()
            .copied()
            .filter(|&id| self.is_own_live(sim, id))
            .collect()
    }

    fn is_own_live(&self, sim: &Simulation, id: UnitId) -> bool {
        sim.unit(id)
            .is_ok_and(|u| u.team == self.team && u.is_alive())
    }

    fn own_live<'a>(&self, sim: &'a Simulation) -> impl Iterator<Item = UnitId> + 'a {
        let team = self.team;
        sim.context()
            .units
            .iter()
            .filter(move |(_, u)| u.team == team && u.is_alive())
            .map(|(id, _)| id)
    }
}

fn group_slot(group: u8) -> Result<usize> {
    if (1..=CONTROL_GROUPS as u8).contains(&group) {
        Ok(usize::from(group) - 1)
    } else {
        warn!(group, "Control group out of range");
        Err(BattleError::InvalidControlGroup(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::Archetype;
    use crate::config::BattleConfig;
    use crate::unit::UnitState;

    fn battle() -> (Simulation, Vec<UnitId>, UnitId) {
        let config = BattleConfig::default().with_ai_teams(&[]);
        let mut sim = Simulation::new(config).unwrap();
        let own = vec![
            sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(-2.0, -30.0), 0),
            sim.spawn_unit(Team::Attacker, Archetype::Melee, Vec2::new(0.0, -30.0), 0),
            sim.spawn_unit(Team::Attacker, Archetype::Ranged, Vec2::new(2.0, -30.0), 1),
            sim.spawn_unit(Team::Attacker, Archetype::Mounted, Vec2::new(4.0, -30.0), 2),
        ];
        let enemy = sim.spawn_unit(Team::Defender, Archetype::Melee, Vec2::new(0.0, 30.0), 5);
        (sim, own, enemy)
    }

    fn select(dispatcher: &mut CommandDispatcher, sim: &mut Simulation, id: UnitId, additive: bool) {
        dispatcher
            .dispatch(
                sim,
                PlayerIntent::Select {
                    unit: Some(id),
                    additive,
                },
            )
            .unwrap();
    }

    #[test]
    fn test_click_select_replaces_and_adds() {
        let (mut sim, own, enemy) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);

        select(&mut cmd, &mut sim, own[0], false);
        select(&mut cmd, &mut sim, own[1], true);
        assert_eq!(cmd.selection(), &[own[0], own[1]]);
        assert!(sim.unit(own[0]).unwrap().is_selected);

        select(&mut cmd, &mut sim, own[2], false);
        assert_eq!(cmd.selection(), &[own[2]]);
        assert!(!sim.unit(own[0]).unwrap().is_selected);

        // Enemies cannot be selected; a plain click on one clears
        select(&mut cmd, &mut sim, enemy, false);
        assert!(cmd.selection().is_empty());
        assert!(!sim.unit(enemy).unwrap().is_selected);
    }

    #[test]
    fn test_box_select() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(
            &mut sim,
            PlayerIntent::SelectBox {
                corner_a: Vec2::new(1.0, -25.0),
                corner_b: Vec2::new(-3.0, -35.0),
                additive: false,
            },
        )
        .unwrap();
        assert_eq!(cmd.selection(), &[own[0], own[1]]);
    }

    #[test]
    fn test_select_all_skips_dead_and_enemies() {
        let (mut sim, own, _) = battle();
        sim.unit_mut(own[3]).unwrap().kill();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(&mut sim, PlayerIntent::SelectAll).unwrap();
        assert_eq!(cmd.selection(), &own[..3]);
    }

    #[test]
    fn test_cycle_squads_wraps() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);

        cmd.dispatch(&mut sim, PlayerIntent::CycleSquad).unwrap();
        assert_eq!(cmd.selection(), &[own[0], own[1]]);
        cmd.dispatch(&mut sim, PlayerIntent::CycleSquad).unwrap();
        assert_eq!(cmd.selection(), &[own[2]]);
        cmd.dispatch(&mut sim, PlayerIntent::CycleSquad).unwrap();
        assert_eq!(cmd.selection(), &[own[3]]);
        cmd.dispatch(&mut sim, PlayerIntent::CycleSquad).unwrap();
        assert_eq!(cmd.selection(), &[own[0], own[1]]);
    }

    #[test]
    fn test_control_groups() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);

        select(&mut cmd, &mut sim, own[0], false);
        select(&mut cmd, &mut sim, own[2], true);
        cmd.dispatch(&mut sim, PlayerIntent::SaveGroup(3)).unwrap();
        cmd.dispatch(&mut sim, PlayerIntent::ClearSelection).unwrap();
        assert!(cmd.selection().is_empty());

        sim.unit_mut(own[0]).unwrap().kill();
        cmd.dispatch(&mut sim, PlayerIntent::RecallGroup(3)).unwrap();
        assert_eq!(cmd.selection(), &[own[2]]);
        assert_eq!(cmd.group(3).unwrap().len(), 2);

        assert_eq!(
            cmd.dispatch(&mut sim, PlayerIntent::SaveGroup(0)),
            Err(BattleError::InvalidControlGroup(0))
        );
        assert_eq!(
            cmd.dispatch(&mut sim, PlayerIntent::RecallGroup(10)),
            Err(BattleError::InvalidControlGroup(10))
        );
    }

    #[test]
    fn test_move_matches_preview() {
        let (mut sim, own, _) = battle();
        sim.begin_battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(&mut sim, PlayerIntent::SelectAll).unwrap();
        cmd.dispatch(&mut sim, PlayerIntent::SetFormation(FormationKind::Wedge))
            .unwrap();

        let target = Vec2::new(10.0, 10.0);
        let preview = cmd.preview_move(&sim, target);
        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target,
                keep_guard: false,
            },
        )
        .unwrap();

        for (id, slot) in own.iter().zip(&preview) {
            let unit = sim.unit(*id).unwrap();
            assert_eq!(unit.state, UnitState::Moving);
            assert_eq!(unit.target_position, Some(*slot));
            let facing = heading(unit.position, target);
            assert!((unit.rest_facing.unwrap() - facing).abs() < 1e-5);
        }
    }

    #[test]
    fn test_drag_move_faces_along_drag() {
        let (mut sim, own, _) = battle();
        sim.begin_battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(&mut sim, PlayerIntent::SelectAll).unwrap();

        let (start, end) = (Vec2::new(0.0, 0.0), Vec2::new(8.0, 0.0));
        let preview = cmd.preview_drag(&sim, start, end);
        cmd.dispatch(
            &mut sim,
            PlayerIntent::DragMove {
                start,
                end,
                keep_guard: false,
            },
        )
        .unwrap();

        let expected = std::f32::consts::FRAC_PI_2;
        for (id, slot) in own.iter().zip(&preview) {
            let unit = sim.unit(*id).unwrap();
            assert_eq!(unit.target_position, Some(*slot));
            assert!((unit.rest_facing.unwrap() - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_deployment_clamps_to_own_side() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(&mut sim, PlayerIntent::SelectAll).unwrap();
        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::new(0.0, 20.0),
                keep_guard: false,
            },
        )
        .unwrap();
        for id in &own {
            let z = sim.unit(*id).unwrap().target_position.unwrap().y;
            assert!(z <= -6.0, "slot at z {z}");
        }

        // The clamp lifts once the battle starts
        sim.begin_battle();
        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::new(0.0, 20.0),
                keep_guard: false,
            },
        )
        .unwrap();
        assert!(own
            .iter()
            .any(|id| sim.unit(*id).unwrap().target_position.unwrap().y > 0.0));
    }

    #[test]
    fn test_empty_selection_orders_are_noops() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        let hash = sim.state_hash();
        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::ZERO,
                keep_guard: false,
            },
        )
        .unwrap();
        cmd.dispatch(&mut sim, PlayerIntent::ToggleGuard).unwrap();
        cmd.dispatch(&mut sim, PlayerIntent::Hold).unwrap();
        assert_eq!(sim.state_hash(), hash);
        assert!(!sim.unit(own[0]).unwrap().is_guarding);
    }

    #[test]
    fn test_guard_toggle_and_move_clear() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        select(&mut cmd, &mut sim, own[0], false);

        cmd.dispatch(&mut sim, PlayerIntent::ToggleGuard).unwrap();
        let unit = sim.unit(own[0]).unwrap();
        assert!(unit.is_guarding);
        assert_eq!(unit.state, UnitState::Idle);

        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::new(0.0, -20.0),
                keep_guard: true,
            },
        )
        .unwrap();
        assert!(sim.unit(own[0]).unwrap().is_guarding);

        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::new(0.0, -20.0),
                keep_guard: false,
            },
        )
        .unwrap();
        assert!(!sim.unit(own[0]).unwrap().is_guarding);
    }

    #[test]
    fn test_hold_stops_movers() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        select(&mut cmd, &mut sim, own[1], false);
        cmd.dispatch(
            &mut sim,
            PlayerIntent::Move {
                target: Vec2::new(0.0, -10.0),
                keep_guard: false,
            },
        )
        .unwrap();
        sim.tick();
        cmd.dispatch(&mut sim, PlayerIntent::Hold).unwrap();
        let unit = sim.unit(own[1]).unwrap();
        assert_eq!(unit.state, UnitState::Idle);
        assert!(unit.target_position.is_none());
    }

    #[test]
    fn test_dead_units_leave_selection() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        cmd.dispatch(&mut sim, PlayerIntent::SelectAll).unwrap();
        sim.unit_mut(own[0]).unwrap().kill();
        cmd.dispatch(&mut sim, PlayerIntent::CycleFormation).unwrap();
        assert_eq!(cmd.selection(), &own[1..]);
        assert_eq!(cmd.formation(), FormationKind::Wedge);
    }

    #[test]
    fn test_summary_and_centroid() {
        let (mut sim, own, _) = battle();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        assert_eq!(cmd.selection_centroid(&sim), None);

        select(&mut cmd, &mut sim, own[1], false);
        select(&mut cmd, &mut sim, own[2], true);
        let summary = cmd.selection_summary(&sim);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.of(Archetype::Melee), 1);
        assert_eq!(summary.of(Archetype::Ranged), 1);
        assert_eq!(summary.max_hp, 180.0);

        let centroid = cmd.selection_centroid(&sim).unwrap();
        assert!((centroid - Vec2::new(1.0, -30.0)).length() < 1e-5);
    }

    #[test]
    fn test_unknown_handle_is_an_error() {
        let (mut sim, own, _) = battle();
        sim.remove_unit(own[3]).unwrap();
        let mut cmd = CommandDispatcher::new(Team::Attacker);
        let err = cmd
            .dispatch(
                &mut sim,
                PlayerIntent::Select {
                    unit: Some(own[3]),
                    additive: false,
                },
            )
            .unwrap_err();
        assert!(matches!(err, BattleError::UnitNotFound(_) | BattleError::StaleHandle(_)));
    }
}
