//! Generational storage for battle units.
//!
//! Units refer to each other through [`UnitId`] handles. A handle carries the
//! generation of the slot it was issued for, so a handle to a removed unit
//! never resolves to whatever later reuses the slot. Liveness checks are a
//! single index plus a generation compare.
//!
//! Iteration is always in slot order, which keeps every pass over the units
//! deterministic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};

/// Generational handle to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    index: u32,
    generation: u32,
}

impl UnitId {
    /// Slot index of this handle.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this handle was issued for.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SlotState<T> {
    Occupied(T),
    /// Temporarily moved out by [`Arena::take`].
    CheckedOut,
    Vacant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// Slot arena with generational handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Create an empty arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Insert a value and return its handle.
    ///
    /// Vacant slots are reused, lowest index first, with a bumped generation.
    pub fn insert(&mut self, value: T) -> UnitId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Occupied(value);
            return UnitId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Occupied(value),
        });
        UnitId {
            index,
            generation: 0,
        }
    }

    /// Remove the value behind `id`, invalidating every copy of the handle.
    pub fn remove(&mut self, id: UnitId) -> Result<T> {
        self.check(id)?;
        let slot = &mut self.slots[id.index as usize];
        match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Occupied(value) => {
                slot.generation = slot.generation.wrapping_add(1);
                self.len -= 1;
                self.free.push(id.index);
                // Keep reuse lowest-index-first
                self.free.sort_unstable_by(|a, b| b.cmp(a));
                Ok(value)
            }
            other => {
                slot.state = other;
                Err(BattleError::UnitNotFound(id))
            }
        }
    }

    fn check(&self, id: UnitId) -> Result<()> {
        match self.slots.get(id.index as usize) {
            None => Err(BattleError::UnitNotFound(id)),
            Some(slot) if slot.generation != id.generation => Err(BattleError::StaleHandle(id)),
            Some(_) => Ok(()),
        }
    }

    /// Borrow the value behind `id`.
    ///
    /// Returns `None` for stale handles and for values currently taken out.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        match &slot.state {
            SlotState::Occupied(value) if slot.generation == id.generation => Some(value),
            _ => None,
        }
    }

    /// Mutably borrow the value behind `id`.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        match &mut slot.state {
            SlotState::Occupied(value) if slot.generation == id.generation => Some(value),
            _ => None,
        }
    }

    /// Like [`get`](Self::get) but reports why the lookup failed.
    pub fn try_get(&self, id: UnitId) -> Result<&T> {
        self.check(id)?;
        self.get(id).ok_or(BattleError::UnitNotFound(id))
    }

    /// Like [`get_mut`](Self::get_mut) but reports why the lookup failed.
    pub fn try_get_mut(&mut self, id: UnitId) -> Result<&mut T> {
        self.check(id)?;
        self.get_mut(id).ok_or(BattleError::UnitNotFound(id))
    }

    /// Whether `id` still refers to a stored value.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.get(id).is_some()
    }

    /// Move a value out of its slot for an exclusive update.
    ///
    /// While taken, the value is invisible to lookups and iteration, and the
    /// slot cannot be reused. Hand it back with [`restore`](Self::restore).
    pub fn take(&mut self, id: UnitId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match std::mem::replace(&mut slot.state, SlotState::CheckedOut) {
            SlotState::Occupied(value) => Some(value),
            other => {
                slot.state = other;
                None
            }
        }
    }

    /// Return a value previously moved out with [`take`](Self::take).
    pub fn restore(&mut self, id: UnitId, value: T) -> Result<()> {
        self.check(id)?;
        let slot = &mut self.slots[id.index as usize];
        if matches!(slot.state, SlotState::CheckedOut) {
            slot.state = SlotState::Occupied(value);
            Ok(())
        } else {
            Err(BattleError::UnitNotFound(id))
        }
    }

    /// Number of stored values, including any currently taken out.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handles of all stored values in slot order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Iterate stored values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let SlotState::Occupied(value) = &slot.state else {
                return None;
            };
            let id = UnitId {
                index: u32::try_from(index).ok()?,
                generation: slot.generation,
            };
            Some((id, value))
        })
    }

    /// Iterate stored values mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (UnitId, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            let SlotState::Occupied(value) = &mut slot.state else {
                return None;
            };
            let id = UnitId {
                index: u32::try_from(index).ok()?,
                generation,
            };
            Some((id, value))
        })
    }
}
