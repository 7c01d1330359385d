//! ECS Components for agents and rooms
//!
//! Components are plain data. Optional components encode agent state:
//! an agent with `Travel` is on the road, one with `DeathMarker` is removed
//! at the start of the next tick.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lineage::LineageId;

// ============================================================================
// Identity Components
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u32);

impl RoomId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room {}", self.0)
    }
}

// ============================================================================
// Rock / Paper / Scissors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpsType {
    Rock,
    Paper,
    Scissors,
}

impl RpsType {
    pub const ALL: [RpsType; 3] = [RpsType::Rock, RpsType::Paper, RpsType::Scissors];

    /// Dense index, usable for `[T; 3]` tables.
    pub fn index(self) -> usize {
        match self {
            RpsType::Rock => 0,
            RpsType::Paper => 1,
            RpsType::Scissors => 2,
        }
    }

    /// The type this one defeats.
    pub fn beats(self) -> RpsType {
        match self {
            RpsType::Rock => RpsType::Scissors,
            RpsType::Paper => RpsType::Rock,
            RpsType::Scissors => RpsType::Paper,
        }
    }

    /// Winner of a match, `None` on a draw.
    pub fn winner(a: RpsType, b: RpsType) -> Option<RpsType> {
        if a == b {
            None
        } else if a.beats() == b {
            Some(a)
        } else {
            Some(b)
        }
    }

    /// The two types other than `self`, in canonical order.
    pub fn others(self) -> [RpsType; 2] {
        match self {
            RpsType::Rock => [RpsType::Paper, RpsType::Scissors],
            RpsType::Paper => [RpsType::Rock, RpsType::Scissors],
            RpsType::Scissors => [RpsType::Rock, RpsType::Paper],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RpsType::Rock => "rock",
            RpsType::Paper => "paper",
            RpsType::Scissors => "scissors",
        }
    }
}

impl fmt::Display for RpsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Agent Components
// ============================================================================

/// Every agent carries one. `room` is the room it lives in, or the room it
/// left while a `Travel` component is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub kind: RpsType,
    pub room: RoomId,
}

/// Reference into the lineage registry. Absent for agents that never split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage(pub LineageId);

/// Agent is on the edge between two adjacent rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travel {
    pub from: RoomId,
    pub to: RoomId,
    pub remaining: u32,
}

/// Marker: agent arrived this tick and may not depart again until the next one.
#[derive(Debug, Clone, Copy, Default)]
pub struct JustArrived;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    Natural,
    Starvation,
    Overcrowding,
    Combat,
}

/// Marker: agent dies; despawned by the cleanup stage of the following tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathMarker {
    pub cause: DeathCause,
    pub tick: u64,
}

// ============================================================================
// Rooms
// ============================================================================

/// A node of the room tree. Rooms are created once and never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub parent: Option<RoomId>,
    pub adjacent: Vec<RoomId>,
    pub depth: u32,
    pub capacity: u32,
    pub resources: u32,
    /// Consecutive ticks that ended with an empty resource pool.
    pub starvation_streak: u32,
}

impl Room {
    pub fn is_starving(&self, threshold: u32) -> bool {
        self.starvation_streak >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winner_cycle() {
        assert_eq!(RpsType::winner(RpsType::Rock, RpsType::Scissors), Some(RpsType::Rock));
        assert_eq!(RpsType::winner(RpsType::Scissors, RpsType::Paper), Some(RpsType::Scissors));
        assert_eq!(RpsType::winner(RpsType::Paper, RpsType::Rock), Some(RpsType::Paper));
        assert_eq!(RpsType::winner(RpsType::Scissors, RpsType::Rock), Some(RpsType::Rock));
        assert_eq!(RpsType::winner(RpsType::Paper, RpsType::Paper), None);
    }

    #[test]
    fn test_others_excludes_self() {
        for kind in RpsType::ALL {
            let others = kind.others();
            assert!(!others.contains(&kind));
            assert_ne!(others[0], others[1]);
        }
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_string(&RpsType::Scissors).unwrap();
        assert_eq!(json, "\"scissors\"");
    }
}
