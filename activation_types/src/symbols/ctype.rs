//! Construct type flags.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};
use std::str::FromStr;

use super::ParseSymbolError;

/// Bitmask over the kinds of constructs a network may contain.
///
/// A symbol carries exactly one flag. Unions of flags are used as filters,
/// e.g. when a container selects which members to propagate or aggregate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConstructType(u32);

impl ConstructType {
    pub const NULL: Self = Self(0);

    // Nodes
    pub const FEATURE: Self = Self(1 << 0);
    pub const CHUNK: Self = Self(1 << 1);
    pub const RULE: Self = Self(1 << 2);

    // Node pools
    pub const FEATURES: Self = Self(1 << 3);
    pub const CHUNKS: Self = Self(1 << 4);

    // Flows
    pub const FLOW_IN: Self = Self(1 << 5);
    pub const FLOW_TB: Self = Self(1 << 6);
    pub const FLOW_BT: Self = Self(1 << 7);
    pub const FLOW_TT: Self = Self(1 << 8);
    pub const FLOW_BB: Self = Self(1 << 9);

    // Terminals and state
    pub const TERMINUS: Self = Self(1 << 10);
    pub const BUFFER: Self = Self(1 << 11);
    pub const UPDATER: Self = Self(1 << 12);

    // Containers
    pub const SUBSYSTEM: Self = Self(1 << 13);
    pub const AGENT: Self = Self(1 << 14);

    pub const NODE: Self = Self(Self::FEATURE.0 | Self::CHUNK.0 | Self::RULE.0);
    pub const NODES: Self = Self(Self::FEATURES.0 | Self::CHUNKS.0);
    /// Flows between the top and bottom levels.
    pub const FLOW_H: Self = Self(Self::FLOW_BT.0 | Self::FLOW_TB.0);
    /// Flows within a single level.
    pub const FLOW_V: Self = Self(Self::FLOW_TT.0 | Self::FLOW_BB.0);
    pub const FLOW: Self = Self(Self::FLOW_IN.0 | Self::FLOW_H.0 | Self::FLOW_V.0);
    pub const CONTAINER: Self = Self(Self::SUBSYSTEM.0 | Self::AGENT.0);
    pub const ALL: Self = Self((1 << 15) - 1);
    pub const BASIC_CONSTRUCT: Self = Self(Self::ALL.0 & !Self::CONTAINER.0);

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build a mask from raw bits, discarding unknown bits.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True iff the two masks share at least one flag.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True iff every flag of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True iff exactly one flag is set.
    pub const fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Name of a single flag, `None` for composites and the empty mask.
    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(flag, _)| *flag == self)
            .map(|(_, name)| *name)
    }

    /// Iterate over the single flags set in this mask, lowest bit first.
    pub fn flags(self) -> impl Iterator<Item = ConstructType> {
        NAMES
            .iter()
            .map(|(flag, _)| *flag)
            .filter(move |flag| self.contains(*flag))
    }
}

impl BitOr for ConstructType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConstructType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ConstructType {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ConstructType {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl std::fmt::Display for ConstructType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "null");
        }
        let names: Vec<_> = self.flags().filter_map(|flag| flag.name()).collect();
        write!(f, "{}", names.join("|"))
    }
}

impl FromStr for ConstructType {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "null" {
            return Ok(Self::NULL);
        }

        let mut mask = Self::NULL;
        for part in s.split('|') {
            let part = part.trim();
            let (flag, _) = NAMES
                .iter()
                .find(|(_, name)| *name == part)
                .ok_or_else(|| ParseSymbolError::UnknownType(part.to_string()))?;
            mask |= *flag;
        }
        Ok(mask)
    }
}

static NAMES: [(ConstructType, &'static str); 15] = [
    (ConstructType::FEATURE, "feature"),
    (ConstructType::CHUNK, "chunk"),
    (ConstructType::RULE, "rule"),
    (ConstructType::FEATURES, "features"),
    (ConstructType::CHUNKS, "chunks"),
    (ConstructType::FLOW_IN, "flow_in"),
    (ConstructType::FLOW_TB, "flow_tb"),
    (ConstructType::FLOW_BT, "flow_bt"),
    (ConstructType::FLOW_TT, "flow_tt"),
    (ConstructType::FLOW_BB, "flow_bb"),
    (ConstructType::TERMINUS, "terminus"),
    (ConstructType::BUFFER, "buffer"),
    (ConstructType::UPDATER, "updater"),
    (ConstructType::SUBSYSTEM, "subsystem"),
    (ConstructType::AGENT, "agent"),
];
