//! Collision categories and contact classification.
//!
//! Every fixture carries one category bit. Gameplay only cares about three
//! fixture pairings, so the raw bits are folded into a closed [`CollisionPair`]
//! in exactly one place, [`CollisionPair::classify`]. Everything downstream
//! matches on the enum instead of testing bits.

use bitflags::bitflags;

bitflags! {
    /// Category bits attached to fixtures, also used as collision masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryBits: u16 {
        const DEBRIS      = 1 << 1;
        const BOUNDARY    = 1 << 2;
        const PLAYER_FEET = 1 << 3;
        const PLAYER_BODY = 1 << 4;
    }
}

/// Semantic meaning of a contact between two fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPair {
    /// Player feet against level geometry.
    FeetBoundary,
    /// Player feet against a piece of falling debris.
    FeetDebris,
    /// Player torso against a piece of falling debris.
    BodyDebris,
    /// Anything else. Physics still resolves these; gameplay ignores them.
    Irrelevant,
}

impl CollisionPair {
    /// Classify a contact from the category bits of its two fixtures.
    ///
    /// Only an exact match of the union counts, so debris-on-debris or
    /// torso-on-boundary contacts are `Irrelevant`. Order-independent.
    pub fn classify(a: CategoryBits, b: CategoryBits) -> Self {
        let union = a | b;
        if union == CategoryBits::PLAYER_FEET | CategoryBits::BOUNDARY {
            Self::FeetBoundary
        } else if union == CategoryBits::PLAYER_FEET | CategoryBits::DEBRIS {
            Self::FeetDebris
        } else if union == CategoryBits::PLAYER_BODY | CategoryBits::DEBRIS {
            Self::BodyDebris
        } else {
            Self::Irrelevant
        }
    }

    /// Feet contacts decide grounding and kick-off eligibility.
    pub fn involves_feet(self) -> bool {
        matches!(self, Self::FeetBoundary | Self::FeetDebris)
    }

    /// Debris contacts are the only ones that can be lethal.
    pub fn involves_debris(self) -> bool {
        matches!(self, Self::FeetDebris | Self::BodyDebris)
    }
}
