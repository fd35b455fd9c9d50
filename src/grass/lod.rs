//! Distance-based LOD tier selection

use serde::{Deserialize, Serialize};

/// Mesh/material tier a chunk is drawn with this frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LodTier {
    /// Full-detail mesh, every visible instance kept
    Full,
    /// Low-detail mesh, far instances thinned by the density divisor
    Lod,
}

impl LodTier {
    pub const ALL: [LodTier; 2] = [LodTier::Full, LodTier::Lod];

    /// `Full` iff `distance < lod_cutoff`. A chunk exactly at the cutoff is `Lod`.
    pub fn select(distance: f32, lod_cutoff: f32) -> Self {
        if distance < lod_cutoff {
            LodTier::Full
        } else {
            LodTier::Lod
        }
    }

    /// Value of `CullParams::lod_tier`
    pub fn as_u32(self) -> u32 {
        match self {
            LodTier::Full => 0,
            LodTier::Lod => 1,
        }
    }

    /// Slot in per-tier arrays
    pub fn index(self) -> usize {
        self.as_u32() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_below_cutoff() {
        assert_eq!(LodTier::select(10.0, 50.0), LodTier::Full);
        assert_eq!(LodTier::select(0.0, 50.0), LodTier::Full);
    }

    #[test]
    fn test_select_exactly_at_cutoff_is_lod() {
        assert_eq!(LodTier::select(50.0, 50.0), LodTier::Lod);
    }

    #[test]
    fn test_select_above_cutoff() {
        assert_eq!(LodTier::select(50.001, 50.0), LodTier::Lod);
    }

    #[test]
    fn test_zero_cutoff_always_lod() {
        assert_eq!(LodTier::select(0.0, 0.0), LodTier::Lod);
    }

    #[test]
    fn test_indices_distinct() {
        assert_eq!(LodTier::Full.index(), 0);
        assert_eq!(LodTier::Lod.index(), 1);
        assert_eq!(LodTier::ALL.len(), 2);
    }
}
