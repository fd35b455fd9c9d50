//! Grass configuration (user-facing tunables).
//!
//! Everything the host can tune lives here. `validate` runs before any GPU
//! resource is created; a config that fails it never reaches the device.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::Result;
use crate::wind::WindConfig;

/// Smallest and largest accepted scan group sizes
pub const MIN_GROUP_SIZE: u32 = 32;
pub const MAX_GROUP_SIZE: u32 = 1024;

/// Host mesh/material handles and index count for one LOD tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshTier {
    /// Host-side mesh handle, passed through to `DrawCommand`
    pub mesh: u32,
    /// Host-side material handle, passed through to `DrawCommand`
    pub material: u32,
    /// Indices per blade; written once into the draw arguments
    pub index_count: u32,
}

/// User-facing grass configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GrassConfig {
    /// Placement cells per terrain side; the mask and heightmap are resampled to this
    pub terrain_dimension: u32,
    /// World units per placement cell
    pub cell_size: f32,
    /// World position of the terrain's min corner
    pub terrain_origin: [f32; 3],
    /// World height of a heightmap value of 1.0
    pub height_scale: f32,
    /// Chunk grid is `chunks_per_side x chunks_per_side`
    pub chunks_per_side: u32,
    /// Threads per scan workgroup (power of two)
    pub group_size: u32,
    /// Instances at or beyond this camera distance are culled
    pub distance_cutoff: f32,
    /// Chunks whose centre is closer than this draw the full-detail tier
    pub lod_cutoff: f32,
    /// In the LOD tier, instances beyond this distance are thinned
    pub thinning_distance: f32,
    /// In the LOD tier, keep one in `density_divisor` thinned instances
    pub density_divisor: u32,
    /// Frustum slack in world units so blades at the screen edge don't pop
    pub frustum_margin: f32,
    /// Luma below this marks a placeable cell (black = grass)
    pub mask_threshold: f32,
    /// Seed for placement jitter and displacement
    pub seed: u32,
    pub full_mesh: MeshTier,
    pub lod_mesh: MeshTier,
    pub wind: WindConfig,
}

impl Default for GrassConfig {
    fn default() -> Self {
        Self {
            terrain_dimension: 512,
            cell_size: 0.5,
            terrain_origin: [0.0; 3],
            height_scale: 40.0,
            chunks_per_side: 8,
            group_size: 128,
            distance_cutoff: 120.0,
            lod_cutoff: 45.0,
            thinning_distance: 60.0,
            density_divisor: 4,
            frustum_margin: 1.0,
            mask_threshold: 0.5,
            seed: 12345,
            full_mesh: MeshTier { mesh: 0, material: 0, index_count: 39 },
            lod_mesh: MeshTier { mesh: 1, material: 1, index_count: 9 },
            wind: WindConfig::default(),
        }
    }
}

impl GrassConfig {
    /// Reject configurations that cannot produce a valid chunk grid or dispatch.
    pub fn validate(&self) -> Result<()> {
        if self.terrain_dimension == 0 {
            return Err(Error::Config("terrain_dimension must be > 0".into()));
        }
        if self.chunks_per_side == 0 {
            return Err(Error::Config("chunks_per_side must be > 0".into()));
        }
        if self.chunks_per_side > self.terrain_dimension {
            return Err(Error::Config(format!(
                "chunks_per_side ({}) exceeds terrain_dimension ({})",
                self.chunks_per_side, self.terrain_dimension
            )));
        }
        validate_group_size(self.group_size)?;
        positive("cell_size", self.cell_size)?;
        positive("distance_cutoff", self.distance_cutoff)?;
        non_negative("height_scale", self.height_scale)?;
        non_negative("lod_cutoff", self.lod_cutoff)?;
        non_negative("thinning_distance", self.thinning_distance)?;
        non_negative("frustum_margin", self.frustum_margin)?;
        if self.density_divisor == 0 {
            return Err(Error::Config("density_divisor must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.mask_threshold) {
            return Err(Error::Config(format!(
                "mask_threshold must be within [0, 1], got {}",
                self.mask_threshold
            )));
        }
        if self.terrain_origin.iter().any(|v| !v.is_finite()) {
            return Err(Error::Config("terrain_origin must be finite".into()));
        }
        for (name, tier) in [("full_mesh", &self.full_mesh), ("lod_mesh", &self.lod_mesh)] {
            if tier.index_count == 0 {
                return Err(Error::Config(format!("{name}.index_count must be > 0")));
            }
        }
        self.wind.validate()
    }

    /// Cells per chunk side; the last row/column of chunks may be clipped
    pub fn cells_per_chunk(&self) -> u32 {
        self.terrain_dimension.div_ceil(self.chunks_per_side)
    }

    /// World size of one chunk side
    pub fn chunk_world_size(&self) -> f32 {
        self.cells_per_chunk() as f32 * self.cell_size
    }

    /// World size of the whole terrain side
    pub fn terrain_world_size(&self) -> f32 {
        self.terrain_dimension as f32 * self.cell_size
    }

    pub fn mesh_tier(&self, tier: crate::grass::LodTier) -> &MeshTier {
        match tier {
            crate::grass::LodTier::Full => &self.full_mesh,
            crate::grass::LodTier::Lod => &self.lod_mesh,
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Group size must be a power of two within the supported range.
/// Device limits are checked separately when the pipelines are built.
pub fn validate_group_size(group_size: u32) -> Result<()> {
    if !group_size.is_power_of_two() || !(MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(&group_size) {
        return Err(Error::Config(format!(
            "group_size must be a power of two in {MIN_GROUP_SIZE}..={MAX_GROUP_SIZE}, got {group_size}"
        )));
    }
    Ok(())
}

fn positive(name: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::Config(format!("{name} must be finite and > 0, got {value}")));
    }
    Ok(())
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(Error::Config(format!("{name} must be finite and >= 0, got {value}")));
    }
    Ok(())
}
