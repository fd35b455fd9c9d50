//! Terrain heightmap: normalized heights in [0, 1], one per cell
//!
//! Loaded from a grayscale image or generated from fractal Brownian motion.
//! World height is `terrain_origin.y + height * height_scale`.

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use crate::core::error::Error;
use crate::core::Result;

/// Parameters controlling procedural heightmap generation
#[derive(Clone, Debug)]
pub struct HeightmapParams {
    pub seed: u32,
    pub scale: f32,       // Horizontal scale in cells (larger = smoother)
    pub octaves: u32,     // FBM octaves (detail levels)
    pub persistence: f32, // FBM persistence (0.5 typical)
    pub lacunarity: f32,  // FBM lacunarity (2.0 typical)
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 128.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Square grid of normalized heights, row-major (z rows, x columns)
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    resolution: u32,
    heights: Vec<f32>,
}

impl Heightmap {
    /// Constant height everywhere
    pub fn flat(resolution: u32, height: f32) -> Self {
        Self::from_fn(resolution, |_, _| height)
    }

    pub fn from_fn(resolution: u32, f: impl Fn(u32, u32) -> f32) -> Self {
        let mut heights = Vec::with_capacity((resolution * resolution) as usize);
        for z in 0..resolution {
            for x in 0..resolution {
                heights.push(f(x, z).clamp(0.0, 1.0));
            }
        }
        Self { resolution, heights }
    }

    /// Fractal noise heightmap. Rows are generated in parallel.
    pub fn generate(resolution: u32, params: &HeightmapParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        let mut heights = vec![0.0f32; (resolution * resolution) as usize];
        heights
            .par_chunks_mut(resolution.max(1) as usize)
            .enumerate()
            .for_each(|(z, row)| {
                for (x, h) in row.iter_mut().enumerate() {
                    let nx = (x as f32 / params.scale) as f64;
                    let nz = (z as f32 / params.scale) as f64;
                    // Noise in [-1, 1] -> [0, 1]
                    let normalized = (noise.get([nx, nz]) + 1.0) * 0.5;
                    *h = (normalized as f32).clamp(0.0, 1.0);
                }
            });

        Self { resolution, heights }
    }

    /// Resample an image's luminance (16-bit precision) to `resolution`.
    pub fn from_image(image: &DynamicImage, resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::Config("heightmap resolution must be > 0".into()));
        }
        let luma = image
            .resize_exact(resolution, resolution, FilterType::Triangle)
            .to_luma16();
        let heights = luma.pixels().map(|p| p.0[0] as f32 / u16::MAX as f32).collect();
        Ok(Self { resolution, heights })
    }

    pub fn load(path: impl AsRef<Path>, resolution: u32) -> Result<Self> {
        let image = image::open(path)?;
        Self::from_image(&image, resolution)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Height of cell (x, z), clamped to the grid
    pub fn get(&self, x: u32, z: u32) -> f32 {
        let max = self.resolution.saturating_sub(1);
        let (x, z) = (x.min(max), z.min(max));
        self.heights[(z * self.resolution + x) as usize]
    }

    /// Bilinear sample at normalized coordinates; (0, 0) and (1, 1) are the
    /// outer edges of the grid and texel centres sit at `(i + 0.5) / resolution`.
    pub fn sample_uv(&self, u: f32, v: f32) -> f32 {
        let res = self.resolution as f32;
        let fx = (u * res - 0.5).clamp(0.0, res - 1.0);
        let fz = (v * res - 0.5).clamp(0.0, res - 1.0);
        let (x0, z0) = (fx.floor() as u32, fz.floor() as u32);
        let (tx, tz) = (fx - x0 as f32, fz - z0 as f32);

        let h00 = self.get(x0, z0);
        let h10 = self.get(x0 + 1, z0);
        let h01 = self.get(x0, z0 + 1);
        let h11 = self.get(x0 + 1, z0 + 1);
        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        top + (bottom - top) * tz
    }

    /// Bilinear resample to another resolution; identity when unchanged
    pub fn resampled(&self, resolution: u32) -> Self {
        if resolution == self.resolution {
            return self.clone();
        }
        let inv = 1.0 / resolution as f32;
        Self::from_fn(resolution, |x, z| {
            self.sample_uv((x as f32 + 0.5) * inv, (z as f32 + 0.5) * inv)
        })
    }

    /// Lowest and highest normalized height
    pub fn range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }
}
