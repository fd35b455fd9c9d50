//! Placement mask: which terrain cells may hold a grass blade

use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;

use crate::core::error::Error;
use crate::core::Result;

/// Square boolean grid, row-major (z rows, x columns)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementMask {
    resolution: u32,
    cells: Vec<bool>,
}

impl PlacementMask {
    /// Every cell placeable
    pub fn filled(resolution: u32) -> Self {
        Self::from_fn(resolution, |_, _| true)
    }

    pub fn from_fn(resolution: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity((resolution * resolution) as usize);
        for z in 0..resolution {
            for x in 0..resolution {
                cells.push(f(x, z));
            }
        }
        Self { resolution, cells }
    }

    /// Bilinear resize to `resolution`, then threshold the luma.
    ///
    /// Dark pixels mark grass: a cell is placeable iff its luma is below
    /// `threshold` (in [0, 1]).
    pub fn from_image(image: &DynamicImage, resolution: u32, threshold: f32) -> Result<Self> {
        if resolution == 0 {
            return Err(Error::Config("mask resolution must be > 0".into()));
        }
        let luma = image
            .resize_exact(resolution, resolution, FilterType::Triangle)
            .to_luma32f();
        let cells = luma.pixels().map(|p| p.0[0] < threshold).collect();
        Ok(Self { resolution, cells })
    }

    pub fn load(path: impl AsRef<Path>, resolution: u32, threshold: f32) -> Result<Self> {
        let image = image::open(path)?;
        Self::from_image(&image, resolution, threshold)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn is_set(&self, x: u32, z: u32) -> bool {
        x < self.resolution && z < self.resolution && self.cells[(z * self.resolution + x) as usize]
    }

    /// Placeable cells in total
    pub fn count(&self) -> u32 {
        self.cells.iter().filter(|&&c| c).count() as u32
    }

    /// Placeable cells inside a square footprint; cells past the edge count as empty
    pub fn count_in(&self, cell_origin: [u32; 2], cells: u32) -> u32 {
        let [ox, oz] = cell_origin;
        let x_end = ox.saturating_add(cells).min(self.resolution);
        let z_end = oz.saturating_add(cells).min(self.resolution);
        (oz..z_end)
            .map(|z| (ox..x_end).filter(|&x| self.is_set(x, z)).count() as u32)
            .sum()
    }

    /// One `u32` flag per cell for the placement shader
    pub fn gpu_words(&self) -> Vec<u32> {
        self.cells.iter().map(|&c| c as u32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    #[test]
    fn test_black_is_grass() {
        let black = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(8, 8, Luma([0u8])));
        let white = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(8, 8, Luma([255u8])));
        assert_eq!(PlacementMask::from_image(&black, 4, 0.5).unwrap().count(), 16);
        assert_eq!(PlacementMask::from_image(&white, 4, 0.5).unwrap().count(), 0);
    }

    #[test]
    fn test_resample_keeps_halves() {
        // Left half black, right half white
        let image = DynamicImage::ImageLuma8(ImageBuffer::from_fn(64, 64, |x, _| {
            Luma([if x < 32 { 0 } else { 255 }])
        }));
        let mask = PlacementMask::from_image(&image, 16, 0.5).unwrap();
        assert_eq!(mask.resolution(), 16);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(7, 15));
        assert!(!mask.is_set(8, 0));
        assert_eq!(mask.count(), 8 * 16);
    }

    #[test]
    fn test_count_in_clips_to_edge() {
        let mask = PlacementMask::filled(10);
        assert_eq!(mask.count_in([0, 0], 4), 16);
        assert_eq!(mask.count_in([8, 8], 4), 4);
        assert_eq!(mask.count_in([12, 0], 4), 0);
    }

    #[test]
    fn test_gpu_words() {
        let mask = PlacementMask::from_fn(2, |x, z| x == z);
        assert_eq!(mask.gpu_words(), vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let image = DynamicImage::new_luma8(2, 2);
        assert!(PlacementMask::from_image(&image, 0, 0.5).is_err());
    }
}
