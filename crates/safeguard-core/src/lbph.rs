//! Local binary pattern histogram (LBPH) template classifier.
//!
//! Circular LBP codes (radius 1, 8 bilinearly sampled neighbours) are
//! pooled into an 8×8 grid of 256-bin histograms, each normalized by its
//! cell size. Two patches are compared with the alternative chi-square
//! distance `Σ 2(a−b)²/(a+b)`; identical patches score exactly 0.

use crate::types::Patch;
use image::GrayImage;
use std::f64::consts::PI;

pub const LBP_RADIUS: u32 = 1;
pub const LBP_NEIGHBORS: u32 = 8;
pub const LBP_GRID: u32 = 8;
const LBP_BINS: usize = 1 << LBP_NEIGHBORS;

/// A classifier trained on exactly one enrolled patch.
#[derive(Debug, Clone)]
pub struct LbphModel {
    histogram: Vec<f64>,
}

impl LbphModel {
    pub fn train(enrolled: &Patch) -> Self {
        Self {
            histogram: spatial_histogram(enrolled.as_image()),
        }
    }

    /// Distance of `probe` to the single trained class. Lower is closer.
    pub fn predict(&self, probe: &Patch) -> f64 {
        chi_square_alt(&self.histogram, &spatial_histogram(probe.as_image()))
    }
}

/// Compute the LBP code image. Output is `(w - 2r) × (h - 2r)`, row-major.
fn lbp_codes(gray: &GrayImage) -> (Vec<u8>, u32, u32) {
    let (width, height) = gray.dimensions();
    let r = LBP_RADIUS;
    if width <= 2 * r || height <= 2 * r {
        return (Vec::new(), 0, 0);
    }
    let out_w = width - 2 * r;
    let out_h = height - 2 * r;
    let mut codes = vec![0u8; (out_w * out_h) as usize];
    let at = |x: i64, y: i64| gray.get_pixel(x as u32, y as u32).0[0] as f64;

    for n in 0..LBP_NEIGHBORS {
        let angle = 2.0 * PI * n as f64 / LBP_NEIGHBORS as f64;
        let sx = r as f64 * angle.cos();
        let sy = -(r as f64) * angle.sin();

        let (fx, fy) = (sx.floor(), sy.floor());
        let (cx, cy) = (sx.ceil() as i64, sy.ceil() as i64);
        let (tx, ty) = (sx - fx, sy - fy);
        let (fx, fy) = (fx as i64, fy as i64);

        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;

        for y in r..height - r {
            for x in r..width - r {
                let (xi, yi) = (x as i64, y as i64);
                let center = at(xi, yi);
                let sample = w1 * at(xi + fx, yi + fy)
                    + w2 * at(xi + cx, yi + fy)
                    + w3 * at(xi + fx, yi + cy)
                    + w4 * at(xi + cx, yi + cy);
                if sample > center || (sample - center).abs() < f32::EPSILON as f64 {
                    codes[((y - r) * out_w + (x - r)) as usize] |= 1 << n;
                }
            }
        }
    }

    (codes, out_w, out_h)
}

/// Concatenated per-cell histograms over an `LBP_GRID`×`LBP_GRID` grid.
pub fn spatial_histogram(gray: &GrayImage) -> Vec<f64> {
    let cells = (LBP_GRID * LBP_GRID) as usize;
    let mut histogram = vec![0.0f64; cells * LBP_BINS];

    let (codes, width, height) = lbp_codes(gray);
    let cell_w = width / LBP_GRID;
    let cell_h = height / LBP_GRID;
    if cell_w == 0 || cell_h == 0 {
        return histogram;
    }
    let cell_total = (cell_w * cell_h) as f64;

    for gy in 0..LBP_GRID {
        for gx in 0..LBP_GRID {
            let base = ((gy * LBP_GRID + gx) as usize) * LBP_BINS;
            let bins = &mut histogram[base..base + LBP_BINS];
            for y in gy * cell_h..(gy + 1) * cell_h {
                let row = (y * width) as usize;
                for x in gx * cell_w..(gx + 1) * cell_w {
                    bins[codes[row + x as usize] as usize] += 1.0;
                }
            }
            for bin in bins.iter_mut() {
                *bin /= cell_total;
            }
        }
    }
    histogram
}

/// Alternative chi-square distance; empty bin pairs contribute nothing.
pub fn chi_square_alt(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .filter(|(x, y)| **x + **y > 0.0)
        .map(|(x, y)| 2.0 * (x - y).powi(2) / (x + y))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PATCH_SIZE;
    use image::Luma;

    fn gradient_x() -> Patch {
        Patch::from_gray(GrayImage::from_fn(PATCH_SIZE, PATCH_SIZE, |x, _| Luma([(30 + x) as u8])))
    }

    fn gradient_y_descending() -> Patch {
        Patch::from_gray(GrayImage::from_fn(PATCH_SIZE, PATCH_SIZE, |_, y| {
            Luma([(229 - y) as u8])
        }))
    }

    #[test]
    fn test_uniform_code_is_all_ones() {
        // Every neighbour equals the centre, so every bit is set.
        let gray = GrayImage::from_pixel(5, 5, Luma([77]));
        let (codes, w, h) = lbp_codes(&gray);
        assert_eq!((w, h), (3, 3));
        assert!(codes.iter().all(|&c| c == 0xFF));
    }

    #[test]
    fn test_single_bright_neighbour() {
        // Centre pixel of a 3×3 with only the right-hand neighbour brighter:
        // bit 0 (east) set, bits at exact grid points below centre unset.
        let mut gray = GrayImage::from_pixel(3, 3, Luma([100]));
        gray.put_pixel(1, 1, Luma([150]));
        gray.put_pixel(2, 1, Luma([200]));
        let (codes, _, _) = lbp_codes(&gray);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0] & 1, 1);
        // West, north, south neighbours are darker.
        assert_eq!(codes[0] & (1 << 4), 0);
        assert_eq!(codes[0] & (1 << 2), 0);
        assert_eq!(codes[0] & (1 << 6), 0);
    }

    #[test]
    fn test_cell_histograms_sum_to_one() {
        let hist = spatial_histogram(gradient_x().as_image());
        assert_eq!(hist.len(), (LBP_GRID * LBP_GRID) as usize * LBP_BINS);
        for cell in hist.chunks(LBP_BINS) {
            let total: f64 = cell.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_self_distance_is_zero() {
        let patch = gradient_x();
        assert_eq!(LbphModel::train(&patch).predict(&patch), 0.0);
    }

    #[test]
    fn test_orthogonal_gradients_are_far() {
        let model = LbphModel::train(&gradient_x());
        let distance = model.predict(&gradient_y_descending());
        assert!(distance > 70.0, "distance {distance}");
    }

    #[test]
    fn test_tiny_patch_has_empty_histogram() {
        let patch = Patch::from_gray(GrayImage::new(2, 2));
        assert!(spatial_histogram(patch.as_image()).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_chi_square_alt_disjoint() {
        assert_eq!(chi_square_alt(&[1.0, 0.0], &[0.0, 1.0]), 4.0);
        assert_eq!(chi_square_alt(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
    }
}
