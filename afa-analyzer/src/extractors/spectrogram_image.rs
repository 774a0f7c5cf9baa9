//! Spectrogram rendering and image anomaly detection
//!
//! The rendered image maps the dB spectrogram linearly onto 0..255 gray
//! levels on a fixed `width x height` canvas, low frequencies at the bottom.
//! Frames and bins are max-pooled into canvas cells (or repeated when the
//! matrix is smaller than the canvas), so clip duration does not change how
//! many pixels a steady signal covers.
//! Anomalies are pixels brighter than the configured intensity threshold;
//! 8-connected groups of them are reported as bounding boxes and outlined in
//! red on a highlighted copy.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use ndarray::{s, Array2, ArrayView2, Axis};

use crate::models::{BoundingBox, ImageAnomalyMetrics};
use crate::types::AnalysisError;

const OUTLINE: Rgb<u8> = Rgb([255, 0, 0]);

/// Rendered grayscale spectrogram and its PNG encoding
#[derive(Debug, Clone)]
pub struct RenderedSpectrogram {
    pub image: GrayImage,
    pub spectrogram_png: Vec<u8>,
}

/// Outcome of `detect_anomalies`
#[derive(Debug, Clone)]
pub struct AnomalyDetection {
    pub metrics: ImageAnomalyMetrics,
    pub highlighted: RgbImage,
}

/// Render a `[bin, frame]` dB matrix with values in `floor..=0`
pub fn render(
    db: ArrayView2<f64>,
    floor: f64,
    width: u32,
    height: u32,
) -> Result<RenderedSpectrogram, AnalysisError> {
    let (n_bins, n_frames) = db.dim();
    if n_bins == 0 || n_frames == 0 {
        return Err(AnalysisError::Internal("Empty spectrogram".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(AnalysisError::Internal("Empty canvas".to_string()));
    }

    let canvas = resample_max(db, height as usize, width as usize, floor);
    let span = -floor;
    let image = GrayImage::from_fn(width, height, |x, y| {
        let value = canvas[[(height - 1 - y) as usize, x as usize]];
        let level = if span > 0.0 {
            ((value - floor) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Luma([(level * 255.0).round() as u8])
    });

    let spectrogram_png = encode_png_gray(&image)?;
    Ok(RenderedSpectrogram {
        image,
        spectrogram_png,
    })
}

/// Max-pool a `[bin, frame]` matrix onto `rows x cols` cells, row 0 = bin 0
fn resample_max(db: ArrayView2<f64>, rows: usize, cols: usize, floor: f64) -> Array2<f64> {
    let (n_bins, n_frames) = db.dim();

    let mut by_column = Array2::from_elem((n_bins, cols), floor);
    for (x, mut column) in by_column.axis_iter_mut(Axis(1)).enumerate() {
        let frames = cell_span(x, cols, n_frames);
        column.assign(
            &db.slice(s![.., frames])
                .fold_axis(Axis(1), floor, |acc: &f64, v: &f64| acc.max(*v)),
        );
    }

    let mut canvas = Array2::from_elem((rows, cols), floor);
    for (y, mut row) in canvas.axis_iter_mut(Axis(0)).enumerate() {
        let bins = cell_span(y, rows, n_bins);
        row.assign(
            &by_column
                .slice(s![bins, ..])
                .fold_axis(Axis(0), floor, |acc: &f64, v: &f64| acc.max(*v)),
        );
    }

    canvas
}

/// Source index range covered by output cell `i` of `n`, never empty
fn cell_span(i: usize, n: usize, source_len: usize) -> std::ops::Range<usize> {
    let start = i * source_len / n;
    let end = ((i + 1) * source_len / n).max(start + 1).min(source_len);
    start..end
}

/// Intensity statistics and bright regions of a grayscale image
pub fn detect_anomalies(image: &GrayImage, threshold: u8) -> AnomalyDetection {
    let (width, height) = image.dimensions();
    let pixels = image.as_raw();

    let count = pixels.len().max(1) as f64;
    let max_intensity = pixels.iter().copied().max().unwrap_or(0);
    let min_intensity = pixels.iter().copied().min().unwrap_or(0);
    let mean = pixels.iter().map(|p| *p as f64).sum::<f64>() / count;
    let variance = pixels.iter().map(|p| (*p as f64 - mean).powi(2)).sum::<f64>() / count;

    let bright: Vec<bool> = pixels.iter().map(|p| *p > threshold).collect();
    let anomaly_pixel_count = bright.iter().filter(|b| **b).count() as u64;
    let regions = connected_regions(&bright, width, height);

    let mut highlighted = RgbImage::from_fn(width, height, |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    });
    for region in &regions {
        outline(&mut highlighted, region);
    }

    AnomalyDetection {
        metrics: ImageAnomalyMetrics {
            max_intensity,
            mean_intensity: mean,
            min_intensity,
            std_intensity: variance.sqrt(),
            anomaly_pixel_count,
            regions,
        },
        highlighted,
    }
}

/// Bounding boxes of 8-connected `true` regions, in scan order
fn connected_regions(mask: &[bool], width: u32, height: u32) -> Vec<BoundingBox> {
    let (w, h) = (width as usize, height as usize);
    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let (mut min_x, mut min_y) = (start % w, start / w);
        let (mut max_x, mut max_y) = (min_x, min_y);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let n = ny as usize * w + nx as usize;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        regions.push(BoundingBox {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        });
    }

    regions
}

fn outline(image: &mut RgbImage, region: &BoundingBox) {
    let right = region.x + region.width - 1;
    let bottom = region.y + region.height - 1;
    for x in region.x..=right {
        image.put_pixel(x, region.y, OUTLINE);
        image.put_pixel(x, bottom, OUTLINE);
    }
    for y in region.y..=bottom {
        image.put_pixel(region.x, y, OUTLINE);
        image.put_pixel(right, y, OUTLINE);
    }
}

pub fn encode_png_gray(image: &GrayImage) -> Result<Vec<u8>, AnalysisError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AnalysisError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

pub fn encode_png_rgb(image: &RgbImage) -> Result<Vec<u8>, AnalysisError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AnalysisError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}
