/// Grayscale conversion helpers
///
/// Weighted luma: Y = 0.299*R + 0.587*G + 0.114*B, computed with integer
/// arithmetic as Y = (76*R + 150*G + 29*B) >> 8. Large frames are processed
/// row-parallel with rayon.
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: i32 = 76;
const COEF_G: i32 = 150;
const COEF_B: i32 = 29;

/// Frames with at least this many pixels are converted in parallel
const PARALLEL_THRESHOLD: usize = 1 << 20;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as i32 + COEF_G * g as i32 + COEF_B * b as i32) >> 8;
    lum.min(255) as u8
}

/// Convert RGB image to grayscale, switching to the parallel path for large frames
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width * height >= PARALLEL_THRESHOLD {
        return rgb_to_grayscale_parallel(rgb, width, height);
    }
    let pixel_count = width * height;
    let mut gray = Vec::with_capacity(pixel_count);
    for px in rgb.chunks_exact(3).take(pixel_count) {
        gray.push(luma(px[0], px[1], px[2]));
    }
    gray
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width * height >= PARALLEL_THRESHOLD {
        return rgba_to_grayscale_parallel(rgba, width, height);
    }
    let pixel_count = width * height;
    let mut gray = Vec::with_capacity(pixel_count);
    for px in rgba.chunks_exact(4).take(pixel_count) {
        gray.push(luma(px[0], px[1], px[2]));
    }
    gray
}

/// Convert RGB to grayscale using parallel processing
/// Processes rows in parallel for multi-core speedup
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            *out = luma(rgb[idx], rgb[idx + 1], rgb[idx + 2]);
        }
    });

    gray
}

/// Convert RGBA to grayscale using parallel processing
pub fn rgba_to_grayscale_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 4;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 4;
            *out = luma(rgba[idx], rgba[idx + 1], rgba[idx + 2]);
        }
    });

    gray
}

/// Unweighted mean of the color channels of each pixel (alpha ignored)
pub fn average_channels(data: &[u8], channels: usize) -> Vec<u16> {
    match channels {
        1 => data.iter().map(|&v| v as u16).collect(),
        3 | 4 => data
            .chunks_exact(channels)
            .map(|px| (px[0] as u16 + px[1] as u16 + px[2] as u16) / 3)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_grayscale() {
        // Pure white
        let white = vec![255, 255, 255];
        let gray = rgb_to_grayscale(&white, 1, 1);
        assert!(gray[0] >= 254);

        // Pure black
        let black = vec![0, 0, 0];
        let gray = rgb_to_grayscale(&black, 1, 1);
        assert_eq!(gray[0], 0);

        // Pure red
        let red = vec![255, 0, 0];
        let gray = rgb_to_grayscale(&red, 1, 1);
        assert!(gray[0] < 255);
        assert!(gray[0] > 0);

        // Pure green
        let green = vec![0, 255, 0];
        let gray = rgb_to_grayscale(&green, 1, 1);
        assert!(gray[0] > 100);

        // 2x2 image
        let img = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let gray = rgb_to_grayscale(&img, 2, 2);
        assert_eq!(gray.len(), 4);
    }

    #[test]
    fn test_rgba_to_grayscale() {
        let rgba = vec![255, 128, 64, 255];
        let gray = rgba_to_grayscale(&rgba, 1, 1);
        assert_eq!(gray.len(), 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let rgb: Vec<u8> = (0..(37 * 11 * 3)).map(|i| (i * 7 % 256) as u8).collect();
        let seq: Vec<u8> = rgb.chunks_exact(3).map(|p| luma(p[0], p[1], p[2])).collect();
        assert_eq!(rgb_to_grayscale_parallel(&rgb, 37, 11), seq);
    }

    #[test]
    fn test_average_channels_ignores_alpha() {
        assert_eq!(average_channels(&[30, 60, 90, 0], 4), vec![60]);
        assert_eq!(average_channels(&[255, 255, 255], 3), vec![255]);
        assert_eq!(average_channels(&[7, 9], 1), vec![7, 9]);
    }
}
