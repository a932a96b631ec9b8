//! Raster thresholding: grayscale floor plan → [`OccupancyGrid`].
//!
//! Dark pixels are walls and furniture, light pixels are floor. A pixel at
//! or below the threshold becomes [`Occupancy::Blocked`].

use image::GrayImage;

use crate::grid::{Occupancy, OccupancyGrid};

/// Intensity threshold used when none is configured.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Errors raised while turning a raster into a grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// The raster has no pixels.
    #[error("invalid image: raster is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// A raw buffer whose length does not match its stated dimensions.
    #[error("invalid image: expected {expected} intensities, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The source could not be decoded.
    #[error("invalid image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Threshold a decoded grayscale image into an occupancy grid of the same
/// dimensions (`rows = height`, `cols = width`).
pub fn build_grid(image: &GrayImage, threshold: u8) -> Result<OccupancyGrid, GridError> {
    let (width, height) = image.dimensions();
    build_grid_from_raw(width, height, image.as_raw(), threshold)
}

/// Threshold a row-major intensity buffer of `width × height` bytes.
pub fn build_grid_from_raw(
    width: u32,
    height: u32,
    intensities: &[u8],
    threshold: u8,
) -> Result<OccupancyGrid, GridError> {
    if width == 0 || height == 0 {
        return Err(GridError::EmptyImage { width, height });
    }
    let expected = width as usize * height as usize;
    if intensities.len() != expected {
        return Err(GridError::SizeMismatch {
            expected,
            actual: intensities.len(),
        });
    }

    let cells: Vec<Occupancy> = intensities
        .iter()
        .map(|&v| {
            if v <= threshold {
                Occupancy::Blocked
            } else {
                Occupancy::Free
            }
        })
        .collect();

    let grid = OccupancyGrid::from_cells(height as usize, width as usize, cells).ok_or(
        GridError::SizeMismatch {
            expected,
            actual: intensities.len(),
        },
    )?;
    log::debug!(
        "built {}x{} occupancy grid at threshold {threshold}: {} free cells",
        grid.rows(),
        grid.cols(),
        grid.free_count()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Pos;
    use image::Luma;

    #[test]
    fn threshold_is_inclusive_for_blocked() {
        let raw = [0u8, 127, 128, 129, 255, 200];
        let g = build_grid_from_raw(3, 2, &raw, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(g.rows(), 2);
        assert_eq!(g.cols(), 3);
        assert!(!g.is_free(Pos::new(0, 0)));
        assert!(!g.is_free(Pos::new(0, 1)));
        assert!(!g.is_free(Pos::new(0, 2)));
        assert!(g.is_free(Pos::new(1, 0)));
        assert!(g.is_free(Pos::new(1, 1)));
        assert!(g.is_free(Pos::new(1, 2)));
    }

    #[test]
    fn image_rows_map_to_grid_rows() {
        let mut img = GrayImage::from_pixel(4, 2, Luma([255]));
        img.put_pixel(3, 1, Luma([10]));
        let g = build_grid(&img, DEFAULT_THRESHOLD).unwrap();
        assert_eq!((g.rows(), g.cols()), (2, 4));
        assert!(!g.is_free(Pos::new(1, 3)));
        assert_eq!(g.free_count(), 7);
    }

    #[test]
    fn custom_threshold() {
        let raw = [50u8, 60];
        let g = build_grid_from_raw(2, 1, &raw, 55).unwrap();
        assert!(!g.is_free(Pos::new(0, 0)));
        assert!(g.is_free(Pos::new(0, 1)));
    }

    #[test]
    fn empty_raster_is_invalid() {
        let img = GrayImage::new(0, 0);
        assert!(matches!(
            build_grid(&img, DEFAULT_THRESHOLD),
            Err(GridError::EmptyImage { .. })
        ));
    }

    #[test]
    fn mis_sized_buffer_is_invalid() {
        let err = build_grid_from_raw(3, 3, &[255; 8], DEFAULT_THRESHOLD).unwrap_err();
        assert!(matches!(
            err,
            GridError::SizeMismatch {
                expected: 9,
                actual: 8
            }
        ));
        assert!(err.to_string().starts_with("invalid image"));
    }
}
