use std::path::Path;

use anyhow::Context;
use burn::tensor::{backend::Backend, Tensor};
use image::{GrayImage, Luma};

pub const GRID_PADDING: usize = 2;

fn to_intensity(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Tiles `count` square images (`side * side` values each, row-major) into a grid with `nrow`
/// images per row. Every tile is surrounded by `padding` black pixels.
pub fn make_grid(pixels: &[f32], count: usize, side: usize, nrow: usize, padding: usize) -> GrayImage {
    let columns = nrow.min(count).max(1);
    let rows = count.div_ceil(columns);
    let cell = side + padding;
    let width = columns * cell + padding;
    let height = rows * cell + padding;

    let mut grid = GrayImage::new(width as u32, height as u32);
    for (index, image) in pixels.chunks_exact(side * side).take(count).enumerate() {
        let left = (index % columns) * cell + padding;
        let top = (index / columns) * cell + padding;
        for (offset, value) in image.iter().enumerate() {
            let x = left + offset % side;
            let y = top + offset / side;
            grid.put_pixel(x as u32, y as u32, Luma([to_intensity(*value)]));
        }
    }
    grid
}

/// Writes `images` (`[n, 1, side, side]`) as a PNG grid with `nrow` images per row.
pub fn save_image_grid<B: Backend>(images: Tensor<B, 4>, nrow: usize, path: &Path) -> anyhow::Result<()> {
    let [count, _, side, _] = images.dims();
    let pixels = images
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| anyhow::anyhow!("failed to read image tensor: {err:?}"))?;

    make_grid(&pixels, count, side, nrow, GRID_PADDING)
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::debug!("saved {count} images to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn grid_dimensions_follow_rows_and_padding() {
        let pixels = vec![0.5; 10 * 4 * 4];
        let grid = make_grid(&pixels, 10, 4, 8, 2);

        // 8 columns, 2 rows of 4x4 tiles with a 2 pixel border around each.
        assert_eq!(grid.width(), 8 * 6 + 2);
        assert_eq!(grid.height(), 2 * 6 + 2);
    }

    #[test]
    fn fewer_images_than_nrow_use_a_single_row() {
        let grid = make_grid(&[1.0; 3 * 4], 3, 2, 11, 2);
        assert_eq!((grid.width(), grid.height()), (3 * 4 + 2, 4 + 2));
    }

    #[test]
    fn tiles_land_inside_padding() {
        let mut pixels = vec![0.0; 2 * 2 * 2];
        pixels[4..8].copy_from_slice(&[1.0, 0.0, 0.0, 1.0]);
        let grid = make_grid(&pixels, 2, 2, 2, 2);

        // Second tile starts at x = 2 + (2 + 2).
        assert_eq!(grid.get_pixel(6, 2).0, [255]);
        assert_eq!(grid.get_pixel(7, 2).0, [0]);
        assert_eq!(grid.get_pixel(7, 3).0, [255]);
        assert_eq!(grid.get_pixel(5, 2).0, [0]);
    }

    #[test]
    fn intensities_are_clamped_and_rounded() {
        assert_eq!(to_intensity(-0.5), 0);
        assert_eq!(to_intensity(2.0), 255);
        assert_eq!(to_intensity(0.5), 128);
    }

    #[test]
    fn saves_png_from_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let device = Default::default();
        let images = Tensor::<NdArray<f32>, 4>::ones([3, 1, 5, 5], &device);

        save_image_grid(images, 3, &path).unwrap();

        let written = image::open(&path).unwrap().into_luma8();
        assert_eq!((written.width(), written.height()), (3 * 7 + 2, 7 + 2));
        assert_eq!(written.get_pixel(2, 2).0, [255]);
    }
}
