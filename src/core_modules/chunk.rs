// THEORY:
// The `Chunk` module represents a square block of the resampled working grid that
// collapses into one pixel of the large icon.
//
// Key architectural principles:
// 1.  **Spatial Pooling**: A block of `side x side` resampled pixels (12x12 in the
//     canonical configuration) approximates the average color of the matching area
//     of the full-size image. Averaging cancels most of the aliasing the nearest
//     neighbor pass introduced.
// 2.  **Exact sums, float mean**: channel sums are accumulated as integers and only
//     the final mean is a float, so block order never changes the result.
// 3.  **Borrowed view**: a `Chunk` does not copy pixels. It is an origin plus a side
//     over the resampled grid.

pub mod chunk {
    use crate::core_modules::pixel::pixel::ComputedChannel;
    use image::RgbImage;

    /// A square, borrowed block of a resampled grid.
    pub struct Chunk<'a> {
        grid: &'a RgbImage,
        /// Left column of the block in grid pixels.
        pub origin_x: u32,
        /// Top row of the block in grid pixels.
        pub origin_y: u32,
        /// Side of the block in grid pixels.
        pub side: u32,
    }

    impl<'a> Chunk<'a> {
        /// Callers keep `origin + side` inside the grid.
        pub fn new(grid: &'a RgbImage, origin_x: u32, origin_y: u32, side: u32) -> Self {
            Self {
                grid,
                origin_x,
                origin_y,
                side,
            }
        }

        /// Mean RGB of the block, each channel in 0.0-255.0.
        pub fn average_rgb(&self) -> [ComputedChannel; 3] {
            let num_pixels = self.side * self.side;
            if num_pixels == 0 {
                return [0.0; 3];
            }

            let mut sum_r = 0u32;
            let mut sum_g = 0u32;
            let mut sum_b = 0u32;
            for y in self.origin_y..self.origin_y + self.side {
                for x in self.origin_x..self.origin_x + self.side {
                    let [r, g, b] = self.grid.get_pixel(x, y).0;
                    sum_r += r as u32;
                    sum_g += g as u32;
                    sum_b += b as u32;
                }
            }

            let inv_pixels = 1.0 / num_pixels as ComputedChannel;
            [
                sum_r as ComputedChannel * inv_pixels,
                sum_g as ComputedChannel * inv_pixels,
                sum_b as ComputedChannel * inv_pixels,
            ]
        }
    }
}
