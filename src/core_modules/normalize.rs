// THEORY:
// Histogram stretching makes the icon invariant to global brightness and
// contrast shifts, the kind different JPEG encoders and gamma settings introduce.
// Each of the three planes is stretched on its own so its minimum lands on 0.0
// and its maximum on 255.0.
//
// A plane with no dynamic range (a uniform image, or a grayscale image's chroma
// planes) would divide by zero. What happens instead is decided by the caller's
// `DegeneratePolicy`; it is never left to NaN propagation.
//
// "No dynamic range" means a range below `FLAT_RANGE`, not exactly zero. The
// chroma of a gray pixel is 128 only up to f32 rounding, so a grayscale image
// carries chroma noise of a few 1e-5 that depends on how it was rendered.
// Stretching that noise to [0, 255] would make two renderings of one image
// disagree, so any plane that flat takes the policy branch.

use crate::config::DegeneratePolicy;
use crate::error::{IconError, Result};
use tracing::warn;

const NUM_CHANNELS: usize = 3;
const MIDPOINT: f32 = 128.0;

/// Planes whose `max - min` is below this are treated as flat.
pub const FLAT_RANGE: f32 = 1e-3;

/// Stretches every plane of `pixels` (three planes of `num_pixels` values each)
/// to the full `[0, 255]` range, in place.
pub fn normalize(pixels: &mut [f32], num_pixels: usize, policy: DegeneratePolicy) -> Result<()> {
    debug_assert_eq!(pixels.len(), NUM_CHANNELS * num_pixels);

    for (channel, plane) in pixels.chunks_exact_mut(num_pixels).enumerate() {
        let (min, max) = plane
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = max - min;

        if range >= FLAT_RANGE {
            for v in plane.iter_mut() {
                *v = (*v - min) * 255.0 / range;
            }
            continue;
        }

        match policy {
            DegeneratePolicy::Zero => {
                warn!(channel, value = min, "flat channel plane, filling with 0");
                plane.fill(0.0);
            }
            DegeneratePolicy::Midpoint => {
                warn!(channel, value = min, "flat channel plane, filling with 128");
                plane.fill(MIDPOINT);
            }
            DegeneratePolicy::Reject => return Err(IconError::DegenerateChannel { channel }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rounded_eq(got: &[f32], want: &[f32]) {
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert_eq!(g.round(), w.round(), "got {got:?}, want {want:?}");
        }
    }

    #[test]
    fn stretches_each_plane_independently() {
        // Three planes of a 2x2 icon.
        let mut pixels = vec![
            0.5, 89.0, 14.0, 211.0, //
            9.0, 193.0, 20.0, 14.0, //
            97.0, 31.0, 7.0, 67.9,
        ];
        normalize(&mut pixels, 4, DegeneratePolicy::Zero).expect("non-degenerate");
        let want = [
            0.0, 107.20902, 16.35392, 255.0, //
            0.0, 255.0, 15.244565, 6.929348, //
            255.0, 68.0, 0.0, 172.55,
        ];
        assert_rounded_eq(&pixels, &want);
    }

    #[test]
    fn repeated_extremes_all_hit_the_bounds() {
        let mut pixels = vec![
            111.0, 111.0, 22.0, 77.0, //
            99.0, 99.0, 255.0, 33.0, //
            88.0, 0.0, 222.0, 33.0,
        ];
        normalize(&mut pixels, 4, DegeneratePolicy::Zero).expect("non-degenerate");
        let want = [
            255.0, 255.0, 0.0, 157.58427, //
            75.810814, 75.810814, 255.0, 0.0, //
            101.08108, 0.0, 255.0, 37.905407,
        ];
        assert_rounded_eq(&pixels, &want);
    }

    #[test]
    fn flat_plane_follows_policy() {
        let source = vec![
            5.0, 5.0, 5.0, 5.0, //
            1.0, 2.0, 3.0, 4.0, //
            7.0, 7.0, 7.0, 7.0,
        ];

        let mut zero = source.clone();
        normalize(&mut zero, 4, DegeneratePolicy::Zero).expect("zero policy never fails");
        assert_eq!(&zero[0..4], &[0.0; 4]);
        assert_eq!(&zero[8..12], &[0.0; 4]);
        assert_eq!(zero[4], 0.0);
        assert_eq!(zero[7], 255.0);

        let mut midpoint = source.clone();
        normalize(&mut midpoint, 4, DegeneratePolicy::Midpoint).expect("midpoint policy never fails");
        assert_eq!(&midpoint[0..4], &[128.0; 4]);

        let mut reject = source;
        assert!(matches!(
            normalize(&mut reject, 4, DegeneratePolicy::Reject),
            Err(IconError::DegenerateChannel { channel: 0 })
        ));
    }

    #[test]
    fn rounding_noise_counts_as_flat() {
        let mut pixels = vec![
            10.0, 20.0, 30.0, 40.0, //
            128.0, 128.00002, 127.99998, 128.00001, //
            7.0, 7.0, 7.0, 7.0,
        ];
        normalize(&mut pixels, 4, DegeneratePolicy::Zero).expect("zero policy never fails");
        assert_eq!(&pixels[4..8], &[0.0; 4]);

        let mut noisy = vec![
            10.0, 20.0, 30.0, 40.0, //
            128.0, 128.00002, 127.99998, 128.00001, //
            7.0, 7.0, 7.0, 7.5,
        ];
        assert!(matches!(
            normalize(&mut noisy, 4, DegeneratePolicy::Reject),
            Err(IconError::DegenerateChannel { channel: 1 })
        ));
    }

    #[test]
    fn small_but_real_range_is_stretched() {
        let mut pixels = vec![
            10.0, 20.0, 30.0, 40.0, //
            128.0, 128.01, 128.0, 128.0, //
            7.0, 7.0, 7.0, 7.5,
        ];
        normalize(&mut pixels, 4, DegeneratePolicy::Reject).expect("no flat plane");
        assert_eq!(pixels[4], 0.0);
        assert!((pixels[5] - 255.0).abs() < 1e-3);
    }

    #[test]
    fn output_never_contains_nan() {
        let mut pixels = vec![42.0; 12];
        normalize(&mut pixels, 4, DegeneratePolicy::Zero).expect("zero policy never fails");
        assert!(pixels.iter().all(|v| v.is_finite()));
    }
}
