// THEORY:
// The similarity engine gives the final, precise verdict on a candidate pair.
// It is stateless and made of two independent filters plus a combinator:
//
// 1.  **Proportions**: the shorter side of image A is scaled to 1 for both
//     images and the longer-side ratios are compared. Cheap, content-free, and
//     symmetric in its arguments.
// 2.  **Euclidean distance**: per-plane sums of squared pixel differences, never
//     square-rooted. Thresholds are squared instead, and scale with the number of
//     icon pixels so they stay meaningful at other icon resolutions. Chroma is
//     allowed `chan_coeff` times more distance than luma.
// 3.  **Verdict**: proportions first (a short-circuit), then distance.
//
// `fast_prefilter` is not a verdict. It shrinks a collection to the ids filed
// under the first query key found in a caller-owned table, so `similar` only runs
// on a handful of candidates.

use crate::config::SimilarityConfig;
use crate::core_modules::icon::{Icon, ImageSize};
use crate::error::{IconError, Result};
use std::collections::HashMap;
use tracing::warn;

/// Hash key to image ids, owned by the caller.
pub type HashTable = HashMap<u64, Vec<u64>>;

/// Squared Euclidean distances of the luma, chroma-blue and chroma-red planes.
pub type EuclideanMetrics = (f32, f32, f32);

/// Relative difference of the two images' normalized aspect ratios. `NaN` when
/// either size has a zero side.
pub fn proportion_metric(size_a: ImageSize, size_b: ImageSize) -> f64 {
    let (x_a, y_a) = (size_a.width as f64, size_a.height as f64);
    let (x_b, y_b) = (size_b.width as f64, size_b.height as f64);

    // Rescale the narrower side of A (and the same side of B) to 1.
    let (long_a, long_b) = if x_a <= y_a {
        (y_a / x_a, y_b / x_b)
    } else {
        (x_a / y_a, x_b / y_b)
    };
    if long_a > long_b {
        (long_a - long_b) / long_a
    } else {
        (long_b - long_a) / long_b
    }
}

/// Whether two image sizes have similar proportions within `threshold`.
pub fn proportion_similar(size_a: ImageSize, size_b: ImageSize, threshold: f64) -> bool {
    // NaN (zero-sized input) compares false.
    proportion_metric(size_a, size_b) <= threshold
}

/// Per-plane squared Euclidean distances between two icons of the same side.
pub fn euclidean_metrics(icon_a: &Icon, icon_b: &Icon) -> Result<EuclideanMetrics> {
    if icon_a.side() != icon_b.side() {
        return Err(IconError::IncompatibleIcons {
            left: icon_a.side(),
            right: icon_b.side(),
        });
    }

    let n = icon_a.num_pixels();
    let (a, b) = (icon_a.pixels(), icon_b.pixels());
    let (mut m1, mut m2, mut m3) = (0.0f32, 0.0f32, 0.0f32);
    for i in 0..n {
        let d1 = a[i] - b[i];
        let d2 = a[n + i] - b[n + i];
        let d3 = a[2 * n + i] - b[2 * n + i];
        m1 += d1 * d1;
        m2 += d2 * d2;
        m3 += d3 * d3;
    }
    Ok((m1, m2, m3))
}

/// Euclidean verdict with the thresholds of `config`. Icons with different
/// sides are never similar.
pub fn euclidean_similar(icon_a: &Icon, icon_b: &Icon, config: &SimilarityConfig) -> bool {
    let (m1, m2, m3) = match euclidean_metrics(icon_a, icon_b) {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!("{}", e);
            return false;
        }
    };
    let threshold_y = config.threshold_y(icon_a.side());
    let threshold_cbcr = config.threshold_cbcr(icon_a.side());
    m1 < threshold_y && m2 < threshold_cbcr && m3 < threshold_cbcr
}

/// Final verdict: similar proportions and similar pixels.
pub fn similar(icon_a: &Icon, icon_b: &Icon, config: &SimilarityConfig) -> bool {
    proportion_similar(
        icon_a.original_size(),
        icon_b.original_size(),
        config.proportion_threshold,
    ) && euclidean_similar(icon_a, icon_b, config)
}

/// Ids filed under the first of `query` found in `table`.
pub fn fast_prefilter<'t>(query: &[u64], table: &'t HashTable) -> Option<&'t [u64]> {
    query.iter().find_map(|key| table.get(key)).map(Vec::as_slice)
}

/// Files `id` under every key of `keys`, skipping keys that already hold it.
pub fn record(table: &mut HashTable, keys: &[u64], id: u64) {
    for key in keys {
        let ids = table.entry(*key).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
}
