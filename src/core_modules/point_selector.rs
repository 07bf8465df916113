// THEORY:
// Hashes are built from the luma of a handful of icon pixels, one pixel per hash
// dimension ("hyper points"). The more independent those pixels are, the more
// information each dimension carries, so they should sit far apart. Pixels near
// the border are skipped: they mostly show background and are noisy.
//
// Selection is an offline, one-time step. Its output is stored (or the
// predefined `HYPER_POINTS_10` is used) and must be the same on the record and
// the query side.
//
// Algorithm:
// 1.  **Greedy seed**: start at the margin corner and keep adding the free cell
//     with the smallest sum of inverse distances to the points chosen so far.
//     This maximizes average spacing.
// 2.  **Relaxation**: a fixed number of passes; each pass lifts every point and
//     drops it on the free cell farthest from its nearest remaining neighbor.
//     The smallest pairwise distance never decreases across a move, which
//     irons out the clusters the greedy seed leaves behind.
//
// Grids are flat `Vec<bool>` occupancy buffers indexed by `y * side + x`.

use crate::core_modules::icon::Point;
use crate::error::{IconError, Result};
use tracing::debug;

const RELAXATION_PASSES: usize = 50;

/// Ten well-spread points of an 11x11 icon, nudged by hand away from
/// texture-like symmetries.
pub const HYPER_POINTS_10: [Point; 10] = [
    Point::new(2, 5),
    Point::new(3, 3),
    Point::new(3, 8),
    Point::new(4, 6),
    Point::new(5, 2),
    Point::new(6, 4),
    Point::new(6, 7),
    Point::new(8, 2),
    Point::new(8, 5),
    Point::new(8, 8),
];

/// Border left unused: 2 pixels for small point sets, 1 pixel for larger ones.
pub fn margin_for(n: usize) -> usize {
    if n <= 11 { 2 } else { 1 }
}

/// Chooses `n` well-separated points inside an `icon_side x icon_side` grid.
///
/// Ties are broken by scan order (rows top to bottom, columns left to right),
/// so the result is deterministic.
pub fn select_points(n: usize, icon_side: usize) -> Result<Vec<Point>> {
    let margin = margin_for(n);
    let span = icon_side.saturating_sub(2 * margin);
    if n == 0 || n > span * span {
        return Err(IconError::InvalidHashConfig(format!(
            "cannot place {n} points in a {icon_side}x{icon_side} icon with margin {margin}"
        )));
    }
    let (lo, hi) = (margin, icon_side - margin);

    let mut taken = vec![false; icon_side * icon_side];
    let mut selected = Vec::with_capacity(n);
    let first = Point::new(margin, margin);
    taken[first.y * icon_side + first.x] = true;
    selected.push(first);

    while selected.len() < n {
        let mut best: Option<(Point, f64)> = None;
        for y in lo..hi {
            for x in lo..hi {
                if taken[y * icon_side + x] {
                    continue;
                }
                let candidate = Point::new(x, y);
                let inv_sum: f64 = selected.iter().map(|s| 1.0 / s.distance(&candidate)).sum();
                let score = 1.0 / inv_sum;
                if best.is_none_or(|(_, b)| score > b) {
                    best = Some((candidate, score));
                }
            }
        }
        // `n <= span * span` guarantees a free cell.
        let Some((point, _)) = best else { break };
        taken[point.y * icon_side + point.x] = true;
        selected.push(point);
    }

    for _ in 0..RELAXATION_PASSES {
        for i in 0..selected.len() {
            let lifted = selected[i];
            taken[lifted.y * icon_side + lifted.x] = false;

            let mut best: Option<(Point, f64)> = None;
            for y in lo..hi {
                for x in lo..hi {
                    if taken[y * icon_side + x] {
                        continue;
                    }
                    let candidate = Point::new(x, y);
                    let nearest = selected
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, s)| s.distance(&candidate))
                        .fold(f64::INFINITY, f64::min);
                    if best.is_none_or(|(_, b)| nearest > b) {
                        best = Some((candidate, nearest));
                    }
                }
            }

            let placed = best.map_or(lifted, |(p, _)| p);
            taken[placed.y * icon_side + placed.x] = true;
            selected[i] = placed;
        }
    }

    debug!(n, icon_side, margin, "hyper points selected");
    Ok(selected)
}

/// Smallest distance between any two points of `points`.
pub fn min_pairwise_distance(points: &[Point]) -> f64 {
    let mut min = f64::INFINITY;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            min = min.min(a.distance(b));
        }
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn predefined_points_are_spread_out() {
        assert_eq!(HYPER_POINTS_10.len(), 10);
        assert!(min_pairwise_distance(&HYPER_POINTS_10) >= 2.0);
        assert!(HYPER_POINTS_10.iter().all(|p| p.x < 11 && p.y < 11));
    }

    #[test]
    fn distance_is_euclidean() {
        let d = Point::new(5, 7).distance(&Point::new(2, 8));
        assert_eq!(d, 3.1622776601683795);
    }

    #[test]
    fn five_points_take_corners_and_center() {
        let got: HashSet<Point> = select_points(5, 11).expect("fits").into_iter().collect();
        let want: HashSet<Point> = [(2, 2), (2, 8), (5, 5), (8, 2), (8, 8)]
            .into_iter()
            .map(|(x, y)| Point::new(x, y))
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn twelve_points_use_the_narrow_margin() {
        let points = select_points(12, 11).expect("fits");
        assert_eq!(points.len(), 12);
        let unique: HashSet<Point> = points.iter().copied().collect();
        assert_eq!(unique.len(), 12);
        assert!(points.iter().all(|p| (1..10).contains(&p.x) && (1..10).contains(&p.y)));
        assert!(min_pairwise_distance(&points) >= 2.0);
    }

    #[test]
    fn selection_is_repeatable() {
        assert_eq!(select_points(7, 11).expect("fits"), select_points(7, 11).expect("fits"));
    }

    #[test]
    fn single_point_stays_inside_margin() {
        let points = select_points(1, 11).expect("fits");
        assert_eq!(points, vec![Point::new(2, 2)]);
    }

    #[test]
    fn impossible_requests_fail() {
        assert!(matches!(select_points(0, 11), Err(IconError::InvalidHashConfig(_))));
        // 9x9 usable cells with margin 1.
        assert!(select_points(81, 11).is_ok());
        assert!(matches!(select_points(82, 11), Err(IconError::InvalidHashConfig(_))));
        assert!(matches!(select_points(3, 4), Err(IconError::InvalidHashConfig(_))));
    }
}
