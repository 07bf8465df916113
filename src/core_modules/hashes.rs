// THEORY:
// The hash generator turns an icon into approximate-match keys for a hash table.
// Only the luma plane is sampled, at the hyper points; each sample is one
// dimension of a vector that `hyper` discretizes and encodes.
//
// Two flavors, used on opposite sides of a lookup:
// - `central_hash`: the one key of the cell holding the vector.
// - `hash_set`: the keys of every cell the vector may belong to within `eps` of
//   a bucket boundary. Always contains the central hash.
//
// Recommended protocol: store the hash set of every image when indexing and
// look up the single central hash when querying (or the reverse). Both sides
// must use the same hyper points and hash parameters. This is a usage
// recommendation; nothing here enforces it.

use crate::config::{HashConfig, validate_hyper_points};
use crate::core_modules::hyper::{central_cube, cube_set, encode, encode_set};
use crate::core_modules::icon::{Icon, Point};
use crate::error::Result;
use tracing::trace;

fn checked_config(icon: &Icon, hyper_points: &[Point], eps_percent: f64, num_buckets: usize) -> Result<HashConfig> {
    let config = HashConfig::new(eps_percent, num_buckets)?;
    validate_hyper_points(hyper_points, icon.side())?;
    Ok(config)
}

/// The single key of the cell holding the icon's hyper point lumas.
pub fn central_hash(icon: &Icon, hyper_points: &[Point], eps_percent: f64, num_buckets: usize) -> Result<u64> {
    let config = checked_config(icon, hyper_points, eps_percent, num_buckets)?;
    let cube = central_cube(&icon.luma_values(hyper_points), &config);
    Ok(encode(&cube, config.num_buckets))
}

/// Keys of every cell within `eps` of the icon's hyper point lumas, central
/// key first.
pub fn hash_set(icon: &Icon, hyper_points: &[Point], eps_percent: f64, num_buckets: usize) -> Result<Vec<u64>> {
    let config = checked_config(icon, hyper_points, eps_percent, num_buckets)?;
    let cubes = cube_set(&icon.luma_values(hyper_points), &config);
    let keys = encode_set(&cubes, config.num_buckets);
    trace!(cubes = cubes.len(), keys = keys.len(), "hash set generated");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::icon::{ImageSize, arr_index};
    use crate::core_modules::point_selector::HYPER_POINTS_10;
    use crate::error::IconError;

    /// An 11x11 icon whose luma at `HYPER_POINTS_10[i]` is `lumas[i]`.
    fn icon_with_lumas(lumas: [f32; 10]) -> Icon {
        let mut pixels = vec![0.0; 3 * 121];
        for (p, luma) in HYPER_POINTS_10.iter().zip(lumas) {
            pixels[arr_index(*p, 11, 0)] = luma;
        }
        Icon::from_parts(pixels, 11, ImageSize::new(100, 100)).expect("valid parts")
    }

    #[test]
    fn central_hash_is_deterministic() {
        let icon = icon_with_lumas([10.0, 70.0, 130.0, 200.0, 255.0, 0.0, 90.0, 160.0, 30.0, 240.0]);
        let a = central_hash(&icon, &HYPER_POINTS_10, 0.25, 4).expect("valid config");
        let b = central_hash(&icon, &HYPER_POINTS_10, 0.25, 4).expect("valid config");
        assert_eq!(a, b);
    }

    #[test]
    fn central_hash_encodes_buckets_as_digits() {
        let icon = icon_with_lumas([10.0, 70.0, 130.0, 200.0, 255.0, 0.0, 90.0, 160.0, 30.0, 240.0]);
        // Buckets: 0 1 2 3 3 0 1 2 0 3, dimension 0 in the units.
        let got = central_hash(&icon, &HYPER_POINTS_10, 0.25, 4).expect("valid config");
        assert_eq!(got, 3_021_033_210);
    }

    #[test]
    fn hash_set_contains_central_hash() {
        let icons = [
            icon_with_lumas([10.0, 70.0, 130.0, 200.0, 255.0, 0.0, 90.0, 160.0, 30.0, 240.0]),
            icon_with_lumas([63.0, 64.0, 127.0, 128.0, 191.0, 192.0, 1.0, 254.0, 100.0, 150.0]),
            icon_with_lumas([0.0; 10]),
        ];
        for icon in &icons {
            for num_buckets in [1, 4, 7, 16] {
                let central = central_hash(icon, &HYPER_POINTS_10, 0.25, num_buckets).expect("valid config");
                let set = hash_set(icon, &HYPER_POINTS_10, 0.25, num_buckets).expect("valid config");
                assert_eq!(set[0], central);
                let unique: std::collections::HashSet<_> = set.iter().collect();
                assert_eq!(unique.len(), set.len());
            }
        }
    }

    #[test]
    fn boundary_values_expand_the_set() {
        // Dimensions 0 and 1 straddle the first boundary (63.75).
        let icon = icon_with_lumas([63.0, 64.0, 31.0, 31.0, 31.0, 31.0, 31.0, 31.0, 31.0, 31.0]);
        let set = hash_set(&icon, &HYPER_POINTS_10, 0.25, 4).expect("valid config");
        assert_eq!(set.len(), 4);
        assert!(set.contains(&0));
        assert!(set.contains(&1));
        assert!(set.contains(&10));
        assert!(set.contains(&11));
    }

    #[test]
    fn single_bucket_collapses_everything() {
        let icon = icon_with_lumas([10.0, 70.0, 130.0, 200.0, 255.0, 0.0, 90.0, 160.0, 30.0, 240.0]);
        assert_eq!(hash_set(&icon, &HYPER_POINTS_10, 0.25, 1).expect("valid config"), vec![0]);
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let icon = icon_with_lumas([0.0; 10]);
        assert!(matches!(
            central_hash(&icon, &HYPER_POINTS_10, 0.25, 0),
            Err(IconError::InvalidHashConfig(_))
        ));
        assert!(matches!(hash_set(&icon, &[], 0.25, 4), Err(IconError::InvalidHashConfig(_))));
        assert!(matches!(
            hash_set(&icon, &[Point::new(11, 0)], 0.25, 4),
            Err(IconError::InvalidHashConfig(_))
        ));

        // Every one of these lumas sits on a bucket boundary.
        let wide: Vec<Point> = (0..17).map(|i| Point::new(i % 11, i / 11)).collect();
        let mut boundary = Icon::new(11, ImageSize::new(100, 100));
        for p in &wide {
            boundary.set(*p, 63.75, 0.0, 0.0);
        }
        assert!(matches!(
            hash_set(&boundary, &wide, 0.25, 4),
            Err(IconError::InvalidHashConfig(_))
        ));
        assert_eq!(hash_set(&boundary, &wide[..16], 0.25, 4).expect("at the limit").len(), 1 << 16);
    }
}
