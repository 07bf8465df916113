// THEORY:
// Discretization of an n-dimensional vector into hash-table keys.
//
// Each dimension's `[HASH_MIN, HASH_MAX]` range is cut into `num_buckets` equal
// buckets. A vector falls into exactly one n-dimensional cell (its "cube"),
// identified by one bucket index per dimension. Exact cell matching is brittle:
// a near-duplicate whose value sits a hair across a boundary lands in another
// cell. So a value within `eps` of a boundary is also counted in the bucket on
// the other side, and the cube set is every combination of those choices.
//
// Cubes become `u64` keys. Small configurations (at most 10 buckets and 19
// dimensions) use decimal positional encoding, one digit per dimension with
// dimension `i` at `10^i`; anything larger is hashed with 64-bit FNV-1a.

use crate::config::{HASH_MIN, HashConfig};
use std::collections::HashSet;

/// One bucket index per dimension.
pub type Cube = Vec<usize>;

const DECIMAL_MAX_BUCKETS: usize = 10;
const DECIMAL_MAX_DIMENSIONS: usize = 19;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Bucket holding `value`. Values at or beyond the range edges are clamped into
/// the first or last bucket.
pub fn bucket_of(value: f64, config: &HashConfig) -> usize {
    let raw = ((value - HASH_MIN) / config.bucket_width()).floor();
    if raw <= 0.0 || raw.is_nan() {
        0
    } else {
        (raw as usize).min(config.num_buckets - 1)
    }
}

/// The single cube containing `values`.
pub fn central_cube(values: &[f64], config: &HashConfig) -> Cube {
    values.iter().map(|&v| bucket_of(v, config)).collect()
}

/// Buckets a value may belong to: its home bucket first, then the neighbor
/// whose boundary lies strictly closer than `eps`. Both sides use the same
/// strict test, so a value exactly `eps` away from a boundary stays home and a
/// zero `eps` never expands.
fn bucket_options(value: f64, config: &HashConfig) -> Vec<usize> {
    let home = bucket_of(value, config);
    let width = config.bucket_width();
    let eps = config.eps();
    let lower_edge = HASH_MIN + home as f64 * width;
    let upper_edge = lower_edge + width;

    let mut options = vec![home];
    if home > 0 && value - eps < lower_edge {
        options.push(home - 1);
    }
    if home + 1 < config.num_buckets && value + eps > upper_edge {
        options.push(home + 1);
    }
    options
}

/// Every cube `values` may belong to within `eps`. The central cube comes first.
pub fn cube_set(values: &[f64], config: &HashConfig) -> Vec<Cube> {
    let mut set: Vec<Cube> = vec![Vec::with_capacity(values.len())];
    for &value in values {
        let options = bucket_options(value, config);
        if options.len() == 1 {
            for cube in &mut set {
                cube.push(options[0]);
            }
            continue;
        }
        set = set
            .into_iter()
            .flat_map(|prefix| {
                options.iter().map(move |&bucket| {
                    let mut cube = prefix.clone();
                    cube.push(bucket);
                    cube
                })
            })
            .collect();
    }
    set
}

/// Decimal positional key: `cube[i] * 10^i`.
pub fn decimal(cube: &[usize]) -> u64 {
    cube.iter()
        .rev()
        .fold(0u64, |acc, &digit| acc.wrapping_mul(10).wrapping_add(digit as u64))
}

/// 64-bit FNV-1a over each bucket index as 8 little-endian bytes.
pub fn fnv1a(cube: &[usize]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &index in cube {
        for byte in (index as u64).to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Key of `cube` under a configuration with `num_buckets` buckets.
pub fn encode(cube: &[usize], num_buckets: usize) -> u64 {
    if num_buckets <= DECIMAL_MAX_BUCKETS && cube.len() <= DECIMAL_MAX_DIMENSIONS {
        decimal(cube)
    } else {
        fnv1a(cube)
    }
}

/// Keys of every cube in `cubes`, duplicates removed, order kept.
pub fn encode_set(cubes: &[Cube], num_buckets: usize) -> Vec<u64> {
    let mut seen = HashSet::with_capacity(cubes.len());
    cubes
        .iter()
        .map(|cube| encode(cube, num_buckets))
        .filter(|key| seen.insert(*key))
        .collect()
}
