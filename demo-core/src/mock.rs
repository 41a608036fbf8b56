//! Helpers for fabricating mock values.
//!
//! Every demo draws from its own `StdRng` so a configured seed makes a whole
//! hub run reproducible.

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Builds a service RNG, deterministic when a seed is given.
pub fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Derives a per-service seed so services sharing a base seed do not draw
/// identical sequences.
pub fn derive_seed(base: u64, name: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    base ^ hash
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Uniform draw from the closed interval `[low, high]`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if low >= high {
        return low;
    }
    rng.gen_range(low..=high)
}

pub fn uniform_rounded<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64, places: i32) -> f64 {
    round_to(uniform(rng, low, high), places)
}

/// Picks one element. `items` must not be empty.
pub fn pick<T: Copy, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> T {
    items[rng.gen_range(0..items.len())]
}

/// Picks up to `amount` distinct elements.
pub fn sample<T: Clone, R: Rng + ?Sized>(rng: &mut R, items: &[T], amount: usize) -> Vec<T> {
    items.choose_multiple(rng, amount).cloned().collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235, 1), 1.2);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = seeded(Some(7));
        let mut b = seeded(Some(7));
        let xs: Vec<f64> = (0..5).map(|_| uniform(&mut a, 0.0, 1.0)).collect();
        let ys: Vec<f64> = (0..5).map(|_| uniform(&mut b, 0.0, 1.0)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_derive_seed_differs_per_name() {
        assert_ne!(derive_seed(42, "fraud"), derive_seed(42, "carbon"));
        assert_eq!(derive_seed(42, "fraud"), derive_seed(42, "fraud"));
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = seeded(Some(1));
        for _ in 0..1000 {
            let v = uniform(&mut rng, 15.0, 35.0);
            assert!((15.0..=35.0).contains(&v));
        }
        assert_eq!(uniform(&mut rng, 3.0, 3.0), 3.0);
    }

    #[test]
    fn test_pick_returns_owned_element() {
        const NAMES: [&str; 3] = ["wheat", "corn", "rice"];
        let mut rng = seeded(Some(5));
        let name: &'static str = pick(&mut rng, &NAMES);
        assert!(NAMES.contains(&name));
    }

    #[test]
    fn test_sample_is_distinct() {
        let mut rng = seeded(Some(3));
        let items = ["a", "b", "c", "d"];
        let picked = sample(&mut rng, &items, 3);
        assert_eq!(picked.len(), 3);
        let mut dedup = picked.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 3);
        assert_eq!(sample(&mut rng, &items, 10).len(), 4);
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        let sd = std_dev(&values).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
        assert_eq!(mean(&[]), None);
        assert_eq!(std_dev(&[1.0]), None);
    }
}
