/// Declining-price engine.
/// 1. Stochastic decay: periodic re-pricing of live listings
/// 2. Deterministic decay: point-in-time price reconstruction
// region:    --- Imports
use chrono::{DateTime, Utc};
use rand::Rng;

// endregion: --- Imports

// region:    --- Noise Source

/// Source of the small market-fluctuation factor applied to decay progress.
///
/// Injected so the stochastic variant can be tested with a fixed factor.
/// Implementations must return values in `[0.9, 1.1]`.
pub trait NoiseSource {
    fn factor(&mut self) -> f64;
}

/// Production noise: uniform in `[0.9, 1.1]` (±10% around nominal progress).
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketNoise;

impl MarketNoise {
    pub fn new() -> Self {
        Self
    }
}

impl NoiseSource for MarketNoise {
    fn factor(&mut self) -> f64 {
        rand::thread_rng().gen_range(0.9..=1.1)
    }
}

/// No-op noise used wherever determinism is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn factor(&mut self) -> f64 {
        1.0
    }
}

// endregion: --- Noise Source

// region:    --- Decay Functions

/// Current price of a declining-price listing at `at`.
///
/// The price falls from `listed_price` to `minimum_price` along a quadratic
/// curve of normalized progress through the auction window, so the markdown
/// accelerates as the deadline approaches:
///
/// `price = listed - (listed - minimum) * (progress * noise)^2`
///
/// Boundary semantics:
/// - `at <= created_at` returns `listed_price` exactly
/// - `at >= end_date` returns `minimum_price` exactly
///
/// The result is rounded to cents and clamped to `[minimum, listed]`, which
/// keeps the noise factor from ever pushing the price through the floor.
/// Callers validate `minimum <= listed` at creation/relist time; if the
/// bounds arrive inverted anyway the floor wins rather than letting the
/// formula grow the price above `listed_price`.
pub fn decayed_price(
    listed_price: f64,
    minimum_price: f64,
    created_at: DateTime<Utc>,
    end_date: DateTime<Utc>,
    at: DateTime<Utc>,
    noise: &mut impl NoiseSource,
) -> f64 {
    let minimum_price = minimum_price.min(listed_price);
    if at >= end_date {
        return minimum_price;
    }
    if at <= created_at {
        return listed_price;
    }

    let total = (end_date - created_at).num_milliseconds() as f64;
    let elapsed = (at - created_at).num_milliseconds() as f64;
    let progress = elapsed / total;

    let range = listed_price - minimum_price;
    let scaled = progress * noise.factor();
    let price = listed_price - range * scaled * scaled;

    round_cents(price).clamp(minimum_price, listed_price)
}

/// Deterministic variant of [`decayed_price`].
///
/// Bit-identical output for identical inputs; used to reconstruct what the
/// price was at a past instant (trend display) and anywhere two independent
/// evaluations of the same instant must agree.
pub fn historical_price(
    listed_price: f64,
    minimum_price: f64,
    created_at: DateTime<Utc>,
    end_date: DateTime<Utc>,
    at: DateTime<Utc>,
) -> f64 {
    decayed_price(
        listed_price,
        minimum_price,
        created_at,
        end_date,
        at,
        &mut NoNoise,
    )
}

/// Round to currency granularity (2 decimal places).
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// endregion: --- Decay Functions

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Test double returning a caller-chosen factor.
    struct FixedNoise(f64);

    impl NoiseSource for FixedNoise {
        fn factor(&mut self) -> f64 {
            self.0
        }
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc::now();
        (start, start + Duration::days(10))
    }

    #[test]
    fn price_before_start_is_listed_price() {
        let (start, end) = window();
        assert_eq!(historical_price(100.0, 20.0, start, end, start), 100.0);
        assert_eq!(
            historical_price(100.0, 20.0, start, end, start - Duration::hours(1)),
            100.0
        );
    }

    #[test]
    fn price_at_or_after_end_is_minimum() {
        let (start, end) = window();
        assert_eq!(historical_price(100.0, 20.0, start, end, end), 20.0);
        assert_eq!(
            historical_price(100.0, 20.0, start, end, end + Duration::days(3)),
            20.0
        );
    }

    #[test]
    fn halfway_price_follows_quadratic_curve() {
        // 100 - 80 * 0.5^2 = 80.0
        let (start, end) = window();
        let at = start + Duration::days(5);
        assert_eq!(historical_price(100.0, 20.0, start, end, at), 80.0);
    }

    #[test]
    fn historical_price_is_deterministic() {
        let (start, end) = window();
        let at = start + Duration::hours(37);
        let a = historical_price(100.0, 20.0, start, end, at);
        let b = historical_price(100.0, 20.0, start, end, at);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn decay_is_monotonically_non_increasing() {
        let (start, end) = window();
        let mut prev = historical_price(100.0, 20.0, start, end, start);
        for hour in 1..=240 {
            let price = historical_price(100.0, 20.0, start, end, start + Duration::hours(hour));
            assert!(
                price <= prev,
                "price rose from {prev} to {price} at hour {hour}"
            );
            prev = price;
        }
    }

    #[test]
    fn price_stays_within_bounds_for_all_noise() {
        let (start, end) = window();
        for factor in [0.9, 1.0, 1.1] {
            for hour in 0..=240 {
                let price = decayed_price(
                    100.0,
                    20.0,
                    start,
                    end,
                    start + Duration::hours(hour),
                    &mut FixedNoise(factor),
                );
                assert!((20.0..=100.0).contains(&price), "out of bounds: {price}");
            }
        }
    }

    #[test]
    fn high_noise_near_deadline_is_clamped_to_floor() {
        // progress 0.95 * 1.1 > 1, so the raw formula would undershoot the
        // floor; the clamp must catch it.
        let (start, end) = window();
        let at = start + Duration::hours(228);
        let price = decayed_price(100.0, 20.0, start, end, at, &mut FixedNoise(1.1));
        assert_eq!(price, 20.0);
    }

    #[test]
    fn market_noise_stays_in_documented_interval() {
        let mut noise = MarketNoise::new();
        for _ in 0..1000 {
            let f = noise.factor();
            assert!((0.9..=1.1).contains(&f), "noise factor out of range: {f}");
        }
    }

    #[test]
    fn inverted_bounds_never_exceed_listed_price() {
        // Invalid input (minimum > listed) is rejected at validation time,
        // but the function itself must not grow the price.
        let (start, end) = window();
        let at = start + Duration::days(5);
        let price = historical_price(50.0, 80.0, start, end, at);
        assert_eq!(price, 50.0);
    }

    #[test]
    fn result_is_rounded_to_cents() {
        let (start, end) = window();
        let at = start + Duration::hours(77);
        let price = historical_price(99.99, 13.37, start, end, at);
        assert_eq!(price, (price * 100.0).round() / 100.0);
    }
}

// endregion: --- Tests
