//! Price Statistics Property Tests
//!
//! Order and spread properties of the quartile computation that must hold for
//! any fare sample the flight store can hand over.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use types::{PriceStatistics, Route, SlotId};

fn fare_samples(min_len: usize) -> impl Strategy<Value = Vec<(SlotId, u64)>> {
    prop::collection::vec(1u64..5_000_000, min_len..64).prop_map(|prices| {
        let route = Route::parse("BUE", "COR").unwrap();
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| {
                let day = base + chrono::Duration::days(i as i64);
                (SlotId::compute("P", "AR", &route, day), price)
            })
            .collect()
    })
}

proptest! {
    /// Property: quartiles are ordered and the spread is never negative
    #[test]
    fn quartiles_are_ordered(samples in fare_samples(4)) {
        let stats = PriceStatistics::from_samples(&samples).unwrap();

        prop_assert!(stats.is_trusted());
        prop_assert!(stats.q1 <= stats.median, "q1 {} > median {}", stats.q1, stats.median);
        prop_assert!(stats.median <= stats.q3, "median {} > q3 {}", stats.median, stats.q3);
        prop_assert_eq!(stats.iqr, stats.q3 - stats.q1);
        prop_assert!(stats.iqr >= Decimal::ZERO);
    }

    /// Property: every summary value lies within the observed range
    #[test]
    fn summary_within_min_max(samples in fare_samples(1)) {
        let stats = PriceStatistics::from_samples(&samples).unwrap();
        let min = Decimal::from(stats.min);
        let max = Decimal::from(stats.max);

        prop_assert_eq!(stats.sample_size, samples.len());
        for value in [stats.q1, stats.median, stats.q3, stats.mean] {
            prop_assert!(value >= min && value <= max, "{} outside [{}, {}]", value, min, max);
        }
        prop_assert!(stats.std_dev >= 0.0);
    }

    /// Property: sample order does not affect the result
    #[test]
    fn statistics_ignore_input_order(samples in fare_samples(4)) {
        let mut reversed = samples.clone();
        reversed.reverse();

        prop_assert_eq!(
            PriceStatistics::from_samples(&samples).map(|s| (s.q1, s.median, s.q3, s.cheapest_slot)),
            PriceStatistics::from_samples(&reversed).map(|s| (s.q1, s.median, s.q3, s.cheapest_slot))
        );
    }
}
