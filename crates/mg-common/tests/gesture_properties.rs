//! Property tests for gesture bookkeeping.

use mg_common::{Gesture, Sample};
use proptest::prelude::*;

fn sample() -> impl Strategy<Value = Sample> {
    (-50.0..50.0f64, -50.0..50.0f64, -50.0..50.0f64).prop_map(|(x, y, z)| Sample::new(x, y, z))
}

fn extremes(samples: &[Sample]) -> (f64, f64) {
    samples.iter().fold((f64::MIN, f64::MAX), |(hi, lo), s| {
        (hi.max(s.max_abs_component()), lo.min(s.min_abs_component()))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Extremes kept on append match a full scan.
    #[test]
    fn extremes_track_appends(samples in prop::collection::vec(sample(), 1..60)) {
        let mut gesture = Gesture::new();
        for (i, s) in samples.iter().enumerate() {
            gesture.add(*s);
            let (hi, lo) = extremes(&samples[..=i]);
            prop_assert_eq!(gesture.max_acceleration(), hi);
            prop_assert_eq!(gesture.min_acceleration(), lo);
            prop_assert!(gesture.min_acceleration() <= gesture.max_acceleration());
        }
        prop_assert_eq!(gesture.last(), samples.last());
    }

    #[test]
    fn remove_first_rescans_extremes(
        samples in prop::collection::vec(sample(), 2..60),
        drops in 1usize..10,
    ) {
        let mut gesture = Gesture::from_samples(samples.clone());
        let drops = drops.min(samples.len() - 1);
        for (i, expected) in samples.iter().take(drops).enumerate() {
            prop_assert_eq!(gesture.remove_first(), Some(*expected));
            prop_assert_eq!(gesture.len(), samples.len() - i - 1);
        }
        let (hi, lo) = extremes(&samples[drops..]);
        prop_assert_eq!(gesture.max_acceleration(), hi);
        prop_assert_eq!(gesture.min_acceleration(), lo);
        prop_assert_eq!(gesture.samples(), &samples[drops..]);
    }

    #[test]
    fn manual_extremes_survive_appends(
        samples in prop::collection::vec(sample(), 0..20),
        max in 0.0..10.0f64,
        min in 0.0..10.0f64,
    ) {
        let mut gesture = Gesture::new();
        gesture.set_max_and_min_acceleration(max, min);
        for s in &samples {
            gesture.add(*s);
        }
        prop_assert!(gesture.has_manual_extremes());
        prop_assert_eq!(gesture.max_acceleration(), max);
        prop_assert_eq!(gesture.min_acceleration(), min);
        prop_assert_eq!(gesture.len(), samples.len());
    }
}
