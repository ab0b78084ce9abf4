use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tanglestat::data::Observation;
use tanglestat::{Alternative, AnalysisError, ContingencyTable, OddsRatio, analyze, fisher_exact};

fn random_observations(rng: &mut StdRng, n: usize, missing_rate: f64) -> Vec<Observation> {
    (0..n)
        .map(|i| {
            let feature = (!rng.gen_bool(missing_rate)).then(|| rng.gen_bool(0.4));
            let outcome = (!rng.gen_bool(missing_rate)).then(|| rng.gen_bool(0.3));
            Observation::new(Some(format!("E{i}")), feature, outcome)
        })
        .collect()
}

#[test]
fn cells_sum_to_complete_records() {
    let mut rng = StdRng::seed_from_u64(7);
    for trial in 0..200 {
        let n = rng.gen_range(1..300);
        let obs = random_observations(&mut rng, n, 0.1);
        let complete = obs.iter().filter(|o| o.is_complete()).count();
        match analyze(&obs, Alternative::TwoSided) {
            Ok(result) => {
                assert_eq!(result.table.total() as usize, complete, "trial {trial}");
                assert_eq!(result.dropped, n - complete, "trial {trial}");
            }
            Err(AnalysisError::UndefinedStatistic(err)) => {
                assert_eq!(err.table.total() as usize, complete, "trial {trial}");
                assert!(err.table.has_empty_margin());
            }
            Err(AnalysisError::InvalidInput(_)) => assert_eq!(complete, 0, "trial {trial}"),
        }
    }
}

#[test]
fn odds_ratio_matches_closed_form_and_is_never_nan() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..500 {
        let t = ContingencyTable::new(
            rng.gen_range(0..40),
            rng.gen_range(0..40),
            rng.gen_range(0..40),
            rng.gen_range(0..40),
        );
        let num = t.a * t.d;
        let den = t.b * t.c;
        match tanglestat::odds_ratio(&t) {
            Ok(OddsRatio::Finite(v)) => {
                assert!(den > 0);
                assert_eq!(v, num as f64 / den as f64);
            }
            Ok(OddsRatio::Infinite) => assert!(den == 0 && num > 0),
            Err(err) => {
                assert!(num == 0 && den == 0);
                assert_eq!(err.table, t);
            }
        }
    }
}

#[test]
fn p_value_is_bounded_and_swap_symmetric() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..300 {
        let t = ContingencyTable::new(
            rng.gen_range(0..60),
            rng.gen_range(0..60),
            rng.gen_range(0..60),
            rng.gen_range(0..60),
        );
        let p = fisher_exact(&t, Alternative::TwoSided);
        assert!((0.0..=1.0).contains(&p), "{t:?}: {p}");
        let swapped = fisher_exact(&t.swapped(), Alternative::TwoSided);
        assert!((p - swapped).abs() <= 1e-12 * p.max(1e-300), "{t:?}: {p} vs {swapped}");
    }
}

#[test]
fn analysis_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(31);
    let obs = random_observations(&mut rng, 250, 0.05);
    let first = analyze(&obs, Alternative::TwoSided).expect("analysable sample");
    for _ in 0..5 {
        let again = analyze(&obs, Alternative::TwoSided).expect("analysable sample");
        assert_eq!(first.p_value.to_bits(), again.p_value.to_bits());
        assert_eq!(first, again);
    }
}
