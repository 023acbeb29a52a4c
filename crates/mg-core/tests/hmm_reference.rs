//! Reference values for HMM evaluation and multi-sequence training.
//!
//! The expected numbers are the recognizer's long-standing regression
//! values for these exact models and sequences. Any change to the forward
//! pass or the re-estimation weighting moves them.

use mg_core::HiddenMarkovModel;
use mg_math::{is_row_stochastic, Matrix, STOCHASTIC_TOL};

const TOL: f64 = 1e-12;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOL,
        "expected {expected}, got {actual} (diff {})",
        (actual - expected).abs()
    );
}

#[test]
fn weather_model_forward_probability() {
    let mut hmm = HiddenMarkovModel::new(2, 3).unwrap();
    hmm.set_initial(vec![0.6, 0.4]).unwrap();
    hmm.set_transition(Matrix::from_rows(&[[0.7, 0.3], [0.4, 0.6]]).unwrap())
        .unwrap();
    hmm.set_emission(Matrix::from_rows(&[[0.1, 0.4, 0.5], [0.6, 0.3, 0.1]]).unwrap())
        .unwrap();

    assert_close(hmm.probability(&[1, 2, 0]).unwrap(), 0.03276);
}

#[test]
fn repeated_training_matches_reference() {
    let mut hmm = HiddenMarkovModel::new(5, 5).unwrap();
    hmm.set_initial(vec![0.1, 0.3, 0.1, 0.4, 0.1]).unwrap();

    for row in hmm.emission().iter_rows() {
        for &e in row {
            assert_close(e, 0.2);
        }
    }

    let first = vec![vec![4, 2, 3, 0, 1, 3, 2]; 10];
    hmm.train(&first).unwrap();
    assert_close(hmm.emission()[(1, 2)], 0.25491738788355622);
    assert_close(hmm.emission()[(3, 1)], 0.087887575284407757);

    let second = vec![vec![3, 4, 0, 2, 1, 1, 4, 1, 3, 2]; 10];
    hmm.train(&second).unwrap();
    assert_close(hmm.emission()[(1, 2)], 0.0096840128278279109);
    assert_close(hmm.emission()[(3, 1)], 0.10439889167415384);
    assert_close(hmm.transition()[(1, 3)], 0.35392973024268204);

    assert_eq!(hmm.initial(), &[0.1, 0.3, 0.1, 0.4, 0.1]);
    assert!(is_row_stochastic(hmm.transition(), STOCHASTIC_TOL));
    assert!(is_row_stochastic(hmm.emission(), STOCHASTIC_TOL));
}

#[test]
fn training_raises_joint_log_likelihood() {
    let mut hmm = HiddenMarkovModel::new(8, 14).unwrap();
    let seqs = vec![
        vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4],
        vec![0, 1, 1, 2, 3, 3, 4, 4, 4, 4],
        vec![0, 0, 0, 1, 2, 2, 3, 4, 4, 4],
    ];
    let total = |hmm: &HiddenMarkovModel| -> f64 {
        seqs.iter().map(|s| hmm.log_probability(s).unwrap()).sum()
    };
    let before = total(&hmm);
    hmm.train(&seqs).unwrap();
    let after = total(&hmm);
    assert!(after > before, "before {before}, after {after}");
}
