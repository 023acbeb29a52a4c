//! Left-to-right hidden Markov model over discrete symbols.
//!
//! Evaluation uses the forward algorithm in linear probability space.
//! Training is a multi-sequence re-estimation: every sequence contributes
//! its expected transition and emission counts weighted by the inverse of
//! its own likelihood, and the new matrices replace the old ones only after
//! the whole pass. The initial distribution is fixed at construction.

use mg_config::recognizer::DEFAULT_JUMP_LIMIT;
use mg_math::{first_non_stochastic_row, is_distribution, ln_or_neg_inf, Matrix, STOCHASTIC_TOL};
use thiserror::Error;

use crate::logging::event_names;

/// HMM errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    #[error("HMM needs at least one state and one symbol, got {states} states and {observations} symbols")]
    InvalidSize { states: usize, observations: usize },

    #[error("observation sequence is empty")]
    EmptySequence,

    #[error("symbol {symbol} at position {position} is outside [0, {observations})")]
    SymbolOutOfRange {
        symbol: usize,
        position: usize,
        observations: usize,
    },

    #[error("{what} has shape {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("{what} row {row} is not a probability distribution")]
    NotStochastic { what: &'static str, row: usize },

    #[error("every one of the {sequences} training sequences has zero or non-finite likelihood")]
    DegenerateTraining { sequences: usize },
}

impl From<HmmError> for mg_common::Error {
    fn from(err: HmmError) -> Self {
        match err {
            HmmError::EmptySequence => mg_common::Error::EmptyGesture,
            HmmError::DegenerateTraining { .. } => {
                mg_common::Error::DegenerateTraining(err.to_string())
            }
            HmmError::NotStochastic { .. } => mg_common::Error::Numerical(err.to_string()),
            other => mg_common::Error::Training(other.to_string()),
        }
    }
}

/// Discrete left-to-right (Bakis) hidden Markov model.
#[derive(Debug, Clone, PartialEq)]
pub struct HiddenMarkovModel {
    states: usize,
    observations: usize,
    initial: Vec<f64>,
    transition: Matrix,
    emission: Matrix,
}

impl HiddenMarkovModel {
    /// Left-to-right model with the default jump limit.
    pub fn new(states: usize, observations: usize) -> Result<Self, HmmError> {
        Self::with_jump_limit(states, observations, DEFAULT_JUMP_LIMIT)
    }

    /// Left-to-right model where state `i` may move to `i..=i + jump_limit`.
    ///
    /// Starts in state 0. The last state is absorbing and the one before it
    /// splits evenly between staying and advancing. Every other state
    /// spreads its mass evenly over the states it can reach. Emissions
    /// start uniform.
    pub fn with_jump_limit(
        states: usize,
        observations: usize,
        jump_limit: usize,
    ) -> Result<Self, HmmError> {
        if states == 0 || observations == 0 {
            return Err(HmmError::InvalidSize {
                states,
                observations,
            });
        }

        let mut initial = vec![0.0; states];
        initial[0] = 1.0;

        let last = states - 1;
        let mut transition = Matrix::zeros(states, states);
        for i in 0..states {
            let reach = i.saturating_add(jump_limit).min(last);
            let share = 1.0 / (reach - i + 1) as f64;
            for j in 0..states {
                transition[(i, j)] = if i == last && j == last {
                    1.0
                } else if states >= 2 && i == last - 1 && (j == last - 1 || j == last) {
                    0.5
                } else if i <= j && j <= reach {
                    share
                } else {
                    0.0
                };
            }
        }

        let emission = Matrix::filled(states, observations, 1.0 / observations as f64);

        Ok(Self {
            states,
            observations,
            initial,
            transition,
            emission,
        })
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    pub fn emission(&self) -> &Matrix {
        &self.emission
    }

    pub fn set_initial(&mut self, initial: Vec<f64>) -> Result<(), HmmError> {
        if initial.len() != self.states {
            return Err(HmmError::DimensionMismatch {
                what: "initial distribution",
                expected: (1, self.states),
                actual: (1, initial.len()),
            });
        }
        if !is_distribution(&initial, STOCHASTIC_TOL) {
            return Err(HmmError::NotStochastic {
                what: "initial distribution",
                row: 0,
            });
        }
        self.initial = initial;
        Ok(())
    }

    pub fn set_transition(&mut self, transition: Matrix) -> Result<(), HmmError> {
        check_stochastic("transition matrix", &transition, (self.states, self.states))?;
        self.transition = transition;
        Ok(())
    }

    pub fn set_emission(&mut self, emission: Matrix) -> Result<(), HmmError> {
        check_stochastic("emission matrix", &emission, (self.states, self.observations))?;
        self.emission = emission;
        Ok(())
    }

    /// Likelihood of `sequence` under this model.
    pub fn probability(&self, sequence: &[usize]) -> Result<f64, HmmError> {
        let fwd = self.forward(sequence)?;
        Ok(last_column_sum(&fwd))
    }

    /// Natural log of [`probability`](Self::probability); zero maps to `-inf`.
    pub fn log_probability(&self, sequence: &[usize]) -> Result<f64, HmmError> {
        self.probability(sequence).map(ln_or_neg_inf)
    }

    /// Forward variables, indexed `(state, time)`.
    pub fn forward(&self, sequence: &[usize]) -> Result<Matrix, HmmError> {
        self.check_sequence(sequence)?;
        Ok(self.forward_unchecked(sequence))
    }

    /// Backward variables, indexed `(state, time)`.
    pub fn backward(&self, sequence: &[usize]) -> Result<Matrix, HmmError> {
        self.check_sequence(sequence)?;
        Ok(self.backward_unchecked(sequence))
    }

    /// One re-estimation pass over `sequences`.
    ///
    /// Sequences whose likelihood is zero or not finite cannot be weighted
    /// and are skipped. If every sequence is skipped the model is left
    /// unchanged and an error is returned. A state whose expected
    /// occupancy is zero keeps its previous transition and emission rows.
    pub fn train<S: AsRef<[usize]>>(&mut self, sequences: &[S]) -> Result<(), HmmError> {
        for seq in sequences {
            self.check_sequence(seq.as_ref())?;
        }

        // Forward, backward and likelihood per usable sequence. Parameters
        // are fixed for the whole pass, so computing these once gives the
        // same values as recomputing them for every parameter.
        let mut tables = Vec::with_capacity(sequences.len());
        for (index, seq) in sequences.iter().enumerate() {
            let seq = seq.as_ref();
            let fwd = self.forward_unchecked(seq);
            let prob = last_column_sum(&fwd);
            if prob == 0.0 || !prob.is_finite() {
                tracing::warn!(
                    target: event_names::HMM_SEQUENCE_SKIPPED,
                    index,
                    likelihood = prob,
                    len = seq.len(),
                    "skipping training sequence with unusable likelihood"
                );
                continue;
            }
            let bwd = self.backward_unchecked(seq);
            tables.push(SequenceTables { seq, fwd, bwd, prob });
        }

        if tables.is_empty() {
            return Err(HmmError::DegenerateTraining {
                sequences: sequences.len(),
            });
        }

        let s = self.states;
        let mut a_new = Matrix::zeros(s, s);
        let mut b_new = Matrix::zeros(s, self.observations);

        for i in 0..s {
            for j in 0..s {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for t in &tables {
                    let mut num_inner = 0.0;
                    let mut den_inner = 0.0;
                    for step in 0..t.seq.len() - 1 {
                        num_inner += t.fwd[(i, step)]
                            * self.transition[(i, j)]
                            * self.emission[(j, t.seq[step + 1])]
                            * t.bwd[(j, step + 1)];
                        den_inner += t.fwd[(i, step)] * t.bwd[(i, step)];
                    }
                    numerator += (1.0 / t.prob) * num_inner;
                    denominator += (1.0 / t.prob) * den_inner;
                }
                a_new[(i, j)] = numerator / denominator;
            }
            keep_row_if_unusable(&mut a_new, &self.transition, i);
        }

        for i in 0..s {
            for k in 0..self.observations {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for t in &tables {
                    let mut num_inner = 0.0;
                    let mut den_inner = 0.0;
                    for step in 0..t.seq.len() - 1 {
                        let occupancy = t.fwd[(i, step)] * t.bwd[(i, step)];
                        if t.seq[step] == k {
                            num_inner += occupancy;
                        }
                        den_inner += occupancy;
                    }
                    numerator += (1.0 / t.prob) * num_inner;
                    denominator += (1.0 / t.prob) * den_inner;
                }
                b_new[(i, k)] = numerator / denominator;
            }
            keep_row_if_unusable(&mut b_new, &self.emission, i);
        }

        self.transition = a_new;
        self.emission = b_new;
        tracing::trace!(
            sequences = sequences.len(),
            used = tables.len(),
            "hmm re-estimation pass complete"
        );
        Ok(())
    }

    fn check_sequence(&self, sequence: &[usize]) -> Result<(), HmmError> {
        if sequence.is_empty() {
            return Err(HmmError::EmptySequence);
        }
        match sequence.iter().position(|&o| o >= self.observations) {
            Some(position) => Err(HmmError::SymbolOutOfRange {
                symbol: sequence[position],
                position,
                observations: self.observations,
            }),
            None => Ok(()),
        }
    }

    fn forward_unchecked(&self, o: &[usize]) -> Matrix {
        let s = self.states;
        let mut f = Matrix::zeros(s, o.len());
        for l in 0..s {
            f[(l, 0)] = self.initial[l] * self.emission[(l, o[0])];
        }
        for t in 1..o.len() {
            for k in 0..s {
                let mut sum = 0.0;
                for l in 0..s {
                    sum += f[(l, t - 1)] * self.transition[(l, k)];
                }
                f[(k, t)] = sum * self.emission[(k, o[t])];
            }
        }
        f
    }

    fn backward_unchecked(&self, o: &[usize]) -> Matrix {
        let s = self.states;
        let len = o.len();
        let mut b = Matrix::zeros(s, len);
        for i in 0..s {
            b[(i, len - 1)] = 1.0;
        }
        for t in (0..len - 1).rev() {
            for i in 0..s {
                let mut sum = 0.0;
                for j in 0..s {
                    sum += b[(j, t + 1)] * self.transition[(i, j)] * self.emission[(j, o[t + 1])];
                }
                b[(i, t)] = sum;
            }
        }
        b
    }
}

struct SequenceTables<'a> {
    seq: &'a [usize],
    fwd: Matrix,
    bwd: Matrix,
    prob: f64,
}

fn last_column_sum(fwd: &Matrix) -> f64 {
    let last = fwd.cols() - 1;
    (0..fwd.rows()).map(|i| fwd[(i, last)]).sum()
}

fn keep_row_if_unusable(new: &mut Matrix, old: &Matrix, row: usize) {
    if new.row(row).iter().any(|v| !v.is_finite()) {
        new.row_mut(row).copy_from_slice(old.row(row));
    }
}

fn check_stochastic(
    what: &'static str,
    m: &Matrix,
    expected: (usize, usize),
) -> Result<(), HmmError> {
    if m.shape() != expected {
        return Err(HmmError::DimensionMismatch {
            what,
            expected,
            actual: m.shape(),
        });
    }
    match first_non_stochastic_row(m, STOCHASTIC_TOL) {
        Some(row) => Err(HmmError::NotStochastic { what, row }),
        None => Ok(()),
    }
}
