//! Aggregates sweep outcomes per scheme and per number of distinct letters.

use std::{collections::BTreeMap, fmt::Write};

use serde::{Deserialize, Serialize};

use crate::{problem::Problem, scheme::Scheme, train::TrainOutcome};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemeErrors {
    /// `None` for networks trained without a scheme.
    pub scheme: Option<Scheme>,
    pub letters: Option<usize>,
    pub runs: usize,
    pub converged: usize,
    /// Final test error summed over every seed.
    pub total_error: f64,
    pub mean_error: f64,
    pub mean_epochs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LetterGroup {
    pub letters: usize,
    pub schemes: usize,
    /// Mean of the schemes' total errors.
    pub mean_total_error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub problem: Problem,
    pub schemes: Vec<SchemeErrors>,
    pub highest: Option<SchemeErrors>,
    pub lowest: Option<SchemeErrors>,
    pub by_letters: Vec<LetterGroup>,
}

impl Summary {
    pub fn from_outcomes(problem: Problem, outcomes: &[TrainOutcome]) -> Self {
        let mut grouped: BTreeMap<Option<&Scheme>, Vec<&TrainOutcome>> = BTreeMap::new();

        for outcome in outcomes {
            grouped
                .entry(outcome.scheme.as_ref())
                .or_default()
                .push(outcome);
        }

        let schemes: Vec<SchemeErrors> = grouped
            .into_iter()
            .map(|(scheme, runs)| {
                let total_error: f64 = runs.iter().map(|o| o.evaluation.error).sum();
                let total_epochs: u64 = runs.iter().map(|o| o.epochs_run).sum();
                let n = runs.len() as f64;

                SchemeErrors {
                    scheme: scheme.cloned(),
                    letters: scheme.map(Scheme::letter_count),
                    runs: runs.len(),
                    converged: runs.iter().filter(|o| o.converged).count(),
                    total_error,
                    mean_error: total_error / n,
                    mean_epochs: total_epochs as f64 / n,
                }
            })
            .collect();

        let highest = schemes
            .iter()
            .max_by(|a, b| a.total_error.total_cmp(&b.total_error))
            .cloned();
        let lowest = schemes
            .iter()
            .min_by(|a, b| a.total_error.total_cmp(&b.total_error))
            .cloned();

        let mut letters: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
        for entry in &schemes {
            if let Some(count) = entry.letters {
                let (n, sum) = letters.entry(count).or_default();
                *n += 1;
                *sum += entry.total_error;
            }
        }

        let by_letters = letters
            .into_iter()
            .map(|(letters, (schemes, sum))| LetterGroup {
                letters,
                schemes,
                mean_total_error: sum / schemes as f64,
            })
            .collect();

        Summary {
            problem,
            schemes,
            highest,
            lowest,
            by_letters,
        }
    }

    /// One `scheme,letters,runs,converged,total_error,mean_error` row per scheme.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("scheme,letters,runs,converged,total_error,mean_error\n");

        for entry in &self.schemes {
            let _ = writeln!(
                csv,
                "{},{},{},{},{},{}",
                entry.scheme.as_ref().map(Scheme::to_string).unwrap_or_default(),
                entry.letters.map(|l| l.to_string()).unwrap_or_default(),
                entry.runs,
                entry.converged,
                entry.total_error,
                entry.mean_error
            );
        }

        csv
    }
}
