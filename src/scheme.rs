use std::{fmt, iter::zip, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Letters used to render scheme labels, in label order.
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Minimum distance between the initial weights of two different letters.
pub const WEIGHT_MARGIN: f64 = 0.01;

/// Assignment of one letter per network weight. Weights sharing a letter are tied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scheme {
    labels: Vec<usize>,
}

impl Scheme {
    /// Scheme tying every weight to the same letter.
    pub fn uniform(len: usize) -> Result<Self> {
        Self::from_labels(vec![0; len])
    }

    pub fn from_labels(labels: Vec<usize>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::EmptyScheme);
        }

        if let Some(&max) = labels.iter().max() {
            if max >= ALPHABET.len() {
                return Err(Error::AlphabetExhausted(max + 1));
            }
        }

        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of distinct letters, i.e. the number of independent weights.
    pub fn letter_count(&self) -> usize {
        let mut seen = vec![false; ALPHABET.len()];

        self.labels
            .iter()
            .filter(|&&l| !std::mem::replace(&mut seen[l], true))
            .count()
    }

    /// Relabels letters in order of first appearance.
    pub fn canonical(&self) -> Self {
        let mut mapping: Vec<Option<usize>> = vec![None; ALPHABET.len()];
        let mut next = 0;

        let labels = self
            .labels
            .iter()
            .map(|&l| {
                *mapping[l].get_or_insert_with(|| {
                    next += 1;
                    next - 1
                })
            })
            .collect();

        Self { labels }
    }

    pub fn is_canonical(&self) -> bool {
        let mut bound = 0;

        self.labels.iter().all(|&l| {
            let ok = l <= bound;
            if l == bound {
                bound += 1;
            }
            ok
        })
    }

    /// Draws one weight in `[-1, 1)` per letter and spreads it over the letter's positions.
    ///
    /// Every letter's weight stays at least [`WEIGHT_MARGIN`] away from the weights of the
    /// letters drawn before it, so distinct letters start out distinguishable.
    pub fn draw_weights<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut by_label: Vec<Option<f64>> = vec![None; ALPHABET.len()];
        let mut taken = Vec::with_capacity(self.letter_count());

        self.labels
            .iter()
            .map(|&l| {
                *by_label[l].get_or_insert_with(|| {
                    let w = distinct_weight(rng, &taken);
                    taken.push(w);
                    w
                })
            })
            .collect()
    }

    /// Moves every weight half the distance toward the average of its letter group.
    pub fn pull(&self, weights: &mut [f64]) -> Result<()> {
        if weights.len() != self.len() {
            return Err(Error::SchemeLength {
                expected: weights.len(),
                actual: self.len(),
            });
        }

        let mut sums = vec![0.0; ALPHABET.len()];
        let mut counts = vec![0usize; ALPHABET.len()];

        for (&l, &w) in zip(&self.labels, weights.iter()) {
            sums[l] += w;
            counts[l] += 1;
        }

        for (&l, w) in zip(&self.labels, weights.iter_mut()) {
            let average = sums[l] / counts[l] as f64;
            *w -= (*w - average) / 2.0;
        }

        Ok(())
    }
}

fn distinct_weight<R: Rng + ?Sized>(rng: &mut R, taken: &[f64]) -> f64 {
    loop {
        let w = rng.gen_range(-1.0..1.0);

        if taken.iter().all(|t| (w - t).abs() >= WEIGHT_MARGIN) {
            return w;
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self.labels.iter().map(|&l| ALPHABET[l] as char).collect();

        f.write_str(&s)
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let labels = s
            .chars()
            .map(|c| {
                ALPHABET
                    .iter()
                    .position(|&a| a as char == c)
                    .ok_or(Error::UnknownLabel(c))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_labels(labels)
    }
}

impl TryFrom<String> for Scheme {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Scheme> for String {
    fn from(scheme: Scheme) -> Self {
        scheme.to_string()
    }
}

/// Lazily enumerates the canonical schemes of a fixed length.
///
/// Canonical schemes start with `A` and never use a letter more than one past the largest
/// letter before it, so each way of grouping the weights shows up exactly once. Order is
/// lexicographic, starting with `AAA…A`.
#[derive(Clone, Debug)]
pub struct Schemes {
    current: Option<Vec<usize>>,
    max_letters: usize,
}

impl Schemes {
    pub fn new(len: usize) -> Result<Self> {
        Self::with_max_letters(len, len)
    }

    /// Only yields schemes using at most `max_letters` distinct letters.
    pub fn with_max_letters(len: usize, max_letters: usize) -> Result<Self> {
        if len == 0 {
            return Err(Error::EmptyScheme);
        }
        if max_letters == 0 {
            return Err(Error::Config("max letters must be at least 1".into()));
        }

        Ok(Self {
            current: Some(vec![0; len]),
            max_letters: max_letters.min(len).min(ALPHABET.len()),
        })
    }
}

impl Iterator for Schemes {
    type Item = Scheme;

    fn next(&mut self) -> Option<Scheme> {
        let labels = self.current.take()?;

        self.current = successor(&labels, self.max_letters);

        Some(Scheme { labels })
    }
}

fn successor(labels: &[usize], max_letters: usize) -> Option<Vec<usize>> {
    let mut prefix_max = Vec::with_capacity(labels.len());
    let mut max = 0;

    for &l in labels {
        prefix_max.push(max);
        max = max.max(l);
    }

    let pos = (1..labels.len())
        .rev()
        .find(|&i| labels[i] <= prefix_max[i] && labels[i] + 1 < max_letters)?;

    let mut next = labels[..=pos].to_vec();
    next[pos] += 1;
    next.resize(labels.len(), 0);

    Some(next)
}
