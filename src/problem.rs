//! Toy problems the networks are trained and scored on.
//!
//! Every problem has a single target in `[0, 1]` so it fits the sigmoid output node.

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::Result, network::Network};

/// Scale applied to the quadratic coefficients before they reach the network.
const ABC_SCALE: f64 = 100.0;
const APLUSB_SCALE: f64 = 1000.0;

/// Fixed quadratic test set `(a, b, c, real roots)`.
const ABC_CASES: [(i16, i16, i16, u8); 8] = [
    (9, 12, 5, 0),
    (20, 1, 20, 0),
    (1, 10, 25, 1),
    (1, -2, 1, 1),
    (5, -44, 1, 2),
    (-1, 30, -8, 2),
    (-5, -20, -4, 2),
    (3, 8, 4, 2),
];

const APLUSB_CASES: [(f64, f64); 6] = [
    (500.0, 200.0),
    (-300.0, 100.0),
    (-999.0, 998.0),
    (10.0, -5.0),
    (-700.0, -200.0),
    (250.0, 750.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Problem {
    /// Exclusive or of two `±1` inputs
    Xor,
    /// Number of real roots of `ax² + bx + c`
    Abc,
    /// Whether `a + b` is positive
    #[value(name = "aplusb")]
    APlusB,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub inputs: Vec<f64>,
    pub expected: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub inputs: Vec<f64>,
    pub expected: f64,
    pub output: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub cases: Vec<CaseResult>,
    /// Sum of absolute differences between expected and produced outputs.
    pub error: f64,
}

impl Problem {
    pub fn name(self) -> &'static str {
        match self {
            Problem::Xor => "xor",
            Problem::Abc => "abc",
            Problem::APlusB => "aplusb",
        }
    }

    pub fn input_len(self) -> usize {
        match self {
            Problem::Xor | Problem::APlusB => 2,
            Problem::Abc => 3,
        }
    }

    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> Sample {
        match self {
            Problem::Xor => {
                let a = if rng.gen::<bool>() { 1.0 } else { -1.0 };
                let b = if rng.gen::<bool>() { 1.0 } else { -1.0 };

                xor_sample(a, b)
            }
            Problem::Abc => {
                let a = loop {
                    let a = rng.gen_range(-100..=100);
                    if a != 0 {
                        break a;
                    }
                };
                let b = rng.gen_range(-100..=100);
                let c = rng.gen_range(-100..=100);

                abc_sample(a, b, c)
            }
            Problem::APlusB => {
                let a = rng.gen_range(-APLUSB_SCALE..=APLUSB_SCALE);
                let b = rng.gen_range(-APLUSB_SCALE..=APLUSB_SCALE);

                aplusb_sample(a, b)
            }
        }
    }

    pub fn test_cases(self) -> Vec<Sample> {
        match self {
            Problem::Xor => [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)]
                .into_iter()
                .map(|(a, b)| xor_sample(a, b))
                .collect(),
            Problem::Abc => ABC_CASES
                .into_iter()
                .map(|(a, b, c, _)| abc_sample(a, b, c))
                .collect(),
            Problem::APlusB => APLUSB_CASES
                .into_iter()
                .map(|(a, b)| aplusb_sample(a, b))
                .collect(),
        }
    }

    /// Runs every test case through `network` and accumulates the absolute error.
    pub fn evaluate(self, network: &Network) -> Result<Evaluation> {
        let cases = self
            .test_cases()
            .into_iter()
            .map(|Sample { inputs, expected }| {
                let output = network.feed_forward(&inputs)?;

                Ok(CaseResult {
                    inputs,
                    expected,
                    output,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let error = cases.iter().map(|c| (c.expected - c.output).abs()).sum();

        Ok(Evaluation { cases, error })
    }
}

fn xor_sample(a: f64, b: f64) -> Sample {
    Sample {
        inputs: vec![a, b],
        expected: f64::from(u8::from(a != b)),
    }
}

/// Real roots of `ax² + bx + c` for `a ≠ 0`.
pub fn real_roots(a: i16, b: i16, c: i16) -> u8 {
    let (a, b, c) = (i64::from(a), i64::from(b), i64::from(c));

    match (b * b - 4 * a * c).signum() {
        -1 => 0,
        0 => 1,
        _ => 2,
    }
}

fn abc_sample(a: i16, b: i16, c: i16) -> Sample {
    Sample {
        inputs: [a, b, c].iter().map(|&v| f64::from(v) / ABC_SCALE).collect(),
        expected: f64::from(real_roots(a, b, c)) / 2.0,
    }
}

fn aplusb_sample(a: f64, b: f64) -> Sample {
    Sample {
        inputs: vec![a / APLUSB_SCALE, b / APLUSB_SCALE],
        expected: f64::from(u8::from(a + b > 0.0)),
    }
}
