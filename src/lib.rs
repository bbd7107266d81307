//! Small multilayer-perceptron trainer for experimenting with weight-sharing schemes.
//!
//! A [`Scheme`] gives every weight of a [`Network`] a letter. Weights sharing a letter
//! start out equal and are periodically pulled toward their shared average while the
//! network trains with plain stochastic gradient descent on a toy [`Problem`].
//!
//! ```
//! use rand::{rngs::StdRng, SeedableRng};
//! use schemenet::{Network, Problem, Scheme, Topology};
//!
//! # fn main() -> schemenet::Result<()> {
//! let topology = Topology::new(Problem::Xor.input_len(), 1, 2)?;
//! let scheme: Scheme = "AABBCCDDE".parse()?;
//! let mut rng = StdRng::seed_from_u64(100);
//! let mut network = Network::from_scheme(topology, 0.5, scheme, &mut rng)?;
//!
//! let sample = Problem::Xor.sample(&mut rng);
//! network.train(&sample.inputs, sample.expected)?;
//! network.pull_scheme()?;
//!
//! let score = Problem::Xor.evaluate(&network)?;
//! assert_eq!(score.cases.len(), 4);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod network;
pub mod problem;
pub mod report;
pub mod scheme;
pub mod summary;
pub mod sweep;
pub mod train;

pub use config::{RunConfig, SeedRange};
pub use error::{Error, Result};
pub use network::{Network, Topology};
pub use problem::{Evaluation, Problem, Sample};
pub use scheme::{Scheme, Schemes};
pub use summary::Summary;
pub use train::TrainOutcome;
