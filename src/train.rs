use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    config::RunConfig,
    error::Result,
    network::Network,
    problem::Evaluation,
    scheme::Scheme,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: u64,
    pub error: f64,
}

/// Result of training one network on one seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub scheme: Option<Scheme>,
    pub seed: u64,
    pub epochs_run: u64,
    pub converged: bool,
    pub checkpoints: Vec<Checkpoint>,
    pub evaluation: Evaluation,
}

/// Builds a network for `scheme` (or an unschemed one) from `seed` and trains it.
///
/// The same seeded generator draws the initial weights and every training sample, so a
/// `(config, scheme, seed)` triple always gives the same outcome.
pub fn run(config: &RunConfig, scheme: Option<Scheme>, seed: u64) -> Result<TrainOutcome> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let topology = config.topology()?;

    let mut network = match scheme {
        Some(scheme) => Network::from_scheme(topology, config.alpha, scheme, &mut rng)?,
        None => Network::new_random(topology, config.alpha, &mut rng)?,
    };

    train(&mut network, config, &mut rng, seed)
}

/// Trains `network` one sample per epoch until it converges or runs out of epochs.
///
/// Every `convergence_interval` epochs the network is scored on the problem's test cases
/// and training stops once the error drops below `convergence_threshold`. At every
/// checkpoint tied weights are pulled together (when enabled) and the error is recorded.
pub fn train<R: Rng + ?Sized>(
    network: &mut Network,
    config: &RunConfig,
    rng: &mut R,
    seed: u64,
) -> Result<TrainOutcome> {
    config.validate()?;

    let problem = config.problem;
    let checkpoint_interval = config.checkpoint_interval();

    let mut checkpoints = Vec::with_capacity(config.checkpoints as usize + 1);
    let mut converged = false;
    let mut epochs_run = 0;

    for epoch in 0..config.epochs {
        let sample = problem.sample(rng);
        network.train(&sample.inputs, sample.expected)?;
        epochs_run = epoch + 1;

        if epoch % config.convergence_interval == 0 {
            let error = problem.evaluate(network)?.error;

            if error < config.convergence_threshold {
                debug!(seed, epoch, error, "converged");
                converged = true;
                break;
            }
        }

        if epoch % checkpoint_interval == 0 {
            if config.pull {
                network.pull_scheme()?;
            }

            let error = problem.evaluate(network)?.error;
            trace!(seed, epoch, error, "checkpoint");
            checkpoints.push(Checkpoint { epoch, error });
        }
    }

    Ok(TrainOutcome {
        scheme: network.scheme().cloned(),
        seed,
        epochs_run,
        converged,
        checkpoints,
        evaluation: problem.evaluate(network)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, network::Topology, problem::Problem};

    fn quick_config() -> RunConfig {
        RunConfig {
            hidden_layers: 1,
            hidden_nodes: 3,
            epochs: 400,
            checkpoints: 4,
            ..RunConfig::default()
        }
    }

    #[test]
    fn runs_are_reproducible() {
        let config = quick_config();

        assert_eq!(run(&config, None, 42).unwrap(), run(&config, None, 42).unwrap());
    }

    #[test]
    fn records_checkpoints_until_done() {
        let config = RunConfig {
            convergence_threshold: 0.0,
            ..quick_config()
        };
        let outcome = run(&config, None, 1).unwrap();

        assert!(!outcome.converged);
        assert_eq!(outcome.epochs_run, 400);
        let epochs: Vec<u64> = outcome.checkpoints.iter().map(|c| c.epoch).collect();
        assert_eq!(epochs, [0, 100, 200, 300]);
        assert_eq!(outcome.evaluation.cases.len(), 4);
    }

    #[test]
    fn stops_once_converged() {
        let config = RunConfig {
            convergence_threshold: f64::INFINITY,
            ..quick_config()
        };
        let outcome = run(&config, None, 1).unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.epochs_run, 1);
        assert!(outcome.checkpoints.is_empty());
    }

    #[test]
    fn scheme_outcome_keeps_its_scheme() {
        let config = RunConfig {
            problem: Problem::APlusB,
            ..quick_config()
        };
        let len = config.topology().unwrap().weight_count();
        let scheme = Scheme::uniform(len).unwrap();
        let outcome = run(&config, Some(scheme.clone()), 3).unwrap();

        assert_eq!(outcome.scheme, Some(scheme));
        assert_eq!(outcome.evaluation.cases.len(), 6);
    }

    #[test]
    fn zero_convergence_interval_is_an_error() {
        let config = RunConfig {
            convergence_interval: 0,
            epochs: 10,
            ..RunConfig::default()
        };

        assert!(matches!(run(&config, None, 1), Err(Error::Config(_))));

        let mut rng = StdRng::seed_from_u64(1);
        let mut network =
            Network::new_random(Topology::new(2, 1, 2).unwrap(), 0.5, &mut rng).unwrap();
        assert!(matches!(
            train(&mut network, &config, &mut rng, 1),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn zero_checkpoints_is_an_error() {
        let config = RunConfig {
            checkpoints: 0,
            ..quick_config()
        };

        assert!(matches!(run(&config, None, 1), Err(Error::Config(_))));
    }

    #[test]
    fn wrong_scheme_length_fails() {
        let scheme = Scheme::uniform(2).unwrap();

        assert!(run(&quick_config(), Some(scheme), 3).is_err());
    }
}
