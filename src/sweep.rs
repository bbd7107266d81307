use itertools::iproduct;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    config::RunConfig,
    error::Result,
    scheme::{Scheme, Schemes},
    train::{self, TrainOutcome},
};

/// Canonical schemes covering every weight of the configured network.
///
/// Large networks need `max_letters` or `scheme_limit`, see [`RunConfig::check_scheme_cap`].
pub fn schemes_for(config: &RunConfig) -> Result<Vec<Scheme>> {
    config.check_scheme_cap()?;

    let len = config.topology()?.weight_count();
    let schemes = Schemes::with_max_letters(len, config.max_letters.unwrap_or(len))?;

    Ok(match config.scheme_limit {
        Some(limit) => schemes.take(limit).collect(),
        None => schemes.collect(),
    })
}

pub fn seeds_for(config: &RunConfig) -> Vec<u64> {
    if config.sweep {
        config.seeds.seeds().collect()
    } else {
        vec![config.seed]
    }
}

/// Trains one network per `(scheme, seed)` pair on the rayon pool.
///
/// Outcomes come back scheme-major, seeds in ascending order, regardless of which
/// thread finished first.
pub fn sweep(config: &RunConfig) -> Result<Vec<TrainOutcome>> {
    config.validate()?;

    let schemes: Vec<Option<Scheme>> = if config.use_schemes {
        schemes_for(config)?.into_iter().map(Some).collect()
    } else {
        vec![None]
    };
    let seeds = seeds_for(config);

    info!(
        problem = config.problem.name(),
        schemes = schemes.len(),
        seeds = seeds.len(),
        "starting sweep"
    );

    let jobs: Vec<_> = iproduct!(schemes.iter(), seeds.iter()).collect();

    let outcomes = jobs
        .par_iter()
        .map(|&(scheme, &seed)| {
            let outcome = train::run(config, scheme.clone(), seed)?;

            debug!(
                scheme = %outcome.scheme.as_ref().map(Scheme::to_string).unwrap_or_default(),
                seed,
                error = outcome.evaluation.error,
                epochs = outcome.epochs_run,
                converged = outcome.converged,
                "run finished"
            );

            Ok(outcome)
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        runs = outcomes.len(),
        converged = outcomes.iter().filter(|o| o.converged).count(),
        "sweep finished"
    );

    Ok(outcomes)
}
