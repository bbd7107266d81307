//! Writes sweep outcomes as per-scheme result files plus an overall summary.

use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::info;

use crate::{
    config::RunConfig,
    error::Result,
    scheme::Scheme,
    summary::Summary,
    train::TrainOutcome,
};

pub const SUMMARY_CSV: &str = "schemeerrors.csv";
pub const SUMMARY_JSON: &str = "summary.json";

/// Result file name encoding the run parameters, e.g. `wAABe20000a0.50i3l2h3o1.xoroutput`.
///
/// Node counts include the bias nodes.
pub fn result_file_name(config: &RunConfig, scheme: Option<&Scheme>) -> String {
    let Some(scheme) = scheme else {
        return format!("simple.{}output", config.problem.name());
    };

    format!(
        "w{}e{}a{:.2}i{}l{}h{}o1.{}output",
        scheme,
        config.epochs,
        config.alpha,
        config.problem.input_len() + 1,
        config.hidden_layers,
        config.hidden_nodes + 1,
        config.problem.name()
    )
}

/// Text block for one run: checkpoints, the final test cases and a seed line.
pub fn render_outcome(outcome: &TrainOutcome) -> String {
    let mut out = String::new();

    for checkpoint in &outcome.checkpoints {
        let _ = writeln!(out, "epoch: {}, error: {}", checkpoint.epoch, checkpoint.error);
    }

    for case in &outcome.evaluation.cases {
        let _ = writeln!(
            out,
            "In: {}, Out: {}",
            case.inputs.iter().join(" "),
            case.output
        );
    }

    let _ = writeln!(
        out,
        "seed: {}, error: {}, epochs: {}, converged: {}",
        outcome.seed, outcome.evaluation.error, outcome.epochs_run, outcome.converged
    );

    out
}

/// Writes every outcome and the summary.
///
/// With `to_file` the results land in `output_dir`, one file per scheme with its seeds
/// appended in order; otherwise they go to stdout. The summary files are only written
/// in the former case.
pub fn write_report(config: &RunConfig, outcomes: &[TrainOutcome]) -> Result<Summary> {
    let summary = Summary::from_outcomes(config.problem, outcomes);

    if config.to_file {
        write_files(config, outcomes, &summary)?;
    } else {
        let stdout = io::stdout();
        write_text(config, outcomes, &summary, &mut stdout.lock())?;
    }

    Ok(summary)
}

/// Writes every outcome under its result file name, followed by the summary CSV.
pub fn write_text<W: Write>(
    config: &RunConfig,
    outcomes: &[TrainOutcome],
    summary: &Summary,
    out: &mut W,
) -> Result<()> {
    for (scheme, runs) in &outcomes.iter().group_by(|o| o.scheme.as_ref()) {
        writeln!(out, "{}", result_file_name(config, scheme))?;
        for outcome in runs {
            write!(out, "{}", render_outcome(outcome))?;
        }
    }

    write!(out, "{}", summary.to_csv())?;
    out.flush()?;

    Ok(())
}

fn write_files(config: &RunConfig, outcomes: &[TrainOutcome], summary: &Summary) -> Result<()> {
    let dir = &config.output_dir;
    fs::create_dir_all(dir)?;

    let mut files = 0;
    for (scheme, runs) in &outcomes.iter().group_by(|o| o.scheme.as_ref()) {
        let mut file = create(dir, &result_file_name(config, scheme))?;

        for outcome in runs {
            file.write_all(render_outcome(outcome).as_bytes())?;
        }

        file.flush()?;
        files += 1;
    }

    let mut csv = create(dir, SUMMARY_CSV)?;
    csv.write_all(summary.to_csv().as_bytes())?;
    csv.flush()?;

    let mut json = create(dir, SUMMARY_JSON)?;
    serde_json::to_writer_pretty(&mut json, summary)?;
    json.flush()?;

    info!(dir = %dir.display(), files, "results written");

    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<BufWriter<File>> {
    let path: PathBuf = dir.join(name);

    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::{CaseResult, Evaluation},
        train::Checkpoint,
    };

    fn outcome(scheme: Option<&str>, seed: u64) -> TrainOutcome {
        TrainOutcome {
            scheme: scheme.map(|s| s.parse().unwrap()),
            seed,
            epochs_run: 30,
            converged: true,
            checkpoints: vec![Checkpoint {
                epoch: 0,
                error: 1.5,
            }],
            evaluation: Evaluation {
                cases: vec![CaseResult {
                    inputs: vec![-1.0, 1.0],
                    expected: 1.0,
                    output: 0.75,
                }],
                error: 0.25,
            },
        }
    }

    #[test]
    fn file_names_encode_parameters() {
        let config = RunConfig::default();
        let scheme: Scheme = "AAB".parse().unwrap();

        assert_eq!(
            result_file_name(&config, Some(&scheme)),
            "wAABe20000a0.50i3l2h3o1.xoroutput"
        );
        assert_eq!(result_file_name(&config, None), "simple.xoroutput");
    }

    #[test]
    fn file_names_use_two_decimal_alpha() {
        let scheme: Scheme = "AAB".parse().unwrap();
        let mut config = RunConfig::default();

        config.alpha = 0.1 + 0.2;
        assert_eq!(
            result_file_name(&config, Some(&scheme)),
            "wAABe20000a0.30i3l2h3o1.xoroutput"
        );

        config.alpha = 1.0;
        assert_eq!(
            result_file_name(&config, Some(&scheme)),
            "wAABe20000a1.00i3l2h3o1.xoroutput"
        );
    }

    #[test]
    fn text_output_groups_runs_under_file_names() {
        let config = RunConfig {
            to_file: false,
            ..RunConfig::default()
        };
        let outcomes = [
            outcome(Some("AAB"), 10),
            outcome(Some("AAB"), 20),
            outcome(Some("ABC"), 10),
        ];
        let summary = Summary::from_outcomes(config.problem, &outcomes);

        let mut buf = Vec::new();
        write_text(&config, &outcomes, &summary, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "wAABe20000a0.50i3l2h3o1.xoroutput");
        assert_eq!(lines.iter().filter(|l| l.ends_with(".xoroutput")).count(), 2);
        assert_eq!(lines.iter().filter(|l| l.starts_with("seed: ")).count(), 3);
        assert!(lines.contains(&"scheme,letters,runs,converged,total_error,mean_error"));
        assert!(text.ends_with(&summary.to_csv()));
    }

    #[test]
    fn renders_cases_and_seed_line() {
        assert_eq!(
            render_outcome(&outcome(None, 7)),
            "epoch: 0, error: 1.5\nIn: -1 1, Out: 0.75\nseed: 7, error: 0.25, epochs: 30, converged: true\n"
        );
    }
}
