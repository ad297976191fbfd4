//! Generate command implementation
//!
//! Runs the strategy orchestrator over an analysis file and writes the chart.

use anyhow::{Context, Result};
use colored::Colorize;
use log::error;
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use beatmapper_backend::{
    write_chart, ChartOutput, GenerateError, GenerateResult, GenerationOutput, GenerationRequest,
    GeneratorOrchestrator,
};
use beatmapper_spec::{AttemptOutcome, ChartError, DifficultyTier, NoteEvent, Strategy};

use crate::input::{load_config, load_reference, resolve_duration, AnalysisFile};

/// Exit code for a request the generator could not satisfy.
pub const EXIT_GENERATION_FAILED: u8 = 2;

/// Options for the generate command.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub analysis: PathBuf,
    pub tier: DifficultyTier,
    pub out: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub duration: Option<f64>,
    pub seed: u32,
    pub profile: String,
    pub config: Option<PathBuf>,
    pub strategy: Option<Strategy>,
    pub report: Option<PathBuf>,
    pub json: bool,
}

/// Run the generate command
///
/// # Returns
/// Exit code: 0 success, 1 input or config error, 2 generation failure
pub fn run(options: &GenerateOptions) -> Result<ExitCode> {
    let config = load_config(&options.profile, options.config.as_deref())?;
    let analysis = AnalysisFile::load(&options.analysis);
    let duration = resolve_duration(options.duration, &analysis)?;
    let reference = options
        .reference
        .as_deref()
        .map(load_reference)
        .transpose()?;

    let mut orchestrator = GeneratorOrchestrator::new(&config).with_analyzer(&analysis);
    if let Some(reference) = &reference {
        orchestrator = orchestrator.with_reference(reference);
    }

    let mut request = GenerationRequest::new(options.tier, duration).with_seed(options.seed);
    if let Some(strategy) = options.strategy {
        request = request.starting_with(strategy);
    }

    let output = match orchestrator.generate(&request) {
        Ok(output) => output,
        Err(err) => return Ok(report_failure(&err, options.json)),
    };

    let chart = ChartOutput::render(&output.events)?;
    let written = match &options.out {
        Some(out) => write_chart_file(&output.events, out),
        None if !options.json => write_chart(&output.events, std::io::stdout().lock()),
        None => Ok(()),
    };
    if let Err(err) = written {
        return Ok(report_failure(&err, options.json));
    }

    if let Some(path) = &options.report {
        let json = output.report.to_json_pretty()?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    if options.json {
        print_json(&output, &chart, options)?;
    } else {
        print_summary(&output, &chart, options);
    }
    Ok(ExitCode::SUCCESS)
}

/// Writes `events` as a chart file at `path`.
///
/// # Errors
/// [`GenerateError::OutputIo`] if the file cannot be created or written.
fn write_chart_file(events: &[NoteEvent], path: &Path) -> GenerateResult<()> {
    let result = fs::File::create(path)
        .map_err(GenerateError::from)
        .and_then(|file| write_chart(events, BufWriter::new(file)));
    if let Err(err) = &result {
        error!("failed to write chart {}: {}", path.display(), err);
    }
    result
}

fn report_failure(err: &GenerateError, json: bool) -> ExitCode {
    if json {
        let value = serde_json::json!({
            "success": false,
            "error": {
                "code": err.code(),
                "category": err.category(),
                "message": err.message(),
            },
        });
        println!("{}", value);
    } else {
        eprintln!("{} [{}] {}", "error".red().bold(), err.code(), err);
    }
    ExitCode::from(EXIT_GENERATION_FAILED)
}

fn print_json(
    output: &GenerationOutput,
    chart: &ChartOutput,
    options: &GenerateOptions,
) -> Result<()> {
    let value = serde_json::json!({
        "success": true,
        "out": options.out.as_ref().map(|p| p.display().to_string()),
        "hash": chart.hash,
        "report": output.report,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_summary(output: &GenerationOutput, chart: &ChartOutput, options: &GenerateOptions) {
    let report = &output.report;
    // The chart itself may be on stdout.
    let line = |text: String| {
        if options.out.is_some() {
            println!("{}", text);
        } else {
            eprintln!("{}", text);
        }
    };

    line(format!(
        "{} {} chart via {}",
        "Generated".green().bold(),
        report.tier,
        report.strategy.to_string().cyan()
    ));
    line(format!(
        "  {} events, {:.3}/s (target {:.3}/s, {} iteration(s))",
        report.event_count, report.achieved_density, report.target_density, report.iterations
    ));
    for attempt in &report.attempts {
        let mark = match attempt.outcome {
            AttemptOutcome::Success => "ok".green(),
            AttemptOutcome::SoftFailure => "!!".yellow(),
            AttemptOutcome::HardFailure => "xx".red(),
        };
        line(format!(
            "  {} {} {}",
            mark,
            attempt.strategy,
            attempt.detail.as_deref().unwrap_or("").dimmed()
        ));
    }
    for warning in &report.warnings {
        line(format!(
            "  {} [{}] {}",
            "warning".yellow(),
            warning.code.code(),
            warning.message
        ));
    }
    if let Some(out) = &options.out {
        line(format!("  {} {}", "->".green(), out.display()));
    }
    line(format!("  {} {}", "hash".dimmed(), chart.hash.dimmed()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn options(dir: &std::path::Path) -> GenerateOptions {
        GenerateOptions {
            analysis: dir.join("analysis.json"),
            tier: DifficultyTier::Easy,
            out: Some(dir.join("notes.csv")),
            reference: None,
            duration: None,
            seed: 0,
            profile: "default".to_string(),
            config: None,
            strategy: None,
            report: Some(dir.join("report.json")),
            json: true,
        }
    }

    #[test]
    fn test_generate_writes_chart_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let onsets: Vec<String> = (0..120)
            .map(|i| format!(r#"{{"time": {}, "strength": 1.0, "band": 0}}"#, i as f64 * 0.5))
            .collect();
        let json = format!(
            r#"{{"tempo": 120.0, "beatTimes": [], "onsetCandidates": [{}], "duration": 60.0}}"#,
            onsets.join(",")
        );
        let mut file = fs::File::create(dir.path().join("analysis.json")).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let code = run(&options(dir.path())).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let csv = fs::read_to_string(dir.path().join("notes.csv")).unwrap();
        assert!(csv.starts_with(beatmapper_backend::chart::CHART_HEADER));
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["strategy"], "onset_driven");
    }

    #[test]
    fn test_missing_analysis_needs_duration() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&options(dir.path())).is_err());

        let mut with_duration = options(dir.path());
        with_duration.duration = Some(20.0);
        assert_eq!(run(&with_duration).unwrap(), ExitCode::SUCCESS);

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["strategy"], "last_resort_grid");
    }

    #[test]
    fn test_unwritable_chart_exits_with_generation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.duration = Some(20.0);
        opts.out = Some(dir.path().join("no").join("such").join("notes.csv"));

        assert_eq!(run(&opts).unwrap(), ExitCode::from(EXIT_GENERATION_FAILED));
        assert!(!dir.path().join("report.json").exists());
    }

    #[test]
    fn test_chart_file_error_carries_output_code() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_chart_file(&[], &dir.path().join("missing").join("notes.csv")).unwrap_err();
        assert!(matches!(err, GenerateError::OutputIo(_)));
        assert_eq!(err.code(), "GEN_004");
    }
}
