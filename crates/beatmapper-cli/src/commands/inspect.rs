//! Inspect command implementation
//!
//! Prints density and interval statistics for an existing chart.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;

use beatmapper_backend::{read_chart, ChartStats};

/// Run the inspect command
///
/// # Returns
/// Exit code: 0 success, 1 error
pub fn run(chart_path: &Path, json_output: bool) -> Result<ExitCode> {
    let stats = load_stats(chart_path)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_human(chart_path, &stats);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads a chart file and summarises it.
pub fn load_stats(chart_path: &Path) -> Result<ChartStats> {
    let file = fs::File::open(chart_path)
        .with_context(|| format!("Failed to open chart: {}", chart_path.display()))?;
    let records = read_chart(BufReader::new(file))
        .with_context(|| format!("Failed to parse chart: {}", chart_path.display()))?;
    Ok(ChartStats::from_records(&records))
}

fn print_human(chart_path: &Path, stats: &ChartStats) {
    println!("{} {}", "Chart:".cyan().bold(), chart_path.display());
    println!(
        "  {} events ({} distinct times)",
        stats.total_events, stats.distinct_times
    );
    if let (Some(first), Some(last)) = (stats.first_time, stats.last_time) {
        println!(
            "  span {:.2}s - {:.2}s ({:.2}s active)",
            first, last, stats.active_span
        );
    }
    println!("  density {:.3} events/s", stats.density);
    if let (Some(min), Some(mean), Some(max)) =
        (stats.min_interval, stats.mean_interval, stats.max_interval)
    {
        println!("  interval min {:.3}s, mean {:.3}s, max {:.3}s", min, mean, max);
    }
    for (enemy_type, count) in &stats.enemy_types {
        println!("  enemy type {}: {}", enemy_type, count);
    }
    println!(
        "  {} {}",
        "recommended tier:".bold(),
        stats.recommended_tier.to_string().green()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        fs::write(
            &path,
            "Time [s],Enemy Type,Aux Color 1,Aux Color 2,Nº Enemies,interval,Aux\n\
             3.00,2,5,6,1,,5\n\
             3.50,1,1,1,1,,6\n\
             4.00,1,2,2,1,,7\n",
        )
        .unwrap();

        let stats = load_stats(&path).unwrap();
        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.min_interval, Some(0.5));
        assert_eq!(run(&path, true).unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_missing_chart_is_error() {
        let err = load_stats(Path::new("/nonexistent/notes.csv")).unwrap_err();
        assert!(err.to_string().contains("Failed to open chart"));
    }
}
