//! Tiers command implementation

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use beatmapper_backend::source::last_resort_spacing;

use crate::input::load_config;

/// Run the tiers command
pub fn run(profile: &str, json_output: bool) -> Result<ExitCode> {
    let config = load_config(profile, None)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} (tolerance ±{:.0}%, {} iterations, start {:.1}s)",
        "Profile".cyan().bold(),
        config.name,
        config.tolerance * 100.0,
        config.max_iterations,
        config.start_offset
    );
    println!(
        "  {:<8} {:>12} {:>10} {:>14}",
        "tier", "target/s", "min gap", "grid spacing"
    );
    for (tier, settings) in config.tiers.iter() {
        println!(
            "  {:<8} {:>12.2} {:>9.3}s {:>13.3}s",
            tier.as_str(),
            settings.target_density,
            settings.min_gap,
            last_resort_spacing(&config, tier)
        );
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile() {
        assert!(run("turbo", false).is_err());
        assert_eq!(run("relaxed", true).unwrap(), ExitCode::SUCCESS);
    }
}
