//! Command-line arguments and the configuration summary

use clap::Parser;
use colored::*;

use crate::config::AppConfig;
use crate::entity::Roster;

/// Trackdeck - drive a JMRI layout from a pad/encoder control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    pub list_ports: bool,

    /// Load and validate the configuration, print a summary and exit
    #[arg(long)]
    pub check_config: bool,
}

/// Human-readable summary of a validated configuration
pub fn config_summary(config: &AppConfig, roster: &Roster) -> Vec<String> {
    let mut lines = vec![
        format!("JMRI server:  {}", config.jmri.url()),
        format!(
            "MIDI ports:   in '{}', out '{}'",
            config.midi.input_port, config.midi.output_port
        ),
        format!(
            "Display:      {}x{} @ {} fps",
            config.display.width, config.display.height, config.display.fps
        ),
        format!(
            "Locos:        {} ({} throttle pages)",
            roster.locos().len(),
            roster.locos().len().div_ceil(crate::layout::COLUMNS).max(1)
        ),
    ];
    for loco in roster.locos() {
        lines.push(format!("Loco:         {} '{}'", loco.address(), loco.name()));
    }
    for panel in roster.panels() {
        lines.push(format!(
            "Panel:        '{}' with {} groups",
            panel.name,
            panel.groups.len()
        ));
    }
    lines.push(format!(
        "Switches:     {}",
        roster.referenced_switches().len()
    ));
    lines
}

pub fn print_config_summary(path: &str, config: &AppConfig, roster: &Roster) {
    println!("\n{} {}", "Configuration OK:".bold().green(), path);
    for line in config_summary(config, roster) {
        println!("  {}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["trackdeck"]);
        assert_eq!(args.config, "config.yaml");
        assert!(!args.list_ports);
        assert!(!args.check_config);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from(["trackdeck", "-c", "layout.yaml", "--check-config"]);
        assert_eq!(args.config, "layout.yaml");
        assert!(args.check_config);
    }

    #[test]
    fn test_summary_counts() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
midi: { input_port: Push, output_port: Push }
locos: [{ address: 3, name: Big Boy }, { address: 4 }]
panels:
  - name: Yard
    groups:
      - { kind: single, switches: [LT1] }
      - { kind: crossover, switches: [LT2, LT3] }
"#,
        )
        .unwrap();
        let roster = Roster::from_config(&config).unwrap();
        let summary = config_summary(&config, &roster);
        assert!(summary.iter().any(|l| l.contains("ws://localhost:12080/json/")));
        assert!(summary.iter().any(|l| l.contains("'Yard' with 2 groups")));
        assert!(summary.iter().any(|l| l.ends_with("3 'Big Boy'")));
        assert!(summary.iter().any(|l| l.ends_with("4 '4'")));
        assert!(summary.iter().any(|l| l.ends_with(" 3")));
    }
}
