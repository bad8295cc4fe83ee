//! `RunConfig::load` reading and validating a YAML run file.

use dscenkit_cli::config::RunConfig;
use std::io::Write;

#[test]
fn loads_a_run_config_and_clamps_out_of_range_hyperparameters() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "system: led-circuit\ngoal: Default\nepisodes: 50\nrl:\n  epsilon: 5.0\n  discount_rate: 0.9\n"
    )
    .unwrap();

    let config = RunConfig::load(file.path()).unwrap();
    assert_eq!(config.system, "led-circuit");
    assert_eq!(config.goal, "Default");
    assert_eq!(config.episodes, 50);
    assert!(config.rl.epsilon <= 1.0, "check_parameters should clamp epsilon into [0, 1]");
}

#[test]
fn defaults_are_used_for_omitted_fields() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "system: gridworld\n").unwrap();

    let config = RunConfig::load(file.path()).unwrap();
    assert_eq!(config.system, "gridworld");
    assert_eq!(config.goal, RunConfig::default().goal);
    assert_eq!(config.episodes, RunConfig::default().episodes);
}

#[test]
fn missing_file_reports_a_helpful_error() {
    let err = RunConfig::load("/nonexistent/path/to/config.yaml").unwrap_err();
    assert!(err.to_string().contains("reading run config"));
}
