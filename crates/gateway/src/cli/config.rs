use mux_domain::config::{Config, ConfigSeverity};

/// Prints every validation issue and returns whether the config is clean
/// enough to serve (no `error`-severity issues).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    for issue in &issues {
        println!("{issue}");
    }

    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    let warning_count = issues.len() - error_count;
    println!("\n{error_count} error(s), {warning_count} warning(s) in {config_path}");
    error_count == 0
}

/// Dumps the resolved configuration, defaults included, as TOML.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}
