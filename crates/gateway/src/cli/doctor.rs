use mux_domain::config::{Config, ConfigSeverity};

/// Runs a sequence of environment/config sanity checks and prints a report.
/// Returns `true` when every check passes.
pub fn run(config: &Config, config_path: &str) -> bool {
    println!("mcplexer doctor");
    println!("===============\n");

    let mut all_passed = true;

    check_config_file(config_path, &mut all_passed);
    check_config_validation(config, &mut all_passed);
    check_state_dir(config, &mut all_passed);
    check_downstream_servers(config, &mut all_passed);

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }
    all_passed
}

fn print_check(name: &str, passed: bool, detail: &str) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}

fn check_config_file(config_path: &str, all_passed: &mut bool) {
    let exists = std::path::Path::new(config_path).exists();
    if exists {
        print_check("Config file exists", true, config_path);
    } else {
        print_check("Config file exists", false, &format!("{config_path} not found, using defaults"));
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    if issues.is_empty() {
        print_check("Config validation", true, "no issues");
    } else {
        print_check("Config validation", error_count == 0, &format!("{} issue(s), {error_count} error(s)", issues.len()));
        for issue in &issues {
            println!("      {issue}");
        }
    }
    if error_count > 0 {
        *all_passed = false;
    }
}

fn check_state_dir(config: &Config, all_passed: &mut bool) {
    let dir = std::path::Path::new(&config.state_dir);
    let writable = std::fs::create_dir_all(dir).is_ok() && {
        let probe = dir.join(".mcplexer-doctor-probe");
        let ok = std::fs::write(&probe, b"probe").is_ok();
        let _ = std::fs::remove_file(&probe);
        ok
    };
    print_check("State directory writable", writable, &config.state_dir);
    if !writable {
        *all_passed = false;
    }
}

fn check_downstream_servers(config: &Config, all_passed: &mut bool) {
    let count = config.downstream.servers.len();
    print_check("Downstream servers configured", count > 0, &format!("{count} server(s)"));
    if count == 0 {
        *all_passed = false;
    }
}
