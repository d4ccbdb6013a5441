#[macro_use]
mod log;

mod api;
mod backend;
mod browser;
mod chart;
mod cli;
mod config;
mod dashboard;
mod tui;

use api::client::AnalyticsClient;
use config::Config;
use std::path::PathBuf;
use std::process::Command;

fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("mailstat").join("config.toml")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".config")
            .join("mailstat")
            .join("config.toml")
    } else {
        PathBuf::from("config.toml")
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{}=", name);
    args.iter()
        .find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn show_log() {
    let path = log::log_path();
    if !path.exists() {
        eprintln!("No log file found at {}", path.display());
        std::process::exit(1);
    }
    let pager = std::env::var("PAGER").unwrap_or_else(|_| "less".to_string());
    match Command::new(&pager).arg(&path).status() {
        Ok(s) if s.success() => {}
        Ok(s) => std::process::exit(s.code().unwrap_or(1)),
        Err(e) => {
            eprintln!("Failed to launch pager '{}': {}", pager, e);
            std::process::exit(1);
        }
    }
}

fn print_help_config() {
    let config_path = default_config_path();
    println!("Default config file: {}", config_path.display());
    println!("A missing config file means all defaults.");
    println!();
    println!("Available options:");
    println!();
    println!("[api]");
    println!("  base_url = \"http://localhost:8000/api\"  # Analytics backend (env: {})", config::API_URL_ENV);
    println!("  timeout_secs = 30            # Per-request timeout (default: 30)");
    println!();
    println!("[ui]");
    println!("  mouse = true                 # Enable mouse support (default: true)");
    println!("  debounce_ms = 500            # Search settle time before fetching (default: 500)");
    println!("  chart_entries = 20           # Bars per dashboard chart (default: 20)");
    println!();
    println!("Precedence for the backend URL: --api-url flag, then ${}, then base_url.", config::API_URL_ENV);
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: mailstat [OPTIONS]");
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --config=PATH    Use config file at PATH instead of default");
        eprintln!("  --api-url=URL    Backend base URL (overrides config and ${})", config::API_URL_ENV);
        eprintln!("  --cli            Run in JSON-over-stdin/stdout CLI mode");
        eprintln!("  --log            View the log file in $PAGER");
        eprintln!("  --clear-log      Truncate the log file at startup");
        eprintln!("  --help-cli       Print CLI mode protocol documentation");
        eprintln!("  --help-config    Print default config path and all options");
        eprintln!("  --help           Show this help");
        std::process::exit(0);
    }

    if args.iter().any(|a| a == "--help-cli") {
        cli::print_help_cli();
        std::process::exit(0);
    }

    if args.iter().any(|a| a == "--help-config") {
        print_help_config();
        std::process::exit(0);
    }

    if args.iter().any(|a| a == "--log") {
        show_log();
        std::process::exit(0);
    }

    if args.iter().any(|a| a == "--clear-log") {
        if let Err(e) = log::clear() {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }

    let config_path = flag_value(&args, "config")
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let env_url = std::env::var(config::API_URL_ENV).ok();
    let config = match Config::load(&config_path)
        .and_then(|c| c.with_overrides(flag_value(&args, "api-url"), env_url.as_deref()))
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config from {}: {}", config_path.display(), e);
            eprintln!("Run with --help-config to see the available options.");
            std::process::exit(1);
        }
    };

    log::init();
    log_info!("mailstat starting, backend: {}", config.api.base_url);

    let client = AnalyticsClient::new(&config.api.base_url, config.api.timeout);

    if args.iter().any(|a| a == "--cli") {
        cli::run_cli(client, &config);
        std::process::exit(0);
    }

    if let Err(e) = tui::run(client, &config) {
        log_error!("TUI error: {}", e);
        eprintln!("TUI error: {}", e);
        std::process::exit(1);
    }
}
