// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `unitjob`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "unitjob",
    version,
    about = "Run a command as a transient systemd service and follow its log.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a config file (TOML). Defaults are used when omitted.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `UNITJOB_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Talk to the per-user manager instead of the system manager.
    #[arg(long)]
    pub user: bool,

    /// Environment variable for the job. May be repeated.
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Pass this process's environment to the job (`--env` wins on clashes).
    #[arg(long)]
    pub inherit_env: bool,

    /// Exit once the unit is created instead of following its log.
    #[arg(long)]
    pub no_follow: bool,

    /// Job name; the unit is `<NAME>.service`.
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Command to run, after `--`.
    #[arg(last = true, required = true, value_name = "ARGV")]
    pub argv: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_env_and_trailing_argv() {
        let args = CliArgs::try_parse_from([
            "unitjob", "-e", "A=1", "--env", "B=x=y", "test-23", "--", "/bin/sh", "-c", "echo lol",
        ])
        .unwrap();

        assert_eq!(args.name, "test-23");
        assert_eq!(
            args.env,
            vec![("A".to_string(), "1".to_string()), ("B".to_string(), "x=y".to_string())]
        );
        assert_eq!(args.argv, vec!["/bin/sh", "-c", "echo lol"]);
        assert!(!args.inherit_env);
    }

    #[test]
    fn argv_is_required() {
        assert!(CliArgs::try_parse_from(["unitjob", "test-23"]).is_err());
    }

    #[test]
    fn env_pair_needs_a_key() {
        assert!(parse_env_pair("=1").is_err());
        assert!(parse_env_pair("NOEQUALS").is_err());
    }
}
