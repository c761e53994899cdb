//! Driver configuration and CLI argument parsing
//!
//! Every option can be given as a command-line flag or as an environment
//! variable with the TOKENGUARD_ prefix.
//!
//! # Configuration Priority
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Default values (lowest priority)
//!
//! # Example Usage
//!
//! ```bash
//! # Replay the eviction walkthrough
//! tokenguard --scenario walkthrough
//!
//! # Hammer 10k keys from 8 threads and print Prometheus metrics
//! export TOKENGUARD_THREADS=8
//! tokenguard --scenario load --keys 10000 --report prometheus
//! ```

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde::Deserialize;
use tokenguard::LimiterConfig;

/// Main configuration structure for the driver
#[derive(Debug, Clone)]
pub struct Config {
    /// Bucket and store parameters handed to the limiter
    pub limiter: LimiterConfig,
    /// What to run
    pub scenario: Scenario,
    /// Load generation parameters, used by [`Scenario::Load`]
    pub load: LoadConfig,
    /// How to print the final metrics
    pub report: ReportFormat,
    /// Logging level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Parameters of the multi-threaded load run
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LoadConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Decisions requested by each thread
    pub requests_per_thread: usize,
    /// Size of the key space requests are drawn from
    pub keys: usize,
}

/// Available driver scenarios
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Scripted five-user story showing hits, misses and LRU eviction
    Walkthrough,
    /// Concurrent random traffic over a configurable key space
    Load,
}

impl std::str::FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "walkthrough" => Ok(Scenario::Walkthrough),
            "load" => Ok(Scenario::Load),
            _ => Err(anyhow!(
                "Invalid scenario: {}. Valid options are: walkthrough, load",
                s
            )),
        }
    }
}

/// Output format of the final metrics report
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human readable summary
    Text,
    /// Prometheus text exposition format
    Prometheus,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "prometheus" => Ok(ReportFormat::Prometheus),
            "json" => Ok(ReportFormat::Json),
            _ => Err(anyhow!(
                "Invalid report format: {}. Valid options are: text, prometheus, json",
                s
            )),
        }
    }
}

/// Command-line arguments for the driver
///
/// All arguments can also be set via environment variables with the
/// TOKENGUARD_ prefix. CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(
    name = "tokenguard",
    about = "Token bucket admission control driver",
    long_about = "Runs the tokenguard rate limiter through a scripted walkthrough or a concurrent load test and reports the resulting metrics.\n\nEnvironment variables with TOKENGUARD_ prefix are supported. CLI arguments take precedence over environment variables."
)]
pub struct Args {
    // Limiter configuration
    #[arg(
        long,
        value_name = "TOKENS",
        help = "Maximum tokens per bucket",
        default_value_t = 5.0,
        env = "TOKENGUARD_BUCKET_CAPACITY"
    )]
    pub bucket_capacity: f64,
    #[arg(
        long,
        value_name = "PER_SEC",
        help = "Tokens added to each bucket per second",
        default_value_t = 1.0,
        env = "TOKENGUARD_REFILL_RATE"
    )]
    pub refill_rate: f64,
    #[arg(
        long,
        value_name = "KEYS",
        help = "Maximum number of keys holding a bucket",
        default_value_t = 1_000,
        env = "TOKENGUARD_CACHE_CAPACITY"
    )]
    pub cache_capacity: usize,

    // Scenario selection
    #[arg(
        long,
        value_name = "NAME",
        help = "Scenario: walkthrough, load",
        default_value = "walkthrough",
        env = "TOKENGUARD_SCENARIO"
    )]
    pub scenario: Scenario,

    // Load options
    #[arg(
        long,
        value_name = "N",
        help = "Worker threads for the load scenario",
        default_value_t = 4,
        env = "TOKENGUARD_THREADS"
    )]
    pub threads: usize,
    #[arg(
        long,
        value_name = "N",
        help = "Requests per worker thread for the load scenario",
        default_value_t = 10_000,
        env = "TOKENGUARD_REQUESTS"
    )]
    pub requests: usize,
    #[arg(
        long,
        value_name = "N",
        help = "Number of distinct keys for the load scenario",
        default_value_t = 5_000,
        env = "TOKENGUARD_KEYS"
    )]
    pub keys: usize,

    // General options
    #[arg(
        long,
        value_name = "FORMAT",
        help = "Report format: text, prometheus, json",
        default_value = "text",
        env = "TOKENGUARD_REPORT"
    )]
    pub report: ReportFormat,
    #[arg(
        long,
        value_name = "LEVEL",
        help = "Log level: error, warn, info, debug, trace",
        default_value = "info",
        env = "TOKENGUARD_LOG_LEVEL"
    )]
    pub log_level: String,

    // Utility options
    #[arg(
        long,
        help = "List all environment variables and exit",
        action = clap::ArgAction::SetTrue
    )]
    pub list_env_vars: bool,
}

impl Config {
    /// Build configuration from environment variables and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if any limiter or load parameter is invalid.
    pub fn from_env_and_args() -> Result<Self> {
        let args = Args::parse();

        if args.list_env_vars {
            Self::print_env_vars();
            std::process::exit(0);
        }

        Self::from_args(args)
    }

    /// Build and validate a configuration from already parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        let config = Config {
            limiter: LimiterConfig {
                bucket_capacity: args.bucket_capacity,
                refill_rate_per_second: args.refill_rate,
                cache_capacity: args.cache_capacity,
            },
            scenario: args.scenario,
            load: LoadConfig {
                threads: args.threads,
                requests_per_thread: args.requests,
                keys: args.keys,
            },
            report: args.report,
            log_level: args.log_level,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the limiter configuration is rejected or the load
    /// scenario has nothing to do.
    fn validate(&self) -> Result<()> {
        self.limiter
            .validate()
            .context("Invalid rate limiter configuration")?;

        if self.scenario == Scenario::Load {
            if self.load.threads == 0 {
                return Err(anyhow!("--threads must be at least 1"));
            }
            if self.load.keys == 0 {
                return Err(anyhow!("--keys must be at least 1"));
            }
        }

        Ok(())
    }

    /// Print all available environment variables and their descriptions
    fn print_env_vars() {
        println!("tokenguard Environment Variables");
        println!("================================");
        println!();
        println!("All environment variables use the TOKENGUARD_ prefix.");
        println!("CLI arguments take precedence over environment variables.");
        println!();

        println!("Limiter Configuration:");
        println!("  TOKENGUARD_BUCKET_CAPACITY=<tokens>   Maximum tokens per bucket [default: 5]");
        println!("  TOKENGUARD_REFILL_RATE=<per_sec>      Tokens added per second [default: 1]");
        println!("  TOKENGUARD_CACHE_CAPACITY=<keys>      Maximum keys holding a bucket [default: 1000]");
        println!();

        println!("Scenario Configuration:");
        println!(
            "  TOKENGUARD_SCENARIO=<name>            Scenario: walkthrough, load [default: walkthrough]"
        );
        println!("  TOKENGUARD_THREADS=<n>                Load worker threads [default: 4]");
        println!("  TOKENGUARD_REQUESTS=<n>               Requests per load thread [default: 10000]");
        println!("  TOKENGUARD_KEYS=<n>                   Distinct load keys [default: 5000]");
        println!();

        println!("General Configuration:");
        println!(
            "  TOKENGUARD_REPORT=<format>            Report format: text, prometheus, json [default: text]"
        );
        println!(
            "  TOKENGUARD_LOG_LEVEL=<level>          Log level: error, warn, info, debug, trace [default: info]"
        );
        println!();

        println!("Examples:");
        println!("  # Load test with a small store to watch evictions");
        println!("  export TOKENGUARD_SCENARIO=load");
        println!("  export TOKENGUARD_CACHE_CAPACITY=100");
        println!("  tokenguard --report json --log-level warn");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tokenguard").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_scenario_from_str() {
        assert_eq!(
            Scenario::from_str("walkthrough").unwrap(),
            Scenario::Walkthrough
        );
        assert_eq!(Scenario::from_str("LOAD").unwrap(), Scenario::Load);
        assert!(Scenario::from_str("soak").is_err());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!(ReportFormat::from_str("text").unwrap(), ReportFormat::Text);
        assert_eq!(
            ReportFormat::from_str("Prometheus").unwrap(),
            ReportFormat::Prometheus
        );
        assert_eq!(ReportFormat::from_str("json").unwrap(), ReportFormat::Json);
        assert!(ReportFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_flags_build_config() {
        let config = Config::from_args(parse(&[
            "--bucket-capacity",
            "2",
            "--refill-rate",
            "0.5",
            "--cache-capacity",
            "3",
            "--scenario",
            "load",
            "--threads",
            "2",
            "--report",
            "json",
        ]))
        .unwrap();

        assert_eq!(config.limiter.bucket_capacity, 2.0);
        assert_eq!(config.limiter.refill_rate_per_second, 0.5);
        assert_eq!(config.limiter.cache_capacity, 3);
        assert_eq!(config.scenario, Scenario::Load);
        assert_eq!(config.load.threads, 2);
        assert_eq!(config.report, ReportFormat::Json);
    }

    #[test]
    fn test_invalid_limiter_config_rejected() {
        let err = Config::from_args(parse(&["--cache-capacity", "0"])).unwrap_err();
        assert!(format!("{err:#}").contains("cache capacity"));

        assert!(Config::from_args(parse(&["--refill-rate", "0"])).is_err());
        assert!(Config::from_args(parse(&["--bucket-capacity", "0"])).is_err());
    }

    #[test]
    fn test_load_needs_threads_and_keys() {
        assert!(Config::from_args(parse(&["--scenario", "load", "--threads", "0"])).is_err());
        assert!(Config::from_args(parse(&["--scenario", "load", "--keys", "0"])).is_err());

        // Load-only parameters are ignored by the walkthrough
        assert!(Config::from_args(parse(&["--threads", "0"])).is_ok());
    }
}
