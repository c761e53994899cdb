use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokenguard::{Metrics, RateLimiter};

use tokenguard_cli::config::{Config, Scenario};
use tokenguard_cli::{report, scenario};

fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("tokenguard={}", config.log_level).parse()?)
                .add_directive(format!("tokenguard_cli={}", config.log_level).parse()?),
        )
        .init();

    let metrics = Arc::new(Metrics::new());

    match config.scenario {
        Scenario::Walkthrough => {
            let limiter = RateLimiter::builder()
                .bucket_capacity(config.limiter.bucket_capacity)
                .refill_rate(config.limiter.refill_rate_per_second)
                .cache_capacity(scenario::WALKTHROUGH_CACHE_CAPACITY)
                .metrics(metrics.clone())
                .build()?;

            tracing::info!(
                "Starting walkthrough with bucket capacity {}, refill rate {}/s, cache capacity {}",
                config.limiter.bucket_capacity,
                config.limiter.refill_rate_per_second,
                scenario::WALKTHROUGH_CACHE_CAPACITY
            );

            let steps = scenario::run_walkthrough(&limiter, Duration::from_millis(100));
            for step in steps {
                println!(
                    "{:<6} {:<8} {:<52} tracked: [{}]",
                    step.key,
                    if step.allowed { "allowed" } else { "blocked" },
                    step.note,
                    step.tracked.join(", ")
                );
            }
        }
        Scenario::Load => {
            let limiter = RateLimiter::builder()
                .bucket_capacity(config.limiter.bucket_capacity)
                .refill_rate(config.limiter.refill_rate_per_second)
                .cache_capacity(config.limiter.cache_capacity)
                .metrics(metrics.clone())
                .build()?;

            tracing::info!(
                "Starting load: {} threads x {} requests over {} keys, cache capacity {}",
                config.load.threads,
                config.load.requests_per_thread,
                config.load.keys,
                config.limiter.cache_capacity
            );

            let summary = scenario::run_load(&limiter, &config.load);
            tracing::info!(
                "Load finished in {:.3}s ({:.0} decisions/s), {} allowed, {} blocked",
                summary.elapsed.as_secs_f64(),
                summary.decisions_per_second(),
                summary.allowed,
                summary.blocked()
            );
        }
    }

    print!("{}", report::render(&metrics, config.report)?);

    Ok(())
}
