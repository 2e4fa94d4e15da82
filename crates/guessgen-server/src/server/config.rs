//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment (a `.env`
//! file is loaded first). [`CliArgs`] is the raw input; [`ServerConfig`] is
//! the validated form the rest of the server consumes.

use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use guessgen_core::DEFAULT_MAX_GUESSES;

#[derive(Parser, Debug, Clone)]
#[command(name = "guessgen-server", version, about)]
pub struct CliArgs {
    /// Address to bind the HTTP/WebSocket listener to.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:5000")]
    pub server_addr: String,

    /// Largest number of guesses a single job may request; larger requests
    /// are clamped.
    #[arg(long, env = "MAX_GUESSES", default_value_t = DEFAULT_MAX_GUESSES)]
    pub max_guesses: usize,

    /// Requests above this count are split into progress-reporting blocks
    /// and distributed across workers.
    #[arg(long, env = "LARGE_BATCH_THRESHOLD", default_value_t = 1000)]
    pub large_batch_threshold: usize,

    /// Upper bound on blocks per large job.
    #[arg(long, env = "MAX_BLOCKS", default_value_t = 10)]
    pub max_blocks: usize,

    /// Number of chunk workers; 0 picks the number of CPUs minus one.
    #[arg(long, env = "NUM_WORKERS", default_value_t = 0)]
    pub num_workers: usize,

    /// Capacity of each worker's request channel.
    #[arg(long, env = "WORK_REQUEST_BUFFER_SIZE", default_value_t = 1)]
    pub work_request_buffer_size: usize,

    /// Jobs that may run at the same time.
    #[arg(long, env = "JOB_CONCURRENCY", default_value_t = 4)]
    pub job_concurrency: usize,

    /// Jobs that may wait for a free slot before submissions are refused.
    #[arg(long, env = "JOB_QUEUE_SIZE", default_value_t = 256)]
    pub job_queue_size: usize,

    /// Time limit for a single job, in seconds.
    #[arg(long, env = "JOB_TIMEOUT_SECS", default_value_t = 3600)]
    pub job_timeout_secs: u64,

    /// How long completed results (and finished job records) are kept, in
    /// seconds.
    #[arg(long, env = "RESULT_TTL_SECS", default_value_t = 3600)]
    pub result_ttl_secs: u64,

    /// Interval between expiry sweeps, in seconds.
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Events buffered per job for each live subscriber before the oldest are
    /// dropped.
    #[arg(long, env = "SUBSCRIBER_BUFFER_SIZE", default_value_t = 64)]
    pub subscriber_buffer_size: usize,

    /// Messages buffered on the progress bus.
    #[arg(long, env = "BUS_BUFFER_SIZE", default_value_t = 1024)]
    pub bus_buffer_size: usize,

    /// Seconds to wait for in-flight jobs and workers during shutdown.
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 5)]
    pub shutdown_timeout: u64,

    /// Base seed for reproducible generation. Random per job when unset.
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub server_addr: String,
    pub max_guesses: usize,
    pub large_batch_threshold: usize,
    pub max_blocks: usize,
    pub num_workers: usize,
    pub work_request_buffer_size: usize,
    pub job_concurrency: usize,
    pub job_queue_size: usize,
    pub job_timeout: Duration,
    pub result_ttl: Duration,
    pub sweep_interval: Duration,
    pub subscriber_buffer_size: usize,
    pub bus_buffer_size: usize,
    pub shutdown_timeout: Duration,
    pub seed: Option<u64>,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> anyhow::Result<Self> {
        let non_zero = [
            ("MAX_GUESSES", args.max_guesses as u64),
            ("MAX_BLOCKS", args.max_blocks as u64),
            ("WORK_REQUEST_BUFFER_SIZE", args.work_request_buffer_size as u64),
            ("JOB_CONCURRENCY", args.job_concurrency as u64),
            ("JOB_QUEUE_SIZE", args.job_queue_size as u64),
            ("JOB_TIMEOUT_SECS", args.job_timeout_secs),
            ("RESULT_TTL_SECS", args.result_ttl_secs),
            ("SWEEP_INTERVAL_SECS", args.sweep_interval_secs),
            ("SUBSCRIBER_BUFFER_SIZE", args.subscriber_buffer_size as u64),
            ("BUS_BUFFER_SIZE", args.bus_buffer_size as u64),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                bail!("{name} must be greater than 0");
            }
        }

        if args.large_batch_threshold > args.max_guesses {
            bail!(
                "LARGE_BATCH_THRESHOLD ({}) must not exceed MAX_GUESSES ({})",
                args.large_batch_threshold,
                args.max_guesses
            );
        }

        let num_workers = if args.num_workers == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            args.num_workers
        };

        Ok(Self {
            server_addr: args.server_addr,
            max_guesses: args.max_guesses,
            large_batch_threshold: args.large_batch_threshold,
            max_blocks: args.max_blocks,
            num_workers,
            work_request_buffer_size: args.work_request_buffer_size,
            job_concurrency: args.job_concurrency,
            job_queue_size: args.job_queue_size,
            job_timeout: Duration::from_secs(args.job_timeout_secs),
            result_ttl: Duration::from_secs(args.result_ttl_secs),
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            subscriber_buffer_size: args.subscriber_buffer_size,
            bus_buffer_size: args.bus_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            seed: args.seed,
        })
    }
}

#[cfg(test)]
impl ServerConfig {
    /// Small, seeded configuration for service tests.
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            max_guesses: 100,
            large_batch_threshold: 50,
            max_blocks: 10,
            num_workers: 2,
            work_request_buffer_size: 1,
            job_concurrency: 2,
            job_queue_size: 8,
            job_timeout: Duration::from_secs(30),
            result_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
            subscriber_buffer_size: 16,
            bus_buffer_size: 64,
            shutdown_timeout: Duration::from_secs(1),
            seed: Some(11),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["guessgen-server"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_from(parse(&[
            "--num-workers",
            "3",
            "--max-guesses",
            "500",
            "--large-batch-threshold",
            "100",
            "--seed",
            "7",
        ]))
        .unwrap();

        assert_eq!(config.num_workers, 3);
        assert_eq!(config.max_guesses, 500);
        assert_eq!(config.large_batch_threshold, 100);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn auto_workers_is_at_least_one() {
        let config = ServerConfig::try_from(parse(&["--num-workers", "0"])).unwrap();
        assert!(config.num_workers >= 1);
    }

    #[test]
    fn rejects_zero_limits() {
        assert!(ServerConfig::try_from(parse(&["--job-concurrency", "0"])).is_err());
        assert!(ServerConfig::try_from(parse(&["--max-blocks", "0"])).is_err());
    }

    #[test]
    fn rejects_threshold_above_maximum() {
        let err = ServerConfig::try_from(parse(&[
            "--max-guesses",
            "10",
            "--large-batch-threshold",
            "20",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("LARGE_BATCH_THRESHOLD"));
    }
}
