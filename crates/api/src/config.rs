//! Process configuration, read from `EDUADMIN_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use eduadmin_infra::jobs::{SimulatorConfig, TransitionPolicy, WeightedRandom};
use eduadmin_observability::LogFormat;

pub const BIND_ADDR: &str = "EDUADMIN_BIND_ADDR";
pub const TICK_MS: &str = "EDUADMIN_TICK_MS";
pub const MAX_RUNNING: &str = "EDUADMIN_MAX_RUNNING";
pub const SUCCESS_RATE: &str = "EDUADMIN_SUCCESS_RATE";
pub const SEED_JOBS: &str = "EDUADMIN_SEED_JOBS";
pub const RNG_SEED: &str = "EDUADMIN_RNG_SEED";
pub const STRICT_TRANSITIONS: &str = "EDUADMIN_STRICT_TRANSITIONS";
pub const AUTO_RETRY: &str = "EDUADMIN_AUTO_RETRY";
pub const LOG_FORMAT: &str = "EDUADMIN_LOG_FORMAT";

/// Console server configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub bind_addr: SocketAddr,
    pub tick_interval: Duration,
    pub max_running: usize,
    pub success_rate: f64,
    /// Mock jobs enqueued at startup
    pub seed_jobs: usize,
    /// Fixed seed for mock data and simulated outcomes
    pub rng_seed: Option<u64>,
    pub policy: TransitionPolicy,
    pub auto_retry: bool,
    pub log_format: LogFormat,
    /// Values that failed to parse and were replaced by defaults
    pub invalid: Vec<InvalidSetting>,
}

/// An environment value that was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub key: &'static str,
    pub value: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            tick_interval: Duration::from_millis(1500),
            max_running: 4,
            success_rate: WeightedRandom::DEFAULT_SUCCESS_RATE,
            seed_jobs: 25,
            rng_seed: None,
            policy: TransitionPolicy::Permissive,
            auto_retry: false,
            log_format: LogFormat::Json,
            invalid: Vec::new(),
        }
    }
}

impl ConsoleConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys keep their default.
    ///
    /// Unparseable values keep the default and are recorded in `invalid`;
    /// call [`ConsoleConfig::warn_invalid`] once logging is up.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        let mut env = EnvReader {
            lookup,
            invalid: Vec::new(),
        };

        let tick_ms = env.parse_or(TICK_MS, d.tick_interval.as_millis() as u64);
        let max_running = env.parse_or(MAX_RUNNING, d.max_running);
        let mut config = Self {
            bind_addr: env.parse_or(BIND_ADDR, d.bind_addr),
            tick_interval: Duration::from_millis(tick_ms.max(1)),
            max_running: max_running.max(1),
            success_rate: env.parse_or(SUCCESS_RATE, d.success_rate),
            seed_jobs: env.parse_or(SEED_JOBS, d.seed_jobs),
            rng_seed: env.parse(RNG_SEED),
            policy: if env.parse_or(STRICT_TRANSITIONS, false) {
                TransitionPolicy::Strict
            } else {
                TransitionPolicy::Permissive
            },
            auto_retry: env.parse_or(AUTO_RETRY, d.auto_retry),
            log_format: (env.lookup)(LOG_FORMAT)
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(d.log_format),
            invalid: Vec::new(),
        };
        if max_running == 0 {
            env.reject(MAX_RUNNING, "0".to_string());
        }
        config.invalid = env.invalid;
        config
    }

    /// Log every ignored value. Needs a subscriber installed first.
    pub fn warn_invalid(&self) {
        for setting in &self.invalid {
            tracing::warn!(
                key = setting.key,
                value = %setting.value,
                "ignoring invalid configuration value"
            );
        }
    }

    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig::default()
            .with_tick_interval(self.tick_interval)
            .with_max_running(self.max_running)
            .with_auto_retry(self.auto_retry)
    }

    pub fn outcome_policy(&self) -> WeightedRandom {
        match self.rng_seed {
            Some(seed) => WeightedRandom::seeded(self.success_rate, seed),
            None => WeightedRandom::new(self.success_rate),
        }
    }
}

struct EnvReader<L> {
    lookup: L,
    invalid: Vec<InvalidSetting>,
}

impl<L: Fn(&str) -> Option<String>> EnvReader<L> {
    fn parse<T: FromStr>(&mut self, key: &'static str) -> Option<T> {
        let raw = (self.lookup)(key)?;
        match raw.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                self.reject(key, raw);
                None
            }
        }
    }

    fn parse_or<T: FromStr>(&mut self, key: &'static str, default: T) -> T {
        self.parse(key).unwrap_or(default)
    }

    fn reject(&mut self, key: &'static str, value: String) {
        self.invalid.push(InvalidSetting { key, value });
    }
}
