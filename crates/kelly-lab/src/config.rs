use std::{env, fmt, num::NonZeroUsize, thread};

const DEFAULT_STARTING_WEALTH: f64 = 1_000.0;
const DEFAULT_LOWER_THRESHOLD: f64 = 1.0;
const DEFAULT_BET_LIMIT: u64 = 1_000;
const DEFAULT_PATHS: u64 = 1_000;
const DEFAULT_SEED: u64 = 42;
const DEFAULT_P_WIN: f64 = 0.55;
const DEFAULT_NET_ODDS: f64 = 1.0;
const DEFAULT_POLICY: PolicyKind = PolicyKind::Kelly;
const DEFAULT_GAMMA: f64 = 1.0;
const DEFAULT_STAKE: f64 = 0.1;
const DEFAULT_FUN_WEIGHT: f64 = 0.0;
const DEFAULT_FUN_SCALE: f64 = 0.0;
const DEFAULT_PERCEPTION: PerceptionKind = PerceptionKind::Identity;
const DEFAULT_PERCEPTION_ALPHA: f64 = 1.0;
const DEFAULT_KELLY_SCALE: f64 = 1.0;
const DEFAULT_RETAIN_HISTORIES: bool = false;
const DEFAULT_REPORT_OUTPUT_PATH: &str = "artifacts/paths.csv";
const DEFAULT_HISTORY_OUTPUT_PATH: &str = "artifacts/histories.csv";
const DEFAULT_SUMMARY_OUTPUT_PATH: &str = "artifacts/summary.json";

const ENV_STARTING_WEALTH: &str = "KELLY_LAB_STARTING_WEALTH";
const ENV_LOWER_THRESHOLD: &str = "KELLY_LAB_LOWER_THRESHOLD";
const ENV_BET_LIMIT: &str = "KELLY_LAB_BET_LIMIT";
const ENV_PATHS: &str = "KELLY_LAB_PATHS";
const ENV_SEED: &str = "KELLY_LAB_SEED";
const ENV_WORKERS: &str = "KELLY_LAB_WORKERS";
const ENV_P_WIN: &str = "KELLY_LAB_P_WIN";
const ENV_P_LOSE: &str = "KELLY_LAB_P_LOSE";
const ENV_NET_ODDS: &str = "KELLY_LAB_NET_ODDS";
const ENV_POLICY: &str = "KELLY_LAB_POLICY";
const ENV_GAMMA: &str = "KELLY_LAB_GAMMA";
const ENV_STAKE: &str = "KELLY_LAB_STAKE";
const ENV_FUN_WEIGHT: &str = "KELLY_LAB_FUN_WEIGHT";
const ENV_FUN_SCALE: &str = "KELLY_LAB_FUN_SCALE";
const ENV_PERCEPTION: &str = "KELLY_LAB_PERCEPTION";
const ENV_PERCEPTION_ALPHA: &str = "KELLY_LAB_PERCEPTION_ALPHA";
const ENV_KELLY_SCALE: &str = "KELLY_LAB_KELLY_SCALE";
const ENV_RETAIN_HISTORIES: &str = "KELLY_LAB_RETAIN_HISTORIES";
const ENV_REPORT_OUTPUT: &str = "KELLY_LAB_REPORT_OUTPUT";
const ENV_HISTORY_OUTPUT: &str = "KELLY_LAB_HISTORY_OUTPUT";
const ENV_SUMMARY_OUTPUT: &str = "KELLY_LAB_SUMMARY_OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Kelly,
    Crra,
    RiskNeutral,
    FixedFraction,
    FixedAmount,
    Utility,
}

impl PolicyKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "kelly" => Some(Self::Kelly),
            "crra" => Some(Self::Crra),
            "risk-neutral" => Some(Self::RiskNeutral),
            "fixed-fraction" => Some(Self::FixedFraction),
            "fixed-amount" => Some(Self::FixedAmount),
            "utility" => Some(Self::Utility),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kelly => "kelly",
            Self::Crra => "crra",
            Self::RiskNeutral => "risk-neutral",
            Self::FixedFraction => "fixed-fraction",
            Self::FixedAmount => "fixed-amount",
            Self::Utility => "utility",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerceptionKind {
    Identity,
    PowerLaw,
    AnchoredPowerLaw,
}

impl PerceptionKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "identity" => Some(Self::Identity),
            "power-law" => Some(Self::PowerLaw),
            "anchored-power-law" => Some(Self::AnchoredPowerLaw),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::PowerLaw => "power-law",
            Self::AnchoredPowerLaw => "anchored-power-law",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub starting_wealth: f64,
    pub lower_threshold: f64,
    pub bet_limit: u64,
    pub paths: u64,
    pub seed: u64,
    pub workers: usize,
    pub p_win: f64,
    /// `None` means a binary bet, `1 - p_win`.
    pub p_lose: Option<f64>,
    pub net_odds: f64,
    pub policy: PolicyKind,
    pub gamma: f64,
    pub stake: f64,
    pub fun_weight: f64,
    pub fun_scale: f64,
    pub perception: PerceptionKind,
    pub perception_alpha: f64,
    pub kelly_scale: f64,
    pub retain_histories: bool,
    pub report_output_path: String,
    pub history_output_path: String,
    pub summary_output_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            starting_wealth: DEFAULT_STARTING_WEALTH,
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            bet_limit: DEFAULT_BET_LIMIT,
            paths: DEFAULT_PATHS,
            seed: DEFAULT_SEED,
            workers: default_workers(),
            p_win: DEFAULT_P_WIN,
            p_lose: None,
            net_odds: DEFAULT_NET_ODDS,
            policy: DEFAULT_POLICY,
            gamma: DEFAULT_GAMMA,
            stake: DEFAULT_STAKE,
            fun_weight: DEFAULT_FUN_WEIGHT,
            fun_scale: DEFAULT_FUN_SCALE,
            perception: DEFAULT_PERCEPTION,
            perception_alpha: DEFAULT_PERCEPTION_ALPHA,
            kelly_scale: DEFAULT_KELLY_SCALE,
            retain_histories: DEFAULT_RETAIN_HISTORIES,
            report_output_path: DEFAULT_REPORT_OUTPUT_PATH.to_owned(),
            history_output_path: DEFAULT_HISTORY_OUTPUT_PATH.to_owned(),
            summary_output_path: DEFAULT_SUMMARY_OUTPUT_PATH.to_owned(),
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        expected: &'static str,
    },
    NonUnicode {
        key: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { key, expected } => write!(f, "{key} must be {expected}"),
            Self::NonUnicode { key } => write!(f, "{key} contains non-unicode data"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            starting_wealth: read_env(
                ENV_STARTING_WEALTH,
                defaults.starting_wealth,
                "a finite number",
                parse_finite,
            )?,
            lower_threshold: read_env(
                ENV_LOWER_THRESHOLD,
                defaults.lower_threshold,
                "a finite number",
                parse_finite,
            )?,
            bet_limit: read_env(
                ENV_BET_LIMIT,
                defaults.bet_limit,
                "a non-negative integer",
                parse_u64,
            )?,
            paths: read_env(ENV_PATHS, defaults.paths, "a positive integer", |value| {
                parse_u64(value).filter(|paths| *paths > 0)
            })?,
            seed: read_env(ENV_SEED, defaults.seed, "a non-negative integer", parse_u64)?,
            workers: read_env(ENV_WORKERS, defaults.workers, "a positive integer", |value| {
                value.trim().parse::<NonZeroUsize>().ok().map(NonZeroUsize::get)
            })?,
            p_win: read_env(ENV_P_WIN, defaults.p_win, "a finite number", parse_finite)?,
            p_lose: read_env(ENV_P_LOSE, defaults.p_lose, "a finite number", |value| {
                parse_finite(value).map(Some)
            })?,
            net_odds: read_env(
                ENV_NET_ODDS,
                defaults.net_odds,
                "a finite number",
                parse_finite,
            )?,
            policy: read_env(
                ENV_POLICY,
                defaults.policy,
                "one of: kelly, crra, risk-neutral, fixed-fraction, fixed-amount, utility",
                PolicyKind::parse,
            )?,
            gamma: read_env(ENV_GAMMA, defaults.gamma, "a finite number", parse_finite)?,
            stake: read_env(ENV_STAKE, defaults.stake, "a finite number", parse_finite)?,
            fun_weight: read_env(
                ENV_FUN_WEIGHT,
                defaults.fun_weight,
                "a finite number",
                parse_finite,
            )?,
            fun_scale: read_env(
                ENV_FUN_SCALE,
                defaults.fun_scale,
                "a finite number",
                parse_finite,
            )?,
            perception: read_env(
                ENV_PERCEPTION,
                defaults.perception,
                "one of: identity, power-law, anchored-power-law",
                PerceptionKind::parse,
            )?,
            perception_alpha: read_env(
                ENV_PERCEPTION_ALPHA,
                defaults.perception_alpha,
                "a finite number",
                parse_finite,
            )?,
            kelly_scale: read_env(
                ENV_KELLY_SCALE,
                defaults.kelly_scale,
                "a finite number",
                parse_finite,
            )?,
            retain_histories: read_env(
                ENV_RETAIN_HISTORIES,
                defaults.retain_histories,
                "true or false",
                parse_bool,
            )?,
            report_output_path: read_env(
                ENV_REPORT_OUTPUT,
                defaults.report_output_path,
                "a non-empty path",
                parse_path,
            )?,
            history_output_path: read_env(
                ENV_HISTORY_OUTPUT,
                defaults.history_output_path,
                "a non-empty path",
                parse_path,
            )?,
            summary_output_path: read_env(
                ENV_SUMMARY_OUTPUT,
                defaults.summary_output_path,
                "a non-empty path",
                parse_path,
            )?,
        })
    }
}

fn read_env<T>(
    key: &'static str,
    default_value: T,
    expected: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => parse(value.as_str()).ok_or(ConfigError::Invalid { key, expected }),
        Err(env::VarError::NotPresent) => Ok(default_value),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::NonUnicode { key }),
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_path(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_owned())
}
