use anyhow::{bail, Context, Result};
use chrono::{FixedOffset, NaiveTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const CONFIG_PATH_ENV: &str = "KITE_DIP_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kite: KiteConfig,
    pub instrument: InstrumentConfig,
    pub strategy: StrategyConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KiteConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub api_secret: String,
    #[serde(skip)]
    pub refresh_token: String,
}

impl Default for KiteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.kite.trade".to_string(),
            ws_base_url: "wss://ws.kite.trade".to_string(),
            request_timeout_secs: 10,
            api_key: String::new(),
            api_secret: String::new(),
            refresh_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub exchange: String,
    pub instrument_token: u32,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "NIFTYBEES".to_string(),
            exchange: "NSE".to_string(),
            instrument_token: 256_788,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Budget in rupees; quantity is floored against it.
    pub investment_amount: f64,
    /// Percentage change from the reference price that triggers the buy.
    pub threshold_pct: f64,
    pub tick_channel_capacity: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            investment_amount: 10_000.0,
            threshold_pct: -1.0,
            tick_channel_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub market_close: String,
    pub utc_offset: String,
    pub recheck_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            market_close: "15:30".to_string(),
            utc_offset: "+05:30".to_string(),
            recheck_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Parse a wall-clock cutoff such as "15:30" or "15:30:00".
pub fn parse_cutoff(s: &str) -> Result<NaiveTime> {
    let trimmed = s.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .with_context(|| format!("invalid cutoff '{}': expected HH:MM or HH:MM:SS", s))
}

/// Parse a UTC offset such as "+05:30" or "-04:00".
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let trimmed = s.trim();
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => bail!("invalid utc offset '{}': expected ±HH:MM", s),
    };
    let Some((hh, mm)) = rest.split_once(':') else {
        bail!("invalid utc offset '{}': expected ±HH:MM", s);
    };
    let hours: i32 = hh
        .parse()
        .with_context(|| format!("invalid utc offset '{}': bad hours", s))?;
    let minutes: i32 = mm
        .parse()
        .with_context(|| format!("invalid utc offset '{}': bad minutes", s))?;
    if hh.len() != 2 || mm.len() != 2 || minutes >= 60 {
        bail!("invalid utc offset '{}': expected ±HH:MM", s);
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("invalid utc offset '{}': out of range", s))
}

impl SessionConfig {
    pub fn cutoff_time(&self) -> Result<NaiveTime> {
        parse_cutoff(&self.market_close)
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("{} not set in .env or environment", name))?;
    if value.trim().is_empty() {
        bail!("{} is empty", name);
    }
    Ok(value.trim().to_string())
}

impl Config {
    /// Parse and validate a TOML document. Credentials are left empty.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instrument.symbol.trim().is_empty() {
            bail!("instrument.symbol must not be empty");
        }
        if self.instrument.exchange.trim().is_empty() {
            bail!("instrument.exchange must not be empty");
        }
        if !self.strategy.investment_amount.is_finite() || self.strategy.investment_amount <= 0.0 {
            bail!(
                "strategy.investment_amount must be positive, got {}",
                self.strategy.investment_amount
            );
        }
        if !self.strategy.threshold_pct.is_finite() || self.strategy.threshold_pct >= 0.0 {
            bail!(
                "strategy.threshold_pct must be negative, got {}",
                self.strategy.threshold_pct
            );
        }
        if self.strategy.tick_channel_capacity == 0 {
            bail!("strategy.tick_channel_capacity must be > 0");
        }
        if self.session.recheck_interval_secs == 0 {
            bail!("session.recheck_interval_secs must be > 0");
        }
        self.session
            .cutoff_time()
            .context("session.market_close is invalid")?;
        self.session
            .offset()
            .context("session.utc_offset is invalid")?;
        Ok(())
    }

    fn config_path() -> (PathBuf, bool) {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(p) if !p.trim().is_empty() => (PathBuf::from(p.trim()), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }

    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Same as [`Config::load`] without reading `.env`.
    pub fn from_env() -> Result<Self> {
        let (config_path, explicit) = Self::config_path();
        let mut config = if explicit || Path::new(&config_path).exists() {
            let config_str = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read {}", config_path.display()))?;
            Self::from_toml_str(&config_str)
                .with_context(|| format!("invalid {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.kite.api_key = require_env("API_KEY")?;
        config.kite.api_secret = require_env("API_SECRET")?;
        config.kite.refresh_token = require_env("REFRESH_TOKEN")?;

        Ok(config)
    }
}
