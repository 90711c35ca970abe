use std::ops::Deref;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use slog::{o, Drain};
use slog_scope::GlobalLoggerGuard;

/// The `[log]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    #[serde(default = "Log::to_default")]
    pub to: To,
    #[serde(default = "Log::level_default")]
    pub level: Level,
}

impl Default for Log {
    #[inline]
    fn default() -> Self {
        Self { to: Self::to_default(), level: Self::level_default() }
    }
}

impl Log {
    #[inline]
    fn to_default() -> To {
        To::Console
    }
    #[inline]
    fn level_default() -> Level {
        Level { inner: slog::Level::Info }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum To {
    Off,
    Console,
}

impl To {
    #[inline]
    pub fn off(&self) -> bool {
        matches!(self, To::Off)
    }
}

impl<'de> Deserialize<'de> for To {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let to = String::deserialize(deserializer)?;
        match to.to_ascii_lowercase().as_str() {
            "off" => Ok(To::Off),
            "console" => Ok(To::Console),
            _ => Err(de::Error::unknown_variant(&to, &["off", "console"])),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    inner: slog::Level,
}

impl Level {
    #[inline]
    pub fn inner(&self) -> slog::Level {
        self.inner
    }
}

impl Deref for Level {
    type Target = slog::Level;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'de> Deserialize<'de> for Level {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level = String::deserialize(deserializer)?;
        let inner = slog::Level::from_str(&level)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&level), &"a log level"))?;
        Ok(Level { inner })
    }
}

/// Builds the root logger described by `cfg`.
pub fn config_logger(cfg: &Log) -> slog::Logger {
    if cfg.to.off() {
        return slog::Logger::root(slog::Discard, o!());
    }

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog::LevelFilter::new(drain, cfg.level.inner()).fuse();
    let drain = slog_async::Async::new(drain)
        .chan_size(4096)
        .overflow_strategy(slog_async::OverflowStrategy::DropAndReport)
        .build()
        .fuse();

    slog::Logger::root(drain, o!())
}

/// Installs the root logger globally and routes the `log` facade into it.
///
/// Logging stays installed until the returned guard is dropped.
pub fn logger_init(cfg: &Log) -> Result<GlobalLoggerGuard> {
    let guard = slog_scope::set_global_logger(config_logger(cfg));
    let level = if cfg.to.off() {
        log::LevelFilter::Off
    } else {
        slog_log_to_level(cfg.level.inner()).to_level_filter()
    };
    slog_stdlog::init_with_level(level.to_level().unwrap_or(log::Level::Error))
        .map_err(|e| anyhow!("logger init failed, {e}"))?;
    log::set_max_level(level);
    Ok(guard)
}

fn slog_log_to_level(level: slog::Level) -> log::Level {
    match level {
        slog::Level::Trace => log::Level::Trace,
        slog::Level::Debug => log::Level::Debug,
        slog::Level::Info => log::Level::Info,
        slog::Level::Warning => log::Level::Warn,
        slog::Level::Error | slog::Level::Critical => log::Level::Error,
    }
}
