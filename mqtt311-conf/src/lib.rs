#![deny(unsafe_code)]

//! Settings for the MQTT v3.1.1 codec.
//!
//! Sources are layered, later ones winning:
//! `/etc/mqtt311/mqtt311.*`, `mqtt311.*` in the working directory, an explicit
//! file, then `MQTT311__SECTION__KEY` environment variables.
//!
//! ```toml
//! [codec]
//! max_packet_size = "1M"
//! strict_protocol = true
//!
//! [log]
//! to = "console"
//! level = "info"
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use once_cell::sync::OnceCell;
use serde::Deserialize;

pub use self::bytesize::{to_bytesize, Bytesize};
pub use self::codec::CodecSettings;
pub use self::logging::{config_logger, logger_init, Level, Log, To};

mod bytesize;
pub mod codec;
pub mod logging;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Clone)]
pub struct Settings(Arc<Inner>);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub codec: CodecSettings,
    #[serde(default)]
    pub log: Log,
}

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    fn new(cfg_name: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("/etc/mqtt311/mqtt311").required(false))
            .add_source(File::with_name("mqtt311").required(false));
        if let Some(cfg) = cfg_name {
            builder = builder.add_source(File::with_name(cfg).required(true));
        }
        Self::build(builder, Self::environment())
    }

    /// Settings from a TOML document plus the environment, without touching the global instance.
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(text, FileFormat::Toml)), Self::environment())
    }

    /// `MQTT311__SECTION__KEY` variables, e.g. `MQTT311__CODEC__MAX_PACKET_SIZE=64K`.
    #[inline]
    fn environment() -> Environment {
        Environment::with_prefix("mqtt311").separator("__").try_parsing(true)
    }

    fn build(builder: ConfigBuilder<DefaultState>, env: Environment) -> Result<Self> {
        let inner: Inner = builder.add_source(env).build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }

    #[inline]
    pub fn instance() -> &'static Self {
        match SETTINGS.get() {
            Some(c) => c,
            None => {
                unreachable!("Settings not initialized");
            }
        }
    }

    /// Loads the layered settings into the global instance. `cfg_name` must exist when given.
    #[inline]
    pub fn init(cfg_name: Option<&str>) -> Result<&'static Self> {
        SETTINGS.set(Settings::new(cfg_name)?).map_err(|_| anyhow!("Settings init failed"))?;
        SETTINGS.get().ok_or_else(|| anyhow!("Settings init failed"))
    }

    #[inline]
    pub fn logs() {
        let cfg = Self::instance();
        log::debug!("Config info is {:?}", cfg.0);
        log::info!("codec.max_packet_size is {:?}", cfg.codec.max_packet_size);
        log::info!("codec.strict_protocol is {}", cfg.codec.strict_protocol);
        log::info!("log.level is {}", cfg.log.level.as_str());
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Settings ...")?;
        Ok(())
    }
}
