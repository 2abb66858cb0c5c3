//! Subscriber installation for Parley hosts.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{TelemetryError, TelemetryResult};

/// Applied before user directives when [`LogConfig::quiet_http`] is set, so
/// the identity exchange does not flood debug output with connection chatter.
const HTTP_STACK_DIRECTIVES: [&str; 4] = [
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "rustls=warn",
];

/// How each event is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored.
    #[default]
    Pretty,
    /// One line, terse field list.
    Compact,
    /// Newline-delimited JSON.
    Json,
    /// One line with every span field.
    Full,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(name: &str) -> TelemetryResult<Self> {
        Ok(match name {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            "json" => Self::Json,
            "full" => Self::Full,
            other => {
                return Err(TelemetryError::ConfigError(format!(
                    "unknown log format '{other}'"
                )));
            },
        })
    }
}

/// Where events are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error, keeping stdout free for the host.
    #[default]
    Stderr,
    /// A directory of daily-rotated files.
    File(PathBuf),
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base filter, e.g. `info`.
    pub level: String,
    /// Event rendering.
    pub format: LogFormat,
    /// Output destination.
    pub target: LogTarget,
    /// File name stem for [`LogTarget::File`]; `parley` yields
    /// `parley.2024-01-15`.
    pub file_prefix: String,
    /// Emit ANSI color codes.
    pub ansi: bool,
    /// Cap the HTTP stack at `warn` regardless of `level`.
    pub quiet_http: bool,
    /// Extra `target=level` directives, applied last.
    pub directives: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            target: LogTarget::Stderr,
            file_prefix: "parley".to_string(),
            ansi: true,
            quiet_http: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Defaults with the base filter set to `level`.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Change the event rendering.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Change the output destination.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Write daily-rotated `prefix.*` files under `directory`, without color.
    #[must_use]
    pub fn with_file_logging(
        mut self,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> Self {
        self.target = LogTarget::File(directory.into());
        self.file_prefix = prefix.into();
        self.ansi = false;
        self
    }

    /// Append a `target=level` directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Let HTTP stack events through at `level`.
    #[must_use]
    pub fn with_http_logging(mut self) -> Self {
        self.quiet_http = false;
        self
    }

    /// Turn off color codes.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        let invalid = |e: tracing_subscriber::filter::ParseError| {
            TelemetryError::ConfigError(e.to_string())
        };

        let quiet: &[&str] = if self.quiet_http {
            &HTTP_STACK_DIRECTIVES[..]
        } else {
            &[]
        };

        let mut filter = EnvFilter::try_new(&self.level).map_err(invalid)?;
        for directive in quiet
            .iter()
            .copied()
            .chain(self.directives.iter().map(String::as_str))
        {
            filter = filter.add_directive(directive.parse().map_err(invalid)?);
        }
        Ok(filter)
    }
}

#[cfg(feature = "config")]
impl From<&parley_config::LoggingSection> for LogConfig {
    fn from(section: &parley_config::LoggingSection) -> Self {
        // Format names are validated when the config loads.
        Self {
            level: section.level.clone(),
            format: section.format.parse().unwrap_or_default(),
            directives: section.directives.clone(),
            ..Self::default()
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an unparsable filter, an uncreatable log directory, or when a
/// global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.env_filter()?;

    match &config.target {
        LogTarget::Stdout => install(filter, config, std::io::stdout),
        LogTarget::Stderr => install(filter, config, std::io::stderr),
        LogTarget::File(dir) => {
            install(filter, config, rolling_appender(dir, &config.file_prefix)?)
        },
    }
}

/// [`setup_logging`] with [`LogConfig::default`].
///
/// # Errors
///
/// Fails when a global subscriber is already set.
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::default())
}

fn rolling_appender(dir: &Path, prefix: &str) -> TelemetryResult<RollingFileAppender> {
    std::fs::create_dir_all(dir).map_err(|e| {
        TelemetryError::ConfigError(format!("cannot create {}: {e}", dir.display()))
    })?;
    Ok(RollingFileAppender::new(Rotation::DAILY, dir, prefix))
}

fn install<W>(filter: EnvFilter, config: &LogConfig, writer: W) -> TelemetryResult<()>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let fmt_layer = fmt::layer().with_writer(writer).with_ansi(config.ansi);
    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
        LogFormat::Compact => fmt_layer.compact().boxed(),
        LogFormat::Json => fmt_layer.json().boxed(),
        LogFormat::Full => fmt_layer.boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))
}
