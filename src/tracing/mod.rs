use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Console,
    Json,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tracing format {0:?}, expected \"console\" or \"json\"")]
pub struct UnknownFormat(String);

impl std::str::FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

pub struct Config {
    format: Format,
    color: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            format: crate::with_env_as_or("TRACING_FORMAT", Format::default())?,
            color: crate::with_env_as_or("TRACING_CONSOLE_COLOR", true)?,
        })
    }

    pub fn install(self) -> anyhow::Result<TracingProvider> {
        let output = match self.format {
            Format::Console => tracing_subscriber::fmt::layer()
                .with_ansi(self.color)
                .boxed(),
            Format::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .boxed(),
        };
        tracing_subscriber::registry()
            .with(output)
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .with_env_var("TRACING_LEVEL")
                    .from_env_lossy(),
            )
            .try_init()?;
        Ok(TracingProvider { format: self.format })
    }
}

pub struct TracingProvider {
    format: Format,
}

impl TracingProvider {
    pub fn shutdown(self) {
        tracing::debug!(format = ?self.format, "tracing stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::Format;

    #[test]
    fn should_parse_format() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("Console".parse::<Format>().unwrap(), Format::Console);
        assert!("yaml".parse::<Format>().is_err());
    }
}
