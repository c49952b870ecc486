use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for the command line run.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, json_format: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(std::io::stderr).json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
