use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize stderr logging. `RUST_LOG` takes precedence over the flags.
pub fn init_logging(debug: bool, quiet: bool) -> anyhow::Result<()> {
    let default_directive = if debug {
        "package_patcher=debug"
    } else if quiet {
        "package_patcher=error"
    } else {
        "package_patcher=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
