use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/**
    Install the global subscriber, writing to stderr.

    `SAMPLETOOL_LOG` takes precedence over `RUST_LOG`. Without either, the
    level comes from the `-v` count.
*/
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_env("SAMPLETOOL_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
