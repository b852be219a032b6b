use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "github_users_backend=info";

/// Installs the global fmt subscriber on stderr, leaving stdout to command
/// output. `RUST_LOG` replaces the default filter. Only the first call has
/// an effect.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
