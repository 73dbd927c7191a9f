pub mod config;
pub mod detector;
pub mod disease;
pub mod error;
pub mod prediction;
pub mod preprocess;
pub mod server;
pub mod torch;

/// Process setup helpers
pub mod util {
    use tracing_subscriber::EnvFilter;

    /// Install the global tracing subscriber. `RUST_LOG` overrides the
    /// configured filter. Also captures `log` records, which is how actix's
    /// access logger reaches the output.
    pub fn init_tracing(default_filter: &str) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
