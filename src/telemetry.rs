//! Tracing bootstrap. Safe to call more than once; only the first call
//! installs a subscriber.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Applies when `RUST_LOG` is unset: quiet dependencies, verbose statement
/// logging from this crate.
const DEFAULT_FILTER: &str = "info,well_registry=debug";

pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}
