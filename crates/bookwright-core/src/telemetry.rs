//! Tracing setup for the bookwright binary.
//!
//! Logs go to stderr; stdout is reserved for the build summary the CLI
//! prints at the end. `RUST_LOG` overrides the default filter entirely.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const BOOKWRIGHT_TARGETS: [&str; 3] = ["bookwright_core", "bookwright_build", "bookwright_cli"];

/// Install the global subscriber.
///
/// `level` applies to bookwright's own crates; everything else logs at
/// `warn`. With `json` set, every event is one JSON object per line.
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry().with(layer).with(filter).try_init().ok();
}

/// `warn,bookwright_core=<level>,...`
fn default_directives(level: Level) -> String {
    let mut directives = String::from("warn");
    for target in BOOKWRIGHT_TARGETS {
        directives.push_str(&format!(",{}={}", target, level.as_str().to_lowercase()));
    }
    directives
}
