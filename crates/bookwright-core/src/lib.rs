//! bookwright core library
//!
//! Content model and loading for book sources:
//! - chapters and appendices ([`ContentUnit`], [`UnitId`]) loaded from TOML
//! - normalized runnable [`Example`]s
//! - structural document comparison used to judge examples
//! - markdown text pages and filesystem-safe naming

pub mod document;
pub mod error;
pub mod example;
pub mod invocation;
pub mod loader;
pub mod page;
pub mod slug;
pub mod telemetry;
pub mod unit;

pub use document::{documents_equal, is_empty_document, normalize_script};
pub use error::{BookError, Result};
pub use example::{Example, DEFAULT_SECTION};
pub use invocation::Invocation;
pub use loader::{discover_units, load_unit, parse_unit};
pub use page::{render_unit_page, ALL_EXAMPLES_ARCHIVE, CODE_DIR};
pub use slug::slugify;
pub use telemetry::init_tracing;
pub use unit::{ContentUnit, Section, UnitId};
