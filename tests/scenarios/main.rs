//! End-to-end scenarios
//!
//! Whole configuration sessions driven through `ModelBuilder`, checked
//! against the finalized model.

mod conflicts;
mod identity;
mod shared_joins;

use skipnav::builder::ModelBuilder;
use skipnav::foundation::ShapeCatalog;

/// Installs a test subscriber so convention decisions show up with
/// `--nocapture`.
pub fn builder(catalog: ShapeCatalog) -> ModelBuilder {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
    ModelBuilder::new(catalog)
}
