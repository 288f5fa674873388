//! Integration tests for Layer 2: Builder
//!
//! Tests for builder configuration, the configuration log and the fluent
//! configuration surface.

mod api;

use skipnav_foundation::{ScalarType, ShapeCatalog};

/// `Blog`/`Tag` pair plus a `Post` with a reference to `Blog`.
pub fn catalog() -> ShapeCatalog {
    let mut catalog = ShapeCatalog::new();
    catalog
        .define("Blog")
        .scalar("Id", ScalarType::Int)
        .collection("Tags", "Tag")
        .collection("Posts", "Post");
    catalog
        .define("Tag")
        .scalar("Id", ScalarType::Int)
        .scalar("Code", ScalarType::String)
        .collection("Blogs", "Blog");
    catalog
        .define("Post")
        .scalar("Id", ScalarType::Int)
        .scalar("BlogId", ScalarType::Int)
        .reference("Blog", "Blog");
    catalog
}
