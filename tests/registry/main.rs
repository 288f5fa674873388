//! Integration tests for Layer 1: Registry
//!
//! Tests for entity types, keys, foreign keys, skip navigations, and
//! cascading removal.

mod entity_types;
mod relationships;

use std::sync::Arc;

use skipnav_foundation::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, ScalarType, ShapeCatalog, SkipNavigationId,
};
use skipnav_registry::{Model, PropertyFlags};

pub const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;
pub const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;

/// `Blog` and `Tag`, keyed by `Id`, with collections of each other.
pub struct Fixture {
    pub model: Model,
    pub blog: EntityTypeId,
    pub tag: EntityTypeId,
}

pub fn fixture() -> Fixture {
    let mut catalog = ShapeCatalog::new();
    catalog
        .define("Blog")
        .scalar("Id", ScalarType::Int)
        .collection("Tags", "Tag")
        .collection("Posts", "Post");
    catalog
        .define("Tag")
        .scalar("Id", ScalarType::Int)
        .collection("Blogs", "Blog");
    catalog
        .define("Post")
        .scalar("Id", ScalarType::Int)
        .scalar("BlogId", ScalarType::Int)
        .reference("Blog", "Blog");

    let mut model = Model::new(Arc::new(catalog));
    let mut keyed = |name: &str| {
        let shape = model.catalog().lookup(name).unwrap();
        let entity = model.find_or_create_entity_type(shape, None, EXPLICIT).unwrap();
        let id = model
            .add_property(entity, "Id", ScalarType::Int, PropertyFlags::MEMBER, CONVENTION)
            .unwrap();
        model.set_primary_key(entity, &[id], CONVENTION).unwrap();
        entity
    };
    let blog = keyed("Blog");
    let tag = keyed("Tag");
    Fixture { model, blog, tag }
}

/// Wires `Blog.Tags` / `Tag.Blogs` through an implicit join named `BlogTag`.
pub struct Wired {
    pub join: EntityTypeId,
    pub left_fk: ForeignKeyId,
    pub right_fk: ForeignKeyId,
    pub tags: SkipNavigationId,
    pub blogs: SkipNavigationId,
}

pub fn wire(f: &mut Fixture) -> Wired {
    let m = &mut f.model;
    let join = m.add_implicit_join_entity_type("BlogTag").unwrap();
    let blog_id = m
        .add_property(join, "Blog_Id", ScalarType::Int, PropertyFlags::INDEXER, CONVENTION)
        .unwrap();
    let tag_id = m
        .add_property(join, "Tag_Id", ScalarType::Int, PropertyFlags::INDEXER, CONVENTION)
        .unwrap();
    m.set_primary_key(join, &[blog_id, tag_id], CONVENTION).unwrap();
    let left_fk = m.add_foreign_key(join, &[blog_id], f.blog, CONVENTION).unwrap();
    let right_fk = m.add_foreign_key(join, &[tag_id], f.tag, CONVENTION).unwrap();
    let tags = m.add_skip_navigation(f.blog, "Tags", f.tag, EXPLICIT).unwrap();
    let blogs = m.add_skip_navigation(f.tag, "Blogs", f.blog, EXPLICIT).unwrap();
    m.set_skip_navigation_foreign_key(tags, Some(left_fk)).unwrap();
    m.set_skip_navigation_foreign_key(blogs, Some(right_fk)).unwrap();
    m.set_skip_navigation_inverse(tags, blogs).unwrap();
    Wired {
        join,
        left_fk,
        right_fk,
        tags,
        blogs,
    }
}
