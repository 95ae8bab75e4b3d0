//! Collection definitions
//!
//! Every collection served by Stockroom is a static [`EntitySchema`]. Adding a
//! collection means adding a schema here; storage, validation, search and the
//! HTTP surface pick it up from the registry.

mod book;
mod movie;
mod product;
mod review;

pub use book::BOOKS;
pub use movie::MOVIES;
pub use product::PRODUCTS;
pub use review::REVIEWS;

use crate::models::EntitySchema;

static ALL: [&EntitySchema; 4] = [&BOOKS, &MOVIES, &PRODUCTS, &REVIEWS];

/// Every known collection schema
pub fn all() -> &'static [&'static EntitySchema] {
    &ALL
}

/// Look up a schema by collection name
pub fn find(name: &str) -> Option<&'static EntitySchema> {
    ALL.iter().copied().find(|schema| schema.collection == name)
}
