//! Product-side view of image storage.
//!
//! Products reference their image through a [`ProductImage`] that is resolved
//! once, when the raw column value enters the system. [`ProductImages`] ties a
//! [`ProductCatalog`] to a [`BlobStore`](vitrine_blob::BlobStore) for the
//! replace and remove flows.

pub mod catalog;
pub mod error;
pub mod image;
pub mod memory;
pub mod postgres;
pub mod service;

pub use catalog::{Product, ProductCatalog, ProductId};
pub use error::CatalogError;
pub use image::{ProductImage, public_url};
pub use memory::MemoryCatalog;
pub use postgres::{PostgresCatalog, PostgresCatalogConfig};
pub use service::ProductImages;
