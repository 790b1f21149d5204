//! Derived reads over a recloser catalog.
//!
//! Provides the firmware service tree (`tree`), structural firmware comparison
//! (`diff`), per-service screen layouts (`layout`), the full device inventory
//! (`inventory`), feature value checks (`validate`) and plain-text rendering
//! (`render`). Every operation takes an explicit `CatalogStore` handle.

pub mod diff;
pub mod inventory;
pub mod layout;
pub mod render;
pub mod tree;
pub mod validate;
