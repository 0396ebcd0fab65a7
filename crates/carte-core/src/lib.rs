pub mod collection;
pub mod error;
pub mod id;
pub mod model;
pub mod store;

pub use collection::{Bbox, FeatureCollection};
pub use error::{CollectionError, InvalidFeature};
pub use id::FeatureId;
pub use model::*;
pub use store::GeometryStore;
