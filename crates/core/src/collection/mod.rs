//! Collection domain: records, photos, and their store contracts.

mod car_model;
mod photo_model;
mod store;

pub use car_model::*;
pub use photo_model::*;
pub use store::*;
