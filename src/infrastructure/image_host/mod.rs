//! External image host adapters

pub mod cloudinary;
#[cfg(test)]
pub(crate) mod fake;

pub use cloudinary::{CloudinaryConfig, CloudinaryImageHost};
