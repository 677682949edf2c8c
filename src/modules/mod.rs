pub mod archive;
pub mod collector;
pub mod converter;
pub mod fetch;
pub mod image_converter;
pub mod pending;
