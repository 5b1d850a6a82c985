//! Node implementation strategies.

pub mod add;
pub mod compound;
pub mod conditional;
pub mod geom;
pub mod image;
pub mod layer;
pub mod mix;
pub mod source_code;
pub mod surface;
pub mod swizzle;
