//! Device configs for the host's registry.

pub mod xbox360;

pub use xbox360::{Xbox360, XboxInput, XboxRequests};
