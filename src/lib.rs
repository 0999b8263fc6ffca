pub mod accent;
pub mod cache;
pub mod config;
pub mod dict;
pub mod morph;
pub mod render;
