//! Integration tests for the wallpaper pipeline.
//!
//! Everything runs against temporary cache directories with in-memory HTTP
//! and installer doubles, so no network or desktop session is needed.
//!
//! ## Running these tests
//! ```bash
//! cargo nextest run -p terrapaper --test integration
//! ```

mod common;
mod wallpaper__cache;
mod wallpaper__render;
mod wallpaper__resolution;
mod wallpaper__rotation;
mod wallpaper__scheduler;
