//! Error types for Terrapaper.
//!
//! This module provides the unified error type returned by CLI commands.
//! Subsystems keep their own error enums and are converted into this one at
//! the command boundary.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during application execution.
///
/// Serializes as `{ "kind": ..., "message": ... }` so `--json` output can
/// report failures in the same shape as results.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum TerrapaperError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Cache operation failed.
    #[error("Cache error: {0}")]
    CacheError(String),
    /// Wallpaper rendering or installation failed.
    #[error("Wallpaper error: {0}")]
    WallpaperError(String),
    /// Favorites operation failed.
    #[error("Favorites error: {0}")]
    FavoritesError(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for TerrapaperError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for TerrapaperError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for TerrapaperError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for TerrapaperError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

impl From<crate::config::ConfigError> for TerrapaperError {
    fn from(err: crate::config::ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<crate::wallpaper::CycleError> for TerrapaperError {
    fn from(err: crate::wallpaper::CycleError) -> Self { Self::WallpaperError(err.to_string()) }
}

impl From<crate::wallpaper::CacheError> for TerrapaperError {
    fn from(err: crate::wallpaper::CacheError) -> Self { Self::CacheError(err.to_string()) }
}

impl From<crate::wallpaper::FavoritesError> for TerrapaperError {
    fn from(err: crate::wallpaper::FavoritesError) -> Self { Self::FavoritesError(err.to_string()) }
}

impl From<crate::wallpaper::DownloadError> for TerrapaperError {
    fn from(err: crate::wallpaper::DownloadError) -> Self { Self::WallpaperError(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = TerrapaperError::InvalidArguments("Cannot import a directory".to_string());
        assert!(err.to_string().contains("Cannot import a directory"));
    }

    #[test]
    fn test_cache_error_display() {
        let err = TerrapaperError::CacheError("Failed to remove directory".to_string());
        let msg = err.to_string();
        assert!(msg.contains("Cache error"));
        assert!(msg.contains("Failed to remove directory"));
    }

    #[test]
    fn test_wallpaper_error_display() {
        let err = TerrapaperError::WallpaperError("No image available".to_string());
        assert!(err.to_string().contains("Wallpaper error"));
    }

    #[test]
    fn test_favorites_error_display() {
        let err = TerrapaperError::FavoritesError("unknown image".to_string());
        assert_eq!(err.to_string(), "Favorites error: unknown image");
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err: TerrapaperError = io_err.into();
        assert!(matches!(err, TerrapaperError::IoError(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_from_string() {
        let err: TerrapaperError = "test error".into();
        assert!(matches!(err, TerrapaperError::CommandError(_)));
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_error_serializes_with_kind() {
        let err = TerrapaperError::CacheError("disk full".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"CacheError\""));
        assert!(json.contains("disk full"));
    }
}
