//! Application-wide constants.

/// Application identifier, used for cache, config and state directory names.
pub const APP_ID: &str = "terrapaper";

/// Name of the source that holds images imported by the user.
pub const USER_SOURCE: &str = "user";
