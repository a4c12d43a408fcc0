//! Shared identifier types.

/// Primary key type for users.
pub type UserId = i32;
