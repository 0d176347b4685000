//! Query parameter validation shared by the REST routes

use super::error::{ApiError, ApiResult};

/// Maximum window for metric queries, one week
pub const MAX_HOURS: u64 = 168;

/// Maximum window for minute based summaries, one week
pub const MAX_MINUTES: u64 = 10_080;

/// Maximum rows returned by one metrics query
pub const MAX_LIMIT: usize = 10_000;

/// Maximum retention accepted by the cleanup endpoint
pub const MAX_CLEANUP_DAYS: u32 = 365;

/// Resolve an optional parameter against its default and inclusive bounds
pub fn bounded<T>(name: &str, value: Option<T>, default: T, min: T, max: T) -> ApiResult<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    let value = value.unwrap_or(default);
    if value < min || value > max {
        return Err(ApiError::InvalidRequest(format!(
            "{name} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(value)
}
