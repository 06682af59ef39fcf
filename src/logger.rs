//! Process-wide tracing setup.
//!
//! Log lines go to stderr; stdout belongs to the console channel's replies.

use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Install the global subscriber. Call once, from `main`.
///
/// `prefer_level` is set when the level came from `-v` flags: it then beats
/// `RUST_LOG`. Config-file levels yield to `RUST_LOG`.
pub fn init(level: &str, prefer_level: bool) -> Result<(), AppError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(level, prefer_level, rust_log.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Pick the filter directive: the preferred source first, the other one if
/// the first is absent or does not parse.
fn resolve_filter(level: &str, prefer_level: bool, rust_log: Option<&str>) -> Result<EnvFilter, AppError> {
    let candidates = if prefer_level { [Some(level), rust_log] } else { [rust_log, Some(level)] };

    let mut last_err = None;
    for directive in candidates.into_iter().flatten() {
        match EnvFilter::try_new(directive) {
            Ok(filter) => return Ok(filter),
            Err(e) => last_err = Some(format!("'{directive}': {e}")),
        }
    }
    Err(AppError::Logger(format!(
        "no usable log filter (level '{level}'): {}",
        last_err.unwrap_or_else(|| "nothing set".into())
    )))
}
