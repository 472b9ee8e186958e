//! Base types and traits shared across the crate.

/// Result type for CLI-facing code. The core pipeline itself reports errors through
/// [`crate::error::Error`]; this alias is for `bin.rs` and other boundary code that wants to
/// bubble up `anyhow`-flavored context.
pub type Res<T> = anyhow::Result<T>;

/// Error type paired with [`Res`].
pub type Err = anyhow::Error;

/// Void result, for `main`-shaped functions.
pub type Void = Res<()>;
