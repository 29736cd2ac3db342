//! Shared support types.
mod bytestr;
pub use bytestr::ByteStr;

/// Protocol-level trace logging.
///
/// Expands to [`tracing::trace!`] under the `verbose` cargo feature and to
/// nothing otherwise, so the receive path carries no logging cost by
/// default.
macro_rules! verbose {
    ($($arg:tt)*) => {
        #[cfg(feature = "verbose")]
        tracing::trace!(target: "postwire", $($arg)*)
    };
}

pub(crate) use verbose;
