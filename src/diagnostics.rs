//! Developer-facing failure reporting.
//!
//! Every recoverable marshalling failure passes through here: it is logged via
//! `tracing`, counted on the current thread, and with the `strict` feature
//! stops debug builds at the first failure.
//!
//! The counter lets tests (and embedders' debug overlays) observe failures
//! that the public operations deliberately swallow:
//!
//! ```
//! use scriptlink::{Variable, VmRef, diagnostics};
//!
//! diagnostics::take_failures();
//! let n: i32 = scriptlink::unpack(VmRef::none(), &Variable::from("not a number"));
//! assert_eq!(n, 0);
//! assert_eq!(diagnostics::take_failures(), 1);
//! ```

use std::cell::Cell;

use crate::error::MarshalError;

thread_local! {
    static FAILURES: Cell<usize> = const { Cell::new(0) };
}

/// Log `error` at error level and record it.
pub fn report(error: &MarshalError) {
    tracing::error!(target: "scriptlink", "{error}");
    record(error, true);
}

/// Log `error` at warn level and record it without asserting.
pub fn warn(error: &MarshalError) {
    tracing::warn!(target: "scriptlink", "{error}");
    record(error, false);
}

/// Failures recorded on this thread since the last [`take_failures`].
pub fn failure_count() -> usize {
    FAILURES.with(Cell::get)
}

/// Return and reset this thread's failure count.
pub fn take_failures() -> usize {
    FAILURES.with(|count| count.replace(0))
}

#[doc(hidden)]
pub fn record(error: &MarshalError, assert: bool) {
    FAILURES.with(|count| count.set(count.get() + 1));
    #[cfg(feature = "strict")]
    debug_assert!(!assert, "{error}");
    #[cfg(not(feature = "strict"))]
    let _ = (error, assert);
}

/// [`report`] with a module-specific log target.
macro_rules! report_at {
    ($target:literal, $error:expr) => {{
        let error: &$crate::MarshalError = &$error;
        ::tracing::error!(target: $target, "{error}");
        $crate::diagnostics::record(error, true);
    }};
}

/// [`warn`] with a module-specific log target.
macro_rules! warn_at {
    ($target:literal, $error:expr) => {{
        let error: &$crate::MarshalError = &$error;
        ::tracing::warn!(target: $target, "{error}");
        $crate::diagnostics::record(error, false);
    }};
}

pub(crate) use {report_at, warn_at};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_thread() {
        take_failures();
        report(&MarshalError::VmUnavailable);
        warn(&MarshalError::VmUnavailable);
        assert_eq!(failure_count(), 2);

        let other = std::thread::spawn(failure_count).join().unwrap();
        assert_eq!(other, 0);

        assert_eq!(take_failures(), 2);
        assert_eq!(failure_count(), 0);
    }

    #[test]
    fn targeted_macros_record() {
        take_failures();
        report_at!("scriptlink::codec", MarshalError::VmUnavailable);
        warn_at!("scriptlink::structure", MarshalError::VmUnavailable);
        assert_eq!(take_failures(), 2);
    }
}
