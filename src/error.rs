//! Error taxonomy and the process-wide error handler (spec §7).

use parking_lot::Mutex;

/// Stable error identifiers, returned by every fallible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("success")]
    Success,
    #[error("bad address")]
    BadAddress,
    #[error("bad extension")]
    BadExtension,
    #[error("bad format")]
    BadFormat,
    #[error("bad projection")]
    BadProjection,
    #[error("bad json")]
    BadJson,
    #[error("domain error")]
    DomainError,
    #[error("library error")]
    LibraryError,
    #[error("lock error")]
    LockError,
    #[error("memory error")]
    MemoryError,
    #[error("path error")]
    PathError,
    #[error("unlock error")]
    UnlockError,
}

/// An error as it is raised at the call site: kind, raising function,
/// source location and a formatted message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message} (in {function} at {file}:{line})")]
pub struct Error {
    pub kind: ErrorKind,
    pub function: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub message: String,
}

impl Error {
    pub fn new(
        kind: ErrorKind,
        function: &'static str,
        file: &'static str,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        let err = Error {
            kind,
            function,
            file,
            line,
            message: message.into(),
        };
        report(&err);
        err
    }
}

/// Raise an [`Error`], recording the call site, and invoke the process-wide handler.
///
/// The raising function's name is given explicitly (Rust has no stable
/// `__func__`); by convention callers pass `"Type::method"`.
macro_rules! raise {
    ($function:expr, $kind:expr, $($arg:tt)*) => {
        $crate::error::Error::new($kind, $function, file!(), line!(), format!($($arg)*))
    };
}
pub(crate) use raise;

pub type Result<T> = std::result::Result<T, Error>;

/// A process-wide handler invoked whenever an [`Error`] is raised.
///
/// The default handler logs the error at `error` level through the `log`
/// facade. Installing a null handler (`clear_error_handler`) disables
/// reporting; error codes are still returned to the caller regardless.
pub type ErrorHandler = fn(&Error);

fn default_handler(err: &Error) {
    log::error!("{err}");
}

// A process-wide slot holding the installed handler (design note §9: "a
// context passed explicitly or stored behind an atomic slot").
static HANDLER: Mutex<ErrorHandler> = Mutex::new(default_handler);

/// Install a process-wide error handler, replacing the default (log-to-`error!`) one.
pub fn set_error_handler(handler: ErrorHandler) {
    *HANDLER.lock() = handler;
}

/// Disable error reporting; error codes are still returned normally.
pub fn clear_error_handler() {
    fn noop(_: &Error) {}
    *HANDLER.lock() = noop;
}

/// Restore the default (log-to-`error!`) handler.
pub fn reset_error_handler() {
    *HANDLER.lock() = default_handler;
}

pub(crate) fn report(err: &Error) {
    (*HANDLER.lock())(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_handler(_: &Error) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn handler_swap() {
        set_error_handler(counting_handler);
        let _ = raise!("test::probe", ErrorKind::DomainError, "probe");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        clear_error_handler();
        let _ = raise!("test::probe", ErrorKind::DomainError, "probe");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        reset_error_handler();
    }

    #[test]
    fn message_contains_kind() {
        let e = raise!("Stack::elevation", ErrorKind::PathError, "missing {}", "N45E002");
        assert_eq!(e.kind, ErrorKind::PathError);
        assert!(e.message.contains("N45E002"));
    }
}
