// The closed error taxonomy the session dispatch loop maps to wire responses
// (see the core crate's session module): Protocol errors are fatal and
// become ERROR; Operation and Transaction errors are recoverable and become
// FAILED. Io covers everything below the protocol (socket failure, registry
// poisoning). Every variant is logged via tracing at construction so the
// record exists even when the caller recovers from it.

use std::borrow::Cow;
use std::fmt;

use backtrace_error::DynBacktraceError;
use tracing::{error, warn};

#[cfg(test)]
use test_log::test;

#[derive(Debug)]
pub enum Error {
    Protocol(Cow<'static, str>),
    Operation(Cow<'static, str>),
    Transaction(Cow<'static, str>),
    Io(DynBacktraceError),
}
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn protocol(msg: impl Into<Cow<'static, str>>) -> Error {
        let msg = msg.into();
        error!(target: "stackdb", kind = "protocol", "{msg}");
        Error::Protocol(msg)
    }

    pub fn operation(msg: impl Into<Cow<'static, str>>) -> Error {
        let msg = msg.into();
        warn!(target: "stackdb", kind = "operation", "{msg}");
        Error::Operation(msg)
    }

    pub fn transaction(msg: impl Into<Cow<'static, str>>) -> Error {
        let msg = msg.into();
        warn!(target: "stackdb", kind = "transaction", "{msg}");
        Error::Transaction(msg)
    }

    /// The text carried by the FAILED/ERROR response sent to the client.
    pub fn client_message(&self) -> Cow<'static, str> {
        match self {
            Error::Protocol(m) | Error::Operation(m) | Error::Transaction(m) => m.clone(),
            Error::Io(_) => Cow::Borrowed("connection failure"),
        }
    }

    /// True for errors that are fatal to the connection (§7: ERROR, not FAILED).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Io(_))
    }

    /// §4.6: any OperationFailed raised while a transaction is open is
    /// promoted to TransactionFailed. Other kinds pass through unchanged.
    pub fn promote_in_transaction(self) -> Error {
        match self {
            Error::Operation(m) => Error::transaction(m),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Protocol(m) => write!(f, "protocol error: {m}"),
            Error::Operation(m) => write!(f, "operation failed: {m}"),
            Error::Transaction(m) => write!(f, "transaction failed: {m}"),
            Error::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        error!(target: "stackdb", kind = "io", "{:?}", e);
        Error::Io(DynBacktraceError::from(e))
    }
}

pub fn protocol(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::protocol(msg)
}

pub fn operation(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::operation(msg)
}

pub fn transaction(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::transaction(msg)
}

#[test]
fn protocol_errors_are_fatal() {
    assert!(protocol("bad line").is_fatal());
}

#[test]
fn operation_errors_are_recoverable() {
    let e = operation("key not found");
    assert!(!e.is_fatal());
    assert_eq!(e.client_message(), "key not found");
}

#[test]
fn operation_promotes_to_transaction_inside_a_txn() {
    let e = operation("key not found").promote_in_transaction();
    assert!(matches!(e, Error::Transaction(_)));
}
