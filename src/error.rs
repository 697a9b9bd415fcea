//! Failure taxonomy for a driver session
//!
//! Callers always get either a finished reading, the numeric-conversion
//! sentinel (see [`TestOutcome`](crate::devices::TestOutcome)), or one of the
//! stable categories below. Raw transport or parse failures never leak
//! through with instrument-specific shapes.

use std::{ io, time::Duration };
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error
{
    /// The serial channel could not be opened or configured
    ///
    /// Surfaced before any command is sent.
    #[cfg(feature = "serial")]
    #[error("failed to open serial channel")]
    Open(#[from] tokio_serial::Error),

    /// A setup command that must acknowledge did not
    ///
    /// Fatal for the current test invocation and never retried; the caller
    /// should re-enter remote mode before trying again.
    #[error("device rejected '{cmd}' with '{response}'")]
    Protocol
    {
        cmd: String,
        response: String,
    },

    /// A read exceeded the channel timeout
    ///
    /// Never retried automatically. The busy-poll loop's repeated reads are a
    /// deliberate per-attempt-bounded exception, not a retry policy.
    #[error("no response from device within {0:?}")]
    Timeout(Duration),

    /// The transport failed to read or write
    #[error("serial channel failure")]
    Io(#[from] io::Error),

    /// A response line was not valid text
    #[error("response line was not valid text")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// An instrument-reported fault token, passed through verbatim
    #[error("device reported fault '{0}'")]
    Device(String),
}
