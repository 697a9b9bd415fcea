//! Typed decoding of raw response lines
//!
//! The instrument replies to every command with a single line. The same `*`
//! marker does double duty on the wire: after a setup command it is the
//! acknowledgement, while during an asynchronous metered reading it means
//! "not ready yet". The string alone cannot tell those apart, so the caller
//! states which interpretation applies at its call site.

use crate::units::{ ParseReadingErr, Reading };

/// The one-character token used for both acknowledgement and busy
pub const ACK_MARKER: &str = "*";

/// Which reading of the `*` marker applies at the calling site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeContext
{
    /// The previous write was a setup command; `*` acknowledges it
    Command,
    /// The previous write started a metered reading; `*` means not ready
    Poll,
}

/// A response line reduced to its protocol meaning
#[derive(Debug, Clone, PartialEq)]
pub enum Response
{
    /// The setup command was accepted
    Ack,
    /// The pending reading has not settled yet
    Busy,
    /// A terminal measurement line
    Reading(Reading),
    /// Shaped like a measurement but the number would not convert
    Unparsed(String),
    /// An instrument-reported error token, passed through verbatim
    Fault(String),
}

/// Classify one raw response line
///
/// Pure string function; the executor hands it lines with the terminator
/// already stripped.
pub fn decode(line: &str, context: DecodeContext) -> Response
{
    let trimmed = line.trim();

    match context {
        DecodeContext::Command => {
            if trimmed == ACK_MARKER {
                return Response::Ack;
            }
        },
        DecodeContext::Poll => {
            // the device pads the marker inconsistently while settling, so
            // this check is containment rather than equality
            if trimmed.contains(ACK_MARKER) {
                return Response::Busy;
            }
        },
    }

    match trimmed.parse::<Reading>() {
        Ok(reading) => Response::Reading(reading),
        Err(ParseReadingErr::BadNumber { .. }) => Response::Unparsed(line.to_owned()),
        Err(ParseReadingErr::NotAMeasurement(_)) => Response::Fault(line.to_owned()),
    }
}
