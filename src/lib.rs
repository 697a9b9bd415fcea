//! Asynchronous remote control for Fluke **ESA**-series electrical safety
//! analyzers
//!
//! The analyzer speaks a line-oriented ASCII protocol over a serial line:
//! commands go out one per carriage-return-terminated line, and every setup
//! command is acknowledged with a single `*`. Measurements come back as
//! `<number> <unit>` lines, either immediately (`READ`) or after a busy-poll
//! loop for the asynchronous metered readings (`MREAD`), during which the
//! very same `*` token means "not ready yet".
//!
//! This crate scripts those exchanges: validated test configuration, the
//! per-electrode cycling of the leakage tests with worst-case aggregation,
//! the busy-poll protocol, and a stable error taxonomy so callers never see
//! raw transport or parse failures.
//!
//! The device handle works over any `tokio` byte stream, so the instrument
//! can sit on a local port or behind a TCP serial bridge:
//!
//! ```no_run
//! use esa620ctrl::{ Esa620, TestKind };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut analyzer = Esa620::open("/dev/ttyUSB0", 115200)?;
//! analyzer.configure("LIVE_TO_NEUTRAL", 5, "NORMAL", "CLOSED", "CLOSED")?;
//!
//! analyzer.enter_remote().await?;
//! let outcome = analyzer.run(TestKind::PatientLeakage).await?;
//! println!("worst-case leakage: {:?}", outcome.reading());
//! analyzer.enter_local().await?;
//! # Ok(())
//! # }
//! ```

pub mod cmd;
pub mod config;
pub mod devices;
pub mod response;
pub mod units;

mod error;
mod executor;

pub use config::{
    ConfigError, Electrode, ElectrodeSet, MeasurementCircuit, Polarity, SwitchState, TestConfig,
    TestKind,
};
pub use devices::{ Esa620, TestOutcome, NUMERIC_CONVERSION_CODE };
pub use error::Error;
pub use executor::{ POLL_INTERVAL, PRE_READ_SETTLE, READ_TIMEOUT, REMOTE_SETTLE };
pub use units::{ Reading, Unit };
