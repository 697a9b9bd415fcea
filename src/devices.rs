//! Device definition and APIs
//!
//! # Purpose
//! This module defines the handle to an active I/O stream which provides
//! high-level RPCs for:
//!   - Selecting and validating test parameters
//!   - Running the scripted measurement sequences
//!   - Switching the instrument between remote and local control
//!
//! # Exchange discipline
//! Every RPC is a chain of strictly sequential command/response exchanges:
//! one command line out, one response line back, each setup response required
//! to acknowledge before the next command is sent. The asynchronous metered
//! readings additionally poll the device until the reading settles. None of
//! the RPCs are cancel safe: dropping one mid-flight leaves the response
//! stream misaligned, and the next exchange will read a stale line. Callers
//! must also not run two RPCs concurrently on the same handle; the `&mut`
//! receivers enforce this.
//!
//! # Transport
//! Creating I/O handles is not baked into the device type so that you are not
//! restricted to a particular hardware interface; anything implementing the
//! tokio read/write traits will do, such as a TCP/IP serial bridge. With the
//! `serial` feature (enabled by default), [`Esa620::open`] opens a local port
//! with the 8N1 framing the instrument ships with.

use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use tokio::time::sleep;
use crate::{
    cmd::{ ApRouting, Command, OperatingMode },
    config::{ ConfigError, Polarity, SwitchState, TestConfig, TestKind },
    error::Error,
    executor::{ Executor, PRE_READ_SETTLE, REMOTE_SETTLE },
    response::{ decode, DecodeContext, Response },
    units::{ Reading, Unit },
};

/// Stable result code for a measurement line that would not convert to a
/// number
pub const NUMERIC_CONVERSION_CODE: i32 = -102;

/// Fault token the insulation test reinterprets as "above measurable range"
const INSULATION_FAULT_TOKEN: &str = "!21";

/// Reading reported when insulation resistance saturates the meter
const INSULATION_SATURATION: Reading = Reading {
    value: 99999.0,
    unit: Unit::MegaOhm,
};

/// The finished result of one measurement operation
///
/// A terminal line that cannot be converted to a number is a data value, not
/// a raised error, so a batch runner can log it and continue with the next
/// test in its campaign.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOutcome
{
    /// The aggregate reading for the test
    Measured(Reading),
    /// The terminal response line was not convertible to a number
    ///
    /// Carries the raw line for diagnostics; reported to legacy callers as
    /// code [`NUMERIC_CONVERSION_CODE`].
    ConversionFailed
    {
        raw: String,
    },
}

impl TestOutcome
{
    pub fn reading(&self) -> Option<Reading>
    {
        match self {
            Self::Measured(reading) => Some(*reading),
            Self::ConversionFailed { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<i32>
    {
        match self {
            Self::Measured(_) => None,
            Self::ConversionFailed { .. } => Some(NUMERIC_CONVERSION_CODE),
        }
    }
}

/// Reduce the terminal line of a metered (busy-polled) reading
///
/// Anything that is not a clean measurement collapses into the conversion
/// sentinel, matching what legacy test campaigns expect from this family.
fn classify_metered(line: String) -> TestOutcome
{
    match decode(&line, DecodeContext::Poll) {
        Response::Reading(reading) => TestOutcome::Measured(reading),
        _ => TestOutcome::ConversionFailed { raw: line },
    }
}

/// Reduce the reply of a one-shot `READ`
///
/// Instrument-reported fault tokens surface as [`Error::Device`] here, unlike
/// the metered family; a merely garbled number is still the sentinel.
fn classify_single(line: String) -> Result<TestOutcome, Error>
{
    match decode(&line, DecodeContext::Poll) {
        Response::Reading(reading) => Ok(TestOutcome::Measured(reading)),
        Response::Fault(token) => Err(Error::Device(token)),
        _ => Ok(TestOutcome::ConversionFailed { raw: line }),
    }
}

/// A connected ESA-series electrical safety analyzer
pub struct Esa620<T>
{
    io_handle: Executor<T>,
    config: TestConfig,
}

#[cfg(feature = "serial")]
impl Esa620<tokio_serial::SerialStream>
{
    /// Open a local serial port with the instrument's 8N1 framing
    pub fn open(port: &str, baudrate: u32) -> Result<Self, Error>
    {
        use tokio_serial::SerialPortBuilderExt;

        let stream = tokio_serial::new(port, baudrate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .timeout(crate::executor::READ_TIMEOUT)
            .open_native_async()?;

        Ok(Self::with(stream))
    }
}

impl <T> Esa620<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    /// Construct a device handle from an async I/O stream
    pub fn with(io_handle: T) -> Self
    {
        Self {
            io_handle: Executor::with(io_handle),
            config: TestConfig::new(),
        }
    }

    pub fn config(&self) -> &TestConfig
    {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TestConfig
    {
        &mut self.config
    }

    /// Apply a full parameter selection in one call
    ///
    /// Each alias is validated before anything reaches the instrument; the
    /// first unrecognized one aborts the call.
    pub fn configure(
        &mut self,
        test: &str,
        leads: u8,
        polarity: &str,
        earth: &str,
        neutral: &str,
    )
        -> Result<(), ConfigError>
    {
        self.config.set_test(test)?;
        self.config.set_leads(leads)?;
        self.config.set_polarity(polarity)?;
        self.config.set_earth(earth)?;
        self.config.set_neutral(neutral)?;

        Ok(())
    }

    /// Release the underlying I/O stream
    pub fn into_inner(self) -> T
    {
        self.io_handle.into_inner()
    }

    /// Take remote control of the instrument
    ///
    /// Idempotent; safe to call before every test. Waits out the front-panel
    /// switchover before returning.
    pub async fn enter_remote(&mut self) -> Result<(), Error>
    {
        self.io_handle.exec(Command::Remote).await?;
        self.io_handle.exec(Command::ReportTime(2)).await?;
        self.io_handle.exec(Command::StandardNone).await?;
        sleep(REMOTE_SETTLE).await;

        Ok(())
    }

    /// Hand the front panel back to the operator
    pub async fn enter_local(&mut self) -> Result<(), Error>
    {
        self.io_handle.exec(Command::Local).await
    }

    /// Query the instrument's identity string
    pub async fn ident(&mut self) -> Result<String, Error>
    {
        self.io_handle.exec(Command::Remote).await?;
        self.io_handle.send(&Command::Ident).await?;
        self.io_handle.read_line().await
    }

    async fn switch_receptacle(&mut self, polarity: Polarity) -> Result<(), Error>
    {
        self.io_handle.exec(Command::Remote).await?;
        self.io_handle.exec(Command::Mode(OperatingMode::Patient)).await?;
        sleep(REMOTE_SETTLE).await;
        self.io_handle.exec(Command::Polarity(polarity)).await
    }

    /// Energize the test receptacle with normal polarity
    pub async fn power_on(&mut self) -> Result<(), Error>
    {
        self.switch_receptacle(Polarity::Normal).await
    }

    /// De-energize the test receptacle
    pub async fn power_off(&mut self) -> Result<(), Error>
    {
        self.switch_receptacle(Polarity::Off).await
    }

    /// Run the measurement for the given test kind with the current
    /// configuration
    pub async fn run(&mut self, kind: TestKind) -> Result<TestOutcome, Error>
    {
        match kind {
            TestKind::EnclosureLeakage => self.enclosure_leakage().await,
            TestKind::PatientLeakage => self.patient_leakage().await,
            TestKind::AppliedPartsLeakage => self.applied_parts_leakage().await,
            TestKind::PatientAuxiliaryCurrent => self.patient_auxiliary_current().await,
            TestKind::EarthLeakage => self.earth_leakage().await,
            TestKind::InsulationResistance => self.insulation_resistance().await,
            TestKind::ProtectiveEarthResistance => self.protective_earth_resistance().await,
            TestKind::MainsVoltage => self.mains_voltage().await,
            TestKind::EquipmentCurrent => self.equipment_current().await,
        }
    }

    async fn metered_reading(&mut self) -> Result<TestOutcome, Error>
    {
        sleep(PRE_READ_SETTLE).await;
        let line = self.io_handle.poll_metered_line().await?;

        Ok(classify_metered(line))
    }

    async fn one_shot_reading(&mut self) -> Result<TestOutcome, Error>
    {
        self.io_handle.send(&Command::Read).await?;
        let line = self.io_handle.read_line().await?;

        classify_single(line)
    }

    /// Leakage current through the enclosure to earth
    ///
    /// Single metered reading; the electrode layout does not participate.
    pub async fn enclosure_leakage(&mut self) -> Result<TestOutcome, Error>
    {
        let polarity = self.config.polarity();
        let earth = self.config.earth();
        let neutral = self.config.neutral();

        self.enter_remote().await?;
        self.io_handle
            .exec_all(&[
                Command::Mode(OperatingMode::Enclosure),
                Command::AppliedParts(ApRouting::AllOpen),
                Command::DualMeterOff,
                Command::Polarity(polarity),
                Command::Earth(earth),
                Command::Neutral(neutral),
            ])
            .await?;

        self.metered_reading().await
    }

    /// Leakage current from mains to each patient lead, worst case
    ///
    /// Cycles every electrode in the active layout, measuring each one
    /// against the remaining leads as the return group, and reports the peak
    /// magnitude observed. A terminal line that will not convert aborts the
    /// cycle immediately; readings from electrodes already measured are
    /// discarded rather than reported as a partial aggregate.
    pub async fn patient_leakage(&mut self) -> Result<TestOutcome, Error>
    {
        let polarity = self.config.polarity();
        let earth = self.config.earth();
        let neutral = self.config.neutral();
        let electrodes = self.config.electrodes();

        self.enter_remote().await?;

        // zero is the meter's quiescent floor; readings only raise it
        let mut peak = Reading { value: 0.0, unit: Unit::MicroAmpere };

        for electrode in electrodes.electrodes().iter().copied() {
            self.io_handle
                .exec_all(&[
                    Command::StandardNone,
                    Command::Mode(OperatingMode::Patient),
                    Command::Polarity(polarity),
                    Command::Earth(earth),
                    Command::Neutral(neutral),
                    Command::MeterAcDc,
                    Command::AppliedParts(ApRouting::Source(electrode)),
                    Command::GroundGroup(electrodes.ground_group(electrode)),
                    Command::DualMeterOff,
                ])
                .await?;

            match self.metered_reading().await? {
                TestOutcome::Measured(reading) => {
                    log::debug!("lead {}: {}", electrode, reading);
                    if reading.value > peak.value {
                        peak = reading;
                    }
                },
                failed => return Ok(failed),
            }
        }

        Ok(TestOutcome::Measured(peak))
    }

    /// Leakage current with mains applied to the patient leads, worst case
    ///
    /// Same cycling and aggregation as [`patient_leakage`](Self::patient_leakage).
    /// The earth and neutral relays are forced closed for this test
    /// regardless of configuration; the measurement is only defined with an
    /// intact supply circuit.
    pub async fn applied_parts_leakage(&mut self) -> Result<TestOutcome, Error>
    {
        let polarity = self.config.polarity();
        let electrodes = self.config.electrodes();

        self.enter_remote().await?;

        let mut peak = Reading { value: 0.0, unit: Unit::MicroAmpere };

        for electrode in electrodes.electrodes().iter().copied() {
            // the previous trial's metering may still be pending
            self.io_handle.cancel_metering().await?;
            self.io_handle
                .exec_all(&[
                    Command::StandardNone,
                    Command::Mode(OperatingMode::AppliedParts),
                    Command::MapRangeLow,
                    Command::Earth(SwitchState::Closed),
                    Command::Neutral(SwitchState::Closed),
                    Command::MapNormal,
                    Command::Polarity(polarity),
                    Command::AppliedParts(ApRouting::Source(electrode)),
                    Command::GroundGroup(electrodes.ground_group(electrode)),
                    Command::MeterAcDc,
                    Command::DualMeterOff,
                ])
                .await?;

            match self.metered_reading().await? {
                TestOutcome::Measured(reading) => {
                    log::debug!("lead {}: {}", electrode, reading);
                    if reading.value > peak.value {
                        peak = reading;
                    }
                },
                failed => return Ok(failed),
            }
        }

        Ok(TestOutcome::Measured(peak))
    }

    /// Auxiliary current between each patient lead and the rest, worst case
    pub async fn patient_auxiliary_current(&mut self) -> Result<TestOutcome, Error>
    {
        let polarity = self.config.polarity();
        let earth = self.config.earth();
        let neutral = self.config.neutral();
        let electrodes = self.config.electrodes();

        self.enter_remote().await?;

        let mut peak = Reading { value: 0.0, unit: Unit::MicroAmpere };

        for electrode in electrodes.electrodes().iter().copied() {
            self.io_handle
                .exec_all(&[
                    Command::StandardNone,
                    Command::Mode(OperatingMode::Auxiliary),
                    Command::Polarity(polarity),
                    Command::Earth(earth),
                    Command::Neutral(neutral),
                    Command::MeterAcDc,
                    Command::AppliedParts(ApRouting::SourceToGroup(
                        electrode,
                        electrodes.ground_group(electrode),
                    )),
                    Command::DualMeterOff,
                ])
                .await?;

            match self.metered_reading().await? {
                TestOutcome::Measured(reading) => {
                    log::debug!("lead {}: {}", electrode, reading);
                    if reading.value > peak.value {
                        peak = reading;
                    }
                },
                failed => return Ok(failed),
            }
        }

        Ok(TestOutcome::Measured(peak))
    }

    /// Leakage current in the protective earth conductor
    pub async fn earth_leakage(&mut self) -> Result<TestOutcome, Error>
    {
        let polarity = self.config.polarity();
        let neutral = self.config.neutral();

        self.enter_remote().await?;
        self.io_handle
            .exec_all(&[
                Command::Mode(OperatingMode::EarthLeakage),
                Command::Polarity(polarity),
                Command::Neutral(neutral),
                Command::MeterAcDc,
            ])
            .await?;
        sleep(PRE_READ_SETTLE).await;

        self.one_shot_reading().await
    }

    /// Resistance of the protective earth conductor
    pub async fn protective_earth_resistance(&mut self) -> Result<TestOutcome, Error>
    {
        self.io_handle.exec(Command::Remote).await?;
        self.io_handle.exec(Command::EarthResistanceLow).await?;
        self.io_handle.exec(Command::WireMode(2)).await?;

        self.one_shot_reading().await
    }

    /// Mains voltage across the configured circuit
    pub async fn mains_voltage(&mut self) -> Result<TestOutcome, Error>
    {
        let circuit = self.config.circuit();

        self.io_handle.exec(Command::Remote).await?;
        self.io_handle.exec(Command::Mains(circuit)).await?;

        self.one_shot_reading().await
    }

    /// Insulation resistance across the configured circuit
    ///
    /// A reply carrying the instrument's over-range fault token is a known
    /// behavior of this measurement, not an error: it is reported as the
    /// saturation reading of 99999 megohms.
    pub async fn insulation_resistance(&mut self) -> Result<TestOutcome, Error>
    {
        let circuit = self.config.circuit();

        self.enter_remote().await?;
        self.io_handle
            .exec_all(&[
                Command::Mode(OperatingMode::Insulation),
                Command::InsulationHigh,
                Command::Circuit(circuit),
            ])
            .await?;

        self.io_handle.send(&Command::Read).await?;
        let line = self.io_handle.read_line().await?;

        if line.contains(INSULATION_FAULT_TOKEN) {
            return Ok(TestOutcome::Measured(INSULATION_SATURATION));
        }

        classify_single(line)
    }

    /// Mains current drawn by the equipment under test
    pub async fn equipment_current(&mut self) -> Result<TestOutcome, Error>
    {
        self.enter_remote().await?;
        self.io_handle.exec(Command::Mode(OperatingMode::EquipmentCurrent)).await?;

        self.one_shot_reading().await
    }
}
