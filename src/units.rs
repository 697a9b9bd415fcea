//! Measurement magnitudes and the unit suffixes the analyzer attaches to them

use std::{ fmt, str::FromStr };
use thiserror::Error;

/// Unit suffix of a measurement line
///
/// The analyzer reports every reading as `<number> <suffix>`, e.g. `12.4 uA`
/// or `99999 MOHMS`. Resistance suffixes are case sensitive: `mOHMS` is
/// milliohms while `MOHMS` is megohms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit
{
    MicroAmpere,
    Ampere,
    Volt,
    MilliOhm,
    Ohm,
    MegaOhm,
    /// The line carried a bare number with no suffix
    None,
}

/// The token was not one of the suffixes the analyzer emits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized unit suffix '{0}'")]
pub struct UnknownUnit(pub String);

impl FromStr for Unit
{
    type Err = UnknownUnit;

    fn from_str(suffix: &str) -> Result<Self, Self::Err>
    {
        match suffix {
            "uA" => Ok(Self::MicroAmpere),
            "A" => Ok(Self::Ampere),
            "V" => Ok(Self::Volt),
            "mOHM" | "mOHMS" => Ok(Self::MilliOhm),
            "OHM" | "OHMS" => Ok(Self::Ohm),
            "MOHM" | "MOHMS" => Ok(Self::MegaOhm),
            _ => Err(UnknownUnit(suffix.to_owned())),
        }
    }
}

impl fmt::Display for Unit
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::MicroAmpere => f.write_str("uA"),
            Self::Ampere => f.write_str("A"),
            Self::Volt => f.write_str("V"),
            Self::MilliOhm => f.write_str("mOHMS"),
            Self::Ohm => f.write_str("OHMS"),
            Self::MegaOhm => f.write_str("MOHMS"),
            Self::None => Ok(()),
        }
    }
}

/// A parsed measurement: a decimal magnitude plus its unit tag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading
{
    pub value: f64,
    pub unit: Unit,
}

/// Why a line could not be interpreted as a measurement
#[derive(Debug, Error)]
pub enum ParseReadingErr
{
    /// The line does not have the `<number> <suffix>` shape at all
    #[error("'{0}' is not a measurement line")]
    NotAMeasurement(String),
    /// The line carries a recognized unit suffix but its numeric field would
    /// not convert
    #[error("numeric field of '{raw}' would not convert")]
    BadNumber
    {
        raw: String,
        source: std::num::ParseFloatError,
    },
}

impl FromStr for Reading
{
    type Err = ParseReadingErr;

    fn from_str(line: &str) -> Result<Self, Self::Err>
    {
        let mut tokens = line.split_whitespace();
        let number = tokens
            .next()
            .ok_or_else(|| ParseReadingErr::NotAMeasurement(line.to_owned()))?;

        let parsed = match tokens.next() {
            Some(suffix) => {
                let unit = suffix
                    .parse::<Unit>()
                    .map_err(|_| ParseReadingErr::NotAMeasurement(line.to_owned()))?;
                let value = number.parse::<f64>().map_err(|err| ParseReadingErr::BadNumber {
                    raw: line.to_owned(),
                    source: err,
                })?;
                Self { value: value, unit: unit }
            },
            // a few firmware revisions omit the suffix on bare numeric replies
            None => {
                let value = number
                    .parse::<f64>()
                    .map_err(|_| ParseReadingErr::NotAMeasurement(line.to_owned()))?;
                Self { value: value, unit: Unit::None }
            },
        };

        if tokens.next().is_some() {
            return Err(ParseReadingErr::NotAMeasurement(line.to_owned()));
        }

        Ok(parsed)
    }
}

impl fmt::Display for Reading
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.unit {
            Unit::None => write!(f, "{}", self.value),
            unit => write!(f, "{} {}", self.value, unit),
        }
    }
}
