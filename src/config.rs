//! Operator-selected test parameters and their validation
//!
//! The front-end layers above this crate deal in human-readable option names
//! ("NORMAL", "CLOSED", "LIVE_TO_EARTH", ...). Each setter here maps those
//! aliases onto the single canonical token the instrument understands and
//! fails closed on anything it does not recognize, so a misconfiguration is
//! rejected before a single byte reaches the serial line.

use std::fmt;
use thiserror::Error;

/// A configuration alias or value the driver refuses to accept
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError
{
    #[error("unrecognized test selection '{0}'")]
    UnknownTest(String),
    #[error("unsupported lead count {0}, the analyzer takes 3, 5, or 10 leads")]
    UnsupportedLeadCount(u8),
    #[error("unrecognized polarity '{0}'")]
    UnknownPolarity(String),
    #[error("unrecognized switch state '{0}'")]
    UnknownSwitchState(String),
}

/// Mains polarity applied to the equipment under test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity
{
    Normal,
    Reversed,
    Off,
}

impl Polarity
{
    /// Map a human-readable alias onto a canonical polarity
    pub fn from_alias(alias: &str) -> Result<Self, ConfigError>
    {
        match alias {
            "N" | "n" | "1" | "NORM" | "NORMAL" | "normal" | "DIR" | "DIRECT" => Ok(Self::Normal),
            "R" | "r" | "-1" | "REV" | "REVERSE" | "reverse" | "REVERSED" => Ok(Self::Reversed),
            "0" | "OFF" | "off" => Ok(Self::Off),
            _ => Err(ConfigError::UnknownPolarity(alias.to_owned())),
        }
    }
}

impl fmt::Display for Polarity
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Normal => f.write_str("N"),
            Self::Reversed => f.write_str("R"),
            Self::Off => f.write_str("OFF"),
        }
    }
}

/// Position of the earth or neutral relay in the receptacle circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState
{
    Open,
    Closed,
}

impl SwitchState
{
    /// Map a human-readable alias onto a relay position
    pub fn from_alias(alias: &str) -> Result<Self, ConfigError>
    {
        match alias {
            "O" | "o" | "OPEN" | "open" => Ok(Self::Open),
            "C" | "c" | "CLOSE" | "CLOSED" | "closed" => Ok(Self::Closed),
            _ => Err(ConfigError::UnknownSwitchState(alias.to_owned())),
        }
    }
}

impl fmt::Display for SwitchState
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Open => f.write_str("O"),
            Self::Closed => f.write_str("C"),
        }
    }
}

/// Which pair of mains conductors a voltage or insulation measurement spans
///
/// These are the tokens the instrument accepts after `MAINS=` and as the
/// circuit selector of an insulation resistance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementCircuit
{
    LiveToNeutral,
    LiveToEarth,
    NeutralToEarth,
    MainsToProtectiveEarth,
    AppliedPartsToProtectiveEarth,
    MainsToAppliedParts,
}

impl MeasurementCircuit
{
    /// Map a human-readable alias onto a canonical circuit token
    pub fn from_alias(alias: &str) -> Result<Self, ConfigError>
    {
        match alias {
            "L1-L2" | "L_N" | "LIVE_TO_NEUTRAL" | "live_to_neutral" => Ok(Self::LiveToNeutral),
            "L1-GND" | "L_GND" | "LIVE_TO_EARTH" | "live_to_earth" => Ok(Self::LiveToEarth),
            "L2-GND" | "N_GND" | "NEUTRAL_TO_EARTH" | "neutral_to_earth" => Ok(Self::NeutralToEarth),
            "INSB" | "MAINS-PE" | "MAIN-PE" | "MAINS_TO_PROTECTIVE_EARTH" => {
                Ok(Self::MainsToProtectiveEarth)
            },
            "INSD" | "AP-PE" | "A.P-PE" | "APPLIED_PARTS_PROTECTIVE_EARTH" => {
                Ok(Self::AppliedPartsToProtectiveEarth)
            },
            "INSE" | "MAIN-A.P" | "MAINS-AP" | "MAINS_TO_APPLIED_PARTS" => {
                Ok(Self::MainsToAppliedParts)
            },
            _ => Err(ConfigError::UnknownTest(alias.to_owned())),
        }
    }

    pub fn token(&self) -> &'static str
    {
        match self {
            Self::LiveToNeutral => "L1-L2",
            Self::LiveToEarth => "L1-GND",
            Self::NeutralToEarth => "L2-GND",
            Self::MainsToProtectiveEarth => "INSB",
            Self::AppliedPartsToProtectiveEarth => "INSD",
            Self::MainsToAppliedParts => "INSE",
        }
    }
}

impl fmt::Display for MeasurementCircuit
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.token())
    }
}

/// One physical patient-lead terminal on the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Electrode
{
    RA,
    LL,
    LA,
    RL,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl fmt::Display for Electrode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::RA => f.write_str("RA"),
            Self::LL => f.write_str("LL"),
            Self::LA => f.write_str("LA"),
            Self::RL => f.write_str("RL"),
            Self::V1 => f.write_str("V1"),
            Self::V2 => f.write_str("V2"),
            Self::V3 => f.write_str("V3"),
            Self::V4 => f.write_str("V4"),
            Self::V5 => f.write_str("V5"),
            Self::V6 => f.write_str("V6"),
        }
    }
}

const LEADS_3: &[Electrode] = &[Electrode::RA, Electrode::LL, Electrode::LA];

const LEADS_5: &[Electrode] = &[
    Electrode::RA,
    Electrode::LL,
    Electrode::LA,
    Electrode::RL,
    Electrode::V1,
];

const LEADS_10: &[Electrode] = &[
    Electrode::RA,
    Electrode::LL,
    Electrode::LA,
    Electrode::RL,
    Electrode::V1,
    Electrode::V2,
    Electrode::V3,
    Electrode::V4,
    Electrode::V5,
    Electrode::V6,
];

/// The ordered set of patient leads participating in a test
///
/// Exactly three layouts exist, matching the 3-, 5-, and 10-lead ECG cable
/// variants the analyzer is wired for. The ordering is fixed and significant:
/// per-electrode test cycling walks it front to back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectrodeSet
{
    leads: &'static [Electrode],
}

impl ElectrodeSet
{
    /// Select the canonical layout for the given lead count
    ///
    /// Any count other than 3, 5, or 10 is rejected.
    pub fn with_lead_count(count: u8) -> Result<Self, ConfigError>
    {
        match count {
            3 => Ok(Self { leads: LEADS_3 }),
            5 => Ok(Self { leads: LEADS_5 }),
            10 => Ok(Self { leads: LEADS_10 }),
            other => Err(ConfigError::UnsupportedLeadCount(other)),
        }
    }

    pub fn electrodes(&self) -> &'static [Electrode]
    {
        self.leads
    }

    pub fn lead_count(&self) -> u8
    {
        self.leads.len() as u8
    }

    /// The return-path group for one sub-trial: every lead except the one
    /// currently under test, in layout order
    pub fn ground_group(&self, excluded: Electrode) -> Vec<Electrode>
    {
        self.leads
            .iter()
            .copied()
            .filter(|lead| *lead != excluded)
            .collect()
    }
}

impl Default for ElectrodeSet
{
    fn default() -> Self
    {
        Self { leads: LEADS_10 }
    }
}

/// The measurement a [`run`](crate::Esa620::run) call should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind
{
    EnclosureLeakage,
    PatientLeakage,
    AppliedPartsLeakage,
    PatientAuxiliaryCurrent,
    EarthLeakage,
    InsulationResistance,
    ProtectiveEarthResistance,
    MainsVoltage,
    EquipmentCurrent,
}

/// The operator-selected state a measurement run is built from
///
/// All fields start at safe values: polarity normal, earth and neutral relays
/// closed, the full 10-lead layout, and the live-to-neutral circuit. Setters
/// are pure in-memory mutations; nothing is sent to the instrument until a
/// measurement runs.
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig
{
    circuit: MeasurementCircuit,
    electrodes: ElectrodeSet,
    polarity: Polarity,
    earth: SwitchState,
    neutral: SwitchState,
}

impl Default for TestConfig
{
    fn default() -> Self
    {
        Self {
            circuit: MeasurementCircuit::LiveToNeutral,
            electrodes: ElectrodeSet::default(),
            polarity: Polarity::Normal,
            earth: SwitchState::Closed,
            neutral: SwitchState::Closed,
        }
    }
}

impl TestConfig
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Select the measurement circuit by alias
    pub fn set_test(&mut self, alias: &str) -> Result<(), ConfigError>
    {
        self.circuit = MeasurementCircuit::from_alias(alias)?;
        Ok(())
    }

    /// Select the electrode layout by lead count (3, 5, or 10)
    pub fn set_leads(&mut self, count: u8) -> Result<(), ConfigError>
    {
        self.electrodes = ElectrodeSet::with_lead_count(count)?;
        Ok(())
    }

    pub fn set_polarity(&mut self, alias: &str) -> Result<(), ConfigError>
    {
        self.polarity = Polarity::from_alias(alias)?;
        Ok(())
    }

    pub fn set_earth(&mut self, alias: &str) -> Result<(), ConfigError>
    {
        self.earth = SwitchState::from_alias(alias)?;
        Ok(())
    }

    pub fn set_neutral(&mut self, alias: &str) -> Result<(), ConfigError>
    {
        self.neutral = SwitchState::from_alias(alias)?;
        Ok(())
    }

    pub fn circuit(&self) -> MeasurementCircuit
    {
        self.circuit
    }

    pub fn electrodes(&self) -> ElectrodeSet
    {
        self.electrodes
    }

    pub fn polarity(&self) -> Polarity
    {
        self.polarity
    }

    pub fn earth(&self) -> SwitchState
    {
        self.earth
    }

    pub fn neutral(&self) -> SwitchState
    {
        self.neutral
    }
}

#[cfg(test)]
mod tests
{
    use super::{ ConfigError, Electrode, ElectrodeSet, MeasurementCircuit, Polarity, SwitchState, TestConfig };

    #[test]
    fn canonical_layouts()
    {
        let three = ElectrodeSet::with_lead_count(3).unwrap();
        assert_eq!(three.electrodes(), &[Electrode::RA, Electrode::LL, Electrode::LA]);
        assert_eq!(three.lead_count(), 3);

        let five = ElectrodeSet::with_lead_count(5).unwrap();
        assert_eq!(five.lead_count(), 5);
        assert_eq!(five.electrodes()[4], Electrode::V1);

        let ten = ElectrodeSet::with_lead_count(10).unwrap();
        assert_eq!(ten.lead_count(), 10);
        assert_eq!(ten.electrodes()[9], Electrode::V6);
    }

    #[test]
    fn rejects_unsupported_lead_counts()
    {
        for count in [0u8, 1, 2, 4, 6, 9, 11, 12] {
            assert_eq!(
                ElectrodeSet::with_lead_count(count),
                Err(ConfigError::UnsupportedLeadCount(count)),
            );
        }
    }

    #[test]
    fn ground_group_preserves_order()
    {
        let five = ElectrodeSet::with_lead_count(5).unwrap();
        assert_eq!(
            five.ground_group(Electrode::LA),
            vec![Electrode::RA, Electrode::LL, Electrode::RL, Electrode::V1],
        );
    }

    #[test]
    fn polarity_aliases()
    {
        assert_eq!(Polarity::from_alias("NORMAL"), Ok(Polarity::Normal));
        assert_eq!(Polarity::from_alias("1"), Ok(Polarity::Normal));
        assert_eq!(Polarity::from_alias("reverse"), Ok(Polarity::Reversed));
        assert_eq!(Polarity::from_alias("-1"), Ok(Polarity::Reversed));
        assert_eq!(Polarity::from_alias("OFF"), Ok(Polarity::Off));
        assert_eq!(
            Polarity::from_alias("sideways"),
            Err(ConfigError::UnknownPolarity("sideways".into())),
        );
    }

    #[test]
    fn switch_aliases_fail_closed()
    {
        assert_eq!(SwitchState::from_alias("OPEN"), Ok(SwitchState::Open));
        assert_eq!(SwitchState::from_alias("c"), Ok(SwitchState::Closed));
        assert_eq!(
            SwitchState::from_alias("ajar"),
            Err(ConfigError::UnknownSwitchState("ajar".into())),
        );
    }

    #[test]
    fn circuit_aliases()
    {
        assert_eq!(
            MeasurementCircuit::from_alias("LIVE_TO_EARTH").unwrap().token(),
            "L1-GND",
        );
        assert_eq!(
            MeasurementCircuit::from_alias("MAINS-PE").unwrap().token(),
            "INSB",
        );
        assert!(MeasurementCircuit::from_alias("BOGUS").is_err());
    }

    #[test]
    fn defaults_are_safe()
    {
        let config = TestConfig::new();
        assert_eq!(config.polarity(), Polarity::Normal);
        assert_eq!(config.earth(), SwitchState::Closed);
        assert_eq!(config.neutral(), SwitchState::Closed);
        assert_eq!(config.electrodes().lead_count(), 10);
        assert_eq!(config.circuit(), MeasurementCircuit::LiveToNeutral);
    }

    #[test]
    fn setters_reject_without_mutating()
    {
        let mut config = TestConfig::new();
        config.set_polarity("R").unwrap();
        assert!(config.set_polarity("diagonal").is_err());
        assert_eq!(config.polarity(), Polarity::Reversed);
    }
}
