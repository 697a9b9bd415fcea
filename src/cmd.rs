//! Device command definition and wire serialization

use std::fmt;
use crate::{
    config::{ Electrode, MeasurementCircuit, Polarity, SwitchState },
};

/// A measurement function of the analyzer, selected by a bare mode token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode
{
    /// Enclosure (chassis) leakage: `ENCL`
    Enclosure,
    /// Patient lead leakage: `PAT`
    Patient,
    /// Mains-on-applied-parts leakage: `MAP`
    AppliedParts,
    /// Patient auxiliary current: `AUX`
    Auxiliary,
    /// Earth leakage: `EARTHL`
    EarthLeakage,
    /// Insulation resistance: `MINS`
    Insulation,
    /// Equipment mains current draw: `EQCURR`
    EquipmentCurrent,
}

/// How the applied-part terminals are routed for one sub-trial
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApRouting
{
    /// Every applied-part terminal left open: `AP=//OPEN`
    AllOpen,
    /// One lead driven, return path configured separately: `AP=<e>//`
    Source(Electrode),
    /// One lead driven against an inline return group: `AP=<e>/<grp>/`
    SourceToGroup(Electrode, Vec<Electrode>),
}

/// One logical instruction to the analyzer
///
/// Serialization mirrors what the instrument expects on the wire, one command
/// per line. The executor appends the carriage-return terminator; the encoder
/// performs no semantic validation (that is [`config`](crate::config)'s job).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command
{
    /// Take over the front panel: `REMOTE`
    Remote,
    /// Return the front panel to the operator: `LOCAL`
    Local,
    /// Query the identity string: `IDENT`
    Ident,
    /// Take a one-shot reading of the active function: `READ`
    Read,
    /// Start an asynchronous metered reading: `MREAD`
    ///
    /// The reply is not immediate; the device answers with the busy marker
    /// until the reading settles.
    MeterRead,
    /// Measurement repeat interval in seconds: `RPTIME=<n>`
    ReportTime(u32),
    /// Disable the compliance-standard limit tables: `STD=NONE`
    StandardNone,
    /// Select a measurement function
    Mode(OperatingMode),
    /// Receptacle polarity: `POL=<N|R|OFF>`
    Polarity(Polarity),
    /// Earth relay: `EARTH=<O|C>`
    Earth(SwitchState),
    /// Neutral relay: `NEUT=<O|C>`
    Neutral(SwitchState),
    /// Combined AC+DC metering: `MODE=ACDC`
    MeterAcDc,
    /// Disable the secondary meter: `MDUAL=OFF`
    DualMeterOff,
    /// Applied-part terminal routing
    AppliedParts(ApRouting),
    /// Return-path electrode group: `GRP=<e1,e2,...>`
    GroundGroup(Vec<Electrode>),
    /// Low current range for mains-on-applied-parts: `MAP=LOW`
    MapRangeLow,
    /// Normal mains-on-applied-parts drive: `MAP=NORM`
    MapNormal,
    /// Low-current earth resistance range: `ERES=LOW`
    EarthResistanceLow,
    /// Kelvin wiring selection for resistance tests: `RWIRE=<n>`
    WireMode(u32),
    /// Circuit selector for a mains voltage measurement: `MAINS=<circuit>`
    Mains(MeasurementCircuit),
    /// Bare circuit selector, used by the insulation test: e.g. `INSB`
    Circuit(MeasurementCircuit),
    /// High insulation test voltage: `INS=HIGH`
    InsulationHigh,
}

fn write_group(f: &mut fmt::Formatter<'_>, group: &[Electrode]) -> fmt::Result
{
    for (index, electrode) in group.iter().enumerate() {
        if index > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", electrode)?;
    }

    Ok(())
}

impl fmt::Display for Command
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Self::Remote => f.write_str("REMOTE"),
            Self::Local => f.write_str("LOCAL"),
            Self::Ident => f.write_str("IDENT"),
            Self::Read => f.write_str("READ"),
            Self::MeterRead => f.write_str("MREAD"),
            Self::ReportTime(seconds) => write!(f, "RPTIME={}", seconds),
            Self::StandardNone => f.write_str("STD=NONE"),
            Self::Mode(mode) => match mode {
                OperatingMode::Enclosure => f.write_str("ENCL"),
                OperatingMode::Patient => f.write_str("PAT"),
                OperatingMode::AppliedParts => f.write_str("MAP"),
                OperatingMode::Auxiliary => f.write_str("AUX"),
                OperatingMode::EarthLeakage => f.write_str("EARTHL"),
                OperatingMode::Insulation => f.write_str("MINS"),
                OperatingMode::EquipmentCurrent => f.write_str("EQCURR"),
            },
            Self::Polarity(polarity) => write!(f, "POL={}", polarity),
            Self::Earth(state) => write!(f, "EARTH={}", state),
            Self::Neutral(state) => write!(f, "NEUT={}", state),
            Self::MeterAcDc => f.write_str("MODE=ACDC"),
            Self::DualMeterOff => f.write_str("MDUAL=OFF"),
            Self::AppliedParts(routing) => match routing {
                ApRouting::AllOpen => f.write_str("AP=//OPEN"),
                ApRouting::Source(electrode) => write!(f, "AP={}//", electrode),
                ApRouting::SourceToGroup(electrode, group) => {
                    write!(f, "AP={}/", electrode)?;
                    write_group(f, group)?;
                    f.write_str("/")
                },
            },
            Self::GroundGroup(group) => {
                f.write_str("GRP=")?;
                write_group(f, group)
            },
            Self::MapRangeLow => f.write_str("MAP=LOW"),
            Self::MapNormal => f.write_str("MAP=NORM"),
            Self::EarthResistanceLow => f.write_str("ERES=LOW"),
            Self::WireMode(wires) => write!(f, "RWIRE={}", wires),
            Self::Mains(circuit) => write!(f, "MAINS={}", circuit),
            Self::Circuit(circuit) => write!(f, "{}", circuit),
            Self::InsulationHigh => f.write_str("INS=HIGH"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::{ ApRouting, Command, OperatingMode };
    use crate::config::{ Electrode, ElectrodeSet, MeasurementCircuit, Polarity, SwitchState };

    #[test]
    fn serialize_bare_tokens()
    {
        assert_eq!(&format!("{}", Command::Remote), "REMOTE");
        assert_eq!(&format!("{}", Command::Local), "LOCAL");
        assert_eq!(&format!("{}", Command::Ident), "IDENT");
        assert_eq!(&format!("{}", Command::Read), "READ");
        assert_eq!(&format!("{}", Command::MeterRead), "MREAD");
        assert_eq!(&format!("{}", Command::StandardNone), "STD=NONE");
        assert_eq!(&format!("{}", Command::MeterAcDc), "MODE=ACDC");
        assert_eq!(&format!("{}", Command::DualMeterOff), "MDUAL=OFF");
        assert_eq!(&format!("{}", Command::MapRangeLow), "MAP=LOW");
        assert_eq!(&format!("{}", Command::MapNormal), "MAP=NORM");
        assert_eq!(&format!("{}", Command::EarthResistanceLow), "ERES=LOW");
        assert_eq!(&format!("{}", Command::InsulationHigh), "INS=HIGH");
    }

    #[test]
    fn serialize_modes()
    {
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::Enclosure)), "ENCL");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::Patient)), "PAT");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::AppliedParts)), "MAP");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::Auxiliary)), "AUX");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::EarthLeakage)), "EARTHL");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::Insulation)), "MINS");
        assert_eq!(&format!("{}", Command::Mode(OperatingMode::EquipmentCurrent)), "EQCURR");
    }

    #[test]
    fn serialize_parameterized()
    {
        assert_eq!(&format!("{}", Command::ReportTime(2)), "RPTIME=2");
        assert_eq!(&format!("{}", Command::Polarity(Polarity::Normal)), "POL=N");
        assert_eq!(&format!("{}", Command::Polarity(Polarity::Off)), "POL=OFF");
        assert_eq!(&format!("{}", Command::Earth(SwitchState::Closed)), "EARTH=C");
        assert_eq!(&format!("{}", Command::Neutral(SwitchState::Open)), "NEUT=O");
        assert_eq!(&format!("{}", Command::WireMode(2)), "RWIRE=2");
        assert_eq!(
            &format!("{}", Command::Mains(MeasurementCircuit::LiveToNeutral)),
            "MAINS=L1-L2",
        );
        assert_eq!(
            &format!("{}", Command::Circuit(MeasurementCircuit::MainsToProtectiveEarth)),
            "INSB",
        );
    }

    #[test]
    fn serialize_applied_part_routing()
    {
        assert_eq!(&format!("{}", Command::AppliedParts(ApRouting::AllOpen)), "AP=//OPEN");
        assert_eq!(
            &format!("{}", Command::AppliedParts(ApRouting::Source(Electrode::RA))),
            "AP=RA//",
        );

        let three = ElectrodeSet::with_lead_count(3).unwrap();
        assert_eq!(
            &format!(
                "{}",
                Command::AppliedParts(ApRouting::SourceToGroup(
                    Electrode::LL,
                    three.ground_group(Electrode::LL),
                ))
            ),
            "AP=LL/RA,LA/",
        );
    }

    #[test]
    fn serialize_ground_group()
    {
        let three = ElectrodeSet::with_lead_count(3).unwrap();
        assert_eq!(
            &format!("{}", Command::GroundGroup(three.ground_group(Electrode::RA))),
            "GRP=LL,LA",
        );

        let ten = ElectrodeSet::with_lead_count(10).unwrap();
        assert_eq!(
            &format!("{}", Command::GroundGroup(ten.ground_group(Electrode::V3))),
            "GRP=RA,LL,LA,RL,V1,V2,V4,V5,V6",
        );
    }
}
