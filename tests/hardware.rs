//! Smoke test against a real analyzer; run with `--ignored` and hardware
//! attached

#![cfg(feature = "serial")]

use esa620ctrl::{ Esa620, TestKind, TestOutcome };

const DEVICE_NAME: &'static str = "/dev/ttyUSB0";

#[tokio::test]
#[ignore = "requires an analyzer on the serial port"]
async fn identify_and_measure_mains()
{
    let mut device = Esa620::open(DEVICE_NAME, 115200).unwrap();

    let ident = device.ident().await.unwrap();
    println!("instrument: {}", ident);

    device
        .configure("LIVE_TO_NEUTRAL", 10, "NORMAL", "CLOSED", "CLOSED")
        .unwrap();

    let outcome = device.run(TestKind::MainsVoltage).await.unwrap();
    match outcome {
        TestOutcome::Measured(reading) => println!("mains: {}", reading),
        TestOutcome::ConversionFailed { raw } => println!("unconvertible reply: {:?}", raw),
    }

    device.enter_local().await.unwrap();
}
