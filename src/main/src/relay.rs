use anyhow::Result;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use log::*;

use control::Level;

/// The four relays wired to the inverter's throttle input, relay 0 is bit 0.
pub struct RelayBank<'d> {
    relays: [PinDriver<'d, AnyOutputPin, Output>; 4],
}

impl<'d> RelayBank<'d> {
    pub fn new(pins: [AnyOutputPin; 4]) -> Result<Self> {
        let [pin0, pin1, pin2, pin3] = pins;
        let mut relays = [
            PinDriver::output(pin0)?,
            PinDriver::output(pin1)?,
            PinDriver::output(pin2)?,
            PinDriver::output(pin3)?,
        ];
        // Level 0 until the controller says otherwise
        for relay in relays.iter_mut() {
            relay.set_low()?;
        }
        Ok(RelayBank { relays })
    }

    pub fn apply(&mut self, level: Level) -> Result<()> {
        for (relay, bit) in self.relays.iter_mut().zip(level.bits()) {
            if bit {
                relay.set_high()?;
            } else {
                relay.set_low()?;
            }
        }
        info!("Relays set to level {} ({:?})", level, level.bits());
        Ok(())
    }
}
