#![no_std]

extern crate alloc;

mod clock;
mod config;
mod error;
pub mod homeassistant;
mod level;
mod snapshot;
mod state;
mod throttle;

pub use clock::{parse_current_time, should_announce};
pub use config::CoreConfig;
pub use error::DecodeError;
pub use level::Level;
pub use snapshot::{decode, PowerSnapshot, PowerSource, TelemetryMessage};
pub use state::{ControlState, Controller, Event, LevelChanged};
pub use throttle::{fraction, THROTTLE_TABLE};

/// Power the site wants to absorb locally, in kW.
pub fn target_load(config: &CoreConfig, snapshot: &PowerSnapshot) -> f32 {
    if snapshot.battery_level < 100.0 {
        // Give the battery full charge headroom so it is fed before we export
        return snapshot.house_power_kw + config.max_battery_charge_kw;
    }

    if snapshot.battery_power_kw <= 0.0 {
        snapshot.house_power_kw
    } else {
        // A full battery that is exporting can't be curtailed from here, absorb it as load
        snapshot.house_power_kw + snapshot.battery_power_kw
    }
}

/// Solar output that would be available at level 0, in kW.
pub fn possible_solar(config: &CoreConfig, snapshot: &PowerSnapshot, current: Level) -> f32 {
    let current_fraction = fraction(current);
    if current_fraction == 0.0 {
        return config.min_possible_solar_kw;
    }

    let possible = snapshot.solar_power_kw / current_fraction;
    if possible <= 0.0 {
        // Nothing measurable, the large desired fraction keeps us at full output
        return config.min_possible_solar_kw;
    }
    possible
}

/// Picks the first level above 0 whose throttle fraction is strictly greater
/// than the desired production fraction, or level 0 when none is.
pub fn select_level(desired_fraction: f32) -> Level {
    Level::all()
        .skip(1)
        .find(|level| fraction(*level) > desired_fraction)
        .unwrap_or(Level::MAX_OUTPUT)
}

pub fn plan_with(config: &CoreConfig, snapshot: &PowerSnapshot, current: Level) -> Level {
    let load = target_load(config, snapshot);
    let possible = possible_solar(config, snapshot, current);

    select_level(load / possible)
}

pub fn plan(snapshot: &PowerSnapshot, current: Level) -> Level {
    plan_with(&CoreConfig::default(), snapshot, current)
}
