#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CoreConfig {
    // Charge headroom reserved for the battery while it is below 100%
    pub max_battery_charge_kw: f32,

    // Stand-in for the possible solar output when none can be measured
    pub min_possible_solar_kw: f32,
}

impl CoreConfig {
    pub const MAX_BATTERY_CHARGE_KW: f32 = 5.0;
    pub const MIN_POSSIBLE_SOLAR_KW: f32 = 0.1;
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            max_battery_charge_kw: Self::MAX_BATTERY_CHARGE_KW,
            min_possible_solar_kw: Self::MIN_POSSIBLE_SOLAR_KW,
        }
    }
}
