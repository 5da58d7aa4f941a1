use crate::Level;

// Fraction of full solar output the inverter allows at each level.
// Calibrated against the inverter's relay input, do not interpolate.
// Must never increase with the level index.
pub static THROTTLE_TABLE: [f32; Level::COUNT] = [
    1.00, 0.94, 0.88, 0.82, 0.76, 0.70, 0.64, 0.57, 0.49, 0.40, 0.34, 0.28, 0.22, 0.17, 0.13, 0.10,
];

pub fn fraction(level: Level) -> f32 {
    THROTTLE_TABLE[level.index()]
}
