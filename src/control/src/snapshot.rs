use alloc::string::String;
use alloc::vec::Vec;
use serde::Deserialize;
use serde_json::Value;

use crate::DecodeError;

/// The most recently accepted power-flow reading, normalised to kilowatts.
///
/// Power fields the telemetry omits stay at 0.0.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct PowerSnapshot {
    pub import_price: f32,
    pub export_price: f32,
    // Percent, 0 to 100
    pub battery_level: f32,
    pub grid_power_kw: f32,
    pub house_power_kw: f32,
    pub solar_power_kw: f32,
    pub battery_power_kw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PowerSource {
    House,
    Solar,
    Battery,
    Grid,
}

// Prices and battery level are optional and tolerated when not numeric
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    import_price: Option<Value>,
    export_price: Option<Value>,
    battery_level: Option<Value>,
    power_values: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PowerValue {
    name: PowerSource,
    units: String,
    value: f32,
}

impl PowerValue {
    fn kilowatts(&self) -> f32 {
        if self.units == "kW" {
            self.value
        } else {
            // Anything that isn't kW is taken to be watts
            self.value / 1000.0
        }
    }
}

// Numbers that don't fit an f32 are tolerated like non-numeric ones
fn number(value: Option<&Value>) -> f32 {
    value
        .and_then(Value::as_f64)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

impl TelemetryMessage {
    pub fn from_slice(raw: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(raw).map_err(|_| DecodeError::MalformedMessage)
    }
}

impl TryFrom<TelemetryMessage> for PowerSnapshot {
    type Error = DecodeError;

    fn try_from(message: TelemetryMessage) -> Result<Self, Self::Error> {
        let mut snapshot = PowerSnapshot {
            import_price: number(message.import_price.as_ref()),
            export_price: number(message.export_price.as_ref()),
            battery_level: number(message.battery_level.as_ref()),
            ..PowerSnapshot::default()
        };

        for (index, entry) in message.power_values.into_iter().enumerate() {
            let power = PowerValue::deserialize(entry).map_err(|_| DecodeError::InvalidEntry(index))?;
            if !power.value.is_finite() {
                return Err(DecodeError::InvalidEntry(index));
            }
            let kilowatts = power.kilowatts();
            let field = match power.name {
                PowerSource::House => &mut snapshot.house_power_kw,
                PowerSource::Solar => &mut snapshot.solar_power_kw,
                PowerSource::Battery => &mut snapshot.battery_power_kw,
                PowerSource::Grid => &mut snapshot.grid_power_kw,
            };
            *field = kilowatts;
        }

        Ok(snapshot)
    }
}

/// Decodes a telemetry message into a fresh snapshot.
///
/// Any bad entry rejects the whole message, callers keep their previous
/// snapshot in that case.
pub fn decode(raw: &[u8]) -> Result<PowerSnapshot, DecodeError> {
    PowerSnapshot::try_from(TelemetryMessage::from_slice(raw)?)
}
