use crate::GateError;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize)]
pub struct BatteryState {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub charge_stage: String,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            charge_stage: "Unknown".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct InverterState {
    pub voltage: f64,
    pub load_watts: f64,
    pub input_voltage: f64,
    pub input_amps: f64,
    pub input_watts: f64,
    pub input_hz: f64,
    pub fet_temp_f: f64,
    pub transformer_temp_f: f64,
    pub batt_temp_f: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ShuntState {
    pub amps: f64,
}

/// `current` and `watts` are part of the published schema but have no
/// decoder on this bus; they stay at zero.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PvState {
    pub voltage: f64,
    pub current: f64,
    pub watts: f64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DailyState {
    pub kwh_today: f64,
}

/// Latest decoded value per field, updated on every successful decode no
/// matter what the throttle decided. Fields persist until overwritten.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StateSnapshot {
    pub battery: BatteryState,
    pub rosie: InverterState,
    pub whizbang: ShuntState,
    pub pv: PvState,
    pub daily: DailyState,
}

#[derive(Serialize)]
struct StampedSnapshot<'a> {
    #[serde(flatten)]
    state: &'a StateSnapshot,
    timestamp: String,
}

impl StateSnapshot {
    /// Serialize with the emission timestamp appended, RFC 3339 UTC.
    pub fn to_json(&self, now: OffsetDateTime) -> Result<String, GateError> {
        let timestamp = now.format(&Rfc3339)?;
        Ok(serde_json::to_string(&StampedSnapshot {
            state: self,
            timestamp,
        })?)
    }
}
