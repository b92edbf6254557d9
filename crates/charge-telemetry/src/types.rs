/// Typed metric updates produced by one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Reading {
    PvVoltage(f64),
    DailyEnergyKwh(f64),
    /// Current-sensor amps, raw and sensitive: never filtered.
    ShuntAmps(f64),
    Battery {
        voltage: f64,
        current: f64,
        power: f64,
    },
    /// Raw stage code; debounced downstream before it becomes a name.
    ChargeStageCode(u8),
    InverterTemps {
        fet_f: f64,
        transformer_f: f64,
    },
    BatteryTempF(f64),
    AcLineVoltage(f64),
    AcLoadWatts(f64),
    AcInput {
        voltage: f64,
        amps: f64,
        hertz: f64,
    },
    AcInputWatts(f64),
}

/// Guards that differed between historical deployments of this bridge,
/// resolved by configuration instead of a hard-coded choice.
#[derive(Clone, Debug)]
pub struct DecodeParams {
    /// Battery frames below this pack voltage are dropped as heartbeats.
    /// 0.0 accepts every battery frame.
    pub battery_voltage_floor: f64,
    /// Plausible AC line voltage band; readings outside it are dropped.
    pub ac_line_min: f64,
    pub ac_line_max: f64,
    /// Mask the stage byte to its low nibble before lookup.
    pub stage_low_nibble: bool,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            battery_voltage_floor: 0.0,
            ac_line_min: 90.0,
            ac_line_max: 150.0,
            stage_low_nibble: false,
        }
    }
}

pub const RESTING_STAGE: &str = "Resting";

/// Charge stage names as reported on the bus.
pub fn stage_name(code: u8) -> String {
    match code {
        0 => RESTING_STAGE.to_string(),
        1 => "Bulk MPPT".to_string(),
        2 => "Absorb".to_string(),
        3 => "Float".to_string(),
        4 => "Equalize".to_string(),
        5 => "Float MPPT".to_string(),
        6 => "EQ MPPT".to_string(),
        other => format!("Unknown({other})"),
    }
}

/// Stages during which the controller is actively producing power.
pub fn is_producing_stage(stage: &str) -> bool {
    matches!(stage, "Bulk MPPT" | "Absorb" | "Float" | "Float MPPT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_table_covers_known_codes() {
        assert_eq!(stage_name(0), "Resting");
        assert_eq!(stage_name(1), "Bulk MPPT");
        assert_eq!(stage_name(6), "EQ MPPT");
        assert_eq!(stage_name(9), "Unknown(9)");
    }

    #[test]
    fn producing_stages_exclude_resting_and_equalize() {
        assert!(is_producing_stage("Bulk MPPT"));
        assert!(is_producing_stage("Float MPPT"));
        assert!(!is_producing_stage("Resting"));
        assert!(!is_producing_stage("Equalize"));
        assert!(!is_producing_stage("Unknown(9)"));
    }
}
