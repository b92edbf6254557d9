//! Per-register decoders. Each runs behind the router's length guard, so
//! fixed-offset indexing below is safe by construction.

use crate::{DecodeParams, Reading};

pub(crate) fn pv_input(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    let volts = round1(f64::from(be_u16(data, 0)) / 10.0);
    if volts > 20.0 {
        vec![Reading::PvVoltage(volts)]
    } else {
        // Below 20 V the controller reports bogus sweep values.
        Vec::new()
    }
}

pub(crate) fn daily_energy(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    let kwh = round2(f64::from(be_u32(data, 0)) / 100.0);
    if kwh > 0.1 {
        vec![Reading::DailyEnergyKwh(kwh)]
    } else {
        Vec::new()
    }
}

pub(crate) fn shunt_amps(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    vec![Reading::ShuntAmps(f64::from(be_i16(data, 2)) / 10.0)]
}

pub(crate) fn battery(data: &[u8], params: &DecodeParams) -> Vec<Reading> {
    let voltage = f64::from(be_u16(data, 0)) / 10.0;
    if voltage < params.battery_voltage_floor {
        return Vec::new();
    }
    vec![Reading::Battery {
        voltage,
        current: f64::from(be_i16(data, 2)) / 10.0,
        power: f64::from(be_u32(data, 4)) / 100.0,
    }]
}

pub(crate) fn charge_stage(data: &[u8], params: &DecodeParams) -> Vec<Reading> {
    let code = if params.stage_low_nibble {
        data[0] & 0x0F
    } else {
        data[0]
    };
    vec![Reading::ChargeStageCode(code)]
}

pub(crate) fn inverter_temps(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    let fet_f = fahrenheit(be_i16(data, 0));
    let transformer_f = fahrenheit(be_i16(data, 2));
    if fet_f > 0.0 {
        vec![Reading::InverterTemps {
            fet_f,
            transformer_f,
        }]
    } else {
        Vec::new()
    }
}

pub(crate) fn battery_temp(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    let temp_f = fahrenheit(be_i16(data, 2));
    if temp_f > 0.0 {
        vec![Reading::BatteryTempF(temp_f)]
    } else {
        Vec::new()
    }
}

pub(crate) fn ac_line_voltage(data: &[u8], params: &DecodeParams) -> Vec<Reading> {
    let volts = f64::from(be_i16(data, 0)) / 10.0;
    if volts >= params.ac_line_min && volts <= params.ac_line_max {
        vec![Reading::AcLineVoltage(volts)]
    } else {
        Vec::new()
    }
}

pub(crate) fn ac_load_watts(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    vec![Reading::AcLoadWatts(f64::from(be_i32(data, 0)) / 100.0)]
}

pub(crate) fn ac_input(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    vec![Reading::AcInput {
        voltage: f64::from(be_i16(data, 0)) / 10.0,
        amps: f64::from(be_i16(data, 2)) / 10.0,
        hertz: round2(f64::from(be_i16(data, 4)) / 100.0),
    }]
}

pub(crate) fn ac_input_watts(data: &[u8], _params: &DecodeParams) -> Vec<Reading> {
    vec![Reading::AcInputWatts(round1(
        f64::from(be_i32(data, 0)) / 100.0,
    ))]
}

fn be_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn be_i16(data: &[u8], at: usize) -> i16 {
    i16::from_be_bytes([data[at], data[at + 1]])
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn be_i32(data: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn fahrenheit(tenths_celsius: i16) -> f64 {
    round1(f64::from(tenths_celsius) / 10.0 * 9.0 / 5.0 + 32.0)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
