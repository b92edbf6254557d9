use crate::decode;
use crate::{DecodeParams, Reading};
use can_link::BusFrame;

// Registers of interest (bits 18..29 of the 29-bit identifier). The bus
// carries many more; everything not listed here is dropped.
pub const REG_PV_INPUT: u16 = 0x081;
pub const REG_DAILY_ENERGY: u16 = 0x022;
pub const REG_SHUNT_AMPS: u16 = 0x2A3;
pub const REG_BATTERY: u16 = 0x0A0;
pub const REG_CHARGE_STAGE: u16 = 0x0A3;
pub const REG_INVERTER_TEMPS_A: u16 = 0x331;
pub const REG_INVERTER_TEMPS_B: u16 = 0x261;
pub const REG_BATTERY_TEMP: u16 = 0x2A4;
pub const REG_AC_LINE_VOLTAGE: u16 = 0x040;
pub const REG_AC_LOAD_WATTS: u16 = 0x041;
pub const REG_AC_INPUT_VAF: u16 = 0x101;
pub const REG_AC_INPUT_WATTS: u16 = 0x102;

/// One routing entry. The decoder runs only when the frame carries at
/// least `min_len` payload bytes; truncated and heartbeat frames fall
/// through without ever indexing past the available bytes.
pub struct RegisterRule {
    pub register: u16,
    pub min_len: usize,
    pub decode: fn(&[u8], &DecodeParams) -> Vec<Reading>,
}

pub const RULES: &[RegisterRule] = &[
    RegisterRule {
        register: REG_PV_INPUT,
        min_len: 2,
        decode: decode::pv_input,
    },
    RegisterRule {
        register: REG_DAILY_ENERGY,
        min_len: 4,
        decode: decode::daily_energy,
    },
    RegisterRule {
        register: REG_SHUNT_AMPS,
        min_len: 4,
        decode: decode::shunt_amps,
    },
    RegisterRule {
        register: REG_BATTERY,
        min_len: 8,
        decode: decode::battery,
    },
    RegisterRule {
        register: REG_CHARGE_STAGE,
        min_len: 1,
        decode: decode::charge_stage,
    },
    RegisterRule {
        register: REG_INVERTER_TEMPS_A,
        min_len: 4,
        decode: decode::inverter_temps,
    },
    RegisterRule {
        register: REG_INVERTER_TEMPS_B,
        min_len: 4,
        decode: decode::inverter_temps,
    },
    RegisterRule {
        register: REG_BATTERY_TEMP,
        min_len: 4,
        decode: decode::battery_temp,
    },
    RegisterRule {
        register: REG_AC_LINE_VOLTAGE,
        min_len: 2,
        decode: decode::ac_line_voltage,
    },
    RegisterRule {
        register: REG_AC_LOAD_WATTS,
        min_len: 4,
        decode: decode::ac_load_watts,
    },
    RegisterRule {
        register: REG_AC_INPUT_VAF,
        min_len: 6,
        decode: decode::ac_input,
    },
    RegisterRule {
        register: REG_AC_INPUT_WATTS,
        min_len: 4,
        decode: decode::ac_input_watts,
    },
];

/// Route one frame to its decoder. Unknown registers and short frames
/// yield no readings; neither is an error on a shared bus.
pub fn decode_frame(frame: &BusFrame, params: &DecodeParams) -> Vec<Reading> {
    let register = frame.register();
    for rule in RULES {
        if rule.register != register {
            continue;
        }
        if frame.payload().len() < rule.min_len {
            return Vec::new();
        }
        return (rule.decode)(frame.payload(), params);
    }
    Vec::new()
}
