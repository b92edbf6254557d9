use crate::{
    DeltaForce, GateConfig, GateError, MetricValue, Publication, StageDebounce, StateSnapshot,
    ThrottleGate, ZeroDropout,
};
use can_link::BusFrame;
use charge_telemetry::{decode_frame, is_producing_stage, DecodeParams, Reading};
use time::OffsetDateTime;
use tracing::trace;

/// The decode→filter→throttle pipeline with all of its state in one
/// place. Time is injected by the caller; the engine never reads a clock,
/// so synthetic sequences with controlled timestamps behave exactly like
/// live traffic.
pub struct BridgeEngine {
    params: DecodeParams,
    cfg: GateConfig,
    throttle: ThrottleGate,
    dropout: ZeroDropout,
    battery_force: DeltaForce,
    load_force: DeltaForce,
    input_force: DeltaForce,
    debounce: StageDebounce,
    snapshot: StateSnapshot,
    last_snapshot_at: Option<OffsetDateTime>,
}

impl BridgeEngine {
    pub fn new(params: DecodeParams, cfg: GateConfig) -> Self {
        Self {
            params,
            cfg,
            throttle: ThrottleGate::new(),
            dropout: ZeroDropout::new(),
            battery_force: DeltaForce::new(),
            load_force: DeltaForce::new(),
            input_force: DeltaForce::new(),
            debounce: StageDebounce::new(),
            snapshot: StateSnapshot::default(),
            last_snapshot_at: None,
        }
    }

    /// Route one frame and return every publish it produced.
    pub fn handle_frame(&mut self, frame: &BusFrame, now: OffsetDateTime) -> Vec<Publication> {
        let mut out = Vec::new();
        for reading in decode_frame(frame, &self.params) {
            self.apply(reading, now, &mut out);
        }
        out
    }

    /// Emit the consolidated snapshot when its interval has elapsed. Call
    /// once per loop tick regardless of bus traffic; the first call emits
    /// immediately.
    pub fn tick(&mut self, now: OffsetDateTime) -> Result<Option<Publication>, GateError> {
        let due = match self.last_snapshot_at {
            None => true,
            Some(at) => now - at >= self.cfg.snapshot_interval,
        };
        if !due {
            return Ok(None);
        }
        let payload = self.snapshot.to_json(now)?;
        self.last_snapshot_at = Some(now);
        Ok(Some(Publication {
            topic: "state".to_string(),
            payload,
            retain: true,
        }))
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    fn apply(&mut self, reading: Reading, now: OffsetDateTime, out: &mut Vec<Publication>) {
        match reading {
            Reading::PvVoltage(volts) => {
                self.snapshot.pv.voltage = volts;
                self.throttled(out, "pv/voltage", volts, self.cfg.thresholds.pv_voltage, now);
            }
            Reading::DailyEnergyKwh(kwh) => {
                self.snapshot.daily.kwh_today = kwh;
                self.throttled(out, "daily/kwh_today", kwh, self.cfg.thresholds.daily_kwh, now);
            }
            Reading::ShuntAmps(amps) => {
                self.snapshot.whizbang.amps = amps;
                self.throttled(out, "whizbang/amps", amps, self.cfg.thresholds.shunt_amps, now);
            }
            Reading::Battery {
                voltage,
                current,
                power,
            } => {
                let producing = is_producing_stage(&self.snapshot.battery.charge_stage);
                let power = self.dropout.filter(
                    power,
                    producing,
                    self.cfg.producing_floor,
                    self.cfg.max_zero_drops,
                );
                self.snapshot.battery.voltage = voltage;
                self.snapshot.battery.current = current;
                self.snapshot.battery.power = power;
                if self.battery_force.check(
                    power,
                    self.cfg.force_threshold,
                    self.cfg.force_interval,
                    now,
                ) {
                    self.dropout.note_published(power);
                    out.push(Publication {
                        topic: "battery/power".to_string(),
                        payload: MetricValue::Numeric(round1(power)).render(),
                        retain: true,
                    });
                }
                self.throttled(
                    out,
                    "battery/voltage",
                    voltage,
                    self.cfg.thresholds.battery_voltage,
                    now,
                );
                self.throttled(
                    out,
                    "battery/current",
                    current,
                    self.cfg.thresholds.battery_current,
                    now,
                );
            }
            Reading::ChargeStageCode(code) => {
                if let Some(stage) = self.debounce.observe(code, self.cfg.resting_debounce) {
                    self.snapshot.battery.charge_stage = stage.clone();
                    let value = MetricValue::Text(stage);
                    if self.throttle.admit(
                        "battery/charge_stage",
                        &value,
                        0.0,
                        self.cfg.min_interval,
                        now,
                    ) {
                        out.push(Publication {
                            topic: "battery/charge_stage".to_string(),
                            payload: value.render(),
                            retain: true,
                        });
                    }
                }
            }
            Reading::InverterTemps {
                fet_f,
                transformer_f,
            } => {
                self.snapshot.rosie.fet_temp_f = fet_f;
                self.snapshot.rosie.transformer_temp_f = transformer_f;
                let threshold = self.cfg.thresholds.temperature;
                self.throttled(out, "rosie/fet_temp", fet_f, threshold, now);
                self.throttled(out, "rosie/transformer_temp", transformer_f, threshold, now);
            }
            Reading::BatteryTempF(temp_f) => {
                self.snapshot.rosie.batt_temp_f = temp_f;
                self.throttled(
                    out,
                    "rosie/batt_temp",
                    temp_f,
                    self.cfg.thresholds.temperature,
                    now,
                );
            }
            Reading::AcLineVoltage(volts) => {
                self.snapshot.rosie.voltage = volts;
                self.throttled(
                    out,
                    "rosie/voltage",
                    volts,
                    self.cfg.thresholds.ac_line_voltage,
                    now,
                );
            }
            Reading::AcLoadWatts(watts) => {
                self.snapshot.rosie.load_watts = watts;
                if self.load_force.check(
                    watts,
                    self.cfg.force_threshold,
                    self.cfg.force_interval,
                    now,
                ) {
                    out.push(Publication {
                        topic: "rosie/load_watts".to_string(),
                        payload: MetricValue::Numeric(watts).render(),
                        retain: true,
                    });
                }
            }
            Reading::AcInput {
                voltage,
                amps,
                hertz,
            } => {
                self.snapshot.rosie.input_voltage = voltage;
                self.snapshot.rosie.input_amps = amps;
                self.snapshot.rosie.input_hz = hertz;
                self.throttled(
                    out,
                    "rosie/input_voltage",
                    voltage,
                    self.cfg.thresholds.ac_input_voltage,
                    now,
                );
                self.throttled(
                    out,
                    "rosie/input_amps",
                    amps,
                    self.cfg.thresholds.ac_input_amps,
                    now,
                );
                self.throttled(
                    out,
                    "rosie/input_hz",
                    hertz,
                    self.cfg.thresholds.ac_input_hz,
                    now,
                );
            }
            Reading::AcInputWatts(watts) => {
                self.snapshot.rosie.input_watts = watts;
                if self.input_force.check(
                    watts,
                    self.cfg.force_threshold,
                    self.cfg.force_interval,
                    now,
                ) {
                    out.push(Publication {
                        topic: "rosie/input_watts".to_string(),
                        payload: MetricValue::Numeric(watts).render(),
                        retain: true,
                    });
                }
            }
        }
    }

    fn throttled(
        &mut self,
        out: &mut Vec<Publication>,
        topic: &str,
        value: f64,
        threshold: f64,
        now: OffsetDateTime,
    ) {
        let value = MetricValue::Numeric(value);
        if self
            .throttle
            .admit(topic, &value, threshold, self.cfg.min_interval, now)
        {
            out.push(Publication {
                topic: topic.to_string(),
                payload: value.render(),
                retain: true,
            });
        } else {
            trace!(topic, "throttled");
        }
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use charge_telemetry::{
        REG_BATTERY, REG_CHARGE_STAGE, REG_PV_INPUT,
    };
    use time::Duration;

    fn engine() -> BridgeEngine {
        BridgeEngine::new(DecodeParams::default(), GateConfig::default())
    }

    fn frame(register: u16, data: &[u8]) -> BusFrame {
        BusFrame::for_register(register, data).unwrap()
    }

    fn battery_frame(power: f64) -> BusFrame {
        // 51.2 V, 10.0 A, power in hundredths.
        let p = ((power * 100.0) as u32).to_be_bytes();
        frame(
            REG_BATTERY,
            &[0x02, 0x00, 0x00, 0x64, p[0], p[1], p[2], p[3]],
        )
    }

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn topics(publications: &[Publication]) -> Vec<&str> {
        publications.iter().map(|p| p.topic.as_str()).collect()
    }

    fn payload_for<'a>(publications: &'a [Publication], topic: &str) -> Option<&'a str> {
        publications
            .iter()
            .find(|p| p.topic == topic)
            .map(|p| p.payload.as_str())
    }

    #[test]
    fn pv_frame_end_to_end() {
        let mut engine = engine();
        // 20.0 V fails the plausibility guard; nothing publishes.
        assert!(engine
            .handle_frame(&frame(REG_PV_INPUT, &[0x00, 0xC8]), t0())
            .is_empty());
        // 20.1 V is accepted and published.
        let out = engine.handle_frame(&frame(REG_PV_INPUT, &[0x00, 0xC9]), t0());
        assert_eq!(payload_for(&out, "pv/voltage"), Some("20.1"));
        assert_eq!(engine.snapshot().pv.voltage, 20.1);
    }

    #[test]
    fn battery_frame_publishes_power_voltage_current() {
        let mut engine = engine();
        let out = engine.handle_frame(&battery_frame(500.0), t0());
        assert_eq!(
            topics(&out),
            vec!["battery/power", "battery/voltage", "battery/current"]
        );
        assert_eq!(payload_for(&out, "battery/power"), Some("500"));
        assert_eq!(payload_for(&out, "battery/voltage"), Some("51.2"));
        assert_eq!(payload_for(&out, "battery/current"), Some("10"));
    }

    #[test]
    fn zero_dropout_hides_the_sweep_then_lets_a_real_shutdown_through() {
        let mut engine = engine();
        // Enter a producing stage, then establish 500 W.
        engine.handle_frame(&frame(REG_CHARGE_STAGE, &[0x01]), t0());
        engine.handle_frame(&battery_frame(500.0), t0());

        // Fifteen consecutive zeros: substituted, so power never moves and
        // nothing force-publishes. The snapshot keeps saying 500.
        for i in 1..=15 {
            let now = t0() + Duration::seconds(i);
            let out = engine.handle_frame(&battery_frame(0.0), now);
            assert_eq!(payload_for(&out, "battery/power"), None, "zero #{i}");
            assert_eq!(engine.snapshot().battery.power, 500.0);
        }

        // The sixteenth zero is a real shutdown: published as 0.
        let out = engine.handle_frame(&battery_frame(0.0), t0() + Duration::seconds(16));
        assert_eq!(payload_for(&out, "battery/power"), Some("0"));
        assert_eq!(engine.snapshot().battery.power, 0.0);
    }

    #[test]
    fn stage_debounce_flips_to_resting_and_publishes_once() {
        let mut engine = engine();
        let out = engine.handle_frame(&frame(REG_CHARGE_STAGE, &[0x01]), t0());
        assert_eq!(payload_for(&out, "battery/charge_stage"), Some("Bulk MPPT"));

        // Nine zero codes: stage holds.
        for i in 1..=9 {
            let now = t0() + Duration::seconds(i / 4);
            let out = engine.handle_frame(&frame(REG_CHARGE_STAGE, &[0x00]), now);
            assert!(out.is_empty(), "zero #{i}");
            assert_eq!(engine.snapshot().battery.charge_stage, "Bulk MPPT");
        }

        // The tenth flips the stage and publishes exactly once.
        let out = engine.handle_frame(&frame(REG_CHARGE_STAGE, &[0x00]), t0() + Duration::seconds(3));
        assert_eq!(payload_for(&out, "battery/charge_stage"), Some("Resting"));
        assert_eq!(engine.snapshot().battery.charge_stage, "Resting");

        // Further zeros keep reporting Resting but the throttle holds it.
        let out = engine.handle_frame(&frame(REG_CHARGE_STAGE, &[0x00]), t0() + Duration::seconds(4));
        assert!(out.is_empty());
    }

    #[test]
    fn forced_delta_reacts_to_swings_not_repeats() {
        let mut engine = engine();
        let out = engine.handle_frame(&battery_frame(100.0), t0());
        assert_eq!(payload_for(&out, "battery/power"), Some("100"));

        // Unchanged within the force interval: no power publish.
        for i in 1..=2 {
            let out = engine.handle_frame(&battery_frame(100.0), t0() + Duration::seconds(i));
            assert_eq!(payload_for(&out, "battery/power"), None);
        }

        // A 6 W swing beats the 5 W change threshold immediately.
        let out = engine.handle_frame(&battery_frame(106.0), t0() + Duration::seconds(3));
        assert_eq!(payload_for(&out, "battery/power"), Some("106"));

        // Unchanged but stale past the 30 s heartbeat.
        let out = engine.handle_frame(&battery_frame(106.0), t0() + Duration::seconds(40));
        assert_eq!(payload_for(&out, "battery/power"), Some("106"));
    }

    #[test]
    fn snapshot_reflects_latest_decode_even_when_throttled() {
        let mut engine = engine();
        let out = engine.handle_frame(&frame(REG_PV_INPUT, &[0x00, 0xFA]), t0());
        assert_eq!(payload_for(&out, "pv/voltage"), Some("25"));

        // 25.3 V moves less than the 1.0 V threshold: not published.
        let out = engine.handle_frame(&frame(REG_PV_INPUT, &[0x00, 0xFD]), t0() + Duration::seconds(1));
        assert!(out.is_empty());

        // The periodic snapshot still carries the newer value.
        let snapshot = engine.tick(t0() + Duration::seconds(2)).unwrap().unwrap();
        assert_eq!(snapshot.topic, "state");
        assert!(snapshot.retain);
        let value: serde_json::Value = serde_json::from_str(&snapshot.payload).unwrap();
        assert_eq!(value["pv"]["voltage"], 25.3);
    }

    #[test]
    fn snapshot_emits_immediately_then_on_interval() {
        let mut engine = engine();
        assert!(engine.tick(t0()).unwrap().is_some());
        assert!(engine.tick(t0() + Duration::seconds(5)).unwrap().is_none());
        let snapshot = engine.tick(t0() + Duration::seconds(10)).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&snapshot.payload).unwrap();
        assert_eq!(value["timestamp"], "2023-11-14T22:13:30Z");
    }

    #[test]
    fn ac_watt_metrics_use_their_own_forced_gates() {
        use charge_telemetry::{REG_AC_INPUT_WATTS, REG_AC_LOAD_WATTS};
        let mut engine = engine();

        let w = 30_000i32.to_be_bytes(); // 300.00 W
        let out = engine.handle_frame(&frame(REG_AC_LOAD_WATTS, &w), t0());
        assert_eq!(payload_for(&out, "rosie/load_watts"), Some("300"));

        // +3 W is under the force threshold: suppressed.
        let w = 30_300i32.to_be_bytes();
        let out = engine.handle_frame(&frame(REG_AC_LOAD_WATTS, &w), t0() + Duration::seconds(1));
        assert!(out.is_empty());
        assert_eq!(engine.snapshot().rosie.load_watts, 303.0);

        // The input-watts gate is independent of the load-watts gate.
        let w = 15_000i32.to_be_bytes();
        let out = engine.handle_frame(&frame(REG_AC_INPUT_WATTS, &w), t0() + Duration::seconds(1));
        assert_eq!(payload_for(&out, "rosie/input_watts"), Some("150"));
    }
}
