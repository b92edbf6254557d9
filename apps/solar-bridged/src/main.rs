use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{info, warn};

use can_link::{FrameSource, MockLink};
use charge_telemetry::DecodeParams;
use publish_gate::{BridgeEngine, GateConfig};

mod mqtt;
use mqtt::MqttPublisher;

#[derive(Parser, Debug)]
#[command(
    name = "solar-bridged",
    version,
    about = "Bridge charge-controller CAN telemetry to MQTT"
)]
struct Args {
    /// MQTT broker host
    #[arg(long, default_value = "127.0.0.1")]
    mqtt_host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 1883)]
    mqtt_port: u16,

    #[arg(long)]
    mqtt_username: Option<String>,

    #[arg(long)]
    mqtt_password: Option<String>,

    /// Topic prefix for every publish
    #[arg(long, default_value = "solar")]
    prefix: String,

    /// Bus interface name (serial device for slcan, anything for mock)
    #[arg(long, default_value = "can0")]
    interface: String,

    /// CAN backend
    #[arg(long, value_enum, default_value = "mock")]
    backend: Backend,

    /// Battery frames below this pack voltage are ignored as heartbeats
    #[arg(long, default_value_t = 0.0)]
    battery_floor: f64,

    /// Plausible AC line voltage band
    #[arg(long, default_value_t = 90.0)]
    ac_line_min: f64,

    #[arg(long, default_value_t = 150.0)]
    ac_line_max: f64,

    /// Mask the charge-stage byte to its low nibble before lookup
    #[arg(long)]
    stage_low_nibble: bool,

    /// Seconds between consolidated state publishes
    #[arg(long, default_value_t = 10)]
    snapshot_secs: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Slcan,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let args = Args::parse();
    info!(
        backend = ?args.backend,
        interface = %args.interface,
        prefix = %args.prefix,
        "solar-bridged starting"
    );

    let credentials = match (&args.mqtt_username, &args.mqtt_password) {
        (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
        _ => None,
    };
    let publisher = MqttPublisher::connect(
        &args.mqtt_host,
        args.mqtt_port,
        credentials,
        "solar-bridged",
        &args.prefix,
    );

    let params = DecodeParams {
        battery_voltage_floor: args.battery_floor,
        ac_line_min: args.ac_line_min,
        ac_line_max: args.ac_line_max,
        stage_low_nibble: args.stage_low_nibble,
    };
    let cfg = GateConfig {
        snapshot_interval: time::Duration::seconds(i64::from(args.snapshot_secs)),
        ..GateConfig::default()
    };
    let engine = BridgeEngine::new(params, cfg);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let loop_publisher = publisher.clone();
    let worker = match args.backend {
        Backend::Mock => {
            let link = MockLink::open(&args.interface)?;
            tokio::task::spawn_blocking(move || run_loop(link, engine, loop_publisher, stop))
        }
        #[cfg(feature = "slcan")]
        Backend::Slcan => {
            let link = can_link::SlcanLink::open(&args.interface)?;
            tokio::task::spawn_blocking(move || run_loop(link, engine, loop_publisher, stop))
        }
        #[cfg(not(feature = "slcan"))]
        Backend::Slcan => {
            anyhow::bail!("built without slcan support; rebuild with --features slcan")
        }
    };
    worker.await??;

    publisher.disconnect().await;
    info!("solar-bridged stopped");
    Ok(())
}

/// The bridge loop: one bounded receive, then decode/filter/publish, then
/// the snapshot check. The 100 ms receive wait is the only suspension
/// point, so the snapshot still fires on schedule when the bus is quiet.
/// A termination signal stops the loop after the current iteration.
fn run_loop<B: FrameSource>(
    mut link: B,
    mut engine: BridgeEngine,
    publisher: MqttPublisher,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    while !stop.load(Ordering::Relaxed) {
        let frame = match link.recv(Duration::from_millis(100)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "bus receive failed");
                return Err(e.into());
            }
        };
        let now = OffsetDateTime::now_utc();
        if let Some(frame) = frame {
            for publication in engine.handle_frame(&frame, now) {
                publisher.publish(&publication);
            }
        }
        if let Some(snapshot) = engine.tick(now)? {
            publisher.publish(&snapshot);
        }
    }
    Ok(())
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
