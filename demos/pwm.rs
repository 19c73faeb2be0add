use std::{collections::BTreeMap, fs::File, io::BufWriter, sync::Arc};

use foc_pwmc::{
    mock::MockPowerStage,
    park_clarke::{self, RotatingReferenceFrame},
    trig::normalize_angle,
    PwmConfig, PwmCurrentFeedback, ThreeShunt, TrigTriplet,
};
use serde::Serialize;

/// Voltage command on the q axis, in the `i16` scale of the modulator.
const VOLTAGE_Q: i32 = 16_000;
/// Current fed to the estimator, in phase units.
const CURRENT_Q: i32 = 1_000;

#[derive(Serialize)]
struct Values {
    time_ns: u64,
    angle_deg: u16,
    orthogonal_voltage_alpha: i32,
    orthogonal_voltage_beta: i32,
    sector: u8,
    counters: [u16; 3],
    duty: [f32; 3],
    estimated_currents: [i16; 3],
}

fn main() -> Result<(), anyhow::Error> {
    let mut writer = mcap::Writer::new(BufWriter::new(File::create("out.mcap")?))?;
    let my_channel = mcap::Channel {
        topic: String::from("pwmc"),
        schema: Some(Arc::new(mcap::Schema {
            name: "".to_owned(),
            encoding: "".to_owned(),
            data: std::borrow::Cow::default(),
        })),
        message_encoding: "cbor".to_owned(),
        metadata: BTreeMap::default(),
    };
    let channel_id = writer.add_channel(&my_channel)?;

    let config = PwmConfig {
        dead_time_compensation: true,
        ..PwmConfig::default()
    };
    let half_period = config.half_period();
    let mut pwmc = PwmCurrentFeedback::new(config, ThreeShunt::new(MockPowerStage::new()))
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    pwmc.switch_on_pwm();

    let mut time_ns = 0;
    let dt_ns = 1_000_000;
    let mut angle_deg: i32 = 0;
    let velocity_deg_per_step = 1;

    while time_ns <= 10_000_000_000 {
        // Calc motor values
        let trig = TrigTriplet::new(angle_deg);
        let orthogonal_voltage = park_clarke::inverse_park(
            RotatingReferenceFrame {
                d: 0,
                q: VOLTAGE_Q,
            },
            &trig,
        );
        pwmc.set_phase_voltage(orthogonal_voltage)
            .map_err(|fault| anyhow::anyhow!("{fault}"))?;
        pwmc.timer_update();

        let estimated = pwmc.estimate_phase_currents(
            RotatingReferenceFrame {
                d: 0,
                q: CURRENT_Q,
            },
            angle_deg,
        );
        let modulation = pwmc.state().modulation();
        let counters = modulation.counters;

        // Write to file
        let mut buffer = Vec::with_capacity(128);
        ciborium::into_writer(
            &Values {
                time_ns,
                angle_deg: normalize_angle(angle_deg),
                orthogonal_voltage_alpha: orthogonal_voltage.alpha,
                orthogonal_voltage_beta: orthogonal_voltage.beta,
                sector: modulation.sector.number(),
                counters: [counters.a, counters.b, counters.c],
                duty: counters.duty_cycles(half_period).map(|v| v.to_num()),
                estimated_currents: [estimated.a, estimated.b, estimated.c],
            },
            &mut buffer,
        )?;
        writer.write_to_known_channel(
            &mcap::records::MessageHeader {
                channel_id,
                sequence: 0,
                log_time: time_ns,
                publish_time: time_ns,
            },
            &buffer,
        )?;

        // Update state
        angle_deg = normalize_angle(angle_deg + velocity_deg_per_step) as i32;
        time_ns += dt_ns;
    }

    pwmc.switch_off_pwm();
    writer.finish()?;

    Ok(())
}
