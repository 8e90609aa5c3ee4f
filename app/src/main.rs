#![no_main]
#![no_std]

// Firmware shell around the servostep state core. Wires the sampling-tick
// timer, the quadrature and step/dir edge interrupts, the SPI angle sensor
// and a foreground telemetry loop to the algorithm crate.

use defmt_rtt as _;
use panic_probe as _;

use hal::{
    self,
    clocks::Clocks,
    gpio::{self, Edge, Pin, PinMode, Port, Pull},
    pac,
    pac::{SPI1, TIM2},
    spi::{BaudRate, Spi, SpiConfig, SpiMode},
    timer::{Timer, TimerConfig, TimerInterrupt},
};

use servostep_algo::{
    CommandState, ControlCore, ControlLaw, ControlMode, ControlSnapshot, QuadratureDecoder,
    SnapshotCell, StepDirCounter, TickInputs,
};

use cortex_m;

/// Sampling-tick frequency in Hz.
const SAMPLE_FREQ: u16 = 6500;

/// Full-step angle of a 200-step motor in degrees.
const STEP_ANGLE: f32 = 1.8;

/// 14-bit absolute encoder scaling to degrees.
const DEG_PER_LSB: f32 = 360.0 / 16384.0;

/// Snapshot published by the tick context, read by the foreground.
static SNAPSHOT: SnapshotCell<ControlSnapshot> = SnapshotCell::new(ControlSnapshot::INIT);

/// Command state written by the foreground, read by the tick context at the
/// start of each period.
static COMMAND: SnapshotCell<CommandState> = SnapshotCell::new(CommandState::INIT);

/// Placeholder proportional-derivative law; the real gain set lives with
/// the tuning tooling, not in the state core.
struct PdLaw {
    kp: f32,
    kd: f32,
}

impl ControlLaw for PdLaw {
    fn effort(&mut self, mode: ControlMode, error: f32, velocity: f32) -> f32 {
        match mode {
            ControlMode::ClosedLoopVelocity => self.kp * error,
            _ => self.kp * error - self.kd * velocity,
        }
    }
}

#[rtic::app(device = pac, peripherals = true)]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        decoder: QuadratureDecoder,
        step_counter: StepDirCounter,
        quad_a: Pin,
        quad_b: Pin,
    }

    #[local]
    struct Local {
        timer_tick: Timer<TIM2>,
        spi: Spi<SPI1>,
        cs_pin: Pin,
        dir_pin: Pin,
        core: ControlCore<PdLaw>,
        stamp: u32,
        last_raw: f32,
        log_div: u32,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;

        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();
        defmt::debug!(
            "SYSTEM: Clock frequency is {} MHz",
            clock_cfg.sysclk() / 1_000_000
        );

        // Sampling-tick timer
        let mut timer_tick = Timer::new_tim2(
            dp.TIM2,
            SAMPLE_FREQ as f32,
            TimerConfig::default(),
            &clock_cfg,
        );
        timer_tick.enable_interrupt(TimerInterrupt::Update);
        timer_tick.enable();

        // Angle sensor on SPI1: PA5 SCK, PA6 MISO, PA7 MOSI, PC4 CS
        Pin::new(Port::A, 5, PinMode::Alt(5));
        Pin::new(Port::A, 6, PinMode::Alt(5));
        Pin::new(Port::A, 7, PinMode::Alt(5));
        let mut cs_pin = Pin::new(Port::C, 4, PinMode::Output);
        cs_pin.set_high();

        let spi_cfg = SpiConfig {
            mode: SpiMode::mode1(),
            ..Default::default()
        };
        let spi = Spi::new(dp.SPI1, spi_cfg, BaudRate::Div32);

        // Quadrature channels on PA0/PA1, both-edge interrupts. The decoder
        // is edge-driven: each handler samples both levels and feeds the
        // state machine, no polling loop involved.
        let mut quad_a = Pin::new(Port::A, 0, PinMode::Input);
        quad_a.pull(Pull::Up);
        quad_a.enable_interrupt(Edge::Either);
        let mut quad_b = Pin::new(Port::A, 1, PinMode::Input);
        quad_b.pull(Pull::Up);
        quad_b.enable_interrupt(Edge::Either);

        // Step/dir slave input on PA2 (STEP, rising edge) and PA3 (DIR)
        let mut step_pin = Pin::new(Port::A, 2, PinMode::Input);
        step_pin.pull(Pull::Up);
        step_pin.enable_interrupt(Edge::Rising);
        let mut dir_pin = Pin::new(Port::A, 3, PinMode::Input);
        dir_pin.pull(Pull::Up);

        let decoder = QuadratureDecoder::new(quad_a.is_high(), quad_b.is_high());
        let core = ControlCore::new(
            PdLaw { kp: 15.0, kd: 0.02 },
            SAMPLE_FREQ,
            SAMPLE_FREQ,
            STEP_ANGLE,
        );

        (
            Shared {
                decoder,
                step_counter: StepDirCounter::new(),
                quad_a,
                quad_b,
            },
            Local {
                timer_tick,
                spi,
                cs_pin,
                dir_pin,
                core,
                stamp: 0,
                last_raw: 0.0,
                log_div: 0,
            },
        )
    }

    /// Sampling tick: read the sensor, gather the edge-counter state, run
    /// the control pipeline and publish the snapshot. Priority below the
    /// edge handlers so no quadrature or step edge is ever lost.
    #[task(binds = TIM2, priority = 2, shared = [decoder, step_counter], local = [timer_tick, spi, cs_pin, core, stamp, last_raw])]
    fn sample_tick(mut cx: sample_tick::Context) {
        cx.local.timer_tick.clear_interrupt(TimerInterrupt::Update);

        // Command state is read atomically once, at the start of the period.
        let cmd = COMMAND.read();

        // A failed read reuses the last sample but flags it, so the core
        // counts the fault and re-baselines instead of treating the reused
        // value as a live measurement.
        let (raw_angle, sensor_fault) = match read_raw_angle(cx.local.spi, cx.local.cs_pin) {
            Some(raw) => (raw, false),
            None => (*cx.local.last_raw, true),
        };
        *cx.local.last_raw = raw_angle;

        *cx.local.stamp = cx.local.stamp.wrapping_add(1);

        // Brief priority-ceiling sections; edge interrupts arriving during
        // them stay pending in the NVIC.
        let (quad_ticks, decode_errors) = cx.shared.decoder.lock(|dec| {
            dec.set_homing(cmd.quad_homing);
            (dec.ticks(), dec.decode_errors())
        });
        let step_count = cx.shared.step_counter.lock(|sc| sc.count());

        let input = TickInputs {
            raw_angle,
            stamp: *cx.local.stamp,
            quad_ticks,
            decode_errors,
            step_count,
            sensor_fault,
        };

        let snapshot = cx.local.core.tick(input, cmd);
        SNAPSHOT.publish(snapshot);

        // Coil drive from snapshot.effort happens in the PWM stage, outside
        // this core.
    }

    /// Edge on quadrature channel A.
    #[task(binds = EXTI0, priority = 3, shared = [decoder, quad_a, quad_b])]
    fn quad_a_edge(cx: quad_a_edge::Context) {
        gpio::clear_exti_interrupt(0);
        (cx.shared.decoder, cx.shared.quad_a, cx.shared.quad_b)
            .lock(|dec, a, b| dec.update(a.is_high(), b.is_high()));
    }

    /// Edge on quadrature channel B.
    #[task(binds = EXTI1, priority = 3, shared = [decoder, quad_a, quad_b])]
    fn quad_b_edge(cx: quad_b_edge::Context) {
        gpio::clear_exti_interrupt(1);
        (cx.shared.decoder, cx.shared.quad_a, cx.shared.quad_b)
            .lock(|dec, a, b| dec.update(a.is_high(), b.is_high()));
    }

    /// Rising edge on STEP: direction level decides the sign.
    #[task(binds = EXTI2, priority = 3, shared = [step_counter], local = [dir_pin])]
    fn step_edge(mut cx: step_edge::Context) {
        gpio::clear_exti_interrupt(2);
        let dir_high = cx.local.dir_pin.is_high();
        cx.shared.step_counter.lock(|sc| sc.step_edge(dir_high));
    }

    /// Foreground: telemetry over the atomic snapshot. Stands in for the
    /// serial command handler, which only ever sees whole-tick state.
    #[idle(local = [log_div])]
    fn idle(cx: idle::Context) -> ! {
        loop {
            *cx.local.log_div = cx.local.log_div.wrapping_add(1);
            if *cx.local.log_div % 500_000 == 0 {
                let s = SNAPSHOT.read();
                defmt::info!(
                    "r {} y {} e {} u {} v {} wraps {} steps {} quad {} faults {}/{}",
                    s.setpoint,
                    s.measured,
                    s.error,
                    s.effort,
                    s.velocity,
                    s.wrap_count,
                    s.step_count,
                    s.quad_ticks,
                    s.faults.missed_samples,
                    s.faults.decode_errors,
                );
            }
        }
    }
}

/// One blocking sensor read inside the tick budget. A bus fault returns
/// `None`; the caller decides what to substitute and reports the fault, so
/// the loop keeps driving without passing stale data off as fresh.
fn read_raw_angle(spi: &mut Spi<SPI1>, cs_pin: &mut Pin) -> Option<f32> {
    cs_pin.set_low();
    let mut buf = [0x80, 0x20, 0x00, 0x00];
    let ok = spi.transfer(&mut buf).is_ok();
    cs_pin.set_high();

    if !ok {
        defmt::warn!("SENSOR: SPI transfer failed");
        return None;
    }

    let raw14 = (((buf[2] as u16) << 8) | buf[3] as u16) & 0x3FFF;
    Some(raw14 as f32 * DEG_PER_LSB)
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
