//! # Impedance
//!
//! The `impedance` application measures the complex impedance of a device under test (DUT) with
//! a lock-in technique.
//!
//! ## Features
//! * Square wave excitation of a resistor bridge, generated by TIM4 on PD12
//! * Round-robin sampling of the excitation (reference) and the DUT response (input) by ADC1
//! * Phase recovery from the reference zero crossing and four-point quadrature demodulation
//! * Averaging over many acquisitions
//! * Open-circuit calibration and impedance readout over a USB serial terminal
//!
//! ## Usage
//! Connect a terminal emulator to the USB serial port and follow the prompts. Logs are
//! available over RTT.
//!
//! When built for the host, the application prints the derived configuration.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(not(target_os = "none"))]
fn main() {
    use lockin_impedance::{
        config::MeterConfig, design_parameters::TIMER_KERNEL_CLOCK,
    };

    match MeterConfig::new(TIMER_KERNEL_CLOCK.to_Hz()) {
        Ok(config) => {
            let json: heapless::String<1024> =
                serde_json_core::to_string(&config).unwrap();
            println!("{json}");
        }
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_os = "none")]
#[rtic::app(device = lockin_impedance::hardware::hal::stm32, peripherals = true)]
mod app {
    use lockin_impedance::hardware::{
        self, setup::ImpedanceMeterDevices, Sampler, SignalGenerator,
        UsbConsole,
    };
    use serial_session::{BestEffortInterface, Runner};

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        runner: Runner<BestEffortInterface<UsbConsole>, Sampler>,
        // Owns the free running excitation.
        _signal_generator: SignalGenerator,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let ImpedanceMeterDevices {
            config,
            signal_generator,
            sampler,
            console,
            metadata,
        } = match hardware::setup::setup(c.core, c.device) {
            Ok(devices) => devices,
            Err(err) => panic!("Setup failed: {err}"),
        };

        if metadata.panic_info != "None" {
            log::warn!("Previous panic: {}", metadata.panic_info);
        }

        let runner = Runner::new(
            BestEffortInterface::new(console),
            sampler,
            config.measurement,
            config.bridge,
        );

        (
            Shared {},
            Local {
                runner,
                _signal_generator: signal_generator,
            },
        )
    }

    #[idle(local=[runner, _signal_generator])]
    fn idle(c: idle::Context) -> ! {
        // The session only returns on a fatal error.
        let err = match c.local.runner.run() {
            Ok(never) => match never {},
            Err(err) => err,
        };
        log::error!("Session failed: {err}");
        panic!("Session failed: {err}");
    }
}
