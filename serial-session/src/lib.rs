//! Impedance Measurement Session over a Serial Terminal
//!
//! # Description
//! This crate runs the interactive measurement session of a lock-in impedance meter over a
//! serial (i.e. text-based) interface such as a USB CDC-ACM port and a terminal emulator.
//!
//! A session first records an open-circuit baseline, then measures the connected device under
//! test (DUT) as often as the user asks for it:
//! ```text
//! Set the DUT as open circuit, then press Enter to confirm.
//! [########################################] 100%
//! Open circuit samples: [3171, 12236, -3170, -12236]
//! Connect the DUT, then press Enter to confirm.
//! [########################################] 100%
//! DUT samples: [1585, 6118, -1586, -6117]
//! Impedance: 990.17-0.08i Ohm (|Z| = 990.17 Ohm, phase = -0.00 deg)
//! Press Enter to measure again.
//! ```
//!
//! # Design
//! Each reading averages many acquisitions as configured by a [Measurement]. Prompts discard any
//! input received before they are shown. A carriage return or line feed acknowledges a prompt.
//! Output is written on a best effort basis, see [BestEffortInterface].
#![cfg_attr(not(test), no_std)]

use core::fmt::Write;
use embedded_io::{Read, ReadReady, Write as EioWrite};
use lockin_dsp::{
    derive_voltage, estimate, Acquire, Bridge, ComplexVoltage, Measurement,
    MeasurementError, Unbounded,
};

mod interface;
mod progress;

pub use interface::BestEffortInterface;
pub use progress::ProgressBar;

const PROMPT_OPEN: &str = "Set the DUT as open circuit, then press Enter to confirm.";
const PROMPT_DUT: &str = "Connect the DUT, then press Enter to confirm.";
const PROMPT_AGAIN: &str = "Press Enter to measure again.";

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error<E, S> {
    #[error("Interface error: {0:?}")]
    Interface(E),
    #[error("Interface closed")]
    Closed,
    #[error("Sampler failed: {0:?}")]
    Sampler(S),
}

/// The terminal side of a session.
struct Terminal<I> {
    interface: I,
}

impl<I: Read + ReadReady + EioWrite> Terminal<I> {
    /// Discard all input received so far.
    fn drain(&mut self) -> Result<(), I::Error> {
        let mut buffer = [0u8; 32];
        while self.interface.read_ready()? {
            if self.interface.read(&mut buffer)? == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Block until a carriage return or line feed is received.
    fn wait_for_enter<S>(&mut self) -> Result<(), Error<I::Error, S>> {
        let mut buffer = [0u8; 32];
        loop {
            let len = self.interface.read(&mut buffer).map_err(Error::Interface)?;
            if len == 0 {
                return Err(Error::Closed);
            }
            if buffer[..len].iter().any(|b| matches!(b, b'\r' | b'\n')) {
                return Ok(());
            }
        }
    }

    fn flush(&mut self) {
        self.interface.flush().ok();
    }
}

impl<I: EioWrite> Write for Terminal<I> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.interface
            .write_all(s.as_bytes())
            .or(Err(core::fmt::Error))
    }
}

/// The measurement session.
pub struct Runner<I, A> {
    terminal: Terminal<I>,
    sampler: A,
    measurement: Measurement,
    bridge: Bridge,
}

impl<I, A> Runner<I, A>
where
    I: Read + ReadReady + EioWrite,
    A: Acquire,
{
    /// Construct a session.
    ///
    /// # Args
    /// * `interface` - The user interface, for example a USB serial port.
    /// * `sampler` - The capture source.
    /// * `measurement` - The averaging configuration of a reading.
    /// * `bridge` - The bridge resistances.
    pub fn new(
        interface: I,
        sampler: A,
        measurement: Measurement,
        bridge: Bridge,
    ) -> Self {
        Self {
            terminal: Terminal { interface },
            sampler,
            measurement,
            bridge,
        }
    }

    pub fn interface(&self) -> &I {
        &self.terminal.interface
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.terminal.interface
    }

    /// Run the session.
    ///
    /// # Returns
    /// Only on a fatal error: the interface failed or was closed, or the sampler exhausted its
    /// retries.
    pub fn run(&mut self) -> Result<core::convert::Infallible, Error<I::Error, A::Error>> {
        let open = self.calibrate()?;
        self.prompt(PROMPT_DUT)?;
        loop {
            self.measure_dut(open)?;
            self.prompt(PROMPT_AGAIN)?;
        }
    }

    /// Record the open-circuit baseline.
    ///
    /// # Note
    /// The user is prompted again until a reading succeeds.
    pub fn calibrate(
        &mut self,
    ) -> Result<ComplexVoltage, Error<I::Error, A::Error>> {
        loop {
            self.prompt(PROMPT_OPEN)?;
            if let Some(samples) = self.measure()? {
                writeln!(self.terminal, "Open circuit samples: {samples:?}").ok();
                self.terminal.flush();
                let open = derive_voltage(samples);
                log::info!("Open circuit: {open}");
                return Ok(open);
            }
        }
    }

    /// Measure the DUT against an open-circuit baseline and report the impedance.
    pub fn measure_dut(
        &mut self,
        open: ComplexVoltage,
    ) -> Result<(), Error<I::Error, A::Error>> {
        let Some(samples) = self.measure()? else {
            return Ok(());
        };
        writeln!(self.terminal, "DUT samples: {samples:?}").ok();

        let report = match estimate(open, derive_voltage(samples), &self.bridge) {
            Ok(z) => {
                log::info!("Impedance: {z}");
                writeln!(
                    self.terminal,
                    "Impedance: {z} Ohm (|Z| = {:.2} Ohm, phase = {:.2} deg)",
                    z.magnitude(),
                    z.phase()
                )
            }
            Err(Unbounded) => {
                log::warn!("Unbounded impedance");
                writeln!(self.terminal, "Impedance: unbounded (open DUT)")
            }
        };
        report.ok();
        self.terminal.flush();
        Ok(())
    }

    fn prompt(&mut self, message: &str) -> Result<(), Error<I::Error, A::Error>> {
        self.terminal.drain().map_err(Error::Interface)?;
        writeln!(self.terminal, "{message}").ok();
        self.terminal.flush();
        self.terminal.wait_for_enter()
    }

    /// Take one averaged reading with a progress bar.
    ///
    /// # Returns
    /// The four averaged phase samples or `None` if no reference signal was found.
    fn measure(&mut self) -> Result<Option<[i32; 4]>, Error<I::Error, A::Error>> {
        let Self {
            terminal,
            sampler,
            measurement,
            ..
        } = self;

        let mut bar = ProgressBar::new(measurement.iterations);
        bar.update(terminal, 0).ok();
        let result = measurement.run(sampler, |done| {
            if bar.update(terminal, done).is_ok() {
                terminal.flush();
            }
        });
        writeln!(terminal).ok();

        match result {
            Ok(samples) => Ok(Some(samples)),
            Err(MeasurementError::NoSignal { skipped }) => {
                log::warn!("No reference signal");
                writeln!(
                    terminal,
                    "No reference signal: {skipped} acquisitions without zero crossing"
                )
                .ok();
                Ok(None)
            }
            Err(MeasurementError::Sampler(err)) => {
                log::error!("Sampler failed: {err:?}");
                Err(Error::Sampler(err))
            }
        }
    }
}
