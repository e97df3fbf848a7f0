use embedded_io::{ErrorKind, ErrorType, Read, ReadReady, Write, WriteReady};
use lockin_dsp::{Acquire, Bridge, Measurement, PhaseSpacing};
use serial_session::{BestEffortInterface, Error, Runner};

use std::collections::VecDeque;
use std::f64::consts::PI;
use std::string::String;
use std::vec::Vec;

/// Slots per excitation period.
const PERIOD: usize = 80;
/// Acquisitions per reading. The reference edge visits the same slots in every reading.
const ITERATIONS: u32 = 20;
const EDGE_STEP: usize = 4;

/// A terminal typing `input` one byte at a time after each prompt and holding `pending` bytes
/// typed before the session started.
struct Console {
    pending: VecDeque<u8>,
    input: VecDeque<u8>,
    output: Vec<u8>,
    /// The terminal is attached but does not drain its output.
    stalled: bool,
}

impl Console {
    fn new(pending: &[u8], input: &[u8]) -> Self {
        Self {
            pending: pending.iter().copied().collect(),
            input: input.iter().copied().collect(),
            output: Vec::new(),
            stalled: false,
        }
    }

    fn text(&self) -> String {
        String::from_utf8(self.output.clone()).unwrap()
    }
}

impl ErrorType for Console {
    type Error = ErrorKind;
}

impl Read for Console {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        match self.pending.pop_front().or_else(|| self.input.pop_front()) {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl ReadReady for Console {
    fn read_ready(&mut self) -> Result<bool, ErrorKind> {
        Ok(!self.pending.is_empty())
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        if self.stalled {
            return Err(ErrorKind::TimedOut);
        }
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        if self.stalled {
            return Err(ErrorKind::TimedOut);
        }
        Ok(())
    }
}

impl WriteReady for Console {
    fn write_ready(&mut self) -> Result<bool, ErrorKind> {
        Ok(true)
    }
}

#[derive(Debug, PartialEq)]
struct Timeout;

/// Synthesizes captures of a square reference and a sinusoidal input.
struct Bench {
    /// Input amplitude of successive readings. The last one repeats.
    amplitudes: Vec<f64>,
    /// Number of leading captures with a flat reference.
    flat: u32,
    fail: bool,
    captured: u32,
    edge: usize,
    buffer: Vec<u16>,
}

impl Bench {
    fn new(amplitudes: &[f64]) -> Self {
        Self {
            amplitudes: amplitudes.to_vec(),
            flat: 0,
            fail: false,
            captured: 0,
            edge: 0,
            buffer: Vec::new(),
        }
    }
}

impl Acquire for Bench {
    type Error = Timeout;

    fn acquire(&mut self) -> Result<&[u16], Timeout> {
        if self.fail {
            return Err(Timeout);
        }
        if self.flat > 0 {
            self.flat -= 1;
            self.buffer = vec![1000; PERIOD];
            return Ok(self.buffer.as_slice());
        }

        let reading = (self.captured / ITERATIONS) as usize;
        let amplitude = self.amplitudes[reading.min(self.amplitudes.len() - 1)];
        self.captured += 1;
        self.edge = (self.edge + EDGE_STEP) % PERIOD;

        self.buffer = (0..PERIOD)
            .map(|slot| {
                let t = (slot + PERIOD - self.edge) % PERIOD;
                let value = if slot & 1 == 0 {
                    if t < PERIOD / 2 {
                        50000.
                    } else {
                        10000.
                    }
                } else {
                    32768. + amplitude * (2. * PI * t as f64 / PERIOD as f64 + 0.7).sin()
                };
                value.round() as u16
            })
            .collect();
        Ok(self.buffer.as_slice())
    }
}

fn measurement() -> Measurement {
    Measurement {
        iterations: ITERATIONS,
        spacing: PhaseSpacing::new(8e3, 100.),
        max_skipped: 2,
        sampler_retries: 1,
    }
}

const BRIDGE: Bridge = Bridge {
    r_internal: 100e3,
    r_bridge: 1e3,
};

fn runner(console: Console, bench: Bench) -> Runner<Console, Bench> {
    Runner::new(console, bench, measurement(), BRIDGE)
}

/// All values following `key` up to the next space.
fn values(text: &str, key: &str) -> Vec<f64> {
    text.match_indices(key)
        .map(|(index, _)| {
            let rest = &text[index + key.len()..];
            rest.split(' ').next().unwrap().parse().unwrap()
        })
        .collect()
}

#[test]
fn full_session() {
    let mut session =
        runner(Console::new(b"", b"\r\r\n"), Bench::new(&[8000., 4000.]));
    assert_eq!(session.run(), Err(Error::Closed));

    let text = session.interface().text();
    assert_eq!(text.matches("open circuit, then press Enter").count(), 1);
    assert_eq!(text.matches("Open circuit samples: [").count(), 1);
    assert_eq!(text.matches("Connect the DUT").count(), 1);
    assert_eq!(text.matches("DUT samples: [").count(), 2);
    assert_eq!(text.matches("Press Enter to measure again.").count(), 2);
    assert_eq!(text.matches("] 100%").count(), 3);

    // A DUT halving the open-circuit amplitude matches the source resistance 100k || 1k.
    let magnitudes = values(&text, "|Z| = ");
    assert_eq!(magnitudes.len(), 2);
    for magnitude in magnitudes {
        assert!((magnitude - 990.099).abs() < 5., "{magnitude}");
    }
    for phase in values(&text, "phase = ") {
        assert!(phase.abs() < 0.5, "{phase}");
    }
}

#[test]
fn stale_input_does_not_acknowledge() {
    let mut session =
        runner(Console::new(b"\r\r\r", b"\r"), Bench::new(&[8000., 4000.]));
    assert_eq!(session.run(), Err(Error::Closed));

    let text = session.interface().text();
    assert_eq!(text.matches("Open circuit samples").count(), 1);
    assert!(text.contains("Connect the DUT"));
    assert!(!text.contains("DUT samples"));
}

#[test]
fn missing_reference_prompts_again() {
    let mut bench = Bench::new(&[8000., 4000.]);
    bench.flat = 3;
    let mut session = runner(Console::new(b"", b"\r\r"), bench);
    assert_eq!(session.run(), Err(Error::Closed));

    let text = session.interface().text();
    assert_eq!(text.matches("No reference signal").count(), 1);
    assert_eq!(text.matches("open circuit, then press Enter").count(), 2);
    assert_eq!(text.matches("Open circuit samples").count(), 1);
}

#[test]
fn sampler_failure_is_fatal() {
    let mut bench = Bench::new(&[8000.]);
    bench.fail = true;
    let mut session = runner(Console::new(b"", b"\r"), bench);
    assert_eq!(session.run(), Err(Error::Sampler(Timeout)));
}

#[test]
fn open_dut() {
    let mut session = runner(Console::new(b"", b"\r\r"), Bench::new(&[8000.]));
    assert_eq!(session.run(), Err(Error::Closed));
    assert!(session
        .interface()
        .text()
        .contains("Impedance: unbounded (open DUT)"));
}

#[test]
fn acknowledgment_ignores_other_keys() {
    let mut session =
        runner(Console::new(b"", b"abc\rxyz"), Bench::new(&[8000., 4000.]));
    assert_eq!(session.run(), Err(Error::Closed));
    let text = session.interface().text();
    assert_eq!(text.matches("Open circuit samples").count(), 1);
    assert!(!text.contains("DUT samples"));
}

#[test]
fn stalled_terminal_does_not_block_reading() {
    let mut console = Console::new(b"", b"\r");
    console.stalled = true;
    let mut session = Runner::new(
        BestEffortInterface::new(console),
        Bench::new(&[8000.]),
        measurement(),
        BRIDGE,
    );

    let open = session.calibrate().unwrap();
    assert!(open.im.abs() + open.re.abs() > 1000, "{open}");
    assert!(session.interface().inner().output.is_empty());
}
