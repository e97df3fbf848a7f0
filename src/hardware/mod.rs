//! Module for all hardware-specific setup of the impedance meter
pub use stm32h7xx_hal as hal;

pub mod capture_buffer;
pub mod console;
mod delay;
pub mod metadata;
pub mod sampler;
pub mod setup;
pub mod signal_generator;
pub mod timers;

pub use console::UsbConsole;
pub use sampler::{Sampler, SamplerError};
pub use signal_generator::SignalGenerator;

pub type UsbBus = hal::usb_hs::UsbBus<hal::usb_hs::USB2>;

// Type alias for the excitation output, TIM4 channel 1.
pub type ExcitationPin = hal::gpio::gpiod::PD12<hal::gpio::Alternate<2>>;

// Type alias for the reference input, ADC1_INP2.
pub type ReferencePin = hal::gpio::gpiof::PF11<hal::gpio::Analog>;

// Type alias for the DUT response input, ADC1_INP6.
pub type InputPin = hal::gpio::gpiof::PF12<hal::gpio::Analog>;

// Millisecond ticks, so that fugit millisecond durations apply directly.
rtic_monotonics::systick_monotonic!(Systick, 1_000);

#[inline(never)]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::{
        fmt::Write,
        sync::atomic::{AtomicBool, Ordering},
    };
    use cortex_m::asm;
    use rtt_target::{ChannelMode, UpChannel};

    cortex_m::interrupt::disable();

    // Recursion protection
    static PANICKED: AtomicBool = AtomicBool::new(false);
    while PANICKED.load(Ordering::Relaxed) {
        asm::bkpt();
    }
    PANICKED.store(true, Ordering::Relaxed);

    // Analogous to panic-rtt-target
    if let Some(mut channel) = unsafe { UpChannel::conjure(0) } {
        channel.set_mode(ChannelMode::BlockIfFull);
        writeln!(channel, "{info}").ok();
    }

    // Persist the message for the next boot
    panic_persist::report_panic_info(info);

    // Abort
    asm::udf();
}

#[cortex_m_rt::exception]
unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
    panic!("HardFault at {:#?}", ef);
}

#[cortex_m_rt::exception]
unsafe fn DefaultHandler(irqn: i16) {
    panic!("Unhandled exception (IRQn = {})", irqn);
}
