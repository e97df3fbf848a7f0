//! Impedance meter hardware configuration
//!
//! This file contains all of the hardware-specific configuration of the impedance meter.
use core::sync::atomic::{AtomicBool, Ordering};
use core::{fmt::Write, ptr};
use heapless::String;
use stm32h7xx_hal::{self as hal, prelude::*};

use super::{
    capture_buffer, delay, metadata::ApplicationMetadata,
    signal_generator::SignalGenerator, timers, Sampler, Systick, UsbConsole,
};
use crate::{
    config::{Error, MeterConfig},
    design_parameters,
};

const UID_BASE: usize = 0x1FF1_E800;

/// The peripherals of the impedance meter after setup.
pub struct ImpedanceMeterDevices {
    pub config: MeterConfig,
    pub signal_generator: SignalGenerator,
    pub sampler: Sampler,
    pub console: UsbConsole,
    pub metadata: &'static ApplicationMetadata,
}

/// Configure the impedance meter hardware for operation.
///
/// # Note
/// The excitation is running when this returns. The sampler is idle until the first
/// acquisition.
///
/// # Args
/// * `core` - The cortex-m peripherals.
/// * `device` - The microcontroller peripherals to be configured.
///
/// # Returns
/// The configured devices, or the first configuration error.
pub fn setup(
    mut core: stm32h7xx_hal::stm32::CorePeripherals,
    device: stm32h7xx_hal::stm32::Peripherals,
) -> Result<ImpedanceMeterDevices, Error> {
    // Set up RTT logging
    {
        // Enable debug during WFE/WFI-induced sleep
        device.DBGMCU.cr.modify(|_, w| w.dbgsleep_d1().set_bit());

        // Set up RTT channel to use for `rprintln!()` as "best effort".
        // If a log record is emitted while another one is being written, the second one is lost.
        let channels = rtt_target::rtt_init_default!();
        // Note(unsafe): The closure we pass does not establish a critical section
        // as demanded but it does ensure synchronization and implements a lock.
        unsafe {
            rtt_target::set_print_channel_cs(
                channels.up.0,
                &((|arg, f| {
                    static LOCKED: AtomicBool = AtomicBool::new(false);
                    if LOCKED.compare_exchange_weak(
                        false,
                        true,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    ) == Ok(false)
                    {
                        f(arg);
                        LOCKED.store(false, Ordering::Release);
                    }
                }) as rtt_target::CriticalSectionFunc),
            );
        }

        static LOGGER: rtt_logger::RTTLogger =
            rtt_logger::RTTLogger::new(log::LevelFilter::Info);
        log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(log::LevelFilter::Trace))
            .ok();
        log::info!("Starting");
    }

    let pwr = device.PWR.constrain();
    let vos = pwr.freeze();

    // Clear reset flags.
    device.RCC.rsr.write(|w| w.rmvf().set_bit());

    // The ADC kernel clock is derived from the fixed frequency per_ck.
    device.RCC.d3ccipr.modify(|_, w| w.adcsel().per());

    let rcc = device.RCC.constrain();
    let mut ccdr = rcc
        .use_hse(8.MHz())
        .sysclk(design_parameters::SYSCLK)
        .hclk(200.MHz())
        .per_ck(64.MHz()) // fixed frequency HSI, only used for internal ADC. This is not the "peripheral" clock for timers and others.
        .freeze(vos, &device.SYSCFG);

    // Set up USB clocks.
    ccdr.clocks.hsi48_ck().unwrap();
    ccdr.peripheral
        .kernel_usb_clk_mux(stm32h7xx_hal::rcc::rec::UsbClkSel::Hsi48);

    Systick::start(core.SYST, ccdr.clocks.sysclk().to_Hz());

    core.SCB.enable_icache();

    let mut delay = delay::AsmDelay::new(ccdr.clocks.c_ck().to_Hz());

    let gpioa = device.GPIOA.split(ccdr.peripheral.GPIOA);
    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);
    let gpiof = device.GPIOF.split(ccdr.peripheral.GPIOF);

    let dma_streams =
        hal::dma::dma::StreamsTuple::new(device.DMA1, ccdr.peripheral.DMA1);

    let metadata = ApplicationMetadata::new().unwrap();
    if let Ok(json) = serde_json_core::to_string::<_, 512>(metadata) {
        log::info!("Metadata: {json}");
    }

    // The excitation timer and its clock source share the APB1 timer kernel clock.
    let config = MeterConfig::new(ccdr.clocks.timx_ker_ck().to_Hz())?;
    if let Ok(json) = serde_json_core::to_string::<_, 1024>(&config) {
        log::info!("Configuration: {json}");
    }

    let signal_generator = {
        let timer4 =
            device
                .TIM4
                .timer(1.kHz(), ccdr.peripheral.TIM4, &ccdr.clocks);
        let output = gpiod.pd12.into_alternate::<2>();
        SignalGenerator::configure_and_start(
            timers::ExcitationTimer::new(timer4),
            output,
            &config.timer,
        )
    };

    // Configure timer 2 to trigger conversions for the ADC
    let sampling_timer = {
        // The timer frequency is manually adjusted below, so the 1KHz setting here is a
        // dont-care.
        let mut timer2 =
            device
                .TIM2
                .timer(1.kHz(), ccdr.peripheral.TIM2, &ccdr.clocks);

        // Configure the timer to count at the designed tick rate. We will manually set the
        // period below.
        timer2.pause();
        timer2.set_tick_freq(design_parameters::TIMER_FREQUENCY);

        let mut sampling_timer = timers::SamplingTimer::new(timer2);
        sampling_timer.set_period_ticks(design_parameters::SAMPLE_TICKS - 1);
        sampling_timer
    };

    let adc1 = {
        let (mut adc1, _adc2) = hal::adc::adc12(
            device.ADC1,
            device.ADC2,
            design_parameters::ADC_CLOCK,
            &mut delay,
            ccdr.peripheral.ADC12,
            &ccdr.clocks,
        );

        adc1.set_resolution(hal::adc::Resolution::SixteenBit);
        adc1.calibrate();
        adc1.enable()
    };

    let sampler = Sampler::new(
        adc1,
        dma_streams.0,
        sampling_timer,
        capture_buffer::allocate(config.capture_len)?,
        config.sequence,
        config.timeout(),
        (gpiof.pf11.into_analog(), gpiof.pf12.into_analog()),
    );

    let (usb_device, usb_serial) = {
        let _usb_id = gpioa.pa10.into_alternate::<10>();
        let usb_n = gpioa.pa11.into_alternate();
        let usb_p = gpioa.pa12.into_alternate();
        let usb = stm32h7xx_hal::usb_hs::USB2::new(
            device.OTG2_HS_GLOBAL,
            device.OTG2_HS_DEVICE,
            device.OTG2_HS_PWRCLK,
            usb_n,
            usb_p,
            ccdr.peripheral.USB2OTG,
            &ccdr.clocks,
        );

        let endpoint_memory =
            cortex_m::singleton!(: [u32; 1024] = [0; 1024]).unwrap();
        let usb_bus = cortex_m::singleton!(: usb_device::bus::UsbBusAllocator<super::UsbBus> =
        stm32h7xx_hal::usb_hs::UsbBus::new(
            usb,
            &mut endpoint_memory[..],
        ))
        .unwrap();

        let read_store = cortex_m::singleton!(: [u8; 128] = [0; 128]).unwrap();
        let write_store =
            cortex_m::singleton!(: [u8; 1024] = [0; 1024]).unwrap();
        let serial = usbd_serial::SerialPort::new_with_store(
            usb_bus,
            &mut read_store[..],
            &mut write_store[..],
        );

        // Generate a device serial number from the 96 bit unique device ID.
        // Note(unsafe): The ID is a read-only system memory region.
        let uid = unsafe { ptr::read_volatile(UID_BASE as *const [u32; 3]) };
        let serial_number = cortex_m::singleton!(: String<24> = {
            let mut s = String::new();
            for word in uid {
                write!(s, "{word:08X}").unwrap();
            }
            s
        })
        .unwrap();

        let usb_device = usb_device::device::UsbDeviceBuilder::new(
            usb_bus,
            usb_device::device::UsbVidPid(0x1209, 0x392F),
        )
        .strings(&[usb_device::device::StringDescriptors::default()
            .manufacturer("ARTIQ/Sinara")
            .product("Lock-in Impedance Meter")
            .serial_number(serial_number)])
        .unwrap()
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();

        (usb_device, serial)
    };

    log::info!("setup() complete");

    Ok(ImpedanceMeterDevices {
        config,
        signal_generator,
        sampler,
        console: UsbConsole::new(usb_device, usb_serial),
        metadata,
    })
}
