//! USB CDC-ACM console
use super::UsbBus;
use usb_device::device::{UsbDevice, UsbDeviceState};
use usbd_serial::{SerialPort, UsbError};

/// The user interface of the measurement session.
///
/// # Note
/// The console is served from the idle loop: every call polls the USB device. Reads block until
/// input arrives. Writes never wait for the host to drain the port.
pub struct UsbConsole {
    usb_device: UsbDevice<'static, UsbBus>,
    usb_serial: SerialPort<'static, UsbBus>,
    // A byte read ahead by `read_ready()`.
    pending: Option<u8>,
}

#[derive(Debug)]
pub enum Error {
    Usb(UsbError),
    Disconnected,
}

impl From<UsbError> for Error {
    fn from(e: UsbError) -> Self {
        Self::Usb(e)
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Disconnected => embedded_io::ErrorKind::NotConnected,
            Self::Usb(_) => embedded_io::ErrorKind::Other,
        }
    }
}

impl UsbConsole {
    pub fn new(
        usb_device: UsbDevice<'static, UsbBus>,
        usb_serial: SerialPort<'static, UsbBus>,
    ) -> Self {
        Self {
            usb_device,
            usb_serial,
            pending: None,
        }
    }

    /// Whether a terminal has opened the port.
    pub fn is_connected(&self) -> bool {
        self.usb_device.state() == UsbDeviceState::Configured
            && self.usb_serial.dtr()
    }

    pub fn process(&mut self) {
        self.usb_device.poll(&mut [&mut self.usb_serial]);
    }

    fn try_read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.process();
        match self.usb_serial.read(buf) {
            Ok(len) => Ok(len),
            Err(UsbError::WouldBlock) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl embedded_io::ErrorType for UsbConsole {
    type Error = Error;
}

impl embedded_io::Read for UsbConsole {
    /// Block until at least one byte is received.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.pending.take() {
            buf[0] = byte;
            return Ok(1);
        }
        loop {
            let len = self.try_read(buf)?;
            if len > 0 {
                return Ok(len);
            }
        }
    }
}

impl embedded_io::ReadReady for UsbConsole {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        if self.pending.is_none() {
            let mut byte = [0u8];
            if self.try_read(&mut byte)? == 1 {
                self.pending = Some(byte[0]);
            }
        }
        Ok(self.pending.is_some())
    }
}

impl embedded_io::Write for UsbConsole {
    /// Queue as much of `buf` as the endpoint buffer takes.
    ///
    /// # Note
    /// This does not wait for the host. A full buffer is reported as
    /// [UsbError::WouldBlock].
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.process();
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        self.usb_serial.write(buf).map_err(From::from)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.process();
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        self.usb_serial.flush().map_err(From::from)
    }
}

impl embedded_io::WriteReady for UsbConsole {
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        self.process();
        Ok(self.is_connected())
    }
}
