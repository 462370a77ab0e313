//! Local tty devices.
//!
//! Used for the wired UART bridge and for the UART side of a radio module.
//! The device is opened non-blocking and switched to raw mode at the
//! configured baud rate (unix hosts only).

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::config::LinkConfig;
use crate::transport::stream::StreamTransport;
use crate::transport::Transport;
use crate::{AppError, Result};

/// Tty-backed line transport.
#[derive(Debug, Default)]
pub struct SerialTransport {
    inner: Option<StreamTransport<File>>,
}

impl SerialTransport {
    /// Create a closed transport; [`Transport::open`] opens the device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn opened(&mut self) -> Result<&mut StreamTransport<File>> {
        self.inner
            .as_mut()
            .ok_or_else(|| AppError::InvalidState("serial link is not open".into()))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, link: &LinkConfig) -> Result<()> {
        let path = link
            .path
            .as_deref()
            .ok_or_else(|| AppError::Config("serial link requires `path`".into()))?;
        let device = open_device(path, link.baud_rate)?;
        info!(path = %path.display(), baud_rate = link.baud_rate, "serial link opened");

        self.inner = Some(StreamTransport::new(device, link.max_line_bytes));
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.opened()?.write_line(line)
    }

    fn try_read_line(&mut self) -> Result<Option<String>> {
        self.opened()?.try_read_line()
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the file closes the descriptor.
        self.inner = None;
        Ok(())
    }
}

#[cfg(unix)]
fn open_device(path: &Path, baud_rate: u32) -> Result<File> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::OpenOptionsExt;

    use nix::fcntl::OFlag;
    use nix::sys::termios::{self, SetArg};

    let device = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags((OFlag::O_NOCTTY | OFlag::O_NONBLOCK).bits())
        .open(path)
        .map_err(|err| {
            AppError::Transport(format!("cannot open {}: {err}", path.display()))
        })?;

    let speed = baud(baud_rate)?;
    let mut settings = termios::tcgetattr(&device)
        .map_err(|err| AppError::Transport(format!("not a tty: {}: {err}", path.display())))?;
    termios::cfmakeraw(&mut settings);
    termios::cfsetspeed(&mut settings, speed)
        .map_err(|err| AppError::Transport(format!("cannot set baud rate: {err}")))?;
    termios::tcsetattr(&device, SetArg::TCSANOW, &settings)
        .map_err(|err| AppError::Transport(format!("cannot configure tty: {err}")))?;

    Ok(device)
}

#[cfg(not(unix))]
fn open_device(path: &Path, _baud_rate: u32) -> Result<File> {
    Err(AppError::Transport(format!(
        "cannot open {}: serial links require a unix host",
        path.display()
    )))
}

/// Map a numeric line rate onto a termios speed constant.
#[cfg(unix)]
fn baud(rate: u32) -> Result<nix::sys::termios::BaudRate> {
    use nix::sys::termios::BaudRate;

    Ok(match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => {
            return Err(AppError::Config(format!("unsupported baud rate: {other}")));
        }
    })
}
