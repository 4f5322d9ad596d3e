//! Serial line with raw termios settings, restored on drop.

use crate::error::CliError;
use hid_nextwindow_protocol::serial::BAUD_RATE;
use nix::sys::termios::{
    self, BaudRate, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices, Termios,
};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// An open serial device configured for the controller's frame stream.
pub struct SerialLine {
    file: File,
    saved: Termios,
}

impl SerialLine {
    /// Open `path` and switch it to 115200 baud, non-canonical, no echo.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| CliError::from_open_error(&path.display().to_string(), e))?;

        let saved = termios::tcgetattr(&file).map_err(io::Error::from)?;
        let mut tio = saved.clone();
        configure(&mut tio)?;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio).map_err(io::Error::from)?;
        debug!("Configured {} for {BAUD_RATE} baud", path.display());

        Ok(Self { file, saved })
    }
}

fn configure(tio: &mut Termios) -> io::Result<()> {
    termios::cfsetspeed(tio, BaudRate::B115200)?;
    tio.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
    tio.input_flags.remove(InputFlags::IXON | InputFlags::ICRNL);
    tio.output_flags.remove(OutputFlags::ONLCR);
    for (index, value) in [
        (SpecialCharacterIndices::VMIN, 1),
        (SpecialCharacterIndices::VTIME, 0),
    ] {
        if let Some(slot) = tio.control_chars.get_mut(index as usize) {
            *slot = value;
        }
    }
    Ok(())
}

impl Read for SerialLine {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Drop for SerialLine {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(&self.file, SetArg::TCSANOW, &self.saved) {
            warn!("Failed to restore serial line settings: {e}");
        }
    }
}
