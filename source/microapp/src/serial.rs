//! `Serial`: log output through the host firmware.

use core::fmt;

use abi::sdk::{
    log::{LogCommand, LogValue, MAX_LOG_DATA},
    SdkType,
};
use heapless::Vec;

use crate::{Error, Microapp, Platform};

pub struct Serial<'a, P: Platform> {
    pub(crate) app: &'a mut Microapp<P>,
}

impl<'a, P: Platform> Serial<'a, P> {
    /// Log `text`, cut short at [`MAX_LOG_DATA`] bytes.
    pub fn print(&mut self, text: &str) -> Result<(), Error> {
        self.text(text, false)
    }

    pub fn println(&mut self, text: &str) -> Result<(), Error> {
        self.text(text, true)
    }

    pub fn print_int(&mut self, value: i32) -> Result<(), Error> {
        self.log(LogValue::Int(value), true)
    }

    /// Log raw bytes, cut short at [`MAX_LOG_DATA`] bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        let data = &data[..data.len().min(MAX_LOG_DATA)];
        self.log(LogValue::Bytes(collect(data)), true)
    }

    fn text(&mut self, text: &str, newline: bool) -> Result<(), Error> {
        let text = truncate(text, MAX_LOG_DATA);
        self.log(LogValue::Text(collect(text.as_bytes())), newline)
    }

    fn log(&mut self, value: LogValue, newline: bool) -> Result<(), Error> {
        self.app
            .request(SdkType::Log, &LogCommand { newline, value })
            .map(|_| ())
    }
}

/// Formatted output is split into as many log messages as it takes, without
/// newlines.
impl<'a, P: Platform> fmt::Write for Serial<'a, P> {
    fn write_str(&mut self, mut s: &str) -> fmt::Result {
        while !s.is_empty() {
            let chunk = truncate(s, MAX_LOG_DATA);
            self.text(chunk, false).map_err(|_| fmt::Error)?;
            s = &s[chunk.len()..];
        }
        Ok(())
    }
}

/// The longest prefix of `text` of at most `max` bytes that ends on a char
/// boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn collect(data: &[u8]) -> Vec<u8, MAX_LOG_DATA> {
    data.iter().copied().take(MAX_LOG_DATA).collect()
}
