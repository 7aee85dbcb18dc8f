use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Stdout, Write};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use termion::color::{AnsiValue, Bg, Fg};
use termion::raw::{IntoRawMode, RawTerminal};
use termion::{clear, cursor};

use cbm_core::console::Console;

use crate::petscii;

/// The Commodore palette squeezed onto the 16 ANSI colors.
fn ansi_color(index: u8) -> AnsiValue {
    let ansi = match index & 0x0F {
        0 => 0,   // black
        1 => 15,  // white
        2 => 1,   // red
        3 => 14,  // cyan
        4 => 5,   // purple
        5 => 2,   // green
        6 => 4,   // blue
        7 => 11,  // yellow
        8 => 3,   // orange lands on dark yellow
        9 => 3,   // brown too
        10 => 9,  // light red
        11 => 8,  // dark grey
        12 => 8,  // medium grey
        13 => 10, // light green
        14 => 12, // light blue
        _ => 7,   // light grey
    };
    AnsiValue(ansi)
}

/// The host side of the console port: a raw-mode terminal with a reader
/// thread feeding keystrokes through a channel. The CPU-side hook calls are
/// all single-threaded; the channel is the only boundary the keyboard
/// crosses.
pub struct TermConsole {
    output: RawTerminal<Stdout>,
    keyboard: Receiver<u8>,
    /// Keys typed but not yet claimed by GETIN or line assembly.
    pending: VecDeque<u8>,
    /// Finished input handed out byte-by-byte through read_char; RUN
    /// injection lands here too.
    line: VecDeque<u8>,
    stop_pending: bool,
    lowercase: bool,
}

impl TermConsole {
    pub fn new() -> io::Result<Rc<RefCell<TermConsole>>> {
        let output = io::stdout().into_raw_mode()?;
        let (sender, keyboard) = mpsc::channel();
        thread::spawn(move || {
            for byte in io::stdin().bytes().flatten() {
                if sender.send(byte).is_err() {
                    break;
                }
            }
        });
        Ok(Rc::new(RefCell::new(TermConsole {
            output,
            keyboard,
            pending: VecDeque::new(),
            line: VecDeque::new(),
            stop_pending: false,
            lowercase: false,
        })))
    }

    /// Classify one host byte: STOP, typeable, or noise.
    fn accept(&mut self, byte: u8) {
        // ESC and ctrl-C both act as the STOP key.
        if byte == 0x1B || byte == 0x03 {
            self.stop_pending = true;
            return;
        }
        if let Some(code) = petscii::from_host(byte) {
            self.pending.push_back(code);
        }
    }

    fn drain_keyboard(&mut self) {
        while let Ok(byte) = self.keyboard.try_recv() {
            self.accept(byte);
        }
    }

    fn next_key_blocking(&mut self) -> u8 {
        loop {
            if let Some(code) = self.pending.pop_front() {
                return code;
            }
            match self.keyboard.recv() {
                Ok(byte) => self.accept(byte),
                // Stdin is gone; answer Enter forever rather than wedge the
                // firmware mid-line.
                Err(_) => return 0x0D,
            }
        }
    }

    fn put(&mut self, text: &str) {
        let _ = self.output.write_all(text.as_bytes());
        let _ = self.output.flush();
    }
}

impl Console for TermConsole {
    fn write_char(&mut self, value: u8) {
        match value {
            0x0D | 0x8D => self.put("\r\n"),
            // Clear screen and home.
            0x93 => self.put(&format!("{}{}", clear::All, cursor::Goto(1, 1))),
            0x13 => self.put(&cursor::Goto(1, 1).to_string()),
            0x11 => self.put(&cursor::Down(1).to_string()),
            0x91 => self.put(&cursor::Up(1).to_string()),
            0x1D => self.put(&cursor::Right(1).to_string()),
            0x9D => self.put(&cursor::Left(1).to_string()),
            // Destructive backspace.
            0x14 => self.put("\x08 \x08"),
            // Character-set switches embedded in the output stream.
            0x0E => self.lowercase = true,
            0x8E => self.lowercase = false,
            _ => {
                if let Some(color) = petscii::color_code(value) {
                    self.set_foreground(color);
                } else if let Some(ch) = petscii::to_host(value, self.lowercase) {
                    self.put(&ch.to_string());
                }
                // Reverse video and the rest of the control range are
                // dropped; a scrolling teletype has nowhere to put them.
            }
        }
    }

    fn read_char(&mut self) -> u8 {
        if let Some(byte) = self.line.pop_front() {
            return byte;
        }
        // Assemble one line with local echo and destructive editing, then
        // hand it out byte-by-byte.
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            let key = self.next_key_blocking();
            match key {
                0x0D => {
                    self.write_char(0x0D);
                    buffer.push(0x0D);
                    break;
                }
                0x14 => {
                    if buffer.pop().is_some() {
                        self.write_char(0x14);
                    }
                }
                _ => {
                    self.write_char(key);
                    buffer.push(key);
                }
            }
        }
        self.line.extend(buffer);
        self.line.pop_front().unwrap_or(0x0D)
    }

    fn get_in(&mut self) -> u8 {
        self.drain_keyboard();
        if let Some(byte) = self.line.pop_front() {
            return byte;
        }
        self.pending.pop_front().unwrap_or(0)
    }

    fn check_stop(&mut self) -> bool {
        self.drain_keyboard();
        let pending = self.stop_pending;
        self.stop_pending = false;
        pending
    }

    fn push_input(&mut self, bytes: &[u8]) {
        self.line.extend(bytes.iter().copied());
    }

    fn set_foreground(&mut self, color: u8) {
        self.put(&Fg(ansi_color(color)).to_string());
    }

    fn set_background(&mut self, color: u8) {
        self.put(&Bg(ansi_color(color)).to_string());
    }

    fn set_lowercase(&mut self, lowercase: bool) {
        self.lowercase = lowercase;
    }
}
