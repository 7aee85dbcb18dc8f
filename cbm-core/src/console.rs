use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// The one external collaborator of the core: a character terminal speaking
/// PETSCII-flavored byte codes. The KERNAL hooks drive it for CHROUT, CHRIN,
/// GETIN and STOP; the address spaces drive the appearance calls when
/// firmware pokes a color or charset register.
///
/// Implementations translate between these byte codes and whatever the host
/// understands. The core never talks to the operating system itself.
pub trait Console {
    /// Render one character. 0x0D/0x8D are newline, 0x20..0x7E print
    /// literally, the PETSCII control range moves the cursor or changes
    /// color, and anything unhandled may be dropped.
    fn write_char(&mut self, value: u8);

    /// Block until a whole input line is available, then hand it out one
    /// byte per call; the last byte of a line is 0x0D.
    fn read_char(&mut self) -> u8;

    /// Non-blocking poll. 0 means no key is waiting.
    fn get_in(&mut self) -> u8;

    /// True exactly once per press of the host's STOP key; consumes the
    /// event.
    fn check_stop(&mut self) -> bool;

    /// Queue bytes ahead of the keyboard, as if the user had typed them.
    /// The auto-load sequence injects "RUN\r" through this.
    fn push_input(&mut self, bytes: &[u8]);

    /// Appearance changes requested by firmware register writes. The color
    /// values are Commodore color indices, not host colors.
    fn set_foreground(&mut self, color: u8);
    fn set_background(&mut self, color: u8);
    fn set_lowercase(&mut self, lowercase: bool);
}

pub type SharedConsole = Rc<RefCell<dyn Console>>;

/// An in-memory console: scripted input, recorded output. This is what the
/// machine tests run against, and it doubles as a headless front end.
pub struct BufferConsole {
    pub output: Vec<u8>,
    pub input: VecDeque<u8>,
    pub stop_pending: bool,
    pub foreground: Option<u8>,
    pub background: Option<u8>,
    pub lowercase: bool,
}

impl BufferConsole {
    pub fn new() -> BufferConsole {
        BufferConsole {
            output: Vec::new(),
            input: VecDeque::new(),
            stop_pending: false,
            foreground: None,
            background: None,
            lowercase: false,
        }
    }

    pub fn new_shared() -> Rc<RefCell<BufferConsole>> {
        Rc::new(RefCell::new(BufferConsole::new()))
    }

    /// The recorded output as text, for assertions.
    pub fn output_string(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }
}

impl Console for BufferConsole {
    fn write_char(&mut self, value: u8) {
        self.output.push(value);
    }

    fn read_char(&mut self) -> u8 {
        // A scripted console cannot block; an exhausted script answers with
        // an empty line forever.
        self.input.pop_front().unwrap_or(0x0D)
    }

    fn get_in(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }

    fn check_stop(&mut self) -> bool {
        let pending = self.stop_pending;
        self.stop_pending = false;
        pending
    }

    fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    fn set_foreground(&mut self, color: u8) {
        self.foreground = Some(color);
    }

    fn set_background(&mut self, color: u8) {
        self.background = Some(color);
    }

    fn set_lowercase(&mut self, lowercase: bool) {
        self.lowercase = lowercase;
    }
}
