use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// What the pipeline does with a finished detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Calibrating,
    Monitoring,
    Previewing,
}

impl Mode {
    fn to_u8(self) -> u8 {
        match self {
            Mode::Calibrating => 0,
            Mode::Monitoring => 1,
            Mode::Previewing => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Mode::Calibrating,
            1 => Mode::Monitoring,
            _ => Mode::Previewing,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Calibrating => "calibrating",
            Mode::Monitoring => "monitoring",
            Mode::Previewing => "previewing",
        };
        f.write_str(name)
    }
}

/// Lock-free holder for the current [`Mode`], read on every completion.
#[derive(Debug)]
pub struct ModeCell(AtomicU8);

impl ModeCell {
    pub fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode.to_u8()))
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Returns the previous mode.
    pub fn set(&self, mode: Mode) -> Mode {
        Mode::from_u8(self.0.swap(mode.to_u8(), Ordering::AcqRel))
    }
}
