//! Application errors
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
}

impl AppError {
    pub fn args(message: impl ToString) -> Self {
        Self {
            kind: ErrorKind::Args(message.to_string()),
        }
    }

    /// Command line usage errors, as opposed to failures while running.
    pub fn is_usage(&self) -> bool {
        matches!(self.kind, ErrorKind::Args(_))
    }
}

impl std::error::Error for AppError {}

#[derive(Debug)]
pub enum ErrorKind {
    Args(String),
    Chip8(chip8_machine::Chip8Error),
    Io(std::io::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "application error: {}", self.kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Args(msg) => write!(f, "{msg}"),
            Self::Chip8(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl From<chip8_machine::Chip8Error> for AppError {
    fn from(err: chip8_machine::Chip8Error) -> Self {
        Self {
            kind: ErrorKind::Chip8(err),
        }
    }
}

impl From<chip8_machine::InvalidKeyCode> for AppError {
    fn from(err: chip8_machine::InvalidKeyCode) -> Self {
        Self::args(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io(err),
        }
    }
}
