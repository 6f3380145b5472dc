//! Pretty-printing messages to the console

use colored::Colorize;
use std::error::Error;

use crate::assembler::error::ParseError;

/// Pretty-print an error message to the console
pub fn error(error_message: String) {
    let error_title = "error:".red().bold();
    eprintln!("{} {}", error_title, error_message);
}

/// Pretty-print a warning message to the console
pub fn warning(message: String, line_number: usize) {
    let warning = "warning:".yellow().bold();
    eprintln!("{} line {}: {}", warning, line_number, message);
}

/// Pretty-print a [ParseError] and its full cause chain, one colored line per frame
pub fn assembly_error(err: &ParseError) {
    let error_title = "error:".red().bold();
    let mut frame: &dyn Error = err;
    loop {
        eprintln!("{} {}", error_title, frame);
        match frame.source() {
            Some(cause) => frame = cause,
            None => break,
        }
    }
}
