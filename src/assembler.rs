//! An assembler for an extended CHIP-8 assembly language (Octo).
//!
//! Source is tokenized once (see [tokenizer]) and fed to a single-pass
//! [parser] that drives a [program] emitter directly — there is no
//! separate first/second pass over the whole file. Forward references
//! (jumps, calls, structured-control-flow skip targets, `:unpack` sites)
//! are recorded as they're encountered and patched in one sweep by
//! [`program::Program::resolve`] once every label is known.
//!
//! ```text
//! source text --[tokenizer::Tokenizer]--> tokens --[parser::Parser]--> program::Program --resolve()--> bytes
//! ```

pub mod calc;
pub mod debugger;
pub mod error;
pub mod parser;
pub mod program;
pub mod symbols;
pub mod token;
pub mod tokenizer;

use std::{fs, io};

use error::ParseError;
use parser::Parser;
use program::Program;
use symbols::Symbols;
use tokenizer::Tokenizer;

/// The result of a successful assembly: the ROM bytes and the debug/symbol
/// information an emulator front-end would load alongside them.
#[derive(Debug)]
pub struct AssembleOutcome {
    pub rom: Vec<u8>,
    pub symbols: Symbols,
}

/// Tokenize, parse, and resolve `source`, producing ROM bytes starting at
/// `0x200` plus a [`Symbols`] table. Fails on the first parse error or on
/// any reference left unresolved once parsing completes.
pub fn assemble(source: &str) -> Result<AssembleOutcome, ParseError> {
    let mut tokenizer = Tokenizer::new(source);
    let mut program = Program::new();
    {
        let mut parser = Parser::new(&mut tokenizer, &mut program);
        parser.parse()?;
    }
    program.resolve()?;

    let symbols = Symbols::new(program.label_order(), program.labels(), tokenizer.consts(), program.debugger());
    Ok(AssembleOutcome { rom: program.into_bytes(), symbols })
}

/// Read `path` and assemble its contents. I/O failures are kept distinct
/// from [`ParseError`] so the CLI can report them (and exit) differently.
pub fn assemble_from_file(path: &str) -> io::Result<Result<AssembleOutcome, ParseError>> {
    let source = fs::read_to_string(path)?;
    Ok(assemble(&source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembling_twice_is_idempotent() {
        let source = ": main\n  v0 := 1\n  exit";
        let first = assemble(source).unwrap();
        let second = assemble(source).unwrap();
        assert_eq!(first.rom, second.rom);
    }

    #[test]
    fn unresolved_label_is_reported_as_a_parse_error() {
        let err = assemble(": main\n  jump nowhere").unwrap_err();
        assert!(err.to_string().contains("nowhere") || format!("{err:?}").contains("nowhere"));
    }

    #[test]
    fn symbols_expose_the_labels_the_program_defined() {
        let outcome = assemble(": main\n  v0 := 1\n  exit").unwrap();
        assert_eq!(outcome.symbols.labels, vec![("main".to_string(), 0x200)]);
    }
}
