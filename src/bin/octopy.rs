use std::path::Path;
use std::{env, fs, process};

use octo_asm::assembler;
use octo_asm::logging;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("Usage: {} <input.8o> [output.ch8] [output.sym]", args[0]);
        process::exit(1);
    }

    let input_path = &args[1];
    let rom_path = args.get(2).cloned().unwrap_or_else(|| with_extension(input_path, "ch8"));
    let sym_path = args.get(3).cloned().unwrap_or_else(|| with_extension(input_path, "sym"));

    let outcome = match assembler::assemble_from_file(input_path) {
        Ok(outcome) => outcome,
        Err(io_err) => {
            logging::error(format!("failed to read {input_path}: {io_err}"));
            process::exit(2);
        }
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(parse_err) => {
            logging::assembly_error(&parse_err);
            process::exit(3);
        }
    };

    if let Err(io_err) = fs::write(&rom_path, &outcome.rom) {
        logging::error(format!("failed to write {rom_path}: {io_err}"));
        process::exit(4);
    }
    if let Err(io_err) = fs::write(&sym_path, outcome.symbols.to_string()) {
        logging::error(format!("failed to write {sym_path}: {io_err}"));
        process::exit(4);
    }
}

fn with_extension(path: &str, ext: &str) -> String {
    Path::new(path).with_extension(ext).to_string_lossy().into_owned()
}
