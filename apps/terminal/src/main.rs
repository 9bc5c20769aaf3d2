//! Caja POS terminal binary.

use std::process::ExitCode;

fn main() -> ExitCode {
    caja_terminal::run()
}
