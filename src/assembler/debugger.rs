//! Breakpoint and memory-monitor bookkeeping, written out later by the
//! symbol file writer.

use super::token::Token;

#[derive(Debug, Default)]
pub struct Debugger {
    /// `(name, address)` pairs in the order `:breakpoint` directives were
    /// seen.
    pub breakpoints: Vec<(Token, u16)>,
    /// `(address, length)` pairs in the order `:monitor` directives were
    /// seen.
    pub monitors: Vec<(u16, u16)>,
}

impl Debugger {
    pub fn new() -> Debugger {
        Debugger::default()
    }

    pub fn breakpoint(&mut self, name: Token, pc: u16) {
        self.breakpoints.push((name, pc));
    }

    pub fn monitor(&mut self, addr: u16, length: u16) {
        self.monitors.push((addr, length));
    }
}
