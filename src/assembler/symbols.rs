//! Renders a resolved [`Program`](super::program::Program) plus the
//! tokenizer's constant table as Octo's symbol-file text format, the way
//! an emulator or debugger front-end would load breakpoints and labels
//! back in.

use std::collections::HashMap;
use std::fmt;

use super::debugger::Debugger;
use super::token::Token;

#[derive(Debug)]
pub struct Symbols {
    pub labels: Vec<(String, u16)>,
    pub constants: Vec<(String, f64)>,
    pub breakpoints: Vec<(Token, u16)>,
    pub monitors: Vec<(u16, u16)>,
}

impl Symbols {
    pub fn new(
        label_order: &[(String, u16)],
        labels: &HashMap<String, u16>,
        consts: &HashMap<String, f64>,
        debugger: &Debugger,
    ) -> Symbols {
        let mut constants: Vec<(String, f64)> = consts
            .iter()
            .filter(|(name, _)| !labels.contains_key(*name))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        constants.sort_by(|a, b| a.0.cmp(&b.0));

        Symbols {
            labels: label_order.to_vec(),
            constants,
            breakpoints: debugger.breakpoints.clone(),
            monitors: debugger.monitors.clone(),
        }
    }
}

impl fmt::Display for Symbols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, addr) in &self.labels {
            writeln!(f, "{name} = {addr:#06X}")?;
        }
        for (name, value) in &self.constants {
            if value.fract() == 0.0 {
                writeln!(f, "{name} = {}", *value as i64)?;
            } else {
                writeln!(f, "{name} = {value}")?;
            }
        }
        for (name, addr) in &self.breakpoints {
            writeln!(f, "{} = {addr:#06X}   # breakpoint: {name}", name.text)?;
        }

        write!(f, "breakpoints=[")?;
        for (i, (_, addr)) in self.breakpoints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{addr:#06X}")?;
        }
        writeln!(f, "]")?;

        write!(f, "monitors=[")?;
        for (i, (addr, len)) in self.monitors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({addr:#06X}, {len})")?;
        }
        writeln!(f, "]")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_shadows_same_named_constant() {
        let mut labels = HashMap::new();
        labels.insert("tick".to_string(), 0x200u16);
        let mut consts = HashMap::new();
        consts.insert("tick".to_string(), 3.0);
        consts.insert("PI".to_string(), std::f64::consts::PI);

        let order = vec![("tick".to_string(), 0x200u16)];
        let debugger = Debugger::new();
        let symbols = Symbols::new(&order, &labels, &consts, &debugger);

        assert!(!symbols.constants.iter().any(|(name, _)| name == "tick"));
        assert!(symbols.constants.iter().any(|(name, _)| name == "PI"));
    }

    #[test]
    fn integral_constants_print_without_a_decimal_point() {
        let labels = HashMap::new();
        let mut consts = HashMap::new();
        consts.insert("SPEED".to_string(), 4.0);
        let order = Vec::new();
        let debugger = Debugger::new();
        let symbols = Symbols::new(&order, &labels, &consts, &debugger);

        let text = symbols.to_string();
        assert!(text.contains("SPEED = 4\n"));
    }

    #[test]
    fn breakpoints_list_addresses_in_definition_order() {
        let labels = HashMap::new();
        let consts = HashMap::new();
        let order = Vec::new();
        let mut debugger = Debugger::new();
        debugger.breakpoint(Token::new("start", 3, 1), 0x200);
        debugger.breakpoint(Token::new("mid", 9, 1), 0x210);
        let symbols = Symbols::new(&order, &labels, &consts, &debugger);

        let text = symbols.to_string();
        assert!(text.contains("breakpoints=[0x0200, 0x0210]"));
    }
}
