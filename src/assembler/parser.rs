//! [Parser]: recognizes a statement at the tokenizer's current position and
//! drives the [`Program`] emitter and the [`Tokenizer`]'s macro table.
//!
//! Macro expansion doesn't recurse: `expand_macro` only consumes the
//! invocation (name plus one argument token per parameter) and splices the
//! body onto the tokenizer's source stack. The ordinary statement loop then
//! walks straight through the spliced tokens as if they were written
//! in-line, and the tokenizer pops the macro frame transparently once it
//! runs dry — so nested macro calls cost stack depth in the token source
//! stack, never in Rust call frames.
//!
//! Every handler below follows one rule: it leaves `tokenizer.current()`
//! sitting on the last token *it* consumed, never past it.
//! [`Parser::parse`]'s loop is the only place that advances to the next
//! statement's first token; this keeps lookahead (register-range's
//! optional `- vY`, `if`'s `then`/`begin` suffix) simple because nothing
//! has been consumed prematurely.

use std::collections::HashMap;

use super::calc;
use super::error::ParseError;
use super::program::Program;
use super::token::{Location, Token};
use super::tokenizer::Tokenizer;

struct Macro {
    params: Vec<String>,
    body: Vec<Token>,
    calls: u64,
}

pub struct Parser<'a> {
    tokenizer: &'a mut Tokenizer,
    program: &'a mut Program,
    macros: HashMap<String, Macro>,
}

impl<'a> Parser<'a> {
    pub fn new(tokenizer: &'a mut Tokenizer, program: &'a mut Program) -> Parser<'a> {
        Parser { tokenizer, program, macros: HashMap::new() }
    }

    /// Drive the tokenizer to the end of input, dispatching one statement
    /// per iteration. Does not call [`Program::resolve`] — that is the
    /// assemble facade's job, once parsing succeeds.
    pub fn parse(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        while self.tokenizer.current().is_some() {
            self.statement()?;
            self.tokenizer.advance();
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<(), ParseError> {
        let start = self.tokenizer.current().cloned().expect("parse() only calls this with a current token");
        self.dispatch(start.clone()).map_err(|e| ParseError::wrap("Statement start", start, e))
    }

    fn dispatch(&mut self, tok: Token) -> Result<(), ParseError> {
        if self.macros.contains_key(&tok.text) {
            return self.expand_macro(tok);
        }
        if let Some(reg) = self.tokenizer.accept_register() {
            return self.register_operation(reg);
        }
        if tok.text == ":" {
            return self.label_definition();
        }
        if tok.text == ";" {
            return self.program.ret();
        }
        if self.program.labels().contains_key(&tok.text) {
            return self.program.call(Location::Label(tok));
        }
        if let Some(byte) = self.tokenizer.accept_byte()? {
            return self.program.emit_byte(byte);
        }
        self.directive_or_mnemonic(tok)
    }

    // -- macro expansion ---------------------------------------------------

    fn expand_macro(&mut self, name: Token) -> Result<(), ParseError> {
        let (params, body, calls) = {
            let mac = self.macros.get(&name.text).expect("checked by caller");
            (mac.params.clone(), mac.body.clone(), mac.calls)
        };

        let mut mapping = HashMap::new();
        for param in &params {
            let arg = self.tokenizer.advance().ok_or_else(|| {
                ParseError::new(format!("missing argument `{param}` for macro `{}`", name.text), name.clone())
            })?;
            mapping.insert(param.clone(), arg.text);
        }

        self.tokenizer.emit_macro(calls, body, mapping);
        self.macros.get_mut(&name.text).unwrap().calls += 1;
        Ok(())
    }

    // -- labels --------------------------------------------------------------

    fn label_definition(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let name = self.tokenizer.expect_ident()?;
        self.program.track_label(name, 0)
    }

    fn next_label(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let name = self.tokenizer.expect_ident()?;
        self.program.track_label(name, 1)
    }

    // -- register operations -------------------------------------------------

    fn register_operation(&mut self, dst: u8) -> Result<(), ParseError> {
        let op_tok = self
            .tokenizer
            .advance()
            .ok_or_else(|| ParseError::new("expected an operator after a register", Token::synthetic("<eof>")))?;
        self.tokenizer.advance();
        self.register_rhs(dst, &op_tok)
    }

    fn register_rhs(&mut self, dst: u8, op_tok: &Token) -> Result<(), ParseError> {
        match op_tok.text.as_str() {
            ":=" => {
                if let Some(src) = self.tokenizer.accept_register() {
                    return self.program.alu(dst, src, 0);
                }
                let cur = self.tokenizer.current().cloned().ok_or_else(|| {
                    ParseError::new("expected a value after `:=`", op_tok.clone())
                })?;
                match cur.text.as_str() {
                    "delay" => self.program.load_delay(dst),
                    "key" => self.program.wait_for_key(dst),
                    "random" => {
                        let mask = self.tokenizer.next_byte()?;
                        self.program.random(dst, mask)
                    }
                    _ => {
                        let n = self.tokenizer.expect_byte()?;
                        self.program.load_immediate(dst, n)
                    }
                }
            }
            "+=" => {
                if let Some(src) = self.tokenizer.accept_register() {
                    return self.program.alu(dst, src, 4);
                }
                let n = self.tokenizer.expect_byte()?;
                self.program.add_immediate(dst, n)
            }
            "-=" => {
                if let Some(src) = self.tokenizer.accept_register() {
                    return self.program.alu(dst, src, 5);
                }
                let n = self.tokenizer.expect_byte()?;
                self.program.add_immediate(dst, 0u8.wrapping_sub(n))
            }
            "|=" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 1)
            }
            "&=" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 2)
            }
            "^=" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 3)
            }
            ">>=" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 6)
            }
            "=-" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 7)
            }
            "<<=" => {
                let src = self.tokenizer.expect_register()?;
                self.program.alu(dst, src, 0xE)
            }
            other => Err(ParseError::new(format!("unknown register operator `{other}`"), op_tok.clone())),
        }
    }

    // -- `i := ...` ------------------------------------------------------

    fn i_assignment(&mut self) -> Result<(), ParseError> {
        let op = self
            .tokenizer
            .advance()
            .ok_or_else(|| ParseError::new("expected `:=` or `+=` after `i`", Token::synthetic("i")))?;
        self.tokenizer.advance();

        if op.text == "+=" {
            let reg = self.tokenizer.expect_register()?;
            return self.program.add_to_i(reg);
        }
        if op.text != ":=" {
            return Err(ParseError::new("`i` only takes `:=` or `+=`", op));
        }

        let cur_text = self
            .tokenizer
            .current()
            .map(|t| t.text.clone())
            .ok_or_else(|| ParseError::new("expected a value after `i :=`", op.clone()))?;
        match cur_text.as_str() {
            "hex" => {
                let src = self.tokenizer.next_register()?;
                self.program.load_hex_sprite(src)
            }
            "bighex" => {
                let src = self.tokenizer.next_register()?;
                self.program.load_big_hex_sprite(src)
            }
            "long" => {
                let loc = self.tokenizer.next_long_location()?;
                self.program.load_i_long(loc)
            }
            _ => {
                let loc = self.tokenizer.expect_location()?;
                self.program.load_i(loc)
            }
        }
    }

    // -- conditionals ------------------------------------------------------

    /// Read `vA OP B`, leaving `current` on the last token of `B` (or of
    /// `OP` itself for the operand-less `key`/`-key`).
    fn parse_condition(&mut self) -> Result<(u8, String, Option<u8>, Option<u8>), ParseError> {
        let a = self.tokenizer.expect_register()?;
        let op_tok = self
            .tokenizer
            .advance()
            .ok_or_else(|| ParseError::new("expected a comparison operator", Token::synthetic("<eof>")))?;
        let op = op_tok.text.clone();

        let mut bn = None;
        let mut br = None;
        if op != "key" && op != "-key" {
            self.tokenizer.advance();
            bn = self.tokenizer.accept_byte()?;
            if bn.is_none() {
                br = Some(self.tokenizer.expect_register()?);
            }
        }
        Ok((a, op, bn, br))
    }

    fn opposite(op: &str, token: &Token) -> Result<String, ParseError> {
        let dual = match op {
            "==" => "!=",
            "!=" => "==",
            "<" => ">=",
            ">=" => "<",
            ">" => "<=",
            "<=" => ">",
            "key" => "-key",
            "-key" => "key",
            other => return Err(ParseError::new(format!("unknown comparison operator `{other}`"), token.clone())),
        };
        Ok(dual.to_string())
    }

    /// Emit the skip instruction(s) for `vA OP B`, inverting `OP` first
    /// when the construct (`begin`, `while`) needs to skip *around* a body
    /// rather than skip a single following instruction.
    fn emit_condition(
        &mut self,
        a: u8,
        op: &str,
        bn: Option<u8>,
        br: Option<u8>,
        invert: bool,
        token: &Token,
    ) -> Result<(), ParseError> {
        let op = if invert { Self::opposite(op, token)? } else { op.to_string() };
        let is_num = bn.is_some();

        if matches!(op.as_str(), "<" | ">" | "<=" | ">=") {
            match bn {
                Some(n) => self.program.load_immediate(0xF, n)?,
                None => self.program.alu(0xF, br.expect("B is a number or a register"), 0)?,
            }
        }
        if matches!(op.as_str(), ">" | "<=") {
            self.program.alu(0xF, a, 5)?;
        }
        if matches!(op.as_str(), "<" | ">=") {
            self.program.alu(0xF, a, 7)?;
        }

        match op.as_str() {
            "-key" => self.program.skip_if_key_pressed(a),
            "key" => self.program.skip_if_key_not_pressed(a),
            "==" => {
                if is_num {
                    self.program.skip_neq_immediate(a, bn.unwrap())
                } else {
                    self.program.skip_neq_register(a, br.unwrap())
                }
            }
            "!=" => {
                if is_num {
                    self.program.skip_eq_immediate(a, bn.unwrap())
                } else {
                    self.program.skip_eq_register(a, br.unwrap())
                }
            }
            "<" | ">" => self.program.skip_neq_immediate(0xF, 0),
            "<=" | ">=" => self.program.skip_eq_immediate(0xF, 0),
            other => Err(ParseError::new(format!("unknown comparison operator `{other}`"), token.clone())),
        }
    }

    fn if_stmt(&mut self) -> Result<(), ParseError> {
        let if_tok = self.tokenizer.current().cloned().expect("dispatched on `if`");
        self.tokenizer.advance();
        let (a, op, bn, br) = self.parse_condition()?;
        let body_tok = self
            .tokenizer
            .advance()
            .ok_or_else(|| ParseError::new("expected `then` or `begin`", if_tok.clone()))?;

        match body_tok.text.as_str() {
            "then" => self.emit_condition(a, &op, bn, br, false, &body_tok),
            "begin" => {
                self.emit_condition(a, &op, bn, br, true, &body_tok)?;
                self.program.emit_begin()
            }
            other => Err(ParseError::new(format!("expected `then` or `begin`, found `{other}`"), body_tok)),
        }
    }

    fn while_stmt(&mut self) -> Result<(), ParseError> {
        let while_tok = self.tokenizer.current().cloned().expect("dispatched on `while`");
        self.tokenizer.advance();
        let (a, op, bn, br) = self.parse_condition()?;
        self.emit_condition(a, &op, bn, br, true, &while_tok)?;
        self.program.emit_while(&while_tok)
    }

    // -- `save`/`load`, optionally ranged ----------------------------------

    fn save_or_load(&mut self, is_save: bool) -> Result<(), ParseError> {
        let x = self.tokenizer.next_register()?;
        let lookahead = self.tokenizer.advance();
        if lookahead.as_ref().map(|t| t.text == "-").unwrap_or(false) {
            let y = self.tokenizer.next_register()?;
            return if is_save { self.program.save_range(x, y) } else { self.program.load_range(x, y) };
        }
        self.tokenizer.unadvance();
        if is_save { self.program.save(x) } else { self.program.load(x) }
    }

    fn delay_or_buzzer(&mut self, is_delay: bool) -> Result<(), ParseError> {
        let assign = self
            .tokenizer
            .advance()
            .ok_or_else(|| ParseError::new("expected `:=`", Token::synthetic("<eof>")))?;
        if assign.text != ":=" {
            return Err(ParseError::new(format!("expected `:=`, found `{}`", assign.text), assign));
        }
        let x = self.tokenizer.next_register()?;
        if is_delay { self.program.store_delay(x) } else { self.program.store_buzzer(x) }
    }

    // -- brace-delimited expressions ---------------------------------------

    /// `current()` is `{`; collects tokens up to the matching `}` (counting
    /// nested depth so a macro call or nested group inside the expression
    /// doesn't end it early), binds `HERE` to the program counter, and hands
    /// the reversed body to [`calc::calc`] on a standalone sub-tokenizer
    /// that shares the enclosing constant table.
    fn eval_braced_expr(&mut self) -> Result<f64, ParseError> {
        let open = self.tokenizer.current().cloned().expect("caller checked for `{`");
        let mut body = Vec::new();
        let mut depth = 1;
        loop {
            let tok = self
                .tokenizer
                .advance()
                .ok_or_else(|| ParseError::new("unclosed expression", open.clone()))?;
            if tok.text == "{" {
                depth += 1;
            }
            if tok.text == "}" {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            body.push(tok);
        }
        body.reverse();

        self.tokenizer.define_const("HERE", self.program.pc() as f64);
        let consts = self.tokenizer.consts().clone();
        let mut sub = Tokenizer::over_tokens(body, consts);
        let program: &Program = self.program;
        let lookup = |addr: i64| program.lookup(addr);
        calc::calc(&mut sub, &lookup, None)
    }

    // -- directives ----------------------------------------------------------

    fn alias_directive(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let dst = self.tokenizer.expect_ident()?;
        self.tokenizer.advance();
        if self.tokenizer.current().map(|t| t.text == "{").unwrap_or(false) {
            let value = self.eval_braced_expr()?;
            let nybble = value.round() as i64;
            if !(0..=15).contains(&nybble) {
                let here = self.tokenizer.current().cloned().unwrap();
                return Err(ParseError::new(format!("alias value {nybble} out of range [0, 15]"), here));
            }
            self.tokenizer.alias_register(dst.text, nybble as u8);
            return Ok(());
        }
        let src = self.tokenizer.expect_register()?;
        self.tokenizer.alias_register(dst.text, src);
        Ok(())
    }

    fn byte_directive(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        if self.tokenizer.current().map(|t| t.text == "{").unwrap_or(false) {
            let value = self.eval_braced_expr()?;
            let n = value.round() as i64;
            if !(-127..=255).contains(&n) {
                let here = self.tokenizer.current().cloned().unwrap();
                return Err(ParseError::new(format!("byte value {n} out of range [-127, 255]"), here));
            }
            return self.program.emit_byte((n & 0xFF) as u8);
        }
        let b = self.tokenizer.expect_byte()?;
        self.program.emit_byte(b)
    }

    fn calc_directive(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let name = self.tokenizer.expect_ident()?;
        self.tokenizer.advance();
        let value = self.eval_braced_expr()?;
        self.tokenizer.define_const(name.text, value);
        Ok(())
    }

    fn const_directive(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let name = self.tokenizer.expect_ident()?;
        let value = self.tokenizer.next_number()?;
        self.tokenizer.define_const(name.text, value);
        Ok(())
    }

    fn macro_directive(&mut self) -> Result<(), ParseError> {
        self.tokenizer.advance();
        let name = self.tokenizer.expect_ident()?;
        let mut params = Vec::new();
        loop {
            let tok = self
                .tokenizer
                .advance()
                .ok_or_else(|| ParseError::new("unclosed macro definition", name.clone()))?;
            if tok.text == "{" {
                break;
            }
            params.push(tok.text);
        }
        let mut body = Vec::new();
        let mut depth = 1;
        loop {
            let tok = self
                .tokenizer
                .advance()
                .ok_or_else(|| ParseError::new("unclosed macro body", name.clone()))?;
            if tok.text == "{" {
                depth += 1;
            }
            if tok.text == "}" {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            body.push(tok);
        }
        self.macros.insert(name.text, Macro { params, body, calls: 0 });
        Ok(())
    }

    fn org_directive(&mut self) -> Result<(), ParseError> {
        let org_tok = self.tokenizer.current().cloned().expect("dispatched on `:org`");
        let addr = self.tokenizer.next_long_address()?;
        self.program.org(addr, &org_tok);
        Ok(())
    }

    fn breakpoint_directive(&mut self) -> Result<(), ParseError> {
        let name = self.tokenizer.next_ident()?;
        self.program.breakpoint(name);
        Ok(())
    }

    fn monitor_directive(&mut self) -> Result<(), ParseError> {
        let addr = self.tokenizer.next_address()?;
        let length = self.tokenizer.next_number()?;
        self.program.monitor(addr, length.round() as u16);
        Ok(())
    }

    fn unpack_directive(&mut self) -> Result<(), ParseError> {
        let msn = self.tokenizer.next_nybble()?;
        let name = self.tokenizer.next_ident()?;
        self.program.emit_unpack(msn, name)
    }

    // -- keywords and the bare-call fallback --------------------------------

    fn directive_or_mnemonic(&mut self, tok: Token) -> Result<(), ParseError> {
        match tok.text.as_str() {
            ":next" => self.next_label(),
            ":unpack" => self.unpack_directive(),
            ":alias" => self.alias_directive(),
            ":byte" => self.byte_directive(),
            ":calc" => self.calc_directive(),
            ":const" => self.const_directive(),
            ":macro" => self.macro_directive(),
            ":org" => self.org_directive(),
            ":breakpoint" => self.breakpoint_directive(),
            ":monitor" => self.monitor_directive(),

            "exit" => self.program.exit(),
            "clear" => self.program.cls(),
            "scroll-down" => {
                let n = self.tokenizer.next_nybble()?;
                self.program.scroll_down(n)
            }
            "scroll-up" => {
                let n = self.tokenizer.next_nybble()?;
                self.program.scroll_up(n)
            }
            "scroll-left" => self.program.scroll_left(),
            "scroll-right" => self.program.scroll_right(),
            "hires" => self.program.hires(),
            "lores" => self.program.lores(),
            "plane" => {
                let n = self.tokenizer.next_nybble()?;
                self.program.plane(n)
            }
            "audio" => self.program.audio(),

            "save" => self.save_or_load(true),
            "load" => self.save_or_load(false),
            "saveflags" => {
                let x = self.tokenizer.next_register()?;
                self.program.save_flags(x)
            }
            "loadflags" => {
                let x = self.tokenizer.next_register()?;
                self.program.load_flags(x)
            }
            "bcd" => {
                let x = self.tokenizer.next_register()?;
                self.program.bcd(x)
            }

            "jump" => {
                let loc = self.tokenizer.next_location()?;
                self.program.jump(loc)
            }
            "jump0" => {
                let loc = self.tokenizer.next_location()?;
                self.program.jump0(loc)
            }

            "loop" => {
                self.program.start_loop();
                Ok(())
            }
            "again" => self.program.end_loop(&tok),

            "delay" => self.delay_or_buzzer(true),
            "buzzer" => self.delay_or_buzzer(false),

            "sprite" => {
                let x = self.tokenizer.next_register()?;
                let y = self.tokenizer.next_register()?;
                let n = self.tokenizer.next_nybble()?;
                self.program.sprite(x, y, n)
            }

            "i" => self.i_assignment(),
            "if" => self.if_stmt(),
            "while" => self.while_stmt(),

            "else" => {
                if !self.program.emit_else(&tok)? {
                    return Err(ParseError::new("`else` without a matching `if ... begin`", tok));
                }
                Ok(())
            }
            "end" => {
                if !self.program.emit_end(&tok)? {
                    return Err(ParseError::new("`end` without a matching `if ... begin`", tok));
                }
                Ok(())
            }

            _ => match self.tokenizer.expect_ident() {
                Ok(target) => self.program.call(Location::Label(target)),
                Err(_) => Err(ParseError::new(
                    "expected a number or identifier to start a statement",
                    tok,
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(source: &str) -> (Vec<u8>, Program) {
        let mut tokenizer = Tokenizer::new(source);
        let mut program = Program::new();
        {
            let mut parser = Parser::new(&mut tokenizer, &mut program);
            parser.parse().unwrap();
        }
        program.resolve().unwrap();
        (program.bytes().to_vec(), program)
    }

    #[test]
    fn minimum_program() {
        let (bytes, _) = assemble(": main\n  v0 := 1\n  exit");
        assert_eq!(bytes, vec![0x60, 0x01, 0x00, 0xFD]);
    }

    #[test]
    fn auto_main_jump_when_first_label_is_not_main() {
        let (bytes, program) = assemble(": foo  v0 := 2\n: main  exit");
        assert_eq!(bytes, vec![0x12, 0x04, 0x60, 0x02, 0x00, 0xFD]);
        assert_eq!(program.labels()["foo"], 0x202);
        assert_eq!(program.labels()["main"], 0x204);
    }

    #[test]
    fn loop_again() {
        let (bytes, _) = assemble(": main loop  v0 += 1 again");
        assert_eq!(bytes, vec![0x70, 0x01, 0x12, 0x00]);
    }

    #[test]
    fn if_then_inverts_nothing() {
        let (bytes, _) = assemble(": main if v0 == 0 then v1 := 9\n exit");
        assert_eq!(bytes, vec![0x40, 0x00, 0x61, 0x09, 0x00, 0xFD]);
    }

    #[test]
    fn if_begin_else_end_inverts_the_condition() {
        let (bytes, _) =
            assemble(": main if v0 != 0 begin v1 := 1 else v1 := 2 end exit");
        // != inverted to == for the skip-over-the-jump encoding: SNE v0, 0
        assert_eq!(&bytes[0..2], &[0x40, 0x00]);
        // then-branch JMP (patched past the else-jump), else body, else JMP
        // (patched past `end`), exit.
        assert_eq!(bytes.last_chunk::<2>().unwrap(), &[0x00, 0xFD]);
    }

    #[test]
    fn unpack_splits_a_forward_labels_address_across_two_loads() {
        let (bytes, program) = assemble(": main\n  :unpack 3 sprite\n: sprite\n  0xAB");
        let target = program.labels()["sprite"];
        assert_eq!(bytes[0], 0x60);
        assert_eq!(bytes[1] & 0xF0, 0x30); // msn prefix survives the patch
        assert_eq!(bytes[1] & 0x0F, ((target >> 8) & 0xF) as u8);
        assert_eq!(bytes[2], 0x61);
        assert_eq!(bytes[3], (target & 0xFF) as u8);
        assert_eq!(bytes[4], 0xAB);
    }

    #[test]
    fn duplicate_label_is_a_parse_error() {
        let mut tokenizer = Tokenizer::new(": main exit\n: main exit");
        let mut program = Program::new();
        let mut parser = Parser::new(&mut tokenizer, &mut program);
        assert!(parser.parse().is_err());
    }

    #[test]
    fn unresolved_call_fails_at_resolve_time() {
        let mut tokenizer = Tokenizer::new(": main nowhere");
        let mut program = Program::new();
        {
            let mut parser = Parser::new(&mut tokenizer, &mut program);
            parser.parse().unwrap();
        }
        assert!(program.resolve().is_err());
    }

    #[test]
    fn comparison_direction_matches_the_alu_subtraction_table() {
        // `>` and `<=` subtract A from a loaded B (ALU op 5); `<` and `>=`
        // subtract the other way (ALU op 7). Both then compare vF to 0 in
        // the direction appropriate to whether the check is strict.
        let cases = [
            (">", [0x8F, 0x05]),
            ("<=", [0x8F, 0x05]),
            ("<", [0x8F, 0x07]),
            (">=", [0x8F, 0x07]),
        ];
        for (op, sub_bytes) in cases {
            let source = format!(": main if v0 {op} 5 begin end exit");
            let (bytes, _) = assemble(&source);
            // bytes[0..2] = LDN vF, 5; bytes[2..4] = the ALU subtraction.
            assert_eq!(&bytes[0..2], &[0x6F, 0x05], "op {op}: VF load");
            assert_eq!(&bytes[2..4], &sub_bytes, "op {op}: subtraction direction");
        }
    }

    #[test]
    fn alias_binds_a_name_to_a_register() {
        let mut tokenizer = Tokenizer::new(":alias counter v3\n counter := 1");
        let mut program = Program::new();
        let mut parser = Parser::new(&mut tokenizer, &mut program);
        parser.parse().unwrap();
        assert_eq!(program.bytes(), &[0x63, 0x01]);
    }

    #[test]
    fn const_and_calc_feed_byte_directives() {
        let mut tokenizer = Tokenizer::new(":const N 2\n:calc DOUBLE { N 2 * }\n:byte { DOUBLE }");
        let mut program = Program::new();
        let mut parser = Parser::new(&mut tokenizer, &mut program);
        parser.parse().unwrap();
        assert_eq!(program.bytes(), &[4]);
    }

    #[test]
    fn macro_expansion_splices_parameters_without_recursion() {
        let mut tokenizer = Tokenizer::new(":macro inc x { x += 1 }\n inc v2\n inc v2");
        let mut program = Program::new();
        let mut parser = Parser::new(&mut tokenizer, &mut program);
        parser.parse().unwrap();
        assert_eq!(program.bytes(), &[0x72, 0x01, 0x72, 0x01]);
    }
}
