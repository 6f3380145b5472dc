//! Arithmetic/bitwise expression evaluator for brace-delimited constant
//! expressions (`:calc`, `:byte { ... }`, `:alias ... { ... }`, …).
//!
//! The caller hands `calc` its body tokens in *reverse* source order (the
//! way the body was originally written, read back to front). A single
//! running accumulator and one pending operator are then enough to
//! evaluate the expression in one forward pass over that reversed stream,
//! which works out to right-associative evaluation of the original
//! expression: each binary operator combines the freshly-read operand with
//! the accumulator as `op(operand, accumulator)` rather than
//! `op(accumulator, operand)`. Because the token order is flipped, `(` and
//! `)` trade roles too: a `)` in the reversed stream is where a
//! parenthesized group *starts* (so it recurses to evaluate the group),
//! and `(` is where that recursive call returns to the enclosing one.
//!
//! Unary operators and functions (`sqrt`, `sin`, …) are written postfix —
//! after the value they apply to — and are applied to the accumulator the
//! moment the scan needs a number but finds another operator instead, or
//! at the end of the expression.
//!
//! The accumulator is kept as `f64` throughout — trigonometric functions
//! and `/` are genuinely floating-point — and callers coerce to an integer
//! only at the use site (masking per the ranged-number rules), the same way
//! the tokenizer's ranged acceptors round before masking.

use super::error::ParseError;
use super::token::Token;
use super::tokenizer::Tokenizer;

/// Evaluate an expression from `tokenizer` (already positioned so the next
/// `advance()` yields the first token of the expression, with the body fed
/// in reverse source order by the caller).
///
/// `rom_lookup` backs the `@` unary operator, reading a byte already
/// written to the program at the given address. `group_open` is the
/// closing-group token when this call is evaluating a parenthesized
/// subgroup recursively reached from an enclosing `calc` call; it is
/// `None` for the outermost call.
pub fn calc(
    tokenizer: &mut Tokenizer,
    rom_lookup: &dyn Fn(i64) -> Result<f64, ParseError>,
    group_open: Option<&Token>,
) -> Result<f64, ParseError> {
    let mut result = 0.0f64;
    let mut pending: Option<String> = Some("+".to_string());
    let mut token = tokenizer.advance();

    loop {
        let tok = match &token {
            Some(t) => t.clone(),
            None => break,
        };

        if tok.text == "(" {
            if group_open.is_none() {
                return Err(ParseError::new("unclosed group", tok));
            }
            break;
        }

        match pending.clone() {
            Some(op) => {
                let num = if tok.text == ")" {
                    Some(calc(tokenizer, rom_lookup, Some(&tok))?)
                } else {
                    tokenizer.accept_number()?
                };

                match num {
                    Some(n) => {
                        if !is_binary_op(&op) {
                            return Err(ParseError::new("unexpected number", tok));
                        }
                        result = apply_binary(&op, n, result, &tok)?;
                        pending = None;
                    }
                    None => {
                        if !is_unary_op(&op) || !is_binary_op(&tok.text) {
                            return Err(ParseError::new("expected number", tok));
                        }
                        result = apply_unary(&op, result, rom_lookup, &tok)?;
                        pending = Some(tok.text.clone());
                    }
                }
            }
            None => {
                pending = Some(tok.text.clone());
            }
        }

        token = tokenizer.advance();
    }

    if let Some(op) = pending.clone() {
        if is_unary_op(&op) {
            result = apply_unary(&op, result, rom_lookup, &token.clone().unwrap_or_else(|| Token::synthetic("<eof>")))?;
            pending = None;
        }
    }
    if let Some(op) = &pending {
        if is_binary_op(op) {
            let here = tokenizer.current().cloned().unwrap_or_else(|| Token::synthetic("<eof>"));
            return Err(ParseError::new("incomplete expression", here));
        }
    }
    if let Some(open) = group_open {
        let terminated_on_open = matches!(&token, Some(t) if t.text == "(");
        if !terminated_on_open {
            return Err(ParseError::new("unexpected )", open.clone()));
        }
    }

    Ok(result)
}

fn is_binary_op(op: &str) -> bool {
    matches!(
        op,
        "-" | "+" | "*" | "/" | "%" | "&" | "|" | "^" | "<<" | ">>" | "pow" | "min" | "max" | ">"
            | "<" | ">=" | "<="
    )
}

fn is_unary_op(op: &str) -> bool {
    matches!(
        op,
        "-" | "~" | "sin" | "cos" | "tan" | "exp" | "log" | "abs" | "sqrt" | "sign" | "ceil"
            | "floor" | "@"
    )
}

/// `bin[op](num, result)` — the right-side-first convention the spec calls
/// out explicitly: `num` is the operand just read, `result` is the
/// accumulator so far.
fn apply_binary(op: &str, num: f64, result: f64, token: &Token) -> Result<f64, ParseError> {
    Ok(match op {
        "-" => num - result,
        "+" => num + result,
        "*" => num * result,
        "/" => num / result,
        "%" => num % result,
        "&" => ((num as i64) & (result as i64)) as f64,
        "|" => ((num as i64) | (result as i64)) as f64,
        "^" => ((num as i64) ^ (result as i64)) as f64,
        "<<" => safe_shl(num as i64, result as i64) as f64,
        ">>" => safe_shr(num as i64, result as i64) as f64,
        "pow" => num.powf(result),
        "min" => num.min(result),
        "max" => num.max(result),
        ">" => bool_to_num(num > result),
        "<" => bool_to_num(num < result),
        ">=" => bool_to_num(num >= result),
        "<=" => bool_to_num(num <= result),
        other => return Err(ParseError::new(format!("unknown binary operator `{other}`"), token.clone())),
    })
}

fn apply_unary(
    op: &str,
    x: f64,
    rom_lookup: &dyn Fn(i64) -> Result<f64, ParseError>,
    token: &Token,
) -> Result<f64, ParseError> {
    Ok(match op {
        "-" => -x,
        "~" => !(x as i64) as f64,
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        "exp" => x.exp(),
        "log" => x.ln(),
        "abs" => x.abs(),
        "sqrt" => x.sqrt(),
        "sign" => bool_to_num(x > 0.0) - bool_to_num(x < 0.0),
        "ceil" => x.ceil(),
        "floor" => x.floor(),
        "@" => return rom_lookup(x.round() as i64),
        other => return Err(ParseError::new(format!("unknown unary operator `{other}`"), token.clone())),
    })
}

fn bool_to_num(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Shift amounts outside `0..64` can't be expressed as a native `i64`
/// shift without panicking; saturate to the value a mathematically
/// unbounded shift would produce.
fn safe_shl(value: i64, amount: i64) -> i64 {
    if (0..64).contains(&amount) { value << amount } else { 0 }
}

fn safe_shr(value: i64, amount: i64) -> i64 {
    if (0..64).contains(&amount) {
        value >> amount
    } else if value < 0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_rom(_addr: i64) -> Result<f64, ParseError> {
        Err(ParseError::new("no rom in this test", Token::synthetic("@")))
    }

    /// Build a tokenizer over `expr` (written in ordinary left-to-right
    /// notation) with its tokens reversed, matching how a brace-delimited
    /// body is actually handed to `calc`.
    fn expr_tokenizer(expr: &str) -> Tokenizer {
        let words: Vec<&str> = expr.split_whitespace().collect();
        let reversed: Vec<&str> = words.into_iter().rev().collect();
        Tokenizer::new(&reversed.join("\n"))
    }

    fn eval(expr: &str) -> f64 {
        let mut t = expr_tokenizer(expr);
        calc(&mut t, &no_rom, None).unwrap()
    }

    fn eval_err(expr: &str) -> ParseError {
        let mut t = expr_tokenizer(expr);
        calc(&mut t, &no_rom, None).unwrap_err()
    }

    #[test]
    fn simple_addition() {
        assert_eq!(eval("4 + 3"), 7.0);
    }

    #[test]
    fn chained_subtraction_is_right_associative() {
        assert_eq!(eval("5 - 4 + 3"), -2.0);
    }

    #[test]
    fn unary_minus_reinterprets_a_pending_binary_op() {
        assert_eq!(eval("5 - - 4 + 3"), 12.0);
    }

    #[test]
    fn leading_group() {
        assert_eq!(eval("( 4 * 2 ) + 2"), 10.0);
    }

    #[test]
    fn trailing_group() {
        assert_eq!(eval("4 * ( 2 + 2 )"), 16.0);
    }

    #[test]
    fn ungrouped_matches_grouped_when_associativity_does_not_matter() {
        assert_eq!(eval("4 * 2 + 2"), 16.0);
    }

    #[test]
    fn doubly_nested_group() {
        assert_eq!(eval("( ( 1 ) ) + 3"), 4.0);
    }

    #[test]
    fn deeply_nested_groups() {
        assert_eq!(eval("4 * ( 2 + ( 3 * ( 1 + 1 ) ) + 3 ) - 2"), 36.0);
    }

    #[test]
    fn leading_unary_minus() {
        assert_eq!(eval("- 1 * 6"), -6.0);
    }

    #[test]
    fn postfix_function_call() {
        assert_eq!(eval("16 sqrt"), 4.0);
    }

    #[test]
    fn unclosed_group_is_an_error() {
        let err = eval_err("( 4 * 2 + 2");
        assert!(err.message.contains("unclosed group"));
    }

    #[test]
    fn unmatched_close_is_an_error() {
        let err = eval_err("4 * 2 ) + 2");
        assert!(err.message.contains("unexpected )"));
    }

    #[test]
    fn two_numbers_in_a_row_is_an_error() {
        let err = eval_err("4 4 3");
        assert!(err.message.contains("unexpected number"));
    }

    #[test]
    fn leading_operator_is_an_error() {
        let err = eval_err("+ 4");
        assert!(err.message.contains("incomplete expression"));
    }

    #[test]
    fn two_binary_operators_in_a_row_is_an_error() {
        let err = eval_err("3 + + 4");
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn empty_group_is_an_error() {
        let err = eval_err("( )");
        assert!(err.message.contains("incomplete expression"));
    }

    #[test]
    fn rom_lookup_backs_the_at_operator() {
        let rom = [11.0, 2.0, 33.0, 44.0];
        let lookup = |n: i64| -> Result<f64, ParseError> {
            rom.get(n as usize).copied().ok_or_else(|| {
                ParseError::new("address out of range", Token::synthetic("@"))
            })
        };
        let mut t = expr_tokenizer("2 * @ 1 + @ 1");
        let v = calc(&mut t, &lookup, None).unwrap();
        assert_eq!(v, 88.0);
    }
}
