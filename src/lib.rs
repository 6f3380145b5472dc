//! An assembler for an extended CHIP-8 assembly language (Octo), featuring:
//! - a tokenizer and macro-splicing layer
//! - a brace-delimited arithmetic expression evaluator
//! - a single-pass emitter with label backpatching and structured control flow

pub mod assembler;
pub mod logging;
