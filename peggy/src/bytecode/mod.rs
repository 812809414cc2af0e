//! # Bytecode
//!
//! Rules are lowered to a linear instruction sequence for a small stack machine, whose stack holds
//! values, saved input positions and failure markers.
//!
//! Conditional and loop instructions carry the length (in instructions) of the blocks following them inline,
//! which makes the bytecode position-independent: a block can be moved or copied without patching jumps.
//!
//! Constants (literals, character classes, expectations and code blocks) are not embedded in the instructions
//! but referenced by their index in the [`ConstTables`].

mod encoding;
mod tables;

pub use encoding::*;
pub use tables::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single bytecode instruction
///
/// Stack offsets (`LoadSavedPos`, `Pluck`, `Call`) are counted from the top of the stack, `0` being the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    PushEmptyString,
    PushUndefined,
    PushNull,
    PushFailed,
    PushEmptyArray,
    PushCurrPos,

    Pop,
    /// Pop a saved position and restore it as the current one
    PopCurrPos,
    PopN(usize),
    /// Pop the value below the top of the stack
    Nip,
    /// Pop a value and append it to the array below it
    Append,
    /// Replace the `n` topmost values by an array containing them
    Wrap(usize),
    /// Replace a saved position by the input text between it and the current position
    Text,
    /// Pop `pop` values and push the picked ones (a single value if there is only one)
    Pluck { pop: usize, picks: Vec<usize> },

    /// Run the `then_len` next instructions if the condition holds, the `else_len` following ones otherwise
    Branch {
        cond: Cond,
        then_len: usize,
        else_len: usize,
    },
    /// Run the `body_len` next instructions until the top of the stack is a failure
    WhileNotError { body_len: usize },
    /// Same as [`Instruction::WhileNotError`], but also stops once the body matched without consuming input
    WhileProgressing { body_len: usize },

    /// Push the `n` next characters and move past them
    AcceptN(usize),
    /// Push a literal and move past it
    AcceptString(usize),
    /// Push the input matched by a lowercased literal, case-insensitively, and move past it
    AcceptStringIc(usize),
    /// Push a failure, recording the expectation unless failures are silenced
    Fail(Option<usize>),

    LoadSavedPos(usize),
    UpdateSavedPos,
    /// Call a code block with the provided arguments, pop `pop` values and push its result
    Call {
        function: usize,
        pop: usize,
        args: Vec<usize>,
    },
    /// Match another rule, by index
    Rule(usize),

    SilentFailsOn,
    SilentFailsOff,
}

/// Condition of a [`Instruction::Branch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cond {
    /// The top of the stack is truthy
    If,
    IfError,
    IfNotError,
    /// There is remaining input
    MatchAny,
    /// The remaining input starts with a literal
    MatchString(usize),
    /// The remaining input starts with a lowercased literal, case-insensitively
    MatchStringIc(usize),
    /// The next character is matched by a class
    MatchClass(usize),
}

/// Build a conditional block, folding it when the condition is statically known
pub fn build_condition(
    known: Option<bool>,
    cond: Cond,
    then_code: Vec<Instruction>,
    else_code: Vec<Instruction>,
) -> Vec<Instruction> {
    match known {
        Some(true) => then_code,
        Some(false) => else_code,
        None => {
            let mut code = Vec::with_capacity(1 + then_code.len() + else_code.len());

            code.push(Instruction::Branch {
                cond,
                then_len: then_code.len(),
                else_len: else_code.len(),
            });

            code.extend(then_code);
            code.extend(else_code);
            code
        }
    }
}

/// Build a loop running its body while the top of the stack isn't a failure
///
/// A `guarded` loop also stops as soon as an iteration doesn't advance the input.
pub fn build_loop(body: Vec<Instruction>, guarded: bool) -> Vec<Instruction> {
    let mut code = Vec::with_capacity(1 + body.len());
    let body_len = body.len();

    code.push(if guarded {
        Instruction::WhileProgressing { body_len }
    } else {
        Instruction::WhileNotError { body_len }
    });

    code.extend(body);
    code
}

impl Instruction {
    /// Get the instruction's mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::PushEmptyString => "PUSH_EMPTY_STRING",
            Self::PushUndefined => "PUSH_UNDEFINED",
            Self::PushNull => "PUSH_NULL",
            Self::PushFailed => "PUSH_FAILED",
            Self::PushEmptyArray => "PUSH_EMPTY_ARRAY",
            Self::PushCurrPos => "PUSH_CURR_POS",
            Self::Pop => "POP",
            Self::PopCurrPos => "POP_CURR_POS",
            Self::PopN(_) => "POP_N",
            Self::Nip => "NIP",
            Self::Append => "APPEND",
            Self::Wrap(_) => "WRAP",
            Self::Text => "TEXT",
            Self::Pluck { .. } => "PLUCK",
            Self::Branch { cond, .. } => match cond {
                Cond::If => "IF",
                Cond::IfError => "IF_ERROR",
                Cond::IfNotError => "IF_NOT_ERROR",
                Cond::MatchAny => "MATCH_ANY",
                Cond::MatchString(_) => "MATCH_STRING",
                Cond::MatchStringIc(_) => "MATCH_STRING_IC",
                Cond::MatchClass(_) => "MATCH_CHAR_CLASS",
            },
            Self::WhileNotError { .. } => "WHILE_NOT_ERROR",
            Self::WhileProgressing { .. } => "WHILE_PROGRESSING",
            Self::AcceptN(_) => "ACCEPT_N",
            Self::AcceptString(_) => "ACCEPT_STRING",
            Self::AcceptStringIc(_) => "ACCEPT_STRING_IC",
            Self::Fail(_) => "FAIL",
            Self::LoadSavedPos(_) => "LOAD_SAVED_POS",
            Self::UpdateSavedPos => "UPDATE_SAVED_POS",
            Self::Call { .. } => "CALL",
            Self::Rule(_) => "RULE",
            Self::SilentFailsOn => "SILENT_FAILS_ON",
            Self::SilentFailsOff => "SILENT_FAILS_OFF",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())?;

        match self {
            Self::PopN(n) | Self::Wrap(n) | Self::AcceptN(n) | Self::LoadSavedPos(n) => {
                write!(f, " {}", n)
            }
            Self::AcceptString(index) | Self::AcceptStringIc(index) | Self::Rule(index) => {
                write!(f, " #{}", index)
            }
            Self::Fail(Some(index)) => write!(f, " #{}", index),
            Self::Fail(None) => Ok(()),
            Self::Pluck { pop, picks } => write!(f, " {} {:?}", pop, picks),
            Self::Call {
                function,
                pop,
                args,
            } => write!(f, " #{} {} {:?}", function, pop, args),
            Self::Branch { cond, .. } => match cond {
                Cond::MatchString(index) | Cond::MatchStringIc(index) | Cond::MatchClass(index) => {
                    write!(f, " #{}", index)
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

/// Render a bytecode sequence as indented text, one instruction per line
pub fn disassemble(code: &[Instruction]) -> String {
    let mut out = String::new();
    disassemble_block(code, 0, &mut out);
    out
}

fn disassemble_block(code: &[Instruction], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let mut ip = 0;

    while ip < code.len() {
        let instr = &code[ip];
        out.push_str(&format!("{}{}\n", indent, instr));
        ip += 1;

        match *instr {
            Instruction::Branch {
                then_len, else_len, ..
            } => {
                let then_end = (ip + then_len).min(code.len());
                let else_end = (then_end + else_len).min(code.len());

                disassemble_block(&code[ip..then_end], depth + 1, out);

                if else_len > 0 {
                    out.push_str(&format!("{}ELSE\n", indent));
                    disassemble_block(&code[then_end..else_end], depth + 1, out);
                }

                ip = else_end;
            }
            Instruction::WhileNotError { body_len } | Instruction::WhileProgressing { body_len } => {
                let body_end = (ip + body_len).min(code.len());
                disassemble_block(&code[ip..body_end], depth + 1, out);
                ip = body_end;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_conditions_are_folded() {
        let then_code = vec![Instruction::Pop];
        let else_code = vec![Instruction::PushFailed];

        assert_eq!(
            build_condition(Some(true), Cond::If, then_code.clone(), else_code.clone()),
            then_code
        );
        assert_eq!(
            build_condition(Some(false), Cond::If, then_code.clone(), else_code.clone()),
            else_code
        );
        assert_eq!(
            build_condition(None, Cond::IfError, then_code, else_code),
            vec![
                Instruction::Branch {
                    cond: Cond::IfError,
                    then_len: 1,
                    else_len: 1
                },
                Instruction::Pop,
                Instruction::PushFailed
            ]
        );
    }

    #[test]
    fn disassembly_indents_blocks() {
        let mut code = vec![Instruction::PushEmptyArray];
        code.extend(build_loop(vec![Instruction::Append, Instruction::Rule(1)], false));
        code.extend(build_condition(
            None,
            Cond::MatchString(0),
            vec![Instruction::AcceptString(0)],
            vec![Instruction::Fail(Some(2))],
        ));

        assert_eq!(
            disassemble(&code),
            "PUSH_EMPTY_ARRAY\nWHILE_NOT_ERROR\n  APPEND\n  RULE #1\nMATCH_STRING #0\n  ACCEPT_STRING #0\nELSE\n  FAIL #2\n"
        );
    }
}
