use super::{Cond, Instruction};

/// Opcodes of the flat encoding
pub mod op {
    pub const PUSH_UNDEFINED: u32 = 1;
    pub const PUSH_NULL: u32 = 2;
    pub const PUSH_FAILED: u32 = 3;
    pub const PUSH_EMPTY_ARRAY: u32 = 4;
    pub const PUSH_CURR_POS: u32 = 5;
    pub const POP: u32 = 6;
    pub const POP_CURR_POS: u32 = 7;
    pub const POP_N: u32 = 8;
    pub const NIP: u32 = 9;
    pub const APPEND: u32 = 10;
    pub const WRAP: u32 = 11;
    pub const TEXT: u32 = 12;
    pub const IF: u32 = 13;
    pub const IF_ERROR: u32 = 14;
    pub const IF_NOT_ERROR: u32 = 15;
    pub const WHILE_NOT_ERROR: u32 = 16;
    pub const MATCH_ANY: u32 = 17;
    pub const MATCH_STRING: u32 = 18;
    pub const MATCH_STRING_IC: u32 = 19;
    pub const MATCH_CHAR_CLASS: u32 = 20;
    pub const ACCEPT_N: u32 = 21;
    pub const ACCEPT_STRING: u32 = 22;
    pub const FAIL: u32 = 23;
    pub const LOAD_SAVED_POS: u32 = 24;
    pub const UPDATE_SAVED_POS: u32 = 25;
    pub const CALL: u32 = 26;
    pub const RULE: u32 = 27;
    pub const SILENT_FAILS_ON: u32 = 28;
    pub const SILENT_FAILS_OFF: u32 = 29;
    pub const WHILE_PROGRESSING: u32 = 30;
    pub const ACCEPT_STRING_IC: u32 = 31;
    pub const PUSH_EMPTY_STRING: u32 = 35;
    pub const PLUCK: u32 = 36;
}

/// Operand of `FAIL` for rules that don't report failures
pub const NO_EXPECTATION: u32 = u32::MAX;

/// Encode a bytecode sequence as a flat list of words
///
/// Each instruction is its opcode followed by its operands. Variable-length operands (`PLUCK` picks,
/// `CALL` arguments) are prefixed with their count. Block lengths of `IF*`, `MATCH_*` and `WHILE_*`
/// are counted in words of the encoded blocks.
pub fn encode(code: &[Instruction]) -> Vec<u32> {
    let mut out = vec![];
    let mut ip = 0;

    while ip < code.len() {
        let instr = &code[ip];
        ip += 1;

        match instr {
            Instruction::PushEmptyString => out.push(op::PUSH_EMPTY_STRING),
            Instruction::PushUndefined => out.push(op::PUSH_UNDEFINED),
            Instruction::PushNull => out.push(op::PUSH_NULL),
            Instruction::PushFailed => out.push(op::PUSH_FAILED),
            Instruction::PushEmptyArray => out.push(op::PUSH_EMPTY_ARRAY),
            Instruction::PushCurrPos => out.push(op::PUSH_CURR_POS),
            Instruction::Pop => out.push(op::POP),
            Instruction::PopCurrPos => out.push(op::POP_CURR_POS),
            Instruction::PopN(n) => out.extend([op::POP_N, word(*n)]),
            Instruction::Nip => out.push(op::NIP),
            Instruction::Append => out.push(op::APPEND),
            Instruction::Wrap(n) => out.extend([op::WRAP, word(*n)]),
            Instruction::Text => out.push(op::TEXT),
            Instruction::Pluck { pop, picks } => {
                out.extend([op::PLUCK, word(*pop), word(picks.len())]);
                out.extend(picks.iter().map(|pick| word(*pick)));
            }

            Instruction::Branch {
                cond,
                then_len,
                else_len,
            } => {
                let then_end = (ip + then_len).min(code.len());
                let else_end = (then_end + else_len).min(code.len());

                let then_words = encode(&code[ip..then_end]);
                let else_words = encode(&code[then_end..else_end]);

                match cond {
                    Cond::If => out.push(op::IF),
                    Cond::IfError => out.push(op::IF_ERROR),
                    Cond::IfNotError => out.push(op::IF_NOT_ERROR),
                    Cond::MatchAny => out.push(op::MATCH_ANY),
                    Cond::MatchString(index) => out.extend([op::MATCH_STRING, word(*index)]),
                    Cond::MatchStringIc(index) => out.extend([op::MATCH_STRING_IC, word(*index)]),
                    Cond::MatchClass(index) => out.extend([op::MATCH_CHAR_CLASS, word(*index)]),
                }

                out.extend([word(then_words.len()), word(else_words.len())]);
                out.extend(then_words);
                out.extend(else_words);

                ip = else_end;
            }

            Instruction::WhileNotError { body_len } | Instruction::WhileProgressing { body_len } => {
                let body_end = (ip + body_len).min(code.len());
                let body_words = encode(&code[ip..body_end]);

                let opcode = match instr {
                    Instruction::WhileProgressing { .. } => op::WHILE_PROGRESSING,
                    _ => op::WHILE_NOT_ERROR,
                };

                out.extend([opcode, word(body_words.len())]);
                out.extend(body_words);

                ip = body_end;
            }

            Instruction::AcceptN(n) => out.extend([op::ACCEPT_N, word(*n)]),
            Instruction::AcceptString(index) => out.extend([op::ACCEPT_STRING, word(*index)]),
            Instruction::AcceptStringIc(index) => out.extend([op::ACCEPT_STRING_IC, word(*index)]),
            Instruction::Fail(expectation) => out.extend([
                op::FAIL,
                expectation.map(word).unwrap_or(NO_EXPECTATION),
            ]),
            Instruction::LoadSavedPos(offset) => out.extend([op::LOAD_SAVED_POS, word(*offset)]),
            Instruction::UpdateSavedPos => out.push(op::UPDATE_SAVED_POS),
            Instruction::Call {
                function,
                pop,
                args,
            } => {
                out.extend([op::CALL, word(*function), word(*pop), word(args.len())]);
                out.extend(args.iter().map(|arg| word(*arg)));
            }
            Instruction::Rule(index) => out.extend([op::RULE, word(*index)]),
            Instruction::SilentFailsOn => out.push(op::SILENT_FAILS_ON),
            Instruction::SilentFailsOff => out.push(op::SILENT_FAILS_OFF),
        }
    }

    out
}

fn word(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(NO_EXPECTATION - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::build_condition;

    #[test]
    fn block_lengths_are_counted_in_words() {
        let code = build_condition(
            None,
            Cond::MatchString(3),
            vec![Instruction::AcceptString(3)],
            vec![Instruction::Fail(None), Instruction::Pop],
        );

        assert_eq!(
            encode(&code),
            vec![
                op::MATCH_STRING,
                3,
                2,
                3,
                op::ACCEPT_STRING,
                3,
                op::FAIL,
                NO_EXPECTATION,
                op::POP
            ]
        );
    }

    #[test]
    fn variable_operands_are_prefixed_with_their_count() {
        let code = vec![Instruction::Call {
            function: 1,
            pop: 2,
            args: vec![0, 4],
        }];

        assert_eq!(encode(&code), vec![op::CALL, 1, 2, 2, 0, 4]);
    }

    #[test]
    fn guarded_loops_have_their_own_opcode() {
        let code = crate::bytecode::build_loop(vec![Instruction::Append, Instruction::PushEmptyString], true);
        assert_eq!(
            encode(&code),
            vec![op::WHILE_PROGRESSING, 2, op::APPEND, op::PUSH_EMPTY_STRING]
        );
    }
}
