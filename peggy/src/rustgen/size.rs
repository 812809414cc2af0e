use super::constants::gen_call;
use super::utils::{index, no_linting};
use crate::bytecode::{encode, op, ConstTables, Instruction, NO_EXPECTATION};
use proc_macro2::{Literal, TokenStream};
use quote::quote;

/// Generate the encoded bytecode of every rule, and the interpreter running it
pub fn gen_interpreter(tables: &ConstTables, bytecode: &[Vec<Instruction>]) -> TokenStream {
    let no_linting = no_linting();

    let rules = bytecode.iter().map(|code| {
        let words = encode(code).into_iter().map(Literal::u32_unsuffixed);
        quote! { &[#(#words),*] }
    });

    let calls = tables.functions().enumerate().map(|(i, (function, _))| {
        let args = vec![quote! { args.next().unwrap_or_default() }; function.params.len()];
        let call = gen_call(i, function.predicate, &args, &quote! { self });
        let i = index(i);
        quote! { #i => #call, }
    });

    // Opcodes, as literal patterns
    let word = Literal::u32_unsuffixed;
    let push_undefined = word(op::PUSH_UNDEFINED);
    let push_null = word(op::PUSH_NULL);
    let push_failed = word(op::PUSH_FAILED);
    let push_empty_array = word(op::PUSH_EMPTY_ARRAY);
    let push_curr_pos = word(op::PUSH_CURR_POS);
    let pop = word(op::POP);
    let pop_curr_pos = word(op::POP_CURR_POS);
    let pop_n = word(op::POP_N);
    let nip = word(op::NIP);
    let append = word(op::APPEND);
    let wrap = word(op::WRAP);
    let text = word(op::TEXT);
    let if_ = word(op::IF);
    let if_error = word(op::IF_ERROR);
    let if_not_error = word(op::IF_NOT_ERROR);
    let while_not_error = word(op::WHILE_NOT_ERROR);
    let match_any = word(op::MATCH_ANY);
    let match_string = word(op::MATCH_STRING);
    let match_string_ic = word(op::MATCH_STRING_IC);
    let match_char_class = word(op::MATCH_CHAR_CLASS);
    let accept_n = word(op::ACCEPT_N);
    let accept_string = word(op::ACCEPT_STRING);
    let fail = word(op::FAIL);
    let load_saved_pos = word(op::LOAD_SAVED_POS);
    let update_saved_pos = word(op::UPDATE_SAVED_POS);
    let call = word(op::CALL);
    let rule = word(op::RULE);
    let silent_fails_on = word(op::SILENT_FAILS_ON);
    let silent_fails_off = word(op::SILENT_FAILS_OFF);
    let while_progressing = word(op::WHILE_PROGRESSING);
    let accept_string_ic = word(op::ACCEPT_STRING_IC);
    let push_empty_string = word(op::PUSH_EMPTY_STRING);
    let pluck = word(op::PLUCK);

    let no_expectation = word(NO_EXPECTATION);

    quote! {
        #no_linting
        static PEG_BYTECODE: &[&[u32]] = &[#(#rules),*];

        #no_linting
        fn peg_word(code: &[u32], at: usize) -> usize {
            code.get(at).copied().unwrap_or(0) as usize
        }

        #no_linting
        impl<'i> PegParser<'i> {
            fn peg_rule_body(&mut self, index: usize) -> PegSlot {
                let mut stack = Vec::new();

                if let Some(code) = PEG_BYTECODE.get(index) {
                    self.peg_run(code, &mut stack);
                }

                stack.pop().unwrap_or(PegSlot::Failed)
            }

            fn peg_run(&mut self, code: &[u32], stack: &mut Vec<PegSlot>) {
                let mut ip = 0;

                while ip < code.len() {
                    match code[ip] {
                        #push_undefined | #push_null => {
                            stack.push(PegSlot::Value(serde_json::Value::Null));
                            ip += 1;
                        }
                        #push_empty_string => {
                            stack.push(PegSlot::Value(serde_json::Value::String(String::new())));
                            ip += 1;
                        }
                        #push_failed => {
                            stack.push(PegSlot::Failed);
                            ip += 1;
                        }
                        #push_empty_array => {
                            stack.push(PegSlot::Value(serde_json::Value::Array(Vec::new())));
                            ip += 1;
                        }
                        #push_curr_pos => {
                            stack.push(PegSlot::Pos(self.pos));
                            ip += 1;
                        }
                        #pop => {
                            stack.pop();
                            ip += 1;
                        }
                        #pop_curr_pos => {
                            self.pos = peg_pos(stack.pop());
                            ip += 1;
                        }
                        #pop_n => {
                            peg_pop_n(stack, peg_word(code, ip + 1));
                            ip += 2;
                        }
                        #nip => {
                            peg_nip(stack);
                            ip += 1;
                        }
                        #append => {
                            peg_append(stack);
                            ip += 1;
                        }
                        #wrap => {
                            peg_wrap(stack, peg_word(code, ip + 1));
                            ip += 2;
                        }
                        #text => {
                            let start = peg_pos(stack.pop());
                            stack.push(self.peg_text(start));
                            ip += 1;
                        }
                        #pluck => {
                            let count = peg_word(code, ip + 2);
                            let picks: Vec<usize> = (0..count).map(|i| peg_word(code, ip + 3 + i)).collect();
                            peg_pluck(stack, peg_word(code, ip + 1), &picks);
                            ip += 3 + count;
                        }
                        #if_ => {
                            let cond = peg_truthy(stack);
                            ip = self.peg_branch(code, ip + 1, cond, stack);
                        }
                        #if_error => {
                            let cond = peg_is_failed(stack);
                            ip = self.peg_branch(code, ip + 1, cond, stack);
                        }
                        #if_not_error => {
                            let cond = !peg_is_failed(stack);
                            ip = self.peg_branch(code, ip + 1, cond, stack);
                        }
                        #match_any => {
                            let cond = self.pos < self.input.len();
                            ip = self.peg_branch(code, ip + 1, cond, stack);
                        }
                        #match_string => {
                            let cond = self.peg_match_string(PEG_LITERALS[peg_word(code, ip + 1)]);
                            ip = self.peg_branch(code, ip + 2, cond, stack);
                        }
                        #match_string_ic => {
                            let cond = self.peg_match_string_ic(PEG_LITERALS[peg_word(code, ip + 1)]);
                            ip = self.peg_branch(code, ip + 2, cond, stack);
                        }
                        #match_char_class => {
                            let class = peg_word(code, ip + 1);
                            let cond = self.peg_next_char().map_or(false, |c| peg_class(class, c));
                            ip = self.peg_branch(code, ip + 2, cond, stack);
                        }
                        #while_not_error => {
                            let end = (ip + 2 + peg_word(code, ip + 1)).min(code.len());
                            let body = &code[ip + 2..end];

                            while !peg_is_failed(stack) {
                                self.peg_run(body, stack);
                            }

                            ip = end;
                        }
                        #while_progressing => {
                            let end = (ip + 2 + peg_word(code, ip + 1)).min(code.len());
                            let body = &code[ip + 2..end];

                            while !peg_is_failed(stack) {
                                let start = self.pos;
                                self.peg_run(body, stack);

                                if self.pos == start && !peg_is_failed(stack) {
                                    break;
                                }
                            }

                            ip = end;
                        }
                        #accept_n => {
                            stack.push(self.peg_accept_n(peg_word(code, ip + 1)));
                            ip += 2;
                        }
                        #accept_string => {
                            stack.push(self.peg_accept_string(PEG_LITERALS[peg_word(code, ip + 1)]));
                            ip += 2;
                        }
                        #accept_string_ic => {
                            stack.push(self.peg_accept_string_ic(PEG_LITERALS[peg_word(code, ip + 1)]));
                            ip += 2;
                        }
                        #fail => {
                            let slot = match code.get(ip + 1).copied() {
                                Some(#no_expectation) | None => PegSlot::Failed,
                                Some(expectation) => self.peg_expect(expectation as usize),
                            };
                            stack.push(slot);
                            ip += 2;
                        }
                        #load_saved_pos => {
                            self.saved_pos = peg_pos(peg_at(stack, peg_word(code, ip + 1)));
                            ip += 2;
                        }
                        #update_saved_pos => {
                            self.saved_pos = self.pos;
                            ip += 1;
                        }
                        #call => {
                            let count = peg_word(code, ip + 3);
                            let args: Vec<serde_json::Value> = (0..count)
                                .map(|i| peg_arg(&stack[..], peg_word(code, ip + 4 + i)))
                                .collect();

                            let value = self.peg_call(peg_word(code, ip + 1), args);
                            peg_pop_n(stack, peg_word(code, ip + 2));
                            stack.push(PegSlot::Value(value));
                            ip += 4 + count;
                        }
                        #rule => {
                            stack.push(self.peg_rule(peg_word(code, ip + 1)));
                            ip += 2;
                        }
                        #silent_fails_on => {
                            self.silent_fails += 1;
                            ip += 1;
                        }
                        #silent_fails_off => {
                            self.silent_fails = self.silent_fails.saturating_sub(1);
                            ip += 1;
                        }
                        _ => ip += 1,
                    }
                }
            }

            /// Run the block selected by a condition, returning the position following both blocks
            fn peg_branch(&mut self, code: &[u32], at: usize, cond: bool, stack: &mut Vec<PegSlot>) -> usize {
                let then_start = (at + 2).min(code.len());
                let else_start = (then_start + peg_word(code, at)).min(code.len());
                let end = (else_start + peg_word(code, at + 1)).min(code.len());

                let block = if cond {
                    &code[then_start..else_start]
                } else {
                    &code[else_start..end]
                };

                self.peg_run(block, stack);
                end
            }

            fn peg_call(&self, function: usize, args: Vec<serde_json::Value>) -> serde_json::Value {
                let mut args = args.into_iter();

                match function {
                    #(#calls)*
                    _ => serde_json::Value::Null,
                }
            }
        }
    }
}
