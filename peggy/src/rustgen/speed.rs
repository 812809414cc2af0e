use super::constants::gen_call;
use super::utils::{index, no_linting};
use crate::bytecode::{ConstTables, Cond, Instruction};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

/// Lowers the bytecode of each rule to a dedicated method of the generated parser
pub struct SpeedGenerator<'a> {
    pub tables: &'a ConstTables,

    /// Call rules methods directly instead of going through `peg_rule` (no cache and no tracing)
    pub direct_calls: bool,
}

impl<'a> SpeedGenerator<'a> {
    pub fn gen_rules(&self, bytecode: &[Vec<Instruction>], names: &[&str]) -> TokenStream {
        let no_linting = no_linting();

        let methods = bytecode.iter().zip(names).enumerate().map(|(i, (code, name))| {
            let ident = rule_ident(i);
            let doc = format!(" Rule `{}`", name);
            let body = self.gen_block(code);

            quote! {
                #[doc = #doc]
                fn #ident(&mut self) -> PegSlot {
                    let mut stack: Vec<PegSlot> = Vec::new();
                    #body
                    stack.pop().unwrap_or(PegSlot::Failed)
                }
            }
        });

        let arms = (0..bytecode.len()).map(|i| {
            let ident = rule_ident(i);
            let i = index(i);
            quote! { #i => self.#ident(), }
        });

        quote! {
            #no_linting
            impl<'i> PegParser<'i> {
                fn peg_rule_body(&mut self, index: usize) -> PegSlot {
                    match index {
                        #(#arms)*
                        _ => PegSlot::Failed,
                    }
                }

                #(#methods)*
            }
        }
    }

    fn gen_block(&self, code: &[Instruction]) -> TokenStream {
        let mut out = vec![];
        let mut ip = 0;

        while ip < code.len() {
            let instr = &code[ip];
            ip += 1;

            let statement = match *instr {
                Instruction::Branch {
                    cond,
                    then_len,
                    else_len,
                } => {
                    let then_end = (ip + then_len).min(code.len());
                    let else_end = (then_end + else_len).min(code.len());

                    let test = self.gen_cond(cond);
                    let then_block = self.gen_block(&code[ip..then_end]);
                    let else_block = self.gen_block(&code[then_end..else_end]);

                    ip = else_end;

                    if else_len == 0 {
                        quote! { if #test { #then_block } }
                    } else {
                        quote! { if #test { #then_block } else { #else_block } }
                    }
                }

                Instruction::WhileNotError { body_len } => {
                    let body_end = (ip + body_len).min(code.len());
                    let body = self.gen_block(&code[ip..body_end]);

                    ip = body_end;

                    quote! {
                        while !peg_is_failed(&stack) {
                            #body
                        }
                    }
                }

                Instruction::WhileProgressing { body_len } => {
                    let body_end = (ip + body_len).min(code.len());
                    let body = self.gen_block(&code[ip..body_end]);

                    ip = body_end;

                    quote! {
                        while !peg_is_failed(&stack) {
                            let peg_loop_start = self.pos;
                            #body

                            if self.pos == peg_loop_start && !peg_is_failed(&stack) {
                                break;
                            }
                        }
                    }
                }

                _ => self.gen_instruction(instr),
            };

            out.push(statement);
        }

        quote! { #(#out)* }
    }

    fn gen_cond(&self, cond: Cond) -> TokenStream {
        match cond {
            Cond::If => quote! { peg_truthy(&stack) },
            Cond::IfError => quote! { peg_is_failed(&stack) },
            Cond::IfNotError => quote! { !peg_is_failed(&stack) },
            Cond::MatchAny => quote! { self.pos < self.input.len() },
            Cond::MatchString(i) => {
                let literal = self.literal(i);
                quote! { self.peg_match_string(#literal) }
            }
            Cond::MatchStringIc(i) => {
                let literal = self.literal(i);
                quote! { self.peg_match_string_ic(#literal) }
            }
            Cond::MatchClass(i) => {
                let class = format_ident!("peg_class_{}", i);
                quote! { self.peg_next_char().map_or(false, #class) }
            }
        }
    }

    fn gen_instruction(&self, instr: &Instruction) -> TokenStream {
        match instr {
            Instruction::PushEmptyString => {
                quote! { stack.push(PegSlot::Value(serde_json::Value::String(String::new()))); }
            }
            Instruction::PushUndefined | Instruction::PushNull => {
                quote! { stack.push(PegSlot::Value(serde_json::Value::Null)); }
            }
            Instruction::PushFailed => quote! { stack.push(PegSlot::Failed); },
            Instruction::PushEmptyArray => {
                quote! { stack.push(PegSlot::Value(serde_json::Value::Array(Vec::new()))); }
            }
            Instruction::PushCurrPos => quote! { stack.push(PegSlot::Pos(self.pos)); },

            Instruction::Pop => quote! { stack.pop(); },
            Instruction::PopCurrPos => quote! { self.pos = peg_pos(stack.pop()); },
            Instruction::PopN(n) => {
                let n = index(*n);
                quote! { peg_pop_n(&mut stack, #n); }
            }
            Instruction::Nip => quote! { peg_nip(&mut stack); },
            Instruction::Append => quote! { peg_append(&mut stack); },
            Instruction::Wrap(n) => {
                let n = index(*n);
                quote! { peg_wrap(&mut stack, #n); }
            }
            Instruction::Text => quote! {
                let start = peg_pos(stack.pop());
                stack.push(self.peg_text(start));
            },
            Instruction::Pluck { pop, picks } => {
                let pop = index(*pop);
                let picks = picks.iter().map(|pick| index(*pick));
                quote! { peg_pluck(&mut stack, #pop, &[#(#picks),*]); }
            }

            Instruction::AcceptN(n) => {
                let n = index(*n);
                quote! { stack.push(self.peg_accept_n(#n)); }
            }
            Instruction::AcceptString(i) => {
                let literal = self.literal(*i);
                quote! { stack.push(self.peg_accept_string(#literal)); }
            }
            Instruction::AcceptStringIc(i) => {
                let literal = self.literal(*i);
                quote! { stack.push(self.peg_accept_string_ic(#literal)); }
            }
            Instruction::Fail(Some(expectation)) => {
                let expectation = index(*expectation);
                quote! { stack.push(self.peg_expect(#expectation)); }
            }
            Instruction::Fail(None) => quote! { stack.push(PegSlot::Failed); },

            Instruction::LoadSavedPos(offset) => {
                let offset = index(*offset);
                quote! { self.saved_pos = peg_pos(peg_at(&stack, #offset)); }
            }
            Instruction::UpdateSavedPos => quote! { self.saved_pos = self.pos; },
            Instruction::Call {
                function,
                pop,
                args,
            } => {
                let predicate = self
                    .tables
                    .function(*function)
                    .map_or(false, |(function, _)| function.predicate);

                let args = args
                    .iter()
                    .map(|offset| {
                        let offset = index(*offset);
                        quote! { peg_arg(&stack, #offset) }
                    })
                    .collect::<Vec<_>>();

                let call = gen_call(*function, predicate, &args, &quote! { self });
                let pop = index(*pop);

                quote! {
                    let value = #call;
                    peg_pop_n(&mut stack, #pop);
                    stack.push(PegSlot::Value(value));
                }
            }
            Instruction::Rule(i) => {
                if self.direct_calls {
                    let ident = rule_ident(*i);
                    quote! { stack.push(self.#ident()); }
                } else {
                    let i = index(*i);
                    quote! { stack.push(self.peg_rule(#i)); }
                }
            }

            Instruction::SilentFailsOn => quote! { self.silent_fails += 1; },
            Instruction::SilentFailsOff => {
                quote! { self.silent_fails = self.silent_fails.saturating_sub(1); }
            }

            // Handled by the caller
            Instruction::Branch { .. }
            | Instruction::WhileNotError { .. }
            | Instruction::WhileProgressing { .. } => quote! {},
        }
    }

    fn literal(&self, i: usize) -> &str {
        self.tables.literal(i).unwrap_or_default()
    }
}

fn rule_ident(i: usize) -> Ident {
    format_ident!("peg_rule_{}", i)
}
