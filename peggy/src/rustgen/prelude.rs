use super::utils::{index, no_linting};
use proc_macro2::TokenStream;
use quote::quote;

/// Settings of the generated parser
#[derive(Debug, Clone)]
pub struct PreludeConfig<'a> {
    /// Allowed start rules with their index, the first one being the default
    pub start_rules: Vec<(&'a str, usize)>,
    pub cache: bool,
    pub trace: bool,
}

/// Generate the items shared by every generated parser
///
/// This includes the public API (`SyntaxError`, `parse`, `parse_from` and `parse_traced` when tracing),
/// the stack helpers, and the parser state with its matching primitives. Rules are run through
/// `PegParser::peg_rule_body`, which is generated separately.
pub fn gen_prelude(config: &PreludeConfig) -> TokenStream {
    let no_linting = no_linting();

    let (default_name, default_index) = config.start_rules.first().copied().unwrap_or(("", 0));
    let default_index = index(default_index);

    let start_names = config.start_rules.iter().map(|(name, _)| *name);
    let start_indices = config.start_rules.iter().map(|(_, i)| index(*i));

    let (cache_field, cache_init, cache_lookup, cache_store) = if config.cache {
        (
            quote! { peg_cache: std::collections::HashMap<(usize, usize), (usize, PegSlot)>, },
            quote! { peg_cache: std::collections::HashMap::new(), },
            quote! {
                if let Some((end, result)) = self.peg_cache.get(&(index, start)).cloned() {
                    self.pos = end;
                    self.peg_trace_result(index, start, &result);
                    return result;
                }
            },
            quote! { self.peg_cache.insert((index, start), (self.pos, result.clone())); },
        )
    } else {
        (quote! {}, quote! {}, quote! {}, quote! {})
    };

    let (trace_items, trace_field, trace_init, trace_enter, trace_methods) = if config.trace {
        (
            quote! {
                /// Event recorded when a rule is entered or left
                #no_linting
                #[derive(Debug, Clone, PartialEq, Eq)]
                pub struct TraceEntry {
                    /// `rule.enter`, `rule.match` or `rule.fail`
                    pub event: &'static str,
                    pub rule: &'static str,
                    pub start: usize,
                    pub end: usize,
                }

                /// Parse an input from the default start rule, recording every rule entered or left
                #no_linting
                pub fn parse_traced(input: &str) -> (Result<serde_json::Value, SyntaxError>, Vec<TraceEntry>) {
                    let mut parser = PegParser::new(input);
                    let result = parser.peg_rule(#default_index);
                    let trace = std::mem::take(&mut parser.peg_trace);
                    (parser.peg_finish(result), trace)
                }
            },
            quote! { peg_trace: Vec<TraceEntry>, },
            quote! { peg_trace: Vec::new(), },
            quote! { self.peg_trace_event("rule.enter", index, start, start); },
            quote! {
                fn peg_trace_event(&mut self, event: &'static str, index: usize, start: usize, end: usize) {
                    self.peg_trace.push(TraceEntry {
                        event,
                        rule: PEG_RULE_NAMES.get(index).copied().unwrap_or(""),
                        start,
                        end,
                    });
                }

                fn peg_trace_result(&mut self, index: usize, start: usize, result: &PegSlot) {
                    match result {
                        PegSlot::Failed => self.peg_trace_event("rule.fail", index, start, start),
                        _ => self.peg_trace_event("rule.match", index, start, self.pos),
                    }
                }
            },
        )
    } else {
        (
            quote! {},
            quote! {},
            quote! {},
            quote! {},
            quote! {
                fn peg_trace_result(&mut self, index: usize, start: usize, result: &PegSlot) {}
            },
        )
    };

    quote! {
        /// Error returned when an input doesn't match the grammar
        #no_linting
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct SyntaxError {
            pub message: String,

            /// Descriptions of what was expected at the furthest failure, sorted
            pub expected: Vec<&'static str>,

            /// Character found at the furthest failure (`None` at the end of the input)
            pub found: Option<String>,

            /// Byte offset of the furthest failure
            pub offset: usize,

            pub line: usize,
            pub column: usize,
        }

        #no_linting
        impl std::fmt::Display for SyntaxError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.message)
            }
        }

        #no_linting
        impl std::error::Error for SyntaxError {}

        /// Parse an input from the default start rule
        #no_linting
        pub fn parse(input: &str) -> Result<serde_json::Value, SyntaxError> {
            parse_from(input, #default_name)
        }

        /// Parse an input from one of the allowed start rules
        #no_linting
        pub fn parse_from(input: &str, start_rule: &str) -> Result<serde_json::Value, SyntaxError> {
            let mut parser = PegParser::new(input);

            let result = match start_rule {
                #(#start_names => parser.peg_rule(#start_indices),)*
                _ => {
                    return Err(SyntaxError {
                        message: format!("Can't start parsing from rule \"{}\".", start_rule),
                        expected: Vec::new(),
                        found: None,
                        offset: 0,
                        line: 1,
                        column: 1,
                    })
                }
            };

            parser.peg_finish(result)
        }

        #trace_items

        #no_linting
        #[derive(Debug, Clone, PartialEq)]
        enum PegSlot {
            Failed,
            Pos(usize),
            Value(serde_json::Value),
        }

        #no_linting
        fn peg_value(slot: PegSlot) -> serde_json::Value {
            match slot {
                PegSlot::Value(value) => value,
                _ => serde_json::Value::Null,
            }
        }

        #no_linting
        fn peg_pos(slot: Option<PegSlot>) -> usize {
            match slot {
                Some(PegSlot::Pos(pos)) => pos,
                _ => 0,
            }
        }

        #no_linting
        fn peg_is_failed(stack: &[PegSlot]) -> bool {
            matches!(stack.last(), Some(PegSlot::Failed))
        }

        #no_linting
        fn peg_truthy(stack: &[PegSlot]) -> bool {
            match stack.last() {
                Some(PegSlot::Value(value)) => match value {
                    serde_json::Value::Null => false,
                    serde_json::Value::Bool(value) => *value,
                    serde_json::Value::Number(value) => value.as_f64().map_or(true, |value| value != 0.0 && !value.is_nan()),
                    serde_json::Value::String(value) => !value.is_empty(),
                    _ => true,
                },
                Some(PegSlot::Pos(_)) => true,
                _ => false,
            }
        }

        #no_linting
        fn peg_at(stack: &[PegSlot], offset: usize) -> Option<PegSlot> {
            stack.len().checked_sub(offset + 1).and_then(|i| stack.get(i)).cloned()
        }

        #no_linting
        fn peg_arg(stack: &[PegSlot], offset: usize) -> serde_json::Value {
            peg_at(stack, offset).map_or(serde_json::Value::Null, peg_value)
        }

        #no_linting
        fn peg_pop_n(stack: &mut Vec<PegSlot>, n: usize) {
            let len = stack.len().saturating_sub(n);
            stack.truncate(len);
        }

        #no_linting
        fn peg_nip(stack: &mut Vec<PegSlot>) {
            if let Some(top) = stack.pop() {
                stack.pop();
                stack.push(top);
            }
        }

        #no_linting
        fn peg_append(stack: &mut Vec<PegSlot>) {
            if let Some(slot) = stack.pop() {
                if let Some(PegSlot::Value(serde_json::Value::Array(items))) = stack.last_mut() {
                    items.push(peg_value(slot));
                }
            }
        }

        #no_linting
        fn peg_wrap(stack: &mut Vec<PegSlot>, n: usize) {
            let at = stack.len().saturating_sub(n);
            let items = stack.split_off(at).into_iter().map(peg_value).collect();
            stack.push(PegSlot::Value(serde_json::Value::Array(items)));
        }

        #no_linting
        fn peg_pluck(stack: &mut Vec<PegSlot>, pop: usize, picks: &[usize]) {
            let mut values: Vec<serde_json::Value> = picks.iter().map(|offset| peg_arg(&stack[..], *offset)).collect();
            peg_pop_n(stack, pop);

            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                serde_json::Value::Array(values)
            };

            stack.push(PegSlot::Value(value));
        }

        #no_linting
        fn peg_match_ignore_case(input: &str, lowered: &str) -> Option<usize> {
            let mut expected = lowered.chars();
            let mut len = 0;

            while !expected.as_str().is_empty() {
                let c = input.get(len..)?.chars().next()?;

                for lower in c.to_lowercase() {
                    if expected.next() != Some(lower) {
                        return None;
                    }
                }

                len += c.len_utf8();
            }

            Some(len)
        }

        #no_linting
        fn peg_escape(c: char) -> String {
            match c {
                '\\' => "\\\\".to_string(),
                '"' => "\\\"".to_string(),
                '\t' => "\\t".to_string(),
                '\n' => "\\n".to_string(),
                '\r' => "\\r".to_string(),
                '\u{0}'..='\u{1F}' | '\u{7F}'..='\u{9F}' => format!("\\x{:02X}", c as u32),
                _ => c.to_string(),
            }
        }

        #no_linting
        fn peg_line_column(input: &str, offset: usize) -> (usize, usize) {
            let mut line = 1;
            let mut column = 1;

            for c in input.get(..offset).unwrap_or(input).chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            (line, column)
        }

        #no_linting
        struct PegParser<'i> {
            input: &'i str,
            pos: usize,
            saved_pos: usize,
            silent_fails: usize,
            max_fail_pos: usize,

            /// Indexes in `PEG_EXPECTED`, `usize::MAX` standing for the end of the input
            max_fail_expected: Vec<usize>,

            #cache_field
            #trace_field
        }

        #no_linting
        impl<'i> PegParser<'i> {
            fn new(input: &'i str) -> Self {
                Self {
                    input,
                    pos: 0,
                    saved_pos: 0,
                    silent_fails: 0,
                    max_fail_pos: 0,
                    max_fail_expected: Vec::new(),
                    #cache_init
                    #trace_init
                }
            }

            fn peg_fail(&mut self, expected: usize) {
                if self.pos < self.max_fail_pos {
                    return;
                }

                if self.pos > self.max_fail_pos {
                    self.max_fail_pos = self.pos;
                    self.max_fail_expected.clear();
                }

                self.max_fail_expected.push(expected);
            }

            fn peg_expect(&mut self, expected: usize) -> PegSlot {
                if self.silent_fails == 0 {
                    self.peg_fail(expected);
                }

                PegSlot::Failed
            }

            fn peg_rest(&self) -> &'i str {
                self.input.get(self.pos..).unwrap_or("")
            }

            fn peg_next_char(&self) -> Option<char> {
                self.peg_rest().chars().next()
            }

            fn peg_match_string(&self, literal: &str) -> bool {
                self.peg_rest().starts_with(literal)
            }

            fn peg_match_string_ic(&self, literal: &str) -> bool {
                peg_match_ignore_case(self.peg_rest(), literal).is_some()
            }

            fn peg_accept_n(&mut self, n: usize) -> PegSlot {
                let rest = self.peg_rest();
                let len = rest.char_indices().nth(n).map_or(rest.len(), |(i, _)| i);
                self.pos += len;
                PegSlot::Value(serde_json::Value::String(rest[..len].to_string()))
            }

            fn peg_accept_string(&mut self, literal: &str) -> PegSlot {
                self.pos += literal.len();
                PegSlot::Value(serde_json::Value::String(literal.to_string()))
            }

            fn peg_accept_string_ic(&mut self, literal: &str) -> PegSlot {
                let rest = self.peg_rest();

                match peg_match_ignore_case(rest, literal) {
                    Some(len) => {
                        self.pos += len;
                        PegSlot::Value(serde_json::Value::String(rest[..len].to_string()))
                    }
                    None => PegSlot::Failed,
                }
            }

            fn peg_text(&self, start: usize) -> PegSlot {
                let text = self.input.get(start..self.pos).unwrap_or("");
                PegSlot::Value(serde_json::Value::String(text.to_string()))
            }

            fn peg_rule(&mut self, index: usize) -> PegSlot {
                let start = self.pos;
                #trace_enter
                #cache_lookup

                let result = self.peg_rule_body(index);

                #cache_store
                self.peg_trace_result(index, start, &result);
                result
            }

            #trace_methods

            fn peg_finish(mut self, result: PegSlot) -> Result<serde_json::Value, SyntaxError> {
                let complete = self.pos == self.input.len();

                match result {
                    PegSlot::Value(value) if complete => return Ok(value),
                    PegSlot::Pos(_) if complete => return Ok(serde_json::Value::Null),
                    PegSlot::Failed => {}
                    _ => self.peg_fail(usize::MAX),
                }

                let mut expected: Vec<&'static str> = self
                    .max_fail_expected
                    .iter()
                    .map(|index| PEG_EXPECTED.get(*index).copied().unwrap_or("end of input"))
                    .collect();

                expected.sort_unstable();
                expected.dedup();

                let found = self.input.get(self.max_fail_pos..).and_then(|rest| rest.chars().next());

                let found_text = match found {
                    Some(c) => format!("\"{}\"", peg_escape(c)),
                    None => "end of input".to_string(),
                };

                let message = match expected.as_slice() {
                    [] => format!("Unexpected {}.", found_text),
                    [single] => format!("Expected {} but {} found.", single, found_text),
                    [first, second] => format!("Expected {} or {} but {} found.", first, second, found_text),
                    [init @ .., last] => format!("Expected {}, or {} but {} found.", init.join(", "), last, found_text),
                };

                let (line, column) = peg_line_column(self.input, self.max_fail_pos);

                Err(SyntaxError {
                    message,
                    expected,
                    found: found.map(String::from),
                    offset: self.max_fail_pos,
                    line,
                    column,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cache: bool, trace: bool) -> PreludeConfig<'static> {
        PreludeConfig {
            start_rules: vec![("start", 0), ("other", 2)],
            cache,
            trace,
        }
    }

    #[test]
    fn start_rules_are_dispatched() {
        let out = gen_prelude(&config(false, false)).to_string();

        assert!(out.contains("pub fn parse (input : & str)"));
        assert!(out.contains("\"start\" => parser . peg_rule (0)"));
        assert!(out.contains("\"other\" => parser . peg_rule (2)"));
        assert!(!out.contains("peg_cache"));
        assert!(!out.contains("TraceEntry"));
    }

    #[test]
    fn cache_and_trace_add_state() {
        let out = gen_prelude(&config(true, true)).to_string();

        assert!(out.contains("peg_cache : std :: collections :: HashMap"));
        assert!(out.contains("pub struct TraceEntry"));
        assert!(out.contains("pub fn parse_traced"));
    }

    #[test]
    fn ignore_case_accepts_the_matched_input() {
        let out = gen_prelude(&config(false, false)).to_string();

        assert!(out.contains("fn peg_match_ignore_case (input : & str , lowered : & str) -> Option < usize >"));
        assert!(out.contains("fn peg_accept_string_ic (& mut self , literal : & str) -> PegSlot"));
    }
}
