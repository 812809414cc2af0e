use super::utils::{index, make_safe_ident, no_linting, parse_code};
use crate::bytecode::{ClassConst, ConstTables, FunctionConst};
use crate::compiler::CompileError;
use crate::grammar::{ClassPart, Location};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Generate the literals, expectations and rule names tables
pub fn gen_tables(tables: &ConstTables, rule_names: &[&str]) -> TokenStream {
    let no_linting = no_linting();
    let literals = tables.literals();
    let expected = tables.expectations().map(|expectation| expectation.describe());

    quote! {
        #no_linting
        static PEG_LITERALS: &[&str] = &[#(#literals),*];

        #no_linting
        static PEG_EXPECTED: &[&str] = &[#(#expected),*];

        #no_linting
        static PEG_RULE_NAMES: &[&str] = &[#(#rule_names),*];
    }
}

/// Generate a matching function for each character class, and a dispatcher over them
pub fn gen_classes(tables: &ConstTables) -> TokenStream {
    let no_linting = no_linting();

    let matchers = tables.classes().enumerate().map(|(i, class)| {
        let ident = format_ident!("peg_class_{}", i);
        let body = gen_class_test(class);

        quote! {
            #no_linting
            fn #ident(c: char) -> bool {
                #body
            }
        }
    });

    let arms = (0..tables.classes().count()).map(|i| {
        let ident = format_ident!("peg_class_{}", i);
        let i = index(i);
        quote! { #i => #ident(c), }
    });

    quote! {
        #(#matchers)*

        #no_linting
        fn peg_class(index: usize, c: char) -> bool {
            match index {
                #(#arms)*
                _ => false,
            }
        }
    }
}

fn gen_class_test(class: &ClassConst) -> TokenStream {
    let parts = class
        .parts
        .iter()
        .filter_map(|part| match *part {
            ClassPart::Char(c) => Some(quote! { #c }),
            ClassPart::Range(from, to) if from <= to => Some(quote! { #from..=#to }),
            // Empty range
            ClassPart::Range(_, _) => None,
        })
        .collect::<Vec<_>>();

    let found = if parts.is_empty() {
        quote! { false }
    } else if class.ignore_case {
        quote! {{
            let test = |c: char| matches!(c, #(#parts)|*);
            test(c) || c.to_lowercase().any(test) || c.to_uppercase().any(test)
        }}
    } else {
        quote! { matches!(c, #(#parts)|*) }
    };

    if class.inverted {
        quote! { !(#found) }
    } else {
        found
    }
}

/// Generate a function for each code block of the grammar
///
/// Labels are passed as arguments; the matched text and its byte range are available as `text` and `range`
/// unless a label shadows them.
pub fn gen_functions(tables: &ConstTables) -> Result<TokenStream, CompileError> {
    tables
        .functions()
        .enumerate()
        .map(|(i, (function, location))| gen_function(i, function, *location))
        .collect()
}

fn gen_function(i: usize, function: &FunctionConst, location: Location) -> Result<TokenStream, CompileError> {
    let no_linting = no_linting();
    let ident = function_ident(i);
    let code = parse_code(&function.body, location)?;

    let params = function
        .params
        .iter()
        .map(|param| make_safe_ident(param))
        .collect::<Vec<_>>();

    let shadowed = |name: &str| params.iter().any(|param| param == name);

    let text = (!shadowed("text")).then(|| quote! { let text: &str = &peg_input[peg_start..peg_end]; });
    let range = (!shadowed("range")).then(|| quote! { let range = peg_start..peg_end; });

    let (ret, body) = if function.predicate {
        (quote! { bool }, quote! { (move || -> bool { #code })() })
    } else {
        (
            quote! { serde_json::Value },
            quote! { serde_json::Value::from((move || { #code })()) },
        )
    };

    Ok(quote! {
        #no_linting
        fn #ident(peg_input: &str, peg_start: usize, peg_end: usize, #(#params: serde_json::Value),*) -> #ret {
            #text
            #range
            #body
        }
    })
}

pub fn function_ident(i: usize) -> proc_macro2::Ident {
    format_ident!("peg_f_{}", i)
}

/// Generate a call to a code block, evaluating to its result as a value
///
/// `args` are the expressions evaluating to the block's arguments, and `state` the expression
/// giving access to the parser (for the input and the matched range).
pub fn gen_call(function: usize, predicate: bool, args: &[TokenStream], state: &TokenStream) -> TokenStream {
    let ident = function_ident(function);
    let call = quote! { #ident(#state.input, #state.saved_pos, #state.pos, #(#args),*) };

    if predicate {
        quote! { serde_json::Value::Bool(#call) }
    } else {
        call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(predicate: bool, params: &[&str], body: &str) -> FunctionConst {
        FunctionConst {
            predicate,
            params: params.iter().map(|param| param.to_string()).collect(),
            body: body.to_string(),
        }
    }

    #[test]
    fn classes_use_patterns() {
        let mut tables = ConstTables::new();
        tables.add_class(ClassConst {
            parts: vec![ClassPart::Range('a', 'z'), ClassPart::Char('_'), ClassPart::Range('z', 'a')],
            inverted: true,
            ignore_case: false,
        });

        let out = gen_classes(&tables).to_string();
        assert!(out.contains("fn peg_class_0"));
        assert!(out.contains("! (matches ! (c , 'a' ..= 'z' | '_'))"));
    }

    #[test]
    fn labels_become_arguments() {
        let mut tables = ConstTables::new();
        tables.add_function(function(false, &["left", "type"], "left"), Location::default());
        tables.add_function(function(true, &["text"], "true"), Location::default());

        let out = gen_functions(&tables).unwrap().to_string();
        assert!(out.contains("fn peg_f_0 (peg_input : & str , peg_start : usize , peg_end : usize , left : serde_json :: Value , r#type : serde_json :: Value) -> serde_json :: Value"));
        assert!(out.contains("fn peg_f_1"));
        assert!(out.contains("-> bool"));

        // A label named `text` hides the matched text
        let predicate = out.split("fn peg_f_1").nth(1).unwrap();
        assert!(!predicate.contains("let text"));
        assert!(predicate.contains("let range"));
    }

    #[test]
    fn calls_wrap_predicates() {
        let state = quote! { self };
        let args = vec![quote! { a }];

        assert_eq!(
            gen_call(2, true, &args, &state).to_string(),
            "serde_json :: Value :: Bool (peg_f_2 (self . input , self . saved_pos , self . pos , a))"
        );
    }
}
