//! # Peggy core macro
//!
//! Attribute macro filling an empty module with a parser generated from a grammar serialized as JSON.
//!
//! ```ignore
//! #[peggy_grammar(filename = "grammars/list.json")]
//! mod list {}
//!
//! let value = list::parse("[1,2]").unwrap();
//! ```
//!
//! Paths are relative to the crate's root. An `options` file, holding the JSON form of the
//! [compilation options](`peggy_core::compiler::CompileOptions`), may be provided too:
//!
//! ```ignore
//! #[peggy_grammar(filename = "grammars/list.json", options = "grammars/list.options.json")]
//! mod list {}
//! ```
//!
//! The generated parser depends on `serde_json`, which must be a dependency of the crate using the macro.

#![forbid(unsafe_code)]
#![forbid(unused_must_use)]

use lazy_static::lazy_static;
use peggy_core::compiler::{compile, CompileOptions, CompileOutput, Format, OutputKind, Passes};
use peggy_core::grammar::Grammar;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use regex::Regex;
use std::env;
use std::fs;
use std::path::PathBuf;
use syn::{Ident, ItemMod, Visibility};

lazy_static! {
    static ref ATTR_CONTENT: Regex = Regex::new(
        "^filename\\s*=\\s*\"(?P<filename>[^\"]+)\"(?:\\s*,\\s*options\\s*=\\s*\"(?P<options>[^\"]+)\")?$"
    ).unwrap();
}

/// Options decoded from the attribute
struct Attr {
    /// Grammar file (JSON)
    grammar_file: PathBuf,

    /// Compilation options file (JSON)
    options_file: Option<PathBuf>,
}

#[proc_macro_attribute]
pub fn peggy_grammar(attr: TokenStream, item: TokenStream) -> TokenStream {
    match expand(attr, item) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(attr: TokenStream, item: TokenStream) -> syn::Result<proc_macro2::TokenStream> {
    let (mod_ident, mod_vis) = parse_input_mod(item)?;
    let attr = parse_attr(attr)?;

    let generated_rust = grammar_to_rust(&attr)?;

    Ok(quote! {
        #mod_vis mod #mod_ident {
            #generated_rust
        }
    })
}

fn parse_input_mod(item: TokenStream) -> syn::Result<(Ident, Visibility)> {
    let item = syn::parse::<ItemMod>(item).map_err(|err| {
        syn::Error::new(
            err.span(),
            "This macro must be used on a module which will be filled with the grammar's parser",
        )
    })?;

    let empty_mod_err = || {
        syn::Error::new_spanned(
            &item.ident,
            format!(
                "This macro must be used on an inline, empty module (e.g. 'mod {} {{}}')",
                item.ident
            ),
        )
    };

    match &item.content {
        Some((_, content)) if content.is_empty() => Ok((item.ident.clone(), item.vis.clone())),
        _ => Err(empty_mod_err()),
    }
}

fn parse_attr(attr: TokenStream) -> syn::Result<Attr> {
    let attr = attr.to_string();

    let captured = ATTR_CONTENT.captures(&attr).ok_or_else(|| {
        call_site_err(
            "Please provide a grammar file path under the form: #[peggy_grammar(filename = \"<path>\")] ('options' may be added with the same syntax)",
        )
    })?;

    let root = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").map_err(|_| call_site_err("CARGO_MANIFEST_DIR is not set"))?,
    );

    Ok(Attr {
        grammar_file: captured
            .name("filename")
            .map(|filename| root.join(filename.as_str()))
            .ok_or_else(|| call_site_err("Missing grammar file path"))?,

        options_file: captured.name("options").map(|options| root.join(options.as_str())),
    })
}

fn grammar_to_rust(attr: &Attr) -> syn::Result<proc_macro2::TokenStream> {
    let grammar: Grammar = read_json(&attr.grammar_file, "grammar")?;

    let options = match &attr.options_file {
        Some(path) => read_json(path, "options")?,
        None => CompileOptions::new(),
    };

    // The macro provides the wrapping module
    let options = CompileOptions {
        output: OutputKind::Source,
        format: Format::Bare,
        export_var: None,
        ..options
    };

    let source = match compile(grammar, &Passes::default(), options) {
        Ok(CompileOutput::Source(source)) => source,
        Ok(CompileOutput::Parser(_)) => return Err(call_site_err("Compilation didn't produce any source")),
        Err(err) => return Err(call_site_err(&format!("Failed to compile grammar: {}", err))),
    };

    source
        .parse::<proc_macro2::TokenStream>()
        .map_err(|err| call_site_err(&format!("Generated parser is invalid: {}", err)))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> syn::Result<T> {
    let content = fs::read_to_string(path).map_err(|err| {
        call_site_err(&format!(
            "Failed to read {} file at '{}': {}",
            what,
            path.display(),
            err
        ))
    })?;

    serde_json::from_str(&content).map_err(|err| {
        call_site_err(&format!(
            "Failed to decode {} file at '{}': {}",
            what,
            path.display(),
            err
        ))
    })
}

fn call_site_err(message: &str) -> syn::Error {
    syn::Error::new(Span::call_site(), message)
}
