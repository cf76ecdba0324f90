#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::module_name_repetitions)]

mod args;
mod report;

use args::Args;

use x64cc::cpp::{Preprocessor, StandardIncludeSearcher};
use x64cc::emitter;
use x64cc::lexer::{Lexer, TokenKind};
use x64cc::parser;

use std::env;
use std::fs;
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};

fn main() -> Result<()> {
    let args = Args::parse();

    let path = args.input.to_string_lossy().into_owned();
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to open source file {path} for parsing"))?;

    let mut out: Vec<u8> = Vec::new();
    if args.tokenize_only {
        tokenize_file(&path, &source, &mut out);
    } else if args.preprocess_only {
        preprocess_file(&path, &source, &mut out);
    } else {
        compile_file(&path, &source, &mut out);
    }

    // nothing is published unless the whole compilation succeeded
    if args.output == "-" {
        io::stdout().write_all(&out)?;
    } else {
        fs::write(&args.output, &out)
            .map_err(|e| anyhow!("failed to write output file {}: {e}", args.output))?;
    }
    Ok(())
}

fn new_preprocessor(path: &str, source: &str) -> Preprocessor {
    let include_paths = env::var("CCINCLUDE").unwrap_or_default();
    Preprocessor::new(
        Lexer::new(path, source),
        Box::new(StandardIncludeSearcher::new(&include_paths)),
    )
}

fn compile_file(path: &str, source: &str, out: &mut Vec<u8>) {
    let pp = new_preprocessor(path, source);
    let tu = match parser::parse(pp) {
        Ok(tu) => tu,
        Err(e) => report::fatal(e.pos(), &e.to_string()),
    };
    emitter::emit(&tu, out).expect("writes to a memory buffer cannot fail");
}

fn tokenize_file(path: &str, source: &str, out: &mut Vec<u8>) {
    let mut lexer = Lexer::new(path, source);
    loop {
        match lexer.next() {
            Ok(tok) => {
                writeln!(out, "{}", tok.dump()).expect("writes to a memory buffer cannot fail");
                if tok.kind == TokenKind::Eof {
                    return;
                }
            }
            Err(e) => report::fatal(e.pos(), &e.to_string()),
        }
    }
}

fn preprocess_file(path: &str, source: &str, out: &mut Vec<u8>) {
    let mut pp = new_preprocessor(path, source);
    loop {
        match pp.next() {
            Ok(tok) => {
                writeln!(out, "{}", tok.dump()).expect("writes to a memory buffer cannot fail");
                if tok.kind == TokenKind::Eof {
                    return;
                }
            }
            Err(e) => report::fatal(e.pos(), &e.to_string()),
        }
    }
}
