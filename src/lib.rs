/*!
A single translation unit C compiler for x86-64 System V, structured as a
strictly linear pipeline:

```text
source bytes → Lexer → Preprocessor → Parser → Emitter → assembly text
```

Each stage pulls from its predecessor on demand and owns its own state;
nothing is shared across stages after a value has been yielded
downstream.

1. **Lexing** - [`lexer::Lexer`] turns raw bytes into tokens carrying a
   file position and an empty hide set. Directive structure (`#define`,
   `#include` headers, directive-terminating newlines) is surfaced as
   pseudo tokens so the preprocessor never re-scans text.
2. **Preprocessing** - [`cpp::Preprocessor`] drives a stack of lexers
   (one per open include), expands object- and function-like macros
   under hide set discipline, and evaluates `#if`/`#ifdef`/`#ifndef`
   conditionals. Header resolution goes through the injectable
   [`cpp::IncludeSearcher`] capability.
3. **Parsing** - [`parser::parse`] builds the typed tree in [`ast`],
   resolving names against three parallel namespaces, folding required
   constants, and reserving the synthetic labels control flow needs.
4. **Emission** - [`emitter::emit`] walks the tree once and writes GNU
   as (AT&T) syntax using a fixed accumulator register convention.

Errors at every stage carry a `file:line:col` position; the driver
renders the offending source line with a caret underneath.
*/

#![deny(unused_must_use)]
#![warn(clippy::pedantic)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod ast;
pub mod cpp;
pub mod ctypes;
#[cfg(test)]
mod ctypes_tests;
pub mod emitter;
pub mod lexer;
pub mod parser;
