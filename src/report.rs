use x64cc::lexer::FilePos;

use std::backtrace::Backtrace;
use std::env;
use std::fs;
use std::process::exit;

/// Prints `file:line:col: message`, the offending source line, and a
/// caret under the column, then exits with a failure status. With
/// `CCDEBUG=true` a backtrace of the compiler itself is appended.
pub fn fatal(pos: &FilePos, msg: &str) -> ! {
    eprintln!("{pos}: {msg}");
    print_source_line(pos);
    if env::var("CCDEBUG").as_deref() == Ok("true") {
        eprintln!("{}", Backtrace::force_capture());
    }
    exit(1)
}

fn print_source_line(pos: &FilePos) {
    let Ok(contents) = fs::read_to_string(&*pos.file) else {
        return;
    };
    let Some(line) = contents.lines().nth(pos.line as usize - 1) else {
        return;
    };
    eprintln!("{line}");
    // columns count a tab as four, matching the lexer
    let mut caret = String::new();
    let mut col = 1u32;
    for c in line.chars() {
        if col >= pos.col {
            break;
        }
        let width = if c == '\t' { 4 } else { 1 };
        col += width;
        for _ in 0..width {
            caret.push(' ');
        }
    }
    caret.push('^');
    eprintln!("{caret}");
}
