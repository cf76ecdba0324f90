use std::env;
use std::path::PathBuf;
use std::process::exit;

pub struct Args {
    /// Dump the preprocessed token stream instead of compiling.
    pub preprocess_only: bool,
    /// Dump the raw token stream, with no macro expansion.
    pub tokenize_only: bool,
    /// `-` selects standard output.
    pub output: String,
    pub input: PathBuf,
}

impl Args {
    pub fn parse() -> Self {
        let mut preprocess_only = false;
        let mut tokenize_only = false;
        let mut output = String::from("-");
        let mut input = None;

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-P" => preprocess_only = true,
                "-T" => tokenize_only = true,
                "-o" => {
                    let Some(path) = args.next() else {
                        eprintln!("-o requires an argument");
                        exit(1);
                    };
                    output = path;
                }
                "--version" => {
                    println!("x64cc version 0.1.0");
                    exit(0);
                }
                "-h" | "--help" => Self::usage(0),
                _ => {
                    if input.is_some() {
                        eprintln!("Bad number of args, please specify a single source file.");
                        exit(1);
                    }
                    input = Some(PathBuf::from(arg));
                }
            }
        }
        let input = input.unwrap_or_else(|| Self::usage(1));
        Self {
            preprocess_only,
            tokenize_only,
            output,
            input,
        }
    }

    fn usage(code: i32) -> ! {
        let cmd0 = env::args().next().unwrap_or_else(|| "x64cc".to_owned());
        print!(concat!(
            "Usage:\n",
            "  {} [FLAGS] FILE.c\n",
            "\n",
            "Environment variables:\n",
            "  CCDEBUG=true enables backtraces for debugging the compiler.\n",
            "  CCINCLUDE is a ';' separated list of system header directories.\n",
            "\n",
            "Flags:\n",
            "  -o FILE      Write output to FILE, '-' for stdout\n",
            "  -P           Print tokens after preprocessing (for debugging)\n",
            "  -T           Print tokens after lexing (for debugging)\n",
            "  --version    Print version info and exit\n",
            "  -h, --help   Show this message\n",
        ), cmd0);
        exit(code)
    }
}
