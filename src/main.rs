// spindle - A C-style scripting language compiled to register bytecode
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Spindle command-line interpreter.
//!
//! One binary with mutually exclusive commands: `--execute`, `--compile`,
//! `--disasm`, `--dump-ast` and `--help`, plus the `--print-nil` and
//! `--print-ret` flags. With no command and no file it enters the REPL;
//! with a file it runs it and passes the remaining arguments to the
//! script.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use spindle_embed::{Context, ErrorKind, Value};
use spindle_parser::{Parser, dump_program};
use spindle_vm::opcode::Word;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// Command bits (mutually exclusive) and flag bits.
const CMD_HELP: u32 = 1 << 0;
const CMD_EXECUTE: u32 = 1 << 1;
const CMD_COMPILE: u32 = 1 << 2;
const CMD_DISASM: u32 = 1 << 3;
const CMD_DUMPAST: u32 = 1 << 4;

const FLAG_PRINTNIL: u32 = 1 << 8;
const FLAG_PRINTRET: u32 = 1 << 9;

const CMDS_MASK: u32 = 0x00ff;

const OPTIONS: &[(&str, &str, u32)] = &[
    ("-h", "--help", CMD_HELP),
    ("-e", "--execute", CMD_EXECUTE),
    ("-c", "--compile", CMD_COMPILE),
    ("-d", "--disasm", CMD_DISASM),
    ("-a", "--dump-ast", CMD_DUMPAST),
    ("-n", "--print-nil", FLAG_PRINTNIL),
    ("-t", "--print-ret", FLAG_PRINTRET),
];

/// Parse leading options; returns the option bitmask and the index of
/// the first non-option argument.
fn process_args(args: &[String]) -> (u32, usize) {
    let mut opts = 0;

    for (i, arg) in args.iter().enumerate().skip(1) {
        let mask = OPTIONS
            .iter()
            .find(|(short, long, _)| arg == short || arg == long)
            .map(|(_, _, mask)| *mask);
        match mask {
            Some(mask) => opts |= mask,
            // The first non-option argument is the file to process.
            None => return (opts, i),
        }
    }

    (opts, args.len())
}

fn show_help(progname: &str) {
    println!(
        "Usage: {} [command] [flags...] [file [scriptargs...]]",
        progname
    );
    println!("Where <command> is one of:\n");
    println!("\t-h, --help\tShow this help then exit");
    println!("\t-e, --execute\tExecute command-line arguments");
    println!("\t-c, --compile\tCompile source files to bytecode");
    println!("\t-d, --disasm\tDisassemble bytecode files");
    println!("\t-a, --dump-ast\tDump abstract syntax tree of files\n");
    println!("Flags consist of zero or more of the following options:\n");
    println!("\t-n, --print-nil\tPrint nil return values in REPL");
    println!("\t-t, --print-ret\tPrint result of scripts passed as arguments\n");
}

fn print_version() {
    println!(
        "Spindle build {}, copyright (C) 2025 Tom Waddington\n",
        VERSION
    );
}

/// Print the captured call stack if the last error was a runtime error.
fn print_stacktrace_if_needed(ctx: &Context) {
    if ctx.last_error_kind() == Some(ErrorKind::Runtime) {
        eprintln!("Call stack:\n");
        for (i, name) in ctx.stack_trace().iter().enumerate() {
            eprintln!("\t[{:<4}]\tin {}", i, name);
        }
        eprintln!();
    }
}

/// Run a source or object file, passing the remaining command-line
/// arguments to the script as strings.
fn run_file(fname: &str, script_args: &[String]) -> i32 {
    let mut ctx = Context::new();
    let args: Vec<Value> = script_args.iter().map(Value::string).collect();

    match ctx.exec_file(fname, &args) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{}", e);
            print_stacktrace_if_needed(&ctx);
            1
        }
    }
}

/// Execute each remaining argument as a source string.
fn run_args(sources: &[String], opts: u32) -> i32 {
    let mut ctx = Context::new();

    for src in sources {
        match ctx.exec_source(src) {
            Ok(val) => {
                if opts & FLAG_PRINTRET != 0 {
                    println!("{}", val.repr());
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                print_stacktrace_if_needed(&ctx);
                return 1;
            }
        }
    }
    0
}

/// The interactive REPL.
///
/// Lines are executed as statements first. If that fails with a syntax
/// or semantic error, the line is re-compiled as an expression; if that
/// fails too, the original message is the one shown.
fn enter_repl(opts: u32) -> i32 {
    let mut ctx = Context::new();
    let mut session_no = 1u32;

    loop {
        print!("spn:{}> ", session_no);
        io::stdout().flush().ok();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("read error: {}", e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match ctx.exec_source(line) {
            Ok(val) => {
                if !matches!(val, Value::Nil) || opts & FLAG_PRINTNIL != 0 {
                    println!("{}", val.repr());
                }
            }
            Err(e) => {
                if e.kind() == ErrorKind::Runtime {
                    eprintln!("{}", e);
                    print_stacktrace_if_needed(&ctx);
                } else {
                    // The statement failed to compile; try it as an
                    // expression. The original message is usually the
                    // meaningful one, so keep it around.
                    let orig_errmsg = e.to_string();
                    match ctx.compile_expr(line) {
                        Ok(func) => match ctx.call(&func, &[]) {
                            Ok(val) => println!("= {}", val.repr()),
                            Err(e) => {
                                eprintln!("{}", e);
                                print_stacktrace_if_needed(&ctx);
                            }
                        },
                        Err(_) => eprintln!("{}", orig_errmsg),
                    }
                }
            }
        }

        session_no += 1;
    }

    0
}

/// Compile each source file to a companion `.spo` file.
fn compile_files(files: &[String]) -> i32 {
    let mut ctx = Context::new();

    for fname in files {
        print!("compiling file '{}'...", fname);
        io::stdout().flush().ok();

        let source = match fs::read_to_string(fname) {
            Ok(s) => s,
            Err(e) => {
                println!();
                eprintln!("I/O error: cannot read file '{}': {}", fname, e);
                return 1;
            }
        };

        let function = match ctx.load_source(&source) {
            Ok(f) => f,
            Err(e) => {
                println!();
                eprintln!("{}", e);
                return 1;
            }
        };

        let script = function
            .as_script()
            .expect("top-level function is a script function");
        let outname = Path::new(fname).with_extension("spo");

        if let Err(e) = fs::write(&outname, script.program.to_bytes()) {
            println!();
            eprintln!(
                "I/O error: can't write to file '{}': {}",
                outname.display(),
                e
            );
            return 1;
        }

        println!(" done.");
    }
    0
}

/// Pretty-print each bytecode file.
fn disassemble_files(files: &[String]) -> i32 {
    for fname in files {
        let bytes = match fs::read(fname) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("I/O error: could not read file '{}': {}", fname, e);
                return 1;
            }
        };

        if bytes.len() % 4 != 0 {
            eprintln!("error disassembling bytecode: file size is not a whole number of words");
            return 1;
        }
        let words: Vec<Word> = bytes
            .chunks_exact(4)
            .map(|c| Word::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        println!("Assembly dump of file {}:\n", fname);
        match spindle_vm::disassemble(&words) {
            Ok(listing) => {
                print!("{}", listing);
                println!("--------\n");
            }
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        }
    }
    0
}

/// Dump the AST of each source file.
fn dump_ast_of_files(files: &[String]) -> i32 {
    for fname in files {
        let source = match fs::read_to_string(fname) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("I/O error: cannot read file '{}': {}", fname, e);
                return 1;
            }
        };

        match Parser::parse_str(&source) {
            Ok(stmts) => print!("{}", dump_program(&stmts)),
            Err(e) => {
                eprintln!("{}", e);
                return 1;
            }
        }
    }
    0
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let (opts, pos) = process_args(&args);

    let status = match opts & CMDS_MASK {
        0 => {
            // No command: REPL if no file was given, otherwise run the
            // file with the remaining arguments.
            if pos == args.len() {
                print_version();
                enter_repl(opts)
            } else {
                run_file(&args[pos], &args[pos + 1..])
            }
        }
        CMD_HELP => {
            show_help(&args[0]);
            0
        }
        CMD_EXECUTE => run_args(&args[pos..], opts),
        CMD_COMPILE => {
            print_version();
            compile_files(&args[pos..])
        }
        CMD_DISASM => {
            print_version();
            disassemble_files(&args[pos..])
        }
        CMD_DUMPAST => {
            print_version();
            dump_ast_of_files(&args[pos..])
        }
        _ => {
            eprintln!("generic error: mutually exclusive commands specified\n");
            1
        }
    };

    process::exit(status);
}
