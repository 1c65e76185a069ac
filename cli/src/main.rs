//! Host binary for the Wisp interpreter: a file runner and a REPL, both
//! thin wrappers around `wisp_core::vm::Vm`. Everything here is explicitly
//! out of the core crate's scope (see `wisp-core`'s crate docs and
//! `SPEC_FULL.md` §1) — file I/O, a REPL loop, debug flags, and error
//! presentation are host concerns.

mod errors;
mod highlighter;
mod lexer;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;
use miette::IntoDiagnostic;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use wisp_core::InterpretError;
use wisp_core::disassemble::disassemble_chunk;
use wisp_core::vm::Vm;

/// Wisp - a small class-based scripting language with closures and a
/// tracing garbage collector.
#[derive(Parser, Debug)]
#[command(name = "wisp")]
#[command(about = "Run or explore Wisp scripts", long_about = None)]
struct Args {
    /// Script to run. Omit to start an interactive REPL (or read a single
    /// script from stdin, if stdin isn't a terminal).
    script: Option<PathBuf>,

    /// Disassemble the compiled chunk instead of running it.
    #[arg(long)]
    disassemble: bool,

    /// Force a full GC cycle on every heap allocation; exercises the
    /// collector's root set far more aggressively than production use
    /// ever would. See `wisp_core::vm::Vm::new`'s `stress_gc` parameter.
    #[arg(long)]
    stress_gc: bool,
}

const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;

fn main() -> miette::Result<()> {
    let args = Args::parse();

    use tracing_subscriber::{EnvFilter, fmt};
    let filter = EnvFilter::try_from_env("WISP_LOG")
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap();
    fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();

    let mut vm = Vm::new(args.stress_gc);

    if let Some(path) = &args.script {
        let source = std::fs::read_to_string(path).into_diagnostic()?;
        let code = run_source(&mut vm, &source, args.disassemble);
        if code != 0 {
            std::process::exit(code);
        }
        return Ok(());
    }

    if std::io::stdin().is_terminal() {
        repl(&mut vm, args.disassemble)
    } else {
        use std::io::Read;
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).into_diagnostic()?;
        let code = run_source(&mut vm, &source, args.disassemble);
        if code != 0 {
            std::process::exit(code);
        }
        Ok(())
    }
}

/// Compiles and runs one unit of source against `vm`, printing any
/// diagnostics to stderr. Returns the process exit code the reference
/// `clox` binary's `main` would use for the same outcome: 0 on success,
/// 65 (`EX_DATAERR`) on a compile error, 70 (`EX_SOFTWARE`) on a runtime
/// error.
fn run_source(vm: &mut Vm, source: &str, disassemble: bool) -> i32 {
    if disassemble {
        return match wisp_core::compiler::compile(source, vm) {
            Ok(function) => {
                print!("{}", disassemble_chunk(unsafe { &(*function).chunk }, "script"));
                0
            }
            Err(diagnostics) => {
                errors::render_compile_errors(source, &diagnostics);
                EX_DATAERR
            }
        };
    }

    match vm.interpret_source(source) {
        Ok(()) => 0,
        Err(InterpretError::Compile(diagnostics)) => {
            errors::render_compile_errors(source, &diagnostics);
            EX_DATAERR
        }
        Err(InterpretError::Runtime(report)) => {
            errors::render_runtime_error(&report);
            EX_SOFTWARE
        }
    }
}

fn history_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("wisp").join("history.txt")
}

fn repl(vm: &mut Vm, disassemble: bool) -> miette::Result<()> {
    let history_path = history_path();
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let history = Box::new(
        FileBackedHistory::with_file(1000, history_path)
            .unwrap_or_else(|_| FileBackedHistory::new(1000).expect("in-memory history")),
    );

    let mut line_editor =
        Reedline::create().with_highlighter(Box::new(highlighter::Highlighter)).with_history(history);
    let prompt = DefaultPrompt::new(DefaultPromptSegment::Empty, DefaultPromptSegment::Empty);

    println!("Wisp REPL - Type statements to run them (Ctrl+D to exit)");

    let mut pending = String::new();
    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(&line);

                // `None` means the buffer ends mid-string: always wait for
                // a closing quote on a later line rather than guessing.
                // Otherwise run as soon as every brace/paren opened so far
                // is balanced.
                if matches!(lexer::calculate_depth(&pending), Some(0)) && !pending.trim().is_empty()
                {
                    run_source(vm, &pending, disassemble);
                    pending.clear();
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("\nGoodbye!");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                return Ok(());
            }
        }
    }
}
