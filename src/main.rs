//! `uyac` CLI driver.
//!
//! Mirrors the teacher's `seqc` binary: a `clap`-derive `Cli` wrapping a
//! `Commands` enum, with one `run_*` helper per subcommand and `main`
//! doing nothing but dispatch (`crates/compiler/src/main.rs`).

use clap::{Parser as ClapParser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use uyac::{CompilerConfig, TestRunner};

#[derive(ClapParser)]
#[command(name = "uyac", version = env!("CARGO_PKG_VERSION"), about = "Compiler for the uya systems language: emits portable C99")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one or more `.uya` files to C99.
    Build {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Invoke the system C compiler and run the result after emitting.
        #[arg(long)]
        exec: bool,
        #[arg(long, overrides_with = "no_line_directives")]
        line_directives: bool,
        #[arg(long, overrides_with = "line_directives")]
        no_line_directives: bool,
        /// Keep the generated `.c` file when `--exec` is used.
        #[arg(long)]
        keep_c: bool,
    },
    /// Parse and type-check without emitting C99.
    Check { input: PathBuf },
    /// Discover and report on `test "name" { ... }` blocks.
    Test {
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        verbose: bool,
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Emit a shell completion script.
    Completions { shell: clap_complete::Shell },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            input,
            output,
            exec,
            line_directives,
            no_line_directives,
            keep_c,
        } => run_build(input, output, exec, resolve_line_directives(line_directives, no_line_directives), keep_c),
        Commands::Check { input } => run_check(input),
        Commands::Test { paths, verbose, filter } => run_test(paths, verbose, filter),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn resolve_line_directives(on: bool, off: bool) -> bool {
    if off {
        false
    } else {
        on
    }
}

fn run_build(input: PathBuf, output: Option<PathBuf>, exec: bool, line_directives: bool, keep_c: bool) -> ExitCode {
    let source = match std::fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let cfg = CompilerConfig::new().with_line_directives(line_directives).with_keep_c(keep_c);
    let file_name = input.display().to_string();

    let c_source = match uyac::compile_source(&source, &file_name, &cfg) {
        Ok(c) => c,
        Err(diags) => {
            eprintln!("{}", diags.format());
            return ExitCode::FAILURE;
        }
    };

    let out_path = output.unwrap_or_else(|| input.with_extension("c"));
    if let Err(e) = std::fs::write(&out_path, &c_source) {
        eprintln!("error: failed to write {}: {e}", out_path.display());
        return ExitCode::FAILURE;
    }
    println!("wrote {}", out_path.display());

    if exec {
        let status = run_cc_and_exec(&out_path, keep_c);
        if status != ExitCode::SUCCESS {
            return status;
        }
    }
    ExitCode::SUCCESS
}

/// Invoke a system `cc` on the emitted C file and run the result.
/// `uyac` itself never links or runs anything beyond what `--exec` asks
/// for (spec's Non-goals exclude bundling a C toolchain).
fn run_cc_and_exec(c_path: &PathBuf, keep_c: bool) -> ExitCode {
    let bin_path = c_path.with_extension("");
    let status = std::process::Command::new("cc").arg(c_path).arg("-o").arg(&bin_path).status();
    match status {
        Ok(s) if s.success() => {}
        Ok(s) => {
            eprintln!("error: cc exited with {s}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("error: failed to invoke cc: {e}");
            return ExitCode::FAILURE;
        }
    }

    let run_status = std::process::Command::new(&bin_path).status();
    if !keep_c {
        let _ = std::fs::remove_file(c_path);
    }
    match run_status {
        Ok(s) if s.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: failed to run {}: {e}", bin_path.display());
            ExitCode::FAILURE
        }
    }
}

fn run_check(input: PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let file_name = input.display().to_string();
    let (checked, diags) = uyac::check_source(&source, &file_name);
    if !diags.is_empty() {
        eprintln!("{}", diags.format());
    }
    if checked.is_some() {
        println!("{}: ok", input.display());
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_test(paths: Vec<PathBuf>, verbose: bool, filter: Option<String>) -> ExitCode {
    let runner = TestRunner::new(verbose, filter);
    let summary = runner.run(&paths);

    for file in &summary.file_results {
        if let Some(err) = &file.compile_error {
            eprintln!("{}: {err}", file.path.display());
            continue;
        }
        for test in &file.tests {
            let mark = if test.passed { "ok" } else { "FAILED" };
            println!("{} :: {} ... {mark}", file.path.display(), test.name);
            if let Some(err) = &test.error_output {
                eprintln!("{err}");
            }
        }
    }

    println!("{} passed; {} failed; {} total", summary.passed, summary.failed, summary.total);
    if summary.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_completions(shell: clap_complete::Shell) -> ExitCode {
    let mut cmd = <Cli as clap::CommandFactory>::command();
    clap_complete::generate(shell, &mut cmd, "uyac", &mut std::io::stdout());
    ExitCode::SUCCESS
}
