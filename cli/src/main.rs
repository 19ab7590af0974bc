mod test_runner;
mod transport;

use std::path::Path as FsPath;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use botblocks::{Block, BlockKind, EditError, Param, Path, Program};
use interpreter::{Interpreter, Timing};

use crate::transport::StdoutTransport;

#[derive(Parser)]
#[command(name = "botblocks", version, about = "Block program editor and interpreter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a block program, printing each command as JSON
    Run(RunArgs),

    /// Parse and validate a program file
    Check(FileArgs),

    /// Print the program tree with paths
    Tree(FileArgs),

    /// Apply one structural edit to a program file
    Edit(EditArgs),

    /// Run .test.toml scenario files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct FileArgs {
    /// Program file (TOML)
    file: String,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Program file (TOML)
    file: String,

    /// Timing config file with a [timing] table
    #[arg(short, long)]
    config: Option<String>,

    /// Treat the command channel as unavailable
    #[arg(long)]
    disconnected: bool,

    /// Run on a simulated clock so waits complete instantly
    #[arg(long)]
    simulate: bool,

    /// Do not print commands
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Program file (TOML)
    file: String,

    /// Write the result here instead of overwriting the input
    #[arg(short, long)]
    output: Option<String>,

    #[command(subcommand)]
    op: EditOp,
}

#[derive(Subcommand)]
enum EditOp {
    /// Insert a new block under PARENT at INDEX
    Insert {
        parent: Path,
        index: usize,
        kind: BlockKind,
        /// Parameter assignment, e.g. --param angle=90. Repeatable.
        #[arg(short, long = "param", value_parser = parse_param_assignment)]
        params: Vec<(Param, f64)>,
    },
    /// Remove the block at INDEX under PARENT
    Remove { parent: Path, index: usize },
    /// Move the block at FROM to DEST_INDEX under DEST_PARENT
    Move {
        from: Path,
        dest_parent: Path,
        dest_index: usize,
    },
    /// Move a block within one sibling list
    Reorder {
        parent: Path,
        from: usize,
        to: usize,
    },
    /// Set a parameter on the block at PATH
    Set { path: Path, param: Param, value: f64 },
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.toml file or directory containing them
    path: String,

    /// Run only scenarios in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Run(args) => do_run(args, color_choice),
        Command::Check(args) => {
            let program = load_program(&args.file, color_choice);
            eprintln!(
                "ok: {} parsed successfully ({} blocks, {} leaves)",
                args.file,
                program.node_count(),
                program.leaf_count()
            );
        }
        Command::Tree(args) => {
            let program = load_program(&args.file, color_choice);
            print_tree(&program);
        }
        Command::Edit(args) => do_edit(args, color_choice),
        Command::Test(args) => {
            let path = FsPath::new(&args.path);
            if args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &args.category);
            process::exit(exit_code);
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and parse a program file, reporting errors and exiting on failure.
fn load_program(file: &str, color_choice: ColorChoice) -> Program {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };

    let mut files = SimpleFiles::new();
    let file_id = files.add(file.to_string(), source.clone());

    match botblocks::parser::Parser::new(source, file_id).parse() {
        Ok(program) => program,
        Err(error) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            let _ = term::emit_to_write_style(
                &mut writer.lock(),
                &config,
                &files,
                &error.to_diagnostic(),
            );
            process::exit(1);
        }
    }
}

fn load_timing(file: &str) -> Timing {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };
    match Timing::from_toml_str(&source) {
        Ok(timing) => timing,
        Err(e) => {
            eprintln!("error: {}: {}", file, e);
            process::exit(1);
        }
    }
}

fn do_run(args: RunArgs, color_choice: ColorChoice) {
    let program = load_program(&args.file, color_choice);
    let timing = args
        .config
        .as_deref()
        .map(load_timing)
        .unwrap_or_default();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(args.simulate)
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {}", e);
            process::exit(1);
        }
    };

    let channel = Arc::new(StdoutTransport::new(!args.disconnected, args.quiet));
    let interpreter = Interpreter::new(channel).with_timing(timing);

    let result = runtime.block_on(async {
        let handle = interpreter.run(&program)?;
        let token = handle.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        handle.wait().await
    });

    match result {
        Ok(report) => {
            eprintln!(
                "{}: {} commands, {} leaves, {} safety interlocks",
                report.outcome, report.commands_published, report.leaves_executed, report.interlocks
            );
            if report.published_while_disconnected > 0 {
                eprintln!(
                    "warning: {} commands were published after the channel disconnected",
                    report.published_while_disconnected
                );
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn do_edit(args: EditArgs, color_choice: ColorChoice) {
    let program = load_program(&args.file, color_choice);
    let edited = match apply_edit(&program, args.op) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let rendered = match botblocks::parser::render(&edited) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot render program: {}", e);
            process::exit(1);
        }
    };
    let output = args.output.as_deref().unwrap_or(&args.file);
    if let Err(e) = std::fs::write(output, rendered) {
        eprintln!("error: cannot write '{}': {}", output, e);
        process::exit(1);
    }
    eprintln!("ok: wrote {} ({} blocks)", output, edited.node_count());
}

fn apply_edit(program: &Program, op: EditOp) -> Result<Program, EditError> {
    match op {
        EditOp::Insert {
            parent,
            index,
            kind,
            params,
        } => {
            let mut block = Block::new(kind);
            for (param, value) in params {
                block.set_param(param, value)?;
            }
            program.insert(&parent, index, block)
        }
        EditOp::Remove { parent, index } => program.remove(&parent, index),
        EditOp::Move {
            from,
            dest_parent,
            dest_index,
        } => program.move_node(&from, &dest_parent, dest_index),
        EditOp::Reorder { parent, from, to } => program.reorder(&parent, from, to),
        EditOp::Set { path, param, value } => program.set_param(&path, param, value),
    }
}

fn parse_param_assignment(s: &str) -> Result<(Param, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let param = name.trim().parse::<Param>().map_err(|e| e.to_string())?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {}: {}", param, e))?;
    Ok((param, value))
}

fn print_tree(program: &Program) {
    if program.is_empty() {
        println!("(empty program)");
        return;
    }
    for (path, node) in program.walk() {
        let pad = "  ".repeat(path.depth() - 1);
        let params = node.params().to_string();
        if params.is_empty() {
            println!("{}{} {}", pad, path, node.kind());
        } else {
            println!("{}{} {} {}", pad, path, node.kind(), params);
        }
    }
}
