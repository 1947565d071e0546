use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use blu::ast_printer::AstPrinter;
use blu::error::BluError;
use blu::interpreter::Interpreter;
use blu::parser::Parser;
use blu::scanner::{self, Scanner};

/// Exit code for lexical, syntax and resolution errors.
const EXIT_STATIC: i32 = 65;

/// Exit code for runtime errors.
const EXIT_RUNTIME: i32 = 70;

/// Stack of the worker thread; debug builds need it to reach `MAX_CALL_DEPTH`.
const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(ClapParser, Debug)]
#[command(version, about = "Blu language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to blu.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses a program and prints the AST of every top-level statement
    Parse { filename: PathBuf },

    /// Runs a Blu program; starts an interactive prompt when no file is given
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    let source = String::from_utf8(buf)
        .map_err(BluError::from)
        .context(format!("File {:?} is not valid UTF-8", filename))?;

    Ok(source)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("blu.log").context("Failed to create blu.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'blu::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("blu::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "{} [{}:{}] {} - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to blu.log");
    Ok(())
}

fn exit_code(err: &BluError) -> i32 {
    if err.is_static() {
        EXIT_STATIC
    } else {
        EXIT_RUNTIME
    }
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source = read_file(filename)?;
    let mut tokenized = true;

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => {
                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);

        std::process::exit(EXIT_STATIC);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    info!("Running Parse subcommand");

    let source = read_file(filename)?;

    let parsed = scanner::scan(&source).and_then(|tokens| Parser::new(&tokens).parse());

    match parsed {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }

            info!("Parse subcommand completed");
            Ok(())
        }

        Err(e) => {
            debug!("Parse debug: {}", e);
            eprintln!("{}", e);
            std::process::exit(EXIT_STATIC);
        }
    }
}

fn run_file(filename: &Path) -> Result<()> {
    info!("Running Run subcommand");

    let source = read_file(filename)?;
    let mut interpreter = Interpreter::new();

    if let Err(e) = blu::run(&mut interpreter, &source) {
        debug!("Run debug: {}", e);
        eprintln!("{}", e);
        std::process::exit(exit_code(&e));
    }

    info!("Program executed successfully");
    Ok(())
}

/// Interactive prompt. Each line runs on the same interpreter, so earlier
/// definitions stay visible; an error only aborts its own line.
fn run_prompt() -> Result<()> {
    info!("Starting interactive prompt");

    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        if let Err(e) = blu::run(&mut interpreter, &line) {
            debug!("Prompt debug: {}", e);
            eprintln!("{}", e);
        }
    }

    info!("Interactive prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let commands: Commands = args.commands;

    let worker = std::thread::Builder::new()
        .name("blu".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || dispatch(commands))
        .context("Failed to spawn interpreter thread")?;

    match worker.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("Interpreter thread panicked")),
    }
}

fn dispatch(commands: Commands) -> Result<()> {
    match &commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Run { filename } => match filename {
            Some(filename) => run_file(filename),
            None => run_prompt(),
        },
    }
}
