use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox::ast_printer::AstPrinter;
use rox::config::Config;
use rox::error::Diagnostics;
use rox::lox::{Lox, RunReport};
use rox::parser::Parser;
use rox::scanner::{self, Scanner};

#[derive(ClapParser, Debug)]
#[command(
    version,
    about = "Rox language interpreter",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Script to run; without one an interactive prompt starts
    scripts: Vec<PathBuf>,

    /// Enable logging to rox.log
    #[arg(long, global = true)]
    log: bool,

    /// Deepest nesting of calls before "Stack overflow."
    #[arg(long, global = true, default_value_t = Config::DEFAULT_MAX_CALL_DEPTH)]
    max_depth: usize,

    /// Do not print unused-variable warnings
    #[arg(long, global = true)]
    no_warnings: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file and prints the AST of each statement
    Parse { filename: PathBuf },
}

/// Reads the contents of a file into a String
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("rox.log").context("Failed to create rox.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to rox.log");
    Ok(())
}

fn exit(code: i32) -> ! {
    let _ = io::stdout().flush();
    std::process::exit(code)
}

fn print_report(report: &RunReport, config: &Config) {
    if config.warnings {
        for warning in &report.warnings {
            eprintln!("{}", warning);
        }
    }

    for error in &report.errors {
        debug!("Reported: {}", error);
        eprintln!("{}", error);
    }
}

fn run_file(filename: &PathBuf, config: Config) -> Result<()> {
    info!("Running script {:?}", filename);

    let source = read_file(filename)?;
    let mut lox = Lox::with_config(io::stdout(), config);

    let report = lox.run(&source);
    print_report(&report, &config);

    let code = report.exit_code();
    if code != 0 {
        debug!("Script failed, exiting with code {}", code);
        exit(code);
    }

    Ok(())
}

fn run_prompt(config: Config) -> Result<()> {
    info!("Starting interactive prompt");

    let mut lox = Lox::with_config(io::stdout(), config);
    let mut lines = io::stdin().lock().lines();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };
        let line = line.context("Failed to read from stdin")?;

        let report = lox.run_line(&line);
        print_report(&report, &config);
    }
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");
    let source = read_file(filename)?;

    let mut tokens = Vec::new();
    let mut tokenized = true;

    for item in Scanner::new(&source) {
        match item {
            Ok(token) => {
                debug!("Scanned token: {}", token);
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&tokens).context("Failed to serialize tokens")?
        );
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(filename: &PathBuf) -> Result<()> {
    info!("Running Parse subcommand");
    let source = read_file(filename)?;

    let mut diagnostics = Diagnostics::new();
    let (tokens, lex_errors) = scanner::scan(&source);
    for e in lex_errors {
        diagnostics.error(e);
    }

    let statements = Parser::new(tokens).parse(&mut diagnostics);

    for stmt in &statements {
        println!("{}", AstPrinter::print_stmt(stmt));
    }

    if diagnostics.had_error() {
        for e in diagnostics.errors() {
            eprintln!("{}", e);
        }
        exit(65);
    }

    info!("Parse subcommand completed");
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

    let config = Config {
        max_call_depth: args.max_depth,
        warnings: !args.no_warnings,
    };

    // Script calls recurse on the host stack; give them room for the depth limit.
    let session = thread::Builder::new()
        .name("rox".to_string())
        .stack_size(Config::STACK_SIZE)
        .spawn(move || dispatch(args, config))
        .context("Failed to start interpreter thread")?;

    match session.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("Interpreter thread panicked")),
    }
}

fn dispatch(args: Cli, config: Config) -> Result<()> {
    match &args.command {
        Some(Commands::Tokenize { filename, json }) => tokenize(filename, *json),

        Some(Commands::Parse { filename }) => parse(filename),

        None => match args.scripts.as_slice() {
            [] => run_prompt(config),
            [script] => run_file(script, config),
            _ => {
                println!("Usage: rox [script]");
                exit(64);
            }
        },
    }
}
