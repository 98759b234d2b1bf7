//! Rill front end driver
//!
//! Usage: rillc [OPTIONS] <input>

use clap::Parser as ClapParser;
use rill_compiler::common::DiagnosticReporter;
use rill_compiler::lexer::Lexer;
use rill_compiler::scope::Frame;
use rill_compiler::{Features, Parser};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser, Debug)]
#[command(name = "rillc")]
#[command(version = "0.1.0")]
#[command(about = "Front end for the Rill embeddable expression language", long_about = None)]
struct Args {
    /// Input script file
    #[arg(required = true)]
    input: PathBuf,

    /// Disable local variable declarations
    #[arg(long)]
    no_locals: bool,

    /// Disable lambda definitions
    #[arg(long)]
    no_lambda: bool,

    /// Disable pragma declarations
    #[arg(long)]
    no_pragma: bool,

    /// Disable assignment operators
    #[arg(long)]
    no_side_effect: bool,

    /// Allow raw register references (debug)
    #[arg(long)]
    registers: bool,

    /// Reserve a name so scripts cannot declare it (repeatable)
    #[arg(long, value_name = "NAME")]
    reserved: Vec<String>,

    /// Pre-declare a script parameter (repeatable)
    #[arg(long, value_name = "NAME")]
    param: Vec<String>,

    /// Dump tokens (for debugging)
    #[arg(long)]
    dump_tokens: bool,

    /// Dump the parse tree (for debugging)
    #[arg(long)]
    dump_ast: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let source = fs::read_to_string(&args.input)?;
    let filename = args.input.display().to_string();

    let mut reporter = DiagnosticReporter::new();
    let file_id = reporter.add_file(&filename, &source);

    let features = Features::default()
        .with_local_var(!args.no_locals)
        .with_lambda(!args.no_lambda)
        .with_pragma(!args.no_pragma)
        .with_side_effect(!args.no_side_effect)
        .with_reserved_names(args.reserved.iter().cloned());

    if args.dump_tokens {
        match Lexer::new(&source).tokenize_all() {
            Ok(tokens) => {
                eprintln!("=== Tokens ===");
                for token in &tokens {
                    eprintln!("{:?}", token);
                }
                eprintln!("=== End Tokens ===\n");
            }
            Err(e) => {
                reporter.report_error(file_id, &e);
                anyhow::bail!("lexing failed");
            }
        }
    }

    let mut parser = match Parser::new(&source, features) {
        Ok(parser) => parser,
        Err(e) => {
            reporter.report_error(file_id, &e);
            anyhow::bail!("parsing failed");
        }
    };
    if args.registers {
        parser.allow_registers(true);
    }
    if !args.param.is_empty() {
        let names: Vec<&str> = args.param.iter().map(String::as_str).collect();
        parser.set_frame(Frame::with_parameters(&names));
    }

    let script = match parser.parse() {
        Ok(script) => script,
        Err(e) => {
            reporter.report_error(file_id, &e);
            anyhow::bail!("parsing failed");
        }
    };

    if args.dump_ast {
        eprintln!("=== Parse tree ===");
        eprintln!("{:#?}", script);
        eprintln!("=== End Parse tree ===\n");
    }

    println!("{}: {} statement(s)", filename, script.body.len());
    if let Some(frame) = &script.scope {
        println!(
            "registers: {} ({} parameter(s))",
            frame.num_registers(),
            frame.num_parameters()
        );
        let mut symbols: Vec<(&str, usize)> = frame.symbols().collect();
        symbols.sort_by_key(|&(_, register)| register);
        for (name, register) in symbols {
            println!("  r{} <- {}", register, name);
        }
    }
    if let Some(pragmas) = &script.pragmas {
        println!("pragmas:");
        for (key, value) in pragmas {
            println!("  {} = {}", key, value);
        }
    }

    Ok(())
}
