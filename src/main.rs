//! `slc` CLI: compile a `.sl` source file to VM program text.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser as ClapParser;

use slc::lexer::Lexer;
use slc::parser::Parser;

#[derive(ClapParser)]
#[command(name = "slc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile SL programs to register-VM instructions", long_about = None)]
struct Cli {
    /// Input .sl source file
    input: PathBuf,

    /// Output path for the compiled VM program
    output: PathBuf,

    /// Print tokens and the parsed AST to stderr before compiling
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), slc::errors::CompileError> {
    let source = fs::read_to_string(&cli.input)?;

    if cli.verbose {
        let tokens = Lexer::new(&source).tokenize()?;
        eprintln!("tokens:\n{:#?}", tokens);
        let program = Parser::new(&source)?.parse()?;
        eprintln!("ast:\n{:#?}", program);
    }

    let output = slc::compile(&source)?;
    fs::write(&cli.output, output)?;

    println!(
        "Compiled {} -> {}",
        cli.input.display(),
        cli.output.display()
    );
    Ok(())
}
