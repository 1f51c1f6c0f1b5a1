use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use logoqr::{generate_to_file, EncodingRequest, SizeTier};

const BANNER: &str = concat!(
    "logoqr ",
    env!("CARGO_PKG_VERSION"),
    "\nCreates a QR code with an optional logo in its center.\n"
);

/// Create a QR code with optional logo.
#[derive(Parser, Debug)]
#[command(name = "logoqr", version, about)]
struct Args {
    /// Prompt for every value on the terminal.
    #[arg(short, long)]
    interactive: bool,

    /// The data to be encoded in the QR code.
    #[arg(short, long)]
    data: Option<String>,

    /// Size of the QR code: small, medium, large (or 1, 2, 3).
    #[arg(short, long, default_value = "medium")]
    size: String,

    /// Path of the logo image to place in the center.
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Output file; `.png` is appended when there is no extension.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.interactive {
        println!("{}", BANNER);
        return run_interactive(&mut io::stdin().lock());
    }
    match (args.data, args.output) {
        (Some(data), Some(output)) => {
            create(&data, &args.size, args.logo.as_deref(), &output)
        }
        _ => {
            eprintln!("Error: --data and --output are required unless --interactive is given.");
            Args::command().print_help()?;
            bail!("missing arguments")
        }
    }
}

fn run_interactive(input: &mut impl BufRead) -> Result<()> {
    let data = prompt(input, "Enter the data to be encoded in the QR code: ")?;
    let size = prompt(input, "Enter the size of the QR code (1: Small, 2: Medium, 3: Large): ")?;
    let logo = prompt(input, "Enter the path of the logo file (leave empty for none): ")?;
    let output = prompt(input, "Enter the name of the QR code file: ")?;
    if output.is_empty() {
        bail!("no output file name given");
    }
    let logo = (!logo.is_empty()).then(|| PathBuf::from(logo));
    create(&data, &size, logo.as_deref(), Path::new(&output))
}

fn prompt(input: &mut impl BufRead, question: &str) -> Result<String> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn create(data: &str, size: &str, logo: Option<&Path>, output: &Path) -> Result<()> {
    let request = EncodingRequest::new(data, SizeTier::parse_lenient(size));
    let path = generate_to_file(&request, logo, output)
        .with_context(|| format!("could not create QR code at {}", output.display()))?;
    println!("QR code successfully created! You can find the file here: {}", path.display());
    Ok(())
}
