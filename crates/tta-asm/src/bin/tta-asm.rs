//! Command-line front end: assemble one P1 source file.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use tta_asm::slot::parse_integer;
use tta_asm::{p1, Architecture, AsmError, Assembler, Format, Summary};

#[derive(Parser, Debug)]
#[command(
    name = "tta-asm",
    version,
    about = "Assembler for the P1 transport-triggered core",
    long_about = "Assembler for the P1 transport-triggered core.

R sets the register field width (2^R registers), W the register width in
bits. The output is written next to FILE with the format's extension
appended (FILE.sim, FILE.hex, FILE.bits or FILE.lst)."
)]
struct Cli {
    /// Register field width in bits.
    #[arg(value_name = "R")]
    register_bits: u32,
    /// Register width in bits.
    #[arg(value_name = "W")]
    word_bits: u32,
    /// Source file.
    #[arg(value_name = "FILE")]
    file: PathBuf,
    /// Output format.
    #[arg(value_name = "FORMAT", value_enum)]
    format: Format,
    /// Define an augmentation constant, e.g. `--aug LEN=12`.
    #[arg(long = "aug", value_name = "KEY=VALUE", value_parser = parse_augmentation)]
    augmentations: Vec<(String, i128)>,
    /// Offset of the first instruction word.
    #[arg(long = "base", value_name = "N", value_parser = parse_offset)]
    base: Option<u64>,
    /// Architecture description (JSON) replacing the built-in P1 table.
    #[arg(long = "arch", value_name = "FILE.json")]
    arch: Option<PathBuf>,
    /// Log each pass and print the label table.
    #[arg(long)]
    debug: bool,
}

fn parse_augmentation(arg: &str) -> Result<(String, i128), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    if key.is_empty() {
        return Err(format!("missing key in '{}'", arg));
    }
    let value = parse_integer(value).ok_or_else(|| format!("invalid integer '{}'", value))?;
    Ok((String::from(key), value))
}

fn parse_offset(arg: &str) -> Result<u64, String> {
    parse_integer(arg)
        .and_then(|n| u64::try_from(n).ok())
        .ok_or_else(|| format!("invalid offset '{}'", arg))
}

#[derive(Debug)]
enum CliError {
    Io { path: PathBuf, source: std::io::Error },
    Config { path: PathBuf, source: serde_json::Error },
    Asm { path: PathBuf, source: AsmError },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            CliError::Config { path, source } => {
                write!(f, "{}: invalid architecture: {}", path.display(), source)
            }
            CliError::Asm { path, source } => write!(f, "{}:{}", path.display(), source),
        }
    }
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn architecture(cli: &Cli) -> Result<Architecture, CliError> {
    let mut arch = match &cli.arch {
        Some(path) => {
            serde_json::from_str::<Architecture>(&read(path)?).map_err(|source| {
                CliError::Config {
                    path: path.clone(),
                    source,
                }
            })?
        }
        None => p1::architecture(cli.register_bits, cli.word_bits),
    };
    arch.register_bits = cli.register_bits;
    arch.word_bits = cli.word_bits;
    if let Some(base) = cli.base {
        arch.base_offset = base;
    }
    for (key, value) in &cli.augmentations {
        arch.augmentations.insert(key.clone(), *value);
    }
    Ok(arch)
}

fn output_path(file: &Path, format: Format) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

fn run(cli: &Cli) -> Result<Summary, CliError> {
    let arch = architecture(cli)?;
    log::debug!(
        "target '{}': {} registers, {}-bit words",
        arch.name,
        arch.register_count(),
        arch.word_bits
    );
    let asm_err = |source: AsmError| CliError::Asm {
        path: cli.file.clone(),
        source,
    };
    let registry = p1::registry().map_err(asm_err)?;
    let asm = Assembler::new(arch, registry);

    let source = read(&cli.file)?;
    let result = asm.assemble_str(&source).map_err(asm_err)?;
    if cli.debug {
        for (name, offset) in result.labels() {
            println!("{} = 0x{:X} ({})", name, offset, offset);
        }
    }

    let out = output_path(&cli.file, cli.format);
    fs::write(&out, cli.format.render(&result)).map_err(|source| CliError::Io {
        path: out.clone(),
        source,
    })?;
    log::debug!("wrote {}", out.display());
    Ok(Summary::new(&result, asm.architecture()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();

    match run(&cli) {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
