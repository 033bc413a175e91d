use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, debug, info};

use hackc::{
    Error, assembler,
    bytecode::{VmModule, compile_source},
    frontend::{StructureWriter, TokenDumper},
    lexer::Lexer,
    output_path,
    parser::parse_source,
    parser_error::ParserError,
    translator::{Translator, TranslatorOptions},
    unit_name,
};

#[derive(Parser, Debug)]
#[command(
    name = "hackc",
    version,
    about = "Compiler, bytecode translator and assembler for the Hack platform"
)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble FILE.asm into FILE.hack
    Asm {
        input: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Translate bytecode (.vm text or .vmb image), one file or a directory,
    /// into a single .asm file
    Vm {
        input: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Function the bootstrap code calls
        #[arg(long, default_value = "Sys.init")]
        entry: String,
        /// Emit bootstrap code (default for more than one input file)
        #[arg(long, conflicts_with = "no_bootstrap")]
        bootstrap: bool,
        /// Omit bootstrap code
        #[arg(long)]
        no_bootstrap: bool,
    },

    /// Compile FILE.jack, or every .jack file in a directory, to bytecode
    Jack {
        input: PathBuf,
        /// Write the structural trace to FILE.xml instead of compiling
        #[arg(long, conflicts_with_all = ["tokens", "image"])]
        xml: bool,
        /// Print the token listing instead of compiling
        #[arg(long, conflicts_with = "image")]
        tokens: bool,
        /// With --tokens, print the listing as a <tokens> element
        #[arg(long, requires = "tokens")]
        token_xml: bool,
        /// Write a binary image FILE.vmb instead of FILE.vm
        #[arg(long)]
        image: bool,
        #[arg(long)]
        no_color: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Command::Asm { input, output } => run_asm(&input, output),
        Command::Vm {
            input,
            output,
            entry,
            bootstrap,
            no_bootstrap,
        } => {
            let forced = match (bootstrap, no_bootstrap) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            run_vm(&input, output, entry, forced)
        }
        Command::Jack {
            input,
            xml,
            tokens,
            token_xml,
            image,
            no_color,
        } => {
            let mode = if xml {
                JackMode::Structure
            } else if tokens {
                JackMode::Tokens {
                    xml: token_xml,
                    color: !no_color,
                }
            } else if image {
                JackMode::Image
            } else {
                JackMode::Bytecode
            };
            run_jack(&input, mode)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ───────────────────────────── File helpers ─────────────────────────────

fn read(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a whole output file at once, so a failed run never leaves a
/// half-written file behind.
fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), Error> {
    fs::write(path, contents).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

/// `input` itself, or the files directly inside it with one of
/// `extensions`, sorted by name.
fn collect_inputs(input: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, Error> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let io_error = |source| Error::Io {
        path: input.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(input).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(Error::NoInputs {
            path: input.to_path_buf(),
            extension: extensions.join("/"),
        });
    }
    Ok(files)
}

// ─────────────────────────────── Commands ───────────────────────────────

fn run_asm(input: &Path, output: Option<PathBuf>) -> Result<(), Error> {
    let output = match output {
        Some(path) => path,
        None => output_path(input, "hack")?,
    };
    let source = read(input)?;
    let words = assembler::assemble(&source).map_err(|source| Error::Asm {
        path: input.to_path_buf(),
        source,
    })?;
    write(&output, assembler::render(&words))
}

fn run_vm(
    input: &Path,
    output: Option<PathBuf>,
    entry: String,
    forced_bootstrap: Option<bool>,
) -> Result<(), Error> {
    let files = collect_inputs(input, &["vm", "vmb"])?;
    let output = match output {
        Some(path) => path,
        None if input.is_dir() => {
            let name = input
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "out".into());
            input.join(name).with_extension("asm")
        }
        None => output_path(input, "asm")?,
    };

    let bootstrap = forced_bootstrap.unwrap_or(files.len() > 1);
    debug!("{} unit(s), bootstrap {}", files.len(), bootstrap);
    let mut translator = Translator::new(TranslatorOptions { bootstrap, entry });

    for file in &files {
        if has_extension(file, &["vmb"]) {
            let bytes = fs::read(file).map_err(|source| Error::Io {
                path: file.clone(),
                source,
            })?;
            let module = VmModule::from_bytes(&bytes).map_err(|source| Error::Image {
                path: file.clone(),
                source,
            })?;
            translator.translate_module(&module)?;
        } else {
            let name = unit_name(file)?;
            translator.translate_text(&name, &read(file)?)?;
        }
    }

    write(&output, translator.finish())
}

#[derive(Debug, Clone, Copy)]
enum JackMode {
    Bytecode,
    Image,
    Structure,
    Tokens { xml: bool, color: bool },
}

fn run_jack(input: &Path, mode: JackMode) -> Result<(), Error> {
    for file in collect_inputs(input, &["jack"])? {
        debug!("compiling {}", file.display());
        let source = read(&file)?;
        let parse_error = |source: ParserError| Error::Parse {
            path: file.clone(),
            source,
        };

        match mode {
            JackMode::Tokens { xml, color } => {
                let tokens = Lexer::new(&source)
                    .tokenize()
                    .map_err(|e| parse_error(e.into()))?;
                let mut dumper = TokenDumper::new();
                if !color {
                    dumper = dumper.no_color();
                }
                if xml {
                    dumper = dumper.xml();
                }
                dumper.dump(&tokens);
            }
            JackMode::Structure => {
                let class = parse_source(&source).map_err(parse_error)?;
                write(&output_path(&file, "xml")?, StructureWriter::new().write(&class))?;
            }
            JackMode::Bytecode | JackMode::Image => {
                let module = compile_source(&unit_name(&file)?, &source).map_err(|source| {
                    Error::Compile {
                        path: file.clone(),
                        source,
                    }
                })?;
                if let JackMode::Image = mode {
                    let bytes = module.to_bytes().map_err(|source| Error::Image {
                        path: file.clone(),
                        source,
                    })?;
                    write(&output_path(&file, "vmb")?, bytes)?;
                } else {
                    write(&output_path(&file, "vm")?, module.to_text())?;
                }
            }
        }
    }
    Ok(())
}
