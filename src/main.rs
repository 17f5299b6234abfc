use std::path::{Path, PathBuf};

use clap::{AppSettings, Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use nifits::{
    codec::{Endianness, Layout, Precision},
    document::Document,
    read::{self, fits::FitsError},
    write::{self, WriteOptions},
    NifitsError, TableSource, ValidationReport,
};

#[derive(Parser)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_long_args = true)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbosity: u8,

    /// Disable progress bars.
    #[clap(long, global = true)]
    no_progress_bars: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Check files against every invariant and report all violations.
    Validate {
        /// .nifits containers or .fits exports.
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },

    /// Summarise a file's header and tables.
    Info { file: PathBuf },

    /// Convert between containers and FITS, or re-encode a container.
    Convert {
        input: PathBuf,

        output: PathBuf,

        /// Write under an older format version.
        #[clap(long)]
        format_version: Option<u32>,

        /// Write big-endian values.
        #[clap(long)]
        big_endian: bool,

        /// Write reals in single precision. Fails if any value would lose
        /// precision.
        #[clap(long)]
        single_precision: bool,
    },

    /// Write a container's static and dynamic tables to separate files.
    Split {
        input: PathBuf,

        /// Where the instrument description goes.
        #[clap(long)]
        static_out: PathBuf,

        /// Where the observation goes.
        #[clap(long)]
        dynamic_out: PathBuf,
    },

    /// Join a static and a dynamic part back into one file.
    Merge {
        static_part: PathBuf,

        dynamic_part: PathBuf,

        output: PathBuf,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Don't know what kind of file {0} is; use .nifits or .fits")]
    UnknownFileType(String),

    #[error("{invalid} of {total} files failed validation")]
    InvalidFiles { invalid: usize, total: usize },

    #[error(transparent)]
    Nifits(#[from] NifitsError),

    #[error(transparent)]
    Template(#[from] indicatif::style::TemplateError),
}

macro_rules! impl_from_for_cli_error {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CliError {
                fn from(e: $t) -> CliError {
                    CliError::Nifits(e.into())
                }
            }
        )*
    };
}

impl_from_for_cli_error!(
    read::ReadError,
    write::WriteError,
    FitsError,
    nifits::schema::SchemaError,
    std::io::Error
);

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    Container,
    Fits,
}

impl FileType {
    fn from_path(path: &Path) -> Result<FileType, CliError> {
        match path.extension().and_then(|os_str| os_str.to_str()) {
            Some("nifits" | "nif") => Ok(FileType::Container),
            Some("fits" | "fit") => Ok(FileType::Fits),
            _ => Err(CliError::UnknownFileType(path.display().to_string())),
        }
    }
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbosity);
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Validate { mut files } => {
            files.sort_unstable();
            validate_files(&files, args.no_progress_bars)
        }

        Command::Info { file } => {
            let document = load(&file)?;
            info!("{}", file.display());
            print!("{document}");
            let cube = document.catalog().transfer_matrix_cube();
            if !cube.values.is_empty() {
                let (n_wl, n_out, n_in) = cube.values.dim();
                println!("Transfer matrix: {n_wl} wavelengths x {n_out} outputs x {n_in} inputs");
            }
            Ok(())
        }

        Command::Convert {
            input,
            output,
            format_version,
            big_endian,
            single_precision,
        } => {
            let document = load(&input)?;
            let header_layout = document.header().layout;
            let layout = (big_endian || single_precision).then(|| Layout {
                endianness: if big_endian {
                    Endianness::Big
                } else {
                    header_layout.endianness
                },
                precision: if single_precision {
                    Precision::Single
                } else {
                    header_layout.precision
                },
            });
            let options = WriteOptions {
                format_version,
                layout,
                ..Default::default()
            };
            save(&document, &output, &options)?;
            info!("Wrote {}", output.display());
            Ok(())
        }

        Command::Split {
            input,
            static_out,
            dynamic_out,
        } => {
            let document = load(&input)?;
            let (static_part, dynamic_part) =
                write::encode_split(&document, &WriteOptions::default())?;
            std::fs::write(&static_out, static_part)?;
            std::fs::write(&dynamic_out, dynamic_part)?;
            info!("Wrote {} and {}", static_out.display(), dynamic_out.display());
            Ok(())
        }

        Command::Merge {
            static_part,
            dynamic_part,
            output,
        } => {
            let document =
                read::decode_merged(&std::fs::read(&static_part)?, &std::fs::read(&dynamic_part)?)?;
            save(&document, &output, &WriteOptions::default())?;
            info!("Wrote {}", output.display());
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Document, CliError> {
    debug!("Loading {}", path.display());
    match FileType::from_path(path)? {
        FileType::Container => Ok(read::decode(&std::fs::read(path)?)?),
        FileType::Fits => Ok(read::fits::import(path)?),
    }
}

fn save(document: &Document, path: &Path, options: &WriteOptions) -> Result<(), CliError> {
    match FileType::from_path(path)? {
        FileType::Container => std::fs::write(path, write::encode_with(document, options)?)?,
        FileType::Fits => {
            if options.format_version.is_some() || options.layout.is_some() {
                warn!("FITS exports always use the document's own version and layout");
            }
            write::fits::export(document, path)?
        }
    }
    Ok(())
}

/// Validate without sealing, so every violation gets reported.
fn check(path: &Path) -> Result<ValidationReport, CliError> {
    match FileType::from_path(path)? {
        FileType::Container => {
            let (_, draft) = read::decode_draft(&std::fs::read(path)?)?;
            Ok(draft.validate())
        }
        FileType::Fits => match read::fits::import(path) {
            Ok(_) => Ok(ValidationReport::default()),
            Err(FitsError::Invalid(report)) => Ok(report),
            Err(e) => Err(e.into()),
        },
    }
}

fn validate_files(files: &[PathBuf], no_progress_bars: bool) -> Result<(), CliError> {
    let progress = ProgressBar::with_draw_target(
        Some(files.len() as _),
        if no_progress_bars {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stdout()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg:17}: [{wide_bar:.blue}] {pos:2}/{len:2} files ({elapsed_precise}<{eta_precise})")?
            .progress_chars("=> "),
    )
    .with_message("Validating");

    let results: Vec<_> = files
        .par_iter()
        .progress_with(progress.clone())
        .map(|file| (file, check(file)))
        .collect();
    progress.finish_and_clear();

    let mut invalid = 0;
    for (file, result) in results {
        match result {
            Ok(report) if report.is_empty() => info!("{}: valid", file.display()),
            Ok(report) => {
                invalid += 1;
                warn!("{}: {report}", file.display());
            }
            Err(e) => {
                invalid += 1;
                warn!("{}: {e}", file.display());
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::InvalidFiles {
            invalid,
            total: files.len(),
        });
    }
    Ok(())
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();
}
