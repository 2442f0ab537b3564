//! The `cormark` binary.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::Parser;

use cormark::{markdown_to_html, Options, ParseOptions, RenderOptions};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// CommonMark file(s) to parse; or standard input if none passed.
    #[arg(value_name = "FILE")]
    files: Option<Vec<PathBuf>>,

    /// Treat newlines as hard line breaks.
    #[arg(long)]
    hardbreaks: bool,

    /// Default value for fenced code block's info strings if none is given.
    #[arg(long, value_name = "INFO")]
    default_info_string: Option<String>,

    /// Write output to FILE instead of stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = Options {
        parse: ParseOptions {
            default_info_string: cli.default_info_string.clone(),
        },
        render: RenderOptions {
            hardbreaks: cli.hardbreaks,
        },
    };

    let mut s: Vec<u8> = Vec::with_capacity(2048);

    match cli.files {
        None => {
            io::stdin().read_to_end(&mut s)?;
        }
        Some(ref fs) => {
            for f in fs {
                let mut io = File::open(f)?;
                io.read_to_end(&mut s)?;
            }
        }
    };

    let input = String::from_utf8(s)?;
    let html = markdown_to_html(&input, &options);

    match cli.output {
        None => {
            io::stdout().write_all(html.as_bytes())?;
        }
        Some(ref path) => {
            let mut f = File::create(path)?;
            f.write_all(html.as_bytes())?;
        }
    }

    Ok(())
}
