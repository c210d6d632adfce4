use std::{fs::read, io, path::PathBuf, process::ExitCode, result::Result};

use clap::Parser;
use env_logger::Env;
use hb_input::{FontModel, GlyphInput, InputGenerator, InputOptions};
use log::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("read: {0}")]
    Read(#[source] io::Error),
    #[error("{0}")]
    Font(#[from] hb_input::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hb-input", version)]
#[command(about = "Derive HarfBuzz input (text and features) that renders each glyph of a font")]
#[command(after_help = "Examples:\n  \
    hb-input NotoSans-Regular.ttf\n  \
    hb-input --hb-shape NotoSans-Regular.ttf f_i A.sc")]
struct Cli {
    /// Input .otf or .ttf font file
    #[arg(value_name = "INPUT", required = true)]
    input: PathBuf,
    /// Glyph names to resolve (default: every glyph); 'gid<N>' selects by glyph id
    #[arg(value_name = "GLYPH")]
    glyphs: Vec<String>,
    /// Do not prefix zero-width glyphs with spaces
    #[arg(long)]
    no_pad: bool,
    /// Warn about glyphs that cannot be reached
    #[arg(short, long)]
    warn: bool,
    /// Print hb-shape arguments instead of a table
    #[arg(long)]
    hb_shape: bool,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Suppress output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn run(&self) -> ExitCode {
        self.execute().map_or_else(
            |e| {
                eprintln!("{e}");
                ExitCode::FAILURE
            },
            |_| ExitCode::SUCCESS,
        )
    }

    fn execute(&self) -> CliResult<()> {
        let data = read(&self.input).map_err(CliError::Read)?;
        let font = FontModel::from_data(&data)?;
        let generator = InputGenerator::new(&font);
        let options = InputOptions::new()
            .with_no_pad_if(self.no_pad)
            .with_warnings_if(self.warn);

        let inputs = if self.glyphs.is_empty() {
            generator.glyph_inputs(&options)?.inputs
        } else {
            self.targeted(&generator, &options)?
        };

        if !self.quiet {
            for input in &inputs {
                self.print(input);
            }
        }
        info!(
            "{}: {} inputs",
            self.input.file_name().unwrap_or_default().to_string_lossy(),
            inputs.len()
        );
        Ok(())
    }

    fn targeted(
        &self,
        generator: &InputGenerator,
        options: &InputOptions,
    ) -> CliResult<Vec<GlyphInput>> {
        let font = generator.font();
        let mut inputs = Vec::with_capacity(self.glyphs.len());
        for name in &self.glyphs {
            let glyph = font
                .glyph_id(name)
                .ok_or_else(|| hb_input::Error::UnknownGlyph(name.clone()))?;
            let pad = options.pad.applies(font.is_zero_width(glyph));
            match generator.input_for_glyph(glyph, pad)? {
                Some(input) => inputs.push(GlyphInput {
                    glyph,
                    name: name.clone(),
                    input,
                }),
                None => log::warn!("not tested (unreachable?): {name}"),
            }
        }
        Ok(inputs)
    }

    fn print(&self, input: &GlyphInput) {
        if self.hb_shape {
            let args: Vec<_> = input
                .input
                .hb_shape_args()
                .iter()
                .map(|arg| shell_quote(arg))
                .collect();
            println!("{} {}", shell_quote(&self.input.to_string_lossy()), args.join(" "));
        } else {
            println!("{input}");
        }
    }
}

fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=,./+:".contains(c))
    {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
    cli.run()
}
