use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use fruit_invoice::fonts::FontConfig;
use fruit_invoice::generator;
use fruit_invoice::invoice::{self, InvoiceOptions, LineItems, TotalPolicy};
use fruit_invoice::model::ImageSource;
use fruit_invoice::DocumentBuilder;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Renders the sample fruit invoice to a PDF file.
///
/// Fonts are looked up under `assets/fonts` next to the binary, in the crate, and in the usual
/// Liberation install directories unless `--fonts-dir` points elsewhere.
#[derive(Parser)]
#[command(author, version, about = "Render the sample fruit invoice")]
struct Cli {
    /// Where to write the PDF.
    #[arg(short, long, default_value = invoice::DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Logo shown in the page header; a missing file only drops the logo.
    #[arg(long, default_value = invoice::DEFAULT_LOGO_PATH)]
    logo: String,

    /// Directory holding the LiberationSans/LiberationMono TrueType files.
    #[arg(long)]
    fonts_dir: Option<PathBuf>,

    /// Fill the table with this many generated fruit records instead of the sample rows.
    #[arg(short, long)]
    generate: Option<usize>,

    /// Seed for the record generator.
    #[arg(long, requires = "generate")]
    seed: Option<u64>,

    /// Print the "$ XXXX.00" placeholder instead of the computed total.
    #[arg(long)]
    placeholder_total: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        println!("Could not save PDF: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }

    println!("PDF saved successfully");
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let items = match (cli.generate, cli.seed) {
        (Some(count), Some(seed)) => {
            LineItems::Generated(generator::generate(count, &mut StdRng::seed_from_u64(seed)))
        }
        (Some(count), None) => LineItems::Generated(generator::generate_unseeded(count)),
        (None, _) => LineItems::Static,
    };
    let total = if cli.placeholder_total {
        TotalPolicy::Placeholder
    } else {
        TotalPolicy::Computed
    };

    let options = InvoiceOptions::new()
        .with_logo(ImageSource::from_path(cli.logo))
        .with_items(items)
        .with_total(total);
    let plan = invoice::invoice_plan(&options)?;

    let mut fonts = FontConfig::new();
    if let Some(directory) = cli.fonts_dir {
        fonts = fonts.with_directory(directory);
    }

    let pdf = DocumentBuilder::new()
        .with_fonts(fonts)
        .assemble(&plan, &cli.output)?;
    log::info!(
        "{} written with {} page(s)",
        cli.output.display(),
        pdf.page_count
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        println!("  caused by: {}", source);
        error = source;
    }
}
