//! Growth form packer CLI - pack a directory of snapshots for the viewer.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use form_packer::{
    PipelineConfig,
    pipeline,
    schema::{DEFAULT_SUBJECT, DiscoveryMode, ExportFormat, NormalizationScope},
};

#[derive(Debug, Parser)]
#[command(
    name = "form-packer",
    version,
    about = "Colorize exported growth forms and pack them into viewer buffers"
)]
struct Cli {
    /// Directory of snapshot files (or generation directories with --evolution)
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Output directory (created if missing)
    #[arg(required_unless_present = "print_config")]
    output: Option<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Treat each numbered subdirectory as a generation and use its final snapshot
    #[arg(long)]
    evolution: bool,

    /// Subject directory inside each generation [default: 0, or the config's]
    #[arg(long, requires = "evolution")]
    subject: Option<String>,

    /// Write one colorized text mesh per frame instead of binary buffers
    #[arg(long)]
    text: bool,

    /// Drop the final snapshot of each sequence
    #[arg(long)]
    drop_last: bool,

    /// Normalize colors over the whole sequence instead of per frame
    #[arg(long)]
    sequence_normalization: bool,

    /// Also write the last frame's buffers on their own
    #[arg(long)]
    write_last_frame: bool,

    /// Parse and project on a single thread
    #[arg(long)]
    sequential: bool,

    /// Print the default JSON configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn load_config(&self) -> Result<PipelineConfig, String> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| format!("Error reading config file {}: {e}", path.display()))?;
                serde_json::from_str(&text)
                    .map_err(|e| format!("Error parsing config {}: {e}", path.display()))?
            }
            None => PipelineConfig::default(),
        };

        if self.evolution {
            let subject = match (&self.subject, &config.discovery) {
                (Some(subject), _) => subject.clone(),
                (None, DiscoveryMode::Evolution { subject }) => subject.clone(),
                (None, DiscoveryMode::Sequence) => DEFAULT_SUBJECT.to_string(),
            };
            config.discovery = DiscoveryMode::Evolution { subject };
        }
        if self.text {
            config.export.format = ExportFormat::Text;
        }
        if self.write_last_frame {
            config.export.write_last_frame = true;
        }
        if self.drop_last {
            config.drop_last = true;
        }
        if self.sequence_normalization {
            config.embedding.normalization = NormalizationScope::Sequence;
        }
        if self.sequential {
            config.parallel = false;
        }
        Ok(config)
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if cli.print_config {
        match serde_json::to_string_pretty(&PipelineConfig::default()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing config: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let config = cli.load_config().unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    // clap enforces both positionals unless --print-config was given
    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        eprintln!("Input and output directories are required");
        std::process::exit(2);
    };

    match pipeline::run(input, output, &config) {
        Ok(Some(report)) => {
            println!("Packed {} -> {}", input.display(), output.display());
            println!("  {report}");
            if report.degenerate_axes > 0 {
                println!(
                    "  {} flat color axes filled with {}",
                    report.degenerate_axes, config.embedding.degenerate_fill
                );
            }
        }
        Ok(None) => {
            println!("No snapshots found in {}", input.display());
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
