use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use qart::{Capacity, Config, Encoded, Level, QArt, Rotation, Version};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qart")]
#[command(about = "QR codes that look like pictures", long_about = None)]
struct Cli {
    /// Log selection passes and corrections (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an image as a QR code
    Encode {
        /// Target image
        image: PathBuf,
        /// Output file (.png or .svg)
        #[arg(short, long, default_value = "qart.png")]
        output: PathBuf,
        /// Also write a PNG showing which modules were steered
        #[arg(long)]
        control: Option<PathBuf>,
        /// Print the code to the terminal
        #[arg(long)]
        ascii: bool,
        #[command(flatten)]
        settings: Settings,
    },
    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        settings: Settings,
    },
    /// Show how a URL fits into a symbol
    Capacity {
        #[command(flatten)]
        settings: Settings,
    },
}

/// Flags that override the config file.
#[derive(Args, Debug)]
struct Settings {
    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// URL prefix encoded before '#'
    #[arg(short, long)]
    url: Option<String>,
    /// QR version (1-40)
    #[arg(long)]
    version: Option<u8>,
    /// Error correction level (L, M, Q, H)
    #[arg(long)]
    level: Option<Level>,
    /// Mask pattern (0-7)
    #[arg(long)]
    mask: Option<u8>,
    /// Horizontal image offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    dx: Option<i32>,
    /// Vertical image offset in pixels
    #[arg(long, allow_hyphen_values = true)]
    dy: Option<i32>,
    /// Extra target pixels beyond the symbol size
    #[arg(long)]
    margin: Option<u32>,
    /// Pixels per module
    #[arg(long)]
    scale: Option<u32>,
    /// Quiet zone in modules
    #[arg(long)]
    quiet_zone: Option<usize>,
    /// Quarter turns to rotate the grid (0-3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
    rotation: Option<u8>,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Replace image contrast with seeded noise
    #[arg(long)]
    rand_control: bool,
    /// Dither the steered modules
    #[arg(long)]
    dither: bool,
    /// Leave check bits alone
    #[arg(long)]
    only_data_bits: bool,
}

impl Settings {
    /// Load the config file (or defaults) and apply flag overrides.
    fn resolve(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Config::default(),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(version) = self.version {
            config.version = version;
        }
        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(mask) = self.mask {
            config.mask = mask;
        }
        if let Some(dx) = self.dx {
            config.dx = dx;
        }
        if let Some(dy) = self.dy {
            config.dy = dy;
        }
        if let Some(margin) = self.margin {
            config.margin = margin;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(quiet_zone) = self.quiet_zone {
            config.quiet_zone = quiet_zone;
        }
        if let Some(turns) = self.rotation {
            config.rotation = Rotation::from_quarter_turns(turns)?;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.rand_control |= self.rand_control;
        config.dither |= self.dither;
        config.only_data_bits |= self.only_data_bits;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Encode {
            image,
            output,
            control,
            ascii,
            settings,
        } => encode(&image, &output, control.as_deref(), ascii, &settings),
        Commands::Config { settings } => print_config(&settings),
        Commands::Capacity { settings } => show_capacity(&settings),
    }
}

fn init_tracing(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Png,
    Svg,
}

fn output_format(path: &Path) -> Result<OutputFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => Ok(OutputFormat::Png),
        Some("svg") => Ok(OutputFormat::Svg),
        _ => bail!(
            "Cannot tell output format from '{}'. Use a .png or .svg file name.",
            path.display()
        ),
    }
}

fn encode(
    image: &Path,
    output: &Path,
    control: Option<&Path>,
    ascii: bool,
    settings: &Settings,
) -> Result<()> {
    let mut config = settings.resolve()?;
    config.save_control |= control.is_some();
    let format = output_format(output)?;

    let qart = QArt::open(config, image)
        .with_context(|| format!("Failed to load image {}", image.display()))?;
    let encoded = qart.encode().context("Failed to encode QR code")?;
    let config = qart.config();

    let bytes = match format {
        OutputFormat::Png => encoded.code.to_png(config.scale, config.quiet_zone)?,
        OutputFormat::Svg => encoded
            .code
            .to_svg(config.scale, config.quiet_zone)
            .into_bytes(),
    };
    fs::write(output, bytes).context("Failed to write output file")?;
    info!(path = %output.display(), "wrote code");

    if let (Some(path), Some(map)) = (control, &encoded.control) {
        let png = map.to_png(config.scale, config.quiet_zone)?;
        fs::write(path, png).context("Failed to write control map")?;
    }

    if ascii {
        println!("{}", encoded.code.to_ascii(2));
    }

    print_summary(config, &encoded, output, control);
    Ok(())
}

fn print_summary(config: &Config, encoded: &Encoded, output: &Path, control: Option<&Path>) {
    let size = encoded.code.size();

    println!("============================================================");
    println!("                  QART CODE GENERATED");
    println!("============================================================");
    println!();
    println!("Written to: {}", output.display());
    if let Some(path) = control {
        println!("Control map: {}", path.display());
    }
    println!();
    println!("------------------------------------------------------------");
    println!("SYMBOL");
    println!("------------------------------------------------------------");
    println!("  Version:      {} ({}x{} modules)", config.version, size, size);
    println!("  Level:        {:?}", config.level);
    println!("  Mask:         {}", config.mask);
    println!("  Rotation:     {:?}", config.rotation);
    println!();
    println!("------------------------------------------------------------");
    println!("SELECTION");
    println!("------------------------------------------------------------");
    println!("  Steered modules:  {}", encoded.bound);
    println!("  Passes:           {}", encoded.passes);
    println!("  Corrections:      {}", encoded.corrections);
    println!();
    println!("Payload:");
    println!("  {}", encoded.payload);
    println!("============================================================");
}

fn print_config(settings: &Settings) -> Result<()> {
    let config = settings.resolve()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn show_capacity(settings: &Settings) -> Result<()> {
    let config = settings.resolve()?;
    let version = Version::new(config.version)?;
    let capacity = Capacity::for_config(&config)?;
    let plan = qart::Plan::new(version, config.level, qart::Mask::new(config.mask)?);

    println!("URL:           {}", config.header());
    println!("Version:       {} level {:?}", config.version, config.level);
    println!("Data bits:     {}", capacity.data_bits);
    println!("Header bits:   {}", capacity.head_bits);
    println!("Digit groups:  {} ({} digits)", capacity.groups, capacity.digits());
    println!("Spare bits:    {}", capacity.spare_bits());
    println!();
    println!("{:<8} {:>10} {:>11}", "Block", "Data bytes", "Check bytes");
    println!("{}", "-".repeat(31));
    for layout in plan.block_layouts() {
        println!(
            "{:<8} {:>10} {:>11}",
            layout.index, layout.data_bytes, layout.check_bytes
        );
    }

    Ok(())
}
