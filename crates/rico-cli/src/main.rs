//! rico-hdl - convert remote-sensing datasets into LMDB tensor stores
//!
//! Every sample becomes one safetensors-compatible container keyed by its
//! sample name. Running the same conversion twice yields byte-identical
//! `data.mdb` files; `rico-hdl diff` checks that on sampled content.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rico_convert::{ConvertOptions, DEFAULT_CHUNK_SIZE, verify::DEFAULT_NUM_SAMPLES};
use rico_core::CompressionOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "rico-hdl")]
#[command(author, version, about = "Remote sensing dataset to LMDB converter")]
#[command(long_about = "
Converts remote sensing datasets into a single LMDB store of
safetensors-compatible records for fast random access during training.

Examples:
  rico-hdl bigearthnet --bigearthnet-s1-dir S1/ --bigearthnet-s2-dir S2/ --target-dir out/
  rico-hdl hyspecnet-11k --dataset-dir hyspecnet-11k/ --target-dir out/ --compress
  rico-hdl uc-merced --dataset-dir UCMerced_LandUse/ --target-dir out/
  rico-hdl inspect out/ --group S2:10
  rico-hdl diff run1/ run2/
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// BigEarthNet-S1 and BigEarthNet-S2 (both roots go into one store)
    Bigearthnet(BigEarthNetArgs),

    /// HySpecNet-11k EnMAP patches
    #[command(name = "hyspecnet-11k")]
    HySpecNet11k(DatasetDirArgs),

    /// Major-TOM-Core S1 RTC and S2 L2A
    #[command(name = "major-tom-core")]
    MajorTomCore(MajorTomArgs),

    /// SSL4EO-S12 S1 GRD, S2 L1C and S2 L2A
    #[command(name = "ssl4eo-s12")]
    Ssl4eoS12(Ssl4eoArgs),

    /// UC Merced Land Use (RGB TIFFs)
    #[command(name = "uc-merced")]
    UcMerced(DatasetDirArgs),

    /// Hydro Sentinel-2 patches
    Hydro(DatasetDirArgs),

    /// EuroSAT multi-spectral
    #[command(name = "eurosat-multi-spectral")]
    EurosatMultiSpectral(DatasetDirArgs),

    /// Print the digest report of one store
    Inspect(InspectArgs),

    /// Compare digest reports of two stores
    #[command(visible_alias = "d")]
    Diff(DiffArgs),
}

/// Flags shared by every conversion.
#[derive(Args, Clone)]
pub struct CommonArgs {
    /// Output LMDB directory, created if missing
    #[arg(long)]
    pub target_dir: PathBuf,

    /// Worker threads (default: available parallelism)
    #[arg(long)]
    pub num_workers: Option<usize>,

    /// Shuffle + zstd compress every record
    #[arg(long)]
    pub compress: bool,

    /// Samples per write transaction
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl CommonArgs {
    fn options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default().with_chunk_size(self.chunk_size);
        if let Some(n) = self.num_workers {
            options = options.with_num_workers(n);
        }
        if self.compress {
            options = options.with_compression(CompressionOptions::default());
        }
        options
    }
}

#[derive(Args)]
pub struct DatasetDirArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Dataset root directory
    #[arg(long)]
    pub dataset_dir: PathBuf,
}

#[derive(Args)]
pub struct BigEarthNetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// BigEarthNet-S1 root
    #[arg(long)]
    pub bigearthnet_s1_dir: Option<PathBuf>,

    /// BigEarthNet-S2 root
    #[arg(long)]
    pub bigearthnet_s2_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct MajorTomArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Major-TOM-Core S1RTC root
    #[arg(long)]
    pub s1_dir: Option<PathBuf>,

    /// Major-TOM-Core S2L2A root
    #[arg(long)]
    pub s2_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct Ssl4eoArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// SSL4EO-S12 S1 root
    #[arg(long)]
    pub s1_dir: Option<PathBuf>,

    /// SSL4EO-S12 S2 L1C root
    #[arg(long)]
    pub s2_l1c_dir: Option<PathBuf>,

    /// SSL4EO-S12 S2 L2A root
    #[arg(long)]
    pub s2_l2a_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Store directory
    pub store: PathBuf,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

#[derive(Args)]
pub struct DiffArgs {
    /// First store
    pub a: PathBuf,

    /// Second store
    pub b: PathBuf,

    #[command(flatten)]
    pub sampling: SamplingArgs,
}

#[derive(Args)]
pub struct SamplingArgs {
    /// Key group as PREFIX[:LIMIT]; repeatable (default: S1 and S2)
    #[arg(long = "group", value_parser = commands::inspect::parse_group)]
    pub groups: Vec<commands::inspect::GroupArg>,

    /// Samples per group when no LIMIT is given
    #[arg(long, default_value_t = DEFAULT_NUM_SAMPLES)]
    pub num_samples: usize,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Bigearthnet(args) => commands::convert::bigearthnet(args),
        Commands::HySpecNet11k(args) => commands::convert::hyspecnet(args),
        Commands::MajorTomCore(args) => commands::convert::major_tom_core(args),
        Commands::Ssl4eoS12(args) => commands::convert::ssl4eo_s12(args),
        Commands::UcMerced(args) => commands::convert::uc_merced(args),
        Commands::Hydro(args) => commands::convert::hydro(args),
        Commands::EurosatMultiSpectral(args) => commands::convert::eurosat_ms(args),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Diff(args) => commands::inspect::run_diff(args),
    }
}
