//! Dataset conversion commands.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rico_convert::{Dataset, Pipeline, Store, discover_samples};
use tracing::info;

use super::progress::BarProgress;
use crate::{BigEarthNetArgs, CommonArgs, DatasetDirArgs, MajorTomArgs, Ssl4eoArgs};

pub fn bigearthnet(args: BigEarthNetArgs) -> Result<()> {
    let roots = collect_roots([
        (Dataset::BigEarthNetS1, args.bigearthnet_s1_dir),
        (Dataset::BigEarthNetS2, args.bigearthnet_s2_dir),
    ]);
    run(&roots, &args.common)
}

pub fn hyspecnet(args: DatasetDirArgs) -> Result<()> {
    run(&[(Dataset::HySpecNet11k, args.dataset_dir)], &args.common)
}

pub fn major_tom_core(args: MajorTomArgs) -> Result<()> {
    let roots = collect_roots([
        (Dataset::MajorTomCoreS1, args.s1_dir),
        (Dataset::MajorTomCoreS2, args.s2_dir),
    ]);
    run(&roots, &args.common)
}

pub fn ssl4eo_s12(args: Ssl4eoArgs) -> Result<()> {
    let roots = collect_roots([
        (Dataset::Ssl4eoS12S1, args.s1_dir),
        (Dataset::Ssl4eoS12S2L1c, args.s2_l1c_dir),
        (Dataset::Ssl4eoS12S2L2a, args.s2_l2a_dir),
    ]);
    run(&roots, &args.common)
}

pub fn uc_merced(args: DatasetDirArgs) -> Result<()> {
    run(&[(Dataset::UcMerced, args.dataset_dir)], &args.common)
}

pub fn hydro(args: DatasetDirArgs) -> Result<()> {
    run(&[(Dataset::Hydro, args.dataset_dir)], &args.common)
}

pub fn eurosat_ms(args: DatasetDirArgs) -> Result<()> {
    run(&[(Dataset::EurosatMs, args.dataset_dir)], &args.common)
}

fn collect_roots<const N: usize>(roots: [(Dataset, Option<PathBuf>); N]) -> Vec<(Dataset, PathBuf)> {
    roots
        .into_iter()
        .filter_map(|(dataset, dir)| dir.map(|d| (dataset, d)))
        .collect()
}

/// Discovers every root, then converts them in order into one store.
fn run(roots: &[(Dataset, PathBuf)], common: &CommonArgs) -> Result<()> {
    if roots.is_empty() {
        bail!("Please provide at least one dataset directory");
    }

    // A bad later root must fail before the store exists.
    let mut jobs = Vec::with_capacity(roots.len());
    for (dataset, root) in roots {
        let samples = discover_samples(*dataset, root)
            .with_context(|| format!("Failed to discover {dataset} samples in {}", root.display()))?;
        info!(dataset = dataset.name(), samples = samples.len(), "found samples");
        jobs.push((*dataset, samples));
    }

    let options = common.options();
    let store = Store::create(&common.target_dir, options.map_size)
        .with_context(|| format!("Failed to open store: {}", common.target_dir.display()))?;
    let progress = BarProgress::new();
    let mut pipeline = Pipeline::new(&store, &options, &progress)?;

    for (dataset, samples) in jobs {
        let report = pipeline
            .convert(dataset, samples, options.compression.as_ref())
            .with_context(|| format!("Failed to convert {dataset}"))?;
        info!(
            dataset = dataset.name(),
            samples = report.samples,
            chunks = report.chunks,
            "committed"
        );
    }

    info!(target = %store.path().display(), "done");
    Ok(())
}
