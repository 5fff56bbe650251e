//! Store inspection and comparison (like diff_lmdb)

use anyhow::{Context, Result, bail};
use rico_convert::verify::{self, Comparison, SampleGroup};

use crate::{DiffArgs, InspectArgs, SamplingArgs};

/// `--group` value before `--num-samples` is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupArg {
    prefix: String,
    limit: Option<usize>,
}

/// Parses `PREFIX[:LIMIT]`.
pub fn parse_group(s: &str) -> Result<GroupArg, String> {
    match s.rsplit_once(':') {
        Some((prefix, limit)) => {
            let limit = limit
                .parse()
                .map_err(|e| format!("invalid limit '{limit}': {e}"))?;
            Ok(GroupArg {
                prefix: prefix.to_owned(),
                limit: Some(limit),
            })
        }
        None => Ok(GroupArg {
            prefix: s.to_owned(),
            limit: None,
        }),
    }
}

fn groups(sampling: &SamplingArgs) -> Vec<SampleGroup> {
    if sampling.groups.is_empty() {
        return SampleGroup::defaults(sampling.num_samples);
    }
    sampling
        .groups
        .iter()
        .map(|g| SampleGroup::new(g.prefix.clone(), g.limit.unwrap_or(sampling.num_samples)))
        .collect()
}

pub fn run(args: InspectArgs) -> Result<()> {
    let report = verify::inspect_path(&args.store, &groups(&args.sampling))
        .with_context(|| format!("Failed to inspect: {}", args.store.display()))?;
    print!("{report}");
    Ok(())
}

pub fn run_diff(args: DiffArgs) -> Result<()> {
    let (outcome, first, second) = verify::compare_stores(&args.a, &args.b, &groups(&args.sampling))
        .context("Failed to compare stores")?;

    println!("{outcome}");
    if outcome == Comparison::Different {
        println!("File 1:");
        print!("{first}");
        println!("File 2:");
        print!("{second}");
        bail!("{} and {} differ", args.a.display(), args.b.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group() {
        assert_eq!(
            parse_group("S2:8").unwrap(),
            GroupArg { prefix: "S2".into(), limit: Some(8) }
        );
        assert_eq!(
            parse_group("s1_").unwrap(),
            GroupArg { prefix: "s1_".into(), limit: None }
        );
        assert!(parse_group("S1:x").is_err());
    }

    #[test]
    fn test_default_groups() {
        let sampling = SamplingArgs { groups: Vec::new(), num_samples: 9 };
        assert_eq!(
            groups(&sampling),
            vec![SampleGroup::new("S1", 9), SampleGroup::new("S2", 3)]
        );

        let sampling = SamplingArgs {
            groups: vec![parse_group("patch").unwrap(), parse_group("S2:1").unwrap()],
            num_samples: 9,
        };
        assert_eq!(
            groups(&sampling),
            vec![SampleGroup::new("patch", 9), SampleGroup::new("S2", 1)]
        );
    }
}
