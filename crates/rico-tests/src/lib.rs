//! End-to-end tests for rico-hdl crates.
//!
//! Fixtures are real GeoTIFF trees written to temporary directories with
//! `rico-io`, converted with `rico-convert` and read back through the
//! container decoder.
//!
//! ```bash
//! cargo test --package rico-tests
//! ```

pub mod fixtures;

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::Duration;

    use rico_convert::dataset::{S2_L2A_BANDS, UC_MERCED_BANDS};
    use rico_convert::{
        BandSpec, Comparison, ConvertError, ConvertOptions, Dataset, KeyRule, NoProgress,
        Pipeline, PipelineState, RunReport, SampleGroup, SampleKey, SourceFile, Store,
        compare_stores, discover_samples,
    };
    use rico_core::compression::{self, MAGIC};
    use rico_core::{CompressionOptions, DataType, container};
    use tempfile::TempDir;

    use crate::fixtures::*;

    const MAP: usize = 1 << 26;

    const S1_PATCHES: [&str; 3] = [
        "S1A_IW_GRDH_1SDV_20170613T165043_33UUP_70_48",
        "S1A_IW_GRDH_1SDV_20170613T165043_33UUP_71_49",
        "S1B_IW_GRDH_1SDV_20180504T051113_29SND_01_76",
    ];

    const S2_PATCHES: [&str; 2] = [
        "S2A_MSIL2A_20170613T101031_N9999_R022_T33UUP_26_57",
        "S2B_MSIL2A_20170924T093020_N9999_R136_T35ULA_42_19",
    ];

    fn bigearthnet_tree(root: &Path) -> (PathBuf, PathBuf) {
        let s1 = root.join("BigEarthNet-S1");
        let s2 = root.join("BigEarthNet-S2");
        for (i, name) in S1_PATCHES.iter().enumerate() {
            bigearthnet_s1_patch(&s1, name, i as u16 * 100);
        }
        for (i, name) in S2_PATCHES.iter().enumerate() {
            bigearthnet_s2_patch(&s2, name, 1000 + i as u16 * 100);
        }
        (s1, s2)
    }

    /// Converts both BigEarthNet roots into `target` and returns the store.
    fn convert_bigearthnet(s1: &Path, s2: &Path, target: &Path, options: &ConvertOptions) -> Store {
        let store = Store::create(target, MAP).unwrap();
        {
            let mut pipeline = Pipeline::new(&store, options, &NoProgress).unwrap();
            for (dataset, root) in [(Dataset::BigEarthNetS1, s1), (Dataset::BigEarthNetS2, s2)] {
                let samples = discover_samples(dataset, root).unwrap();
                pipeline
                    .convert(dataset, samples, options.compression.as_ref())
                    .unwrap();
            }
            assert_eq!(pipeline.state(), PipelineState::Idle);
        }
        store
    }

    fn keys(store: &Store) -> Vec<String> {
        store
            .keys()
            .unwrap()
            .into_iter()
            .map(|k| String::from_utf8(k).unwrap())
            .collect()
    }

    /// Two samples, each a directory with `A.tif` and `B.tif`.
    #[test]
    fn test_two_sample_conversion() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        for (i, sample) in ["sample_2", "sample_1"].iter().enumerate() {
            let base = i as u16 * 10;
            write_band(&data.join(sample).join("A.tif"), &u16_band(4, 4, base));
            write_band(&data.join(sample).join("B.tif"), &u16_band(4, 4, base + 1));
        }

        let spec = BandSpec::file_per_band(&["A", "B"], |n| SourceFile::Named(format!("{n}.tif")));
        let store = Store::create(dir.path().join("out"), MAP).unwrap();
        let options = ConvertOptions::default().with_chunk_size(1).with_num_workers(2);
        let mut pipeline = Pipeline::new(&store, &options, &NoProgress).unwrap();

        let samples = vec![data.join("sample_2"), data.join("sample_1")];
        let report = pipeline
            .run(
                "two-samples",
                samples,
                |p| KeyRule::LastComponent.derive(p),
                |p| Ok(container::encode(&spec.extract(p)?)),
            )
            .unwrap();
        assert_eq!(report, RunReport { samples: 2, chunks: 2 });
        assert_eq!(keys(&store), ["sample_1", "sample_2"]);

        let record = container::decode(&store.get(b"sample_2").unwrap().unwrap()).unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), ["A", "B"]);
        let a = record.get("A").unwrap();
        assert_eq!(a.dtype(), DataType::UInt16);
        assert_eq!(a.shape(), &[4, 4]);
        assert_eq!(a, &u16_band(4, 4, 0));
        assert_eq!(record.get("B").unwrap(), &u16_band(4, 4, 1));
    }

    #[test]
    fn test_bigearthnet_multi_root() {
        let dir = TempDir::new().unwrap();
        let (s1, s2) = bigearthnet_tree(dir.path());
        let store = convert_bigearthnet(&s1, &s2, &dir.path().join("out"), &ConvertOptions::default());

        let mut expected: Vec<String> = S1_PATCHES.iter().chain(&S2_PATCHES).map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(keys(&store), expected);

        let s1_record = container::decode(&store.get(S1_PATCHES[0].as_bytes()).unwrap().unwrap()).unwrap();
        assert_eq!(s1_record.names().collect::<Vec<_>>(), ["VH", "VV"]);

        // Table order, not file or alphabetical order.
        let s2_record = container::decode(&store.get(S2_PATCHES[1].as_bytes()).unwrap().unwrap()).unwrap();
        assert_eq!(s2_record.names().collect::<Vec<_>>(), S2_L2A_BANDS);
        for (i, (_, band)) in s2_record.iter().enumerate() {
            assert_eq!(band, &u16_band(4, 4, 1100 + i as u16));
        }
    }

    #[test]
    fn test_data_file_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let (s1, s2) = bigearthnet_tree(dir.path());

        let serial = ConvertOptions::default().with_num_workers(1).with_chunk_size(2);
        let parallel = ConvertOptions::default().with_num_workers(4).with_chunk_size(2);
        let a = convert_bigearthnet(&s1, &s2, &dir.path().join("a"), &serial);
        let b = convert_bigearthnet(&s1, &s2, &dir.path().join("b"), &parallel);
        let (a_file, b_file) = (a.data_file(), b.data_file());
        drop((a, b));

        assert_eq!(sha256_file(&a_file), sha256_file(&b_file));
    }

    #[test]
    fn test_slow_workers_do_not_reorder_commits() {
        let dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("s{i}")).collect();
        let samples: Vec<PathBuf> = names.iter().map(|n| dir.path().join(n)).collect();

        let convert = |target: &str, delay: bool| {
            let store = Store::create(dir.path().join(target), MAP).unwrap();
            {
                let options = ConvertOptions::default().with_chunk_size(4).with_num_workers(4);
                let mut pipeline = Pipeline::new(&store, &options, &NoProgress).unwrap();
                pipeline
                    .run(
                        target,
                        samples.iter().rev().cloned().collect(),
                        |p| KeyRule::LastComponent.derive(p),
                        |p| {
                            let key = KeyRule::LastComponent.derive(p)?;
                            if delay {
                                // Earliest samples finish last.
                                let index: u64 = key.to_string()[1..].parse().unwrap_or(0);
                                thread::sleep(Duration::from_millis((8 - index) * 10));
                            }
                            Ok(key.into_bytes())
                        },
                    )
                    .unwrap();
            }
            store.data_file()
        };

        let fast = convert("fast", false);
        let slow = convert("slow", true);
        assert_eq!(sha256_file(&fast), sha256_file(&slow));
    }

    #[test]
    fn test_key_collision_keeps_earlier_chunks() {
        let dir = TempDir::new().unwrap();
        let store = Store::create(dir.path(), MAP).unwrap();
        let options = ConvertOptions::default().with_chunk_size(2);
        let mut pipeline = Pipeline::new(&store, &options, &NoProgress).unwrap();

        let samples = ["a", "b", "c", "d"].iter().map(|n| PathBuf::from(format!("/x/{n}"))).collect();
        let err = pipeline
            .run(
                "collide",
                samples,
                |p| {
                    // "d" reuses the key of the already committed "a".
                    if p.ends_with("d") {
                        Ok(SampleKey::from("a"))
                    } else {
                        KeyRule::LastComponent.derive(p)
                    }
                },
                |_| Ok(vec![0u8; 8]),
            )
            .unwrap_err();

        match err {
            ConvertError::KeyCollision { key, path } => {
                assert_eq!(key, "a");
                assert_eq!(path, Path::new("/x/d"));
            }
            other => panic!("expected key collision, got {other}"),
        }
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(pipeline.state(), PipelineState::Aborted);
    }

    #[test]
    fn test_same_patch_name_in_two_tiles() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("s1");
        let name = S1_PATCHES[0];
        bigearthnet_s1_patch_in(&root, "tile-2", name, 10);
        let first = bigearthnet_s1_patch_in(&root, "tile", name, 20);

        let samples = discover_samples(Dataset::BigEarthNetS1, &root).unwrap();
        assert_eq!(samples.len(), 2);

        let store = Store::create(&dir.path().join("out"), MAP).unwrap();
        let options = ConvertOptions::default().with_chunk_size(1).with_num_workers(2);
        let mut pipeline = Pipeline::new(&store, &options, &NoProgress).unwrap();
        let err = pipeline.convert(Dataset::BigEarthNetS1, samples, None).unwrap_err();

        // "tile-2/" sorts before "tile/", so the later one collides.
        match err {
            ConvertError::KeyCollision { key, path } => {
                assert_eq!(key, name);
                assert_eq!(path, first);
            }
            other => panic!("expected key collision, got {other}"),
        }
        assert_eq!(store.keys().unwrap(), vec![name.as_bytes().to_vec()]);
        let kept = container::decode(&store.get(name.as_bytes()).unwrap().unwrap()).unwrap();
        assert_eq!(kept.get("VH"), Some(&u16_band(4, 4, 10)));
    }

    #[test]
    fn test_compressed_conversion() {
        let dir = TempDir::new().unwrap();
        let (s1, s2) = bigearthnet_tree(dir.path());

        let plain = convert_bigearthnet(&s1, &s2, &dir.path().join("plain"), &ConvertOptions::default());
        let options = ConvertOptions::default().with_compression(CompressionOptions::default());
        let packed = convert_bigearthnet(&s1, &s2, &dir.path().join("packed"), &options);

        for key in plain.keys().unwrap() {
            let raw = plain.get(&key).unwrap().unwrap();
            let value = packed.get(&key).unwrap().unwrap();
            assert!(value.starts_with(MAGIC));
            assert!(compression::is_compressed(&value));
            assert_eq!(compression::decompress(&value).unwrap(), raw);
            assert_eq!(container::decode(&value).unwrap(), container::decode(&raw).unwrap());
        }
    }

    #[test]
    fn test_uc_merced_rgb() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("UCMerced_LandUse").join("Images");
        uc_merced_image(&root, "airplane", 0);
        uc_merced_image(&root, "airplane", 1);
        uc_merced_image(&root, "forest", 42);

        let samples = discover_samples(Dataset::UcMerced, &root).unwrap();
        assert_eq!(samples.len(), 3);

        let store = Store::create(dir.path().join("out"), MAP).unwrap();
        let mut pipeline = Pipeline::new(&store, &ConvertOptions::default(), &NoProgress).unwrap();
        pipeline.convert(Dataset::UcMerced, samples, None).unwrap();
        assert_eq!(keys(&store), ["airplane00", "airplane01", "forest42"]);

        let record = container::decode(&store.get(b"forest42").unwrap().unwrap()).unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), UC_MERCED_BANDS);
        for (i, (_, band)) in record.iter().enumerate() {
            assert_eq!(band.dtype(), DataType::UInt8);
            assert_eq!(band, &u8_band(8, 8, 42 * 3 + i as u8));
        }
    }

    #[test]
    fn test_incomplete_band_set_aborts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("hydro");
        let bands: Vec<_> = (0..3).map(|i| u16_band(4, 4, i)).collect();
        write_bands(&root.join("patch_0.tif"), &bands, Some(&GEO));

        let samples = discover_samples(Dataset::Hydro, &root).unwrap();
        let store = Store::create(dir.path().join("out"), MAP).unwrap();
        let mut pipeline = Pipeline::new(&store, &ConvertOptions::default(), &NoProgress).unwrap();
        let err = pipeline.convert(Dataset::Hydro, samples, None).unwrap_err();

        assert!(matches!(err, ConvertError::IncompleteBandSet { expected: 12, found: 3, .. }));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_missing_band_file_aborts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("BigEarthNet-S1");
        let patch = bigearthnet_s1_patch(&root, S1_PATCHES[0], 0);
        std::fs::remove_file(patch.join(format!("{}_VV.tif", S1_PATCHES[0]))).unwrap();

        let samples = discover_samples(Dataset::BigEarthNetS1, &root).unwrap();
        let store = Store::create(dir.path().join("out"), MAP).unwrap();
        let mut pipeline = Pipeline::new(&store, &ConvertOptions::default(), &NoProgress).unwrap();
        let err = pipeline.convert(Dataset::BigEarthNetS1, samples, None).unwrap_err();

        assert!(matches!(err, ConvertError::MissingSourceFile { ref sample, .. } if sample == &patch));
    }

    #[test]
    fn test_diff_of_reruns() {
        let dir = TempDir::new().unwrap();
        let (s1, s2) = bigearthnet_tree(dir.path());
        let options = ConvertOptions::default();
        drop(convert_bigearthnet(&s1, &s2, &dir.path().join("run1"), &options));
        drop(convert_bigearthnet(&s1, &s2, &dir.path().join("run2"), &options.clone().with_num_workers(3)));

        let groups = SampleGroup::defaults(25);
        let (outcome, first, _) =
            compare_stores(&dir.path().join("run1"), &dir.path().join("run2"), &groups).unwrap();
        assert_eq!(outcome, Comparison::Identical);
        // Three S1 keys, two S2 keys, one band group each.
        assert_eq!(first.lines.len(), 5);

        // Change one S2 band and rerun into a third store.
        let patch = s2.join("tile").join(S2_PATCHES[0]);
        write_band(&patch.join(format!("{}_B05.tif", S2_PATCHES[0])), &u16_band(4, 4, 7));
        drop(convert_bigearthnet(&s1, &s2, &dir.path().join("run3"), &options));

        let (outcome, _, third) =
            compare_stores(&dir.path().join("run1"), &dir.path().join("run3"), &groups).unwrap();
        assert_eq!(outcome, Comparison::Different);
        assert_eq!(third.lines.len(), 5);
    }
}
