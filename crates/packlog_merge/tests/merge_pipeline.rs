//! End-to-end fixtures for the packaging and merge pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use packlog_core::{
    content_hash, BaselineSource, ChecksumIndexBuilder, FormatHandler, HandlerError,
    HandlerRegistry, PriorityPair, ZstdBackend,
};
use packlog_merge::{MergeEnv, Merger, ModChangelog, Packager, ShopsMerger};
use packlog_sarc::Sarc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Handler that makes both operations visible in the output bytes.
struct TracingHandler;

impl FormatHandler for TracingHandler {
    fn package(&self, _key: &str, i: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError> {
        let base = String::from_utf8_lossy(i.base);
        let over = String::from_utf8_lossy(i.over);
        Ok(format!("D[{base}>{over}]").into_bytes())
    }

    fn merge(&self, _key: &str, i: PriorityPair<'_>) -> Result<Vec<u8>, HandlerError> {
        let base = String::from_utf8_lossy(i.base);
        let over = String::from_utf8_lossy(i.over);
        Ok(format!("M[{base}|{over}]").into_bytes())
    }
}

struct Fixture {
    _dirs: Vec<TempDir>,
    env: Arc<MergeEnv>,
}

fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

fn write(root: &Utf8Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap().as_std_path()).unwrap();
    std::fs::write(path.as_std_path(), bytes).unwrap();
}

fn read(root: &Utf8Path, rel: &str) -> Vec<u8> {
    std::fs::read(root.join(rel).as_std_path()).unwrap()
}

fn sarc(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut archive = Sarc::new();
    for (name, data) in entries {
        archive.insert(*name, data.to_vec());
    }
    archive.encode()
}

fn list_files(root: &Utf8Path) -> Vec<String> {
    fn visit(dir: &std::path::Path, base: &std::path::Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                visit(&path, base, out);
            } else {
                out.push(
                    path.strip_prefix(base)
                        .unwrap()
                        .to_str()
                        .unwrap()
                        .replace('\\', "/"),
                );
            }
        }
    }
    let mut out = Vec::new();
    visit(root.as_std_path(), root.as_std_path(), &mut out);
    out.sort();
    out
}

/// Build an environment over a temp baseline tree.
fn fixture(
    baseline_files: &[(&str, Vec<u8>)],
    index: ChecksumIndexBuilder,
    versions: &[&str],
    handlers: HandlerRegistry,
) -> Fixture {
    let baseline_dir = TempDir::new().unwrap();
    let baseline_root = utf8_root(&baseline_dir);
    for (rel, bytes) in baseline_files {
        write(&baseline_root, rel, bytes);
    }

    let zstd = Arc::new(ZstdBackend::plain());
    let baseline = BaselineSource::new(baseline_root, Arc::clone(&zstd)).unwrap();
    let env = MergeEnv::new(
        Arc::new(index.build(versions.iter().map(|v| v.to_string()).collect())),
        Arc::new(handlers),
        zstd,
        baseline,
    );
    Fixture {
        _dirs: vec![baseline_dir],
        env,
    }
}

fn temp_tree() -> (TempDir, Utf8PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = utf8_root(&dir);
    (dir, root)
}

// --- packaging ---

#[test]
fn identity_skip_emits_nothing() {
    let baseline_pack = sarc(&[("f1.dat", b"v0")]);
    let mut index = ChecksumIndexBuilder::new();
    index.add_file("Pack/Actor/A.pack", content_hash(&baseline_pack));

    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack.clone())],
        index,
        &[],
        HandlerRegistry::new(),
    );

    let (_mod_dir, mod_root) = temp_tree();
    write(&mod_root, "romfs/Pack/Actor/A.pack", &baseline_pack);
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();

    assert_eq!(summary.emitted, 0);
    assert_eq!(summary.skipped, 1);
    assert!(list_files(&out_root).is_empty());
}

#[test]
fn version_tagged_variant_counts_as_baseline() {
    let content = b"hello world".to_vec();
    let mut index = ChecksumIndexBuilder::new();
    // Only the tagged key exists.
    index.add_file("Docs/Readme.txt#121", content_hash(&content));

    let fx = fixture(&[], index, &["110", "121"], HandlerRegistry::new());

    let (_mod_dir, mod_root) = temp_tree();
    write(&mod_root, "romfs/Docs/Readme.txt", &content);
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();

    assert_eq!(summary.emitted, 0);
    assert!(list_files(&out_root).is_empty());
}

#[test]
fn container_diff_strips_unchanged_entries() {
    let baseline_pack = sarc(&[("f1.dat", b"v0"), ("f2.dat", b"w0")]);
    let mut index = ChecksumIndexBuilder::new();
    index.add_file("Pack/Actor/A.pack", content_hash(&baseline_pack));
    index.add_entry("Pack/Actor/A.pack/f1.dat", content_hash(b"v0"));
    index.add_entry("Pack/Actor/A.pack/f2.dat", content_hash(b"w0"));

    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        index,
        &[],
        HandlerRegistry::new(),
    );

    let (_mod_dir, mod_root) = temp_tree();
    write(
        &mod_root,
        "romfs/Pack/Actor/A.pack",
        &sarc(&[("f1.dat", b"v0"), ("f2.dat", b"w1")]),
    );
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();
    assert_eq!(summary.emitted, 1);

    let changelog = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert!(!changelog.contains("f1.dat"), "unchanged entry must be stripped");
    assert_eq!(changelog.get("f2.dat"), Some(&b"w1"[..]));
}

#[test]
fn known_container_with_only_subentry_noise_emits_nothing() {
    // The container's whole-file hash mismatches the index (a baseline
    // variant this index doesn't carry), but no entry is actually changed,
    // stripped or replaced, so the container is unchanged at its granularity.
    let pack = sarc(&[("f1.dat", b"v0")]);
    let mut index = ChecksumIndexBuilder::new();
    index.add_file("Pack/Actor/A.pack", 0xDEAD_BEEF); // known path, other hash

    let fx = fixture(
        &[("Pack/Actor/A.pack", pack.clone())],
        index,
        &[],
        HandlerRegistry::new(),
    );

    let (_mod_dir, mod_root) = temp_tree();
    write(&mod_root, "romfs/Pack/Actor/A.pack", &pack);
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();
    assert_eq!(summary.emitted, 0);
    assert!(list_files(&out_root).is_empty());
}

#[test]
fn handler_deltifies_changed_container_entries() {
    let baseline_pack = sarc(&[("Actor/A.bgyml", b"old")]);
    let mut handlers = HandlerRegistry::new();
    handlers.register("bgyml", Arc::new(TracingHandler));

    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        ChecksumIndexBuilder::new(),
        &[],
        handlers,
    );

    let (_mod_dir, mod_root) = temp_tree();
    write(
        &mod_root,
        "romfs/Pack/Actor/A.pack",
        &sarc(&[("Actor/A.bgyml", b"new")]),
    );
    let (_out_dir, out_root) = temp_tree();

    Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();

    let changelog = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(changelog.get("Actor/A.bgyml"), Some(&b"D[old>new]"[..]));
}

#[test]
fn corrupt_container_in_mod_is_copied_raw() {
    let fx = fixture(&[], ChecksumIndexBuilder::new(), &[], HandlerRegistry::new());

    let (_mod_dir, mod_root) = temp_tree();
    write(&mod_root, "romfs/Pack/Actor/Broken.pack", b"this is not an archive");
    write(&mod_root, "romfs/Misc/Fine.bin", b"payload");
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();

    assert_eq!(summary.raw_copies, 1);
    assert_eq!(read(&out_root, "Pack/Actor/Broken.pack"), b"this is not an archive");
    // The failure did not prevent the other asset from being processed.
    assert_eq!(read(&out_root, "Misc/Fine.bin"), b"payload");
}

// --- merging ---

#[test]
fn addition_propagates_verbatim() {
    let baseline_pack = sarc(&[("f1.dat", b"v0")]);
    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_m1_dir, m1_root) = temp_tree();
    write(
        &m1_root,
        "Pack/Actor/A.pack",
        &sarc(&[("brand_new.bin", b"fresh")]),
    );
    let (_out_dir, out_root) = temp_tree();

    Merger::new(fx.env.clone())
        .merge(
            &[ModChangelog {
                id: "m1".to_owned(),
                root: m1_root,
            }],
            &out_root,
        )
        .unwrap();

    let merged = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(merged.get("brand_new.bin"), Some(&b"fresh"[..]));
    // Seeded baseline entry survives untouched.
    assert_eq!(merged.get("f1.dat"), Some(&b"v0"[..]));
}

#[test]
fn unhandled_extension_last_priority_wins() {
    let baseline_pack = sarc(&[("f1.dat", b"v0")]);
    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, "Pack/Actor/A.pack", &sarc(&[("f1.dat", b"from-m1")]));
    let (_m2_dir, m2_root) = temp_tree();
    write(&m2_root, "Pack/Actor/A.pack", &sarc(&[("f1.dat", b"from-m2")]));
    let (_out_dir, out_root) = temp_tree();

    Merger::new(fx.env.clone())
        .merge(
            &[
                ModChangelog { id: "m1".to_owned(), root: m1_root },
                ModChangelog { id: "m2".to_owned(), root: m2_root },
            ],
            &out_root,
        )
        .unwrap();

    let merged = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(merged.get("f1.dat"), Some(&b"from-m2"[..]));
}

#[test]
fn priority_accumulation_feeds_merged_state_forward() {
    let baseline_pack = sarc(&[("X.bgyml", b"B")]);
    let mut handlers = HandlerRegistry::new();
    handlers.register("bgyml", Arc::new(TracingHandler));

    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        ChecksumIndexBuilder::new(),
        &[],
        handlers,
    );

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, "Pack/Actor/A.pack", &sarc(&[("X.bgyml", b"A'")]));
    let (_m2_dir, m2_root) = temp_tree();
    write(&m2_root, "Pack/Actor/A.pack", &sarc(&[("X.bgyml", b"C'")]));
    let (_out_dir, out_root) = temp_tree();

    Merger::new(fx.env.clone())
        .merge(
            &[
                ModChangelog { id: "a".to_owned(), root: m1_root },
                ModChangelog { id: "c".to_owned(), root: m2_root },
            ],
            &out_root,
        )
        .unwrap();

    // The higher-priority merge must see the lower-priority result as its
    // accumulated destination, never the raw baseline.
    let merged = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(merged.get("X.bgyml"), Some(&b"M[M[B|A']|C']"[..]));
}

#[test]
fn end_to_end_scenario_no_handler() {
    // Baseline Pack/Actor/A.pack {f1: v0}; mod1 changes f1 to v1, mod2 to v2.
    let baseline_pack = sarc(&[("f1.dat", b"v0")]);
    let fx = fixture(
        &[("Pack/Actor/A.pack", baseline_pack)],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let packager = Packager::new(fx.env.clone());

    let (_m1_src, m1_src) = temp_tree();
    write(&m1_src, "romfs/Pack/Actor/A.pack", &sarc(&[("f1.dat", b"v1")]));
    let (_m1_out, m1_out) = temp_tree();
    packager.package_mod(&m1_src, &m1_out).unwrap();

    // No handler for the synthetic extension: content is kept, not deltified.
    let changelog = Sarc::decode(&read(&m1_out, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(changelog.get("f1.dat"), Some(&b"v1"[..]));

    let (_m2_src, m2_src) = temp_tree();
    write(&m2_src, "romfs/Pack/Actor/A.pack", &sarc(&[("f1.dat", b"v2")]));
    let (_m2_out, m2_out) = temp_tree();
    packager.package_mod(&m2_src, &m2_out).unwrap();

    let (_out_dir, out_root) = temp_tree();
    Merger::new(fx.env.clone())
        .merge(
            &[
                ModChangelog { id: "mod1".to_owned(), root: m1_out },
                ModChangelog { id: "mod2".to_owned(), root: m2_out },
            ],
            &out_root,
        )
        .unwrap();

    let merged = Sarc::decode(&read(&out_root, "Pack/Actor/A.pack")).unwrap();
    assert_eq!(merged.get("f1.dat"), Some(&b"v2"[..]));
}

#[test]
fn corrupt_container_is_isolated_and_priority_wins_wholesale() {
    let baseline_p = sarc(&[("p.dat", b"p0")]);
    let baseline_q = sarc(&[("q.dat", b"q0")]);
    let fx = fixture(
        &[
            ("Pack/Actor/P.pack", baseline_p),
            ("Pack/Actor/Q.pack", baseline_q),
        ],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, "Pack/Actor/P.pack", b"garbage, not an archive");
    write(&m1_root, "Pack/Actor/Q.pack", &sarc(&[("q.dat", b"q1")]));
    let (_out_dir, out_root) = temp_tree();

    let merger = Merger::new(fx.env.clone());
    merger
        .merge(
            &[ModChangelog { id: "m1".to_owned(), root: m1_root }],
            &out_root,
        )
        .unwrap();

    // P resolved wholesale to the mod's raw bytes; Q unaffected by P's failure.
    assert_eq!(read(&out_root, "Pack/Actor/P.pack"), b"garbage, not an archive");
    let q = Sarc::decode(&read(&out_root, "Pack/Actor/Q.pack")).unwrap();
    assert_eq!(q.get("q.dat"), Some(&b"q1"[..]));

    // The next mod's valid container replaces the corrupt destination.
    let (_m2_dir, m2_root) = temp_tree();
    write(&m2_root, "Pack/Actor/P.pack", &sarc(&[("p.dat", b"p2")]));
    merger
        .merge(
            &[ModChangelog { id: "m2".to_owned(), root: m2_root }],
            &out_root,
        )
        .unwrap();
    let p = Sarc::decode(&read(&out_root, "Pack/Actor/P.pack")).unwrap();
    assert_eq!(p.get("p.dat"), Some(&b"p2"[..]));
}

#[test]
fn gamedata_changelog_applies_to_every_variant() {
    use packlog_merge::gdl::GdlTable;

    let table = |entries: &[(&str, u64)]| -> Vec<u8> {
        GdlTable {
            entries: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
        .encode()
    };

    let vanilla = table(&[("Flag.A", 1), ("Flag.B", 2)]);
    let fx = fixture(
        &[
            ("GameData/GameDataList.Product.100.gdl", vanilla.clone()),
            ("GameData/GameDataList.Product.110.gdl", vanilla.clone()),
        ],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    // Package: two physical candidates, one logical asset.
    let (_mod_dir, mod_root) = temp_tree();
    let modded = table(&[("Flag.A", 1), ("Flag.B", 20), ("Flag.C", 3)]);
    write(&mod_root, "romfs/GameData/GameDataList.Product.100.gdl", &modded);
    write(&mod_root, "romfs/GameData/GameDataList.Product.110.gdl", &modded);
    let (_log_dir, log_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &log_root)
        .unwrap();
    assert_eq!(summary.emitted, 1, "exactly one changelog artifact per run");
    assert_eq!(
        list_files(&log_root),
        vec!["GameData/GameDataList.gdlchangelog".to_owned()]
    );

    // Merge: changelog applied to all staged variants, artifact deleted.
    let (_out_dir, out_root) = temp_tree();
    Merger::new(fx.env.clone())
        .merge(
            &[ModChangelog { id: "m1".to_owned(), root: log_root }],
            &out_root,
        )
        .unwrap();

    for variant in [
        "GameData/GameDataList.Product.100.gdl",
        "GameData/GameDataList.Product.110.gdl",
    ] {
        let merged = GdlTable::decode(&read(&out_root, variant)).unwrap();
        assert_eq!(merged.entries.get("Flag.B"), Some(&20), "{variant}");
        assert_eq!(merged.entries.get("Flag.C"), Some(&3), "{variant}");
    }
    assert!(
        !out_root
            .join("GameData/GameDataList.gdlchangelog")
            .as_std_path()
            .exists(),
        "stray changelog artifact must be deleted"
    );
}

#[test]
fn shops_post_pass_materializes_baseline_on_demand() {
    let fx = fixture(&[], ChecksumIndexBuilder::new(), &[], HandlerRegistry::new());
    let actor = "Pack/Actor/Npc_GeneralShop_Hateno.pack";

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, actor, &sarc(&[("Shop/Stock.dat", b"m1")]));
    let (_m2_dir, m2_root) = temp_tree();
    write(&m2_root, actor, &sarc(&[("Shop/Extra.dat", b"m2")]));
    let (_out_dir, out_root) = temp_tree();

    let fetches = AtomicUsize::new(0);
    let baseline = sarc(&[("Shop/Stock.dat", b"vanilla"), ("Shop/Sign.dat", b"sign")]);
    let fetch = |canonical: &str| -> packlog_merge::Result<Option<Vec<u8>>> {
        fetches.fetch_add(1, Ordering::SeqCst);
        assert_eq!(canonical, actor);
        Ok(Some(baseline.clone()))
    };

    let mods = [
        ModChangelog { id: "m1".to_owned(), root: m1_root },
        ModChangelog { id: "m2".to_owned(), root: m2_root },
    ];
    let written = ShopsMerger::new(fx.env.clone())
        .merge(&mods, &out_root, &fetch)
        .unwrap();

    assert_eq!(written, 1);
    // Staged exactly once, on first need.
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let merged = Sarc::decode(&read(&out_root, actor)).unwrap();
    assert_eq!(merged.get("Shop/Stock.dat"), Some(&b"m1"[..]), "last writer wins");
    assert_eq!(merged.get("Shop/Extra.dat"), Some(&b"m2"[..]), "additions propagate");
    assert_eq!(merged.get("Shop/Sign.dat"), Some(&b"sign"[..]), "baseline survives");
}

#[test]
fn compressed_assets_flow_through_both_engines() {
    let zstd = ZstdBackend::plain();
    let baseline_pack = sarc(&[("f1.dat", b"v0")]);
    let baseline_zs = zstd
        .compress(&baseline_pack, packlog_core::Category::Pack)
        .unwrap();

    let fx = fixture(
        &[("Pack/Actor/A.pack.zs", baseline_zs)],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_mod_dir, mod_root) = temp_tree();
    let modded = zstd
        .compress(&sarc(&[("f1.dat", b"v1")]), packlog_core::Category::Pack)
        .unwrap();
    write(&mod_root, "romfs/Pack/Actor/A.pack.zs", &modded);

    let (_log_dir, log_root) = temp_tree();
    Packager::new(fx.env.clone())
        .package_mod(&mod_root, &log_root)
        .unwrap();
    assert_eq!(list_files(&log_root), vec!["Pack/Actor/A.pack.zs".to_owned()]);

    let (_out_dir, out_root) = temp_tree();
    Merger::new(fx.env.clone())
        .merge(
            &[ModChangelog { id: "m1".to_owned(), root: log_root }],
            &out_root,
        )
        .unwrap();

    let out_bytes = read(&out_root, "Pack/Actor/A.pack.zs");
    let merged = Sarc::decode(
        &zstd
            .decompress(&out_bytes, packlog_core::Category::Pack)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(merged.get("f1.dat"), Some(&b"v1"[..]));
}

#[test]
fn corrupt_gamedata_table_is_isolated_during_packaging() {
    use packlog_merge::gdl::GdlTable;

    let vanilla = GdlTable {
        entries: [("Flag.A".to_owned(), 1)].into_iter().collect(),
    }
    .encode();
    let fx = fixture(
        &[("GameData/GameDataList.Product.100.gdl", vanilla)],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_mod_dir, mod_root) = temp_tree();
    write(
        &mod_root,
        "romfs/GameData/GameDataList.Product.100.gdl",
        b"not a table",
    );
    write(&mod_root, "romfs/Misc/Fine.bin", b"payload");
    let (_out_dir, out_root) = temp_tree();

    let summary = Packager::new(fx.env.clone())
        .package_mod(&mod_root, &out_root)
        .unwrap();

    // The malformed table degrades to a raw copy; the batch still finishes.
    assert_eq!(summary.raw_copies, 1);
    assert_eq!(
        read(&out_root, "GameData/GameDataList.Product.100.gdl"),
        b"not a table"
    );
    assert_eq!(read(&out_root, "Misc/Fine.bin"), b"payload");
}

#[test]
fn corrupt_gamedata_artifact_is_isolated_during_merging() {
    use packlog_merge::gdl::{GdlChangelog, GdlTable};

    let vanilla = GdlTable {
        entries: [("Flag.A".to_owned(), 1)].into_iter().collect(),
    }
    .encode();
    let fx = fixture(
        &[("GameData/GameDataList.Product.100.gdl", vanilla.clone())],
        ChecksumIndexBuilder::new(),
        &[],
        HandlerRegistry::new(),
    );

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, "GameData/GameDataList.gdlchangelog", b"garbage");
    write(&m1_root, "Misc/New.bin", b"new");

    let (_m2_dir, m2_root) = temp_tree();
    let valid = GdlChangelog {
        set: [("Flag.B".to_owned(), 2)].into_iter().collect(),
        removed: Default::default(),
    }
    .encode();
    write(&m2_root, "GameData/GameDataList.gdlchangelog", &valid);

    let (_out_dir, out_root) = temp_tree();
    let summary = Merger::new(fx.env.clone())
        .merge(
            &[
                ModChangelog { id: "m1".to_owned(), root: m1_root },
                ModChangelog { id: "m2".to_owned(), root: m2_root },
            ],
            &out_root,
        )
        .unwrap();

    // m1's bad artifact is dropped; its other asset and m2's artifact land.
    assert!(summary.skipped >= 1);
    assert_eq!(read(&out_root, "Misc/New.bin"), b"new");
    let merged =
        GdlTable::decode(&read(&out_root, "GameData/GameDataList.Product.100.gdl")).unwrap();
    assert_eq!(merged.entries.get("Flag.A"), Some(&1));
    assert_eq!(merged.entries.get("Flag.B"), Some(&2));
    assert!(
        !out_root
            .join("GameData/GameDataList.gdlchangelog")
            .as_std_path()
            .exists()
    );
}

#[test]
fn merge_clears_stale_containers_from_destination() {
    let fx = fixture(&[], ChecksumIndexBuilder::new(), &[], HandlerRegistry::new());

    let (_out_dir, out_root) = temp_tree();
    write(&out_root, "Pack/Actor/Stale.pack", &sarc(&[("old.dat", b"old")]));
    write(&out_root, "Misc/Keep.bin", b"kept");

    let (_m1_dir, m1_root) = temp_tree();
    write(&m1_root, "Misc/New.bin", b"new");

    Merger::new(fx.env.clone())
        .merge(
            &[ModChangelog { id: "m1".to_owned(), root: m1_root }],
            &out_root,
        )
        .unwrap();

    assert!(
        !out_root.join("Pack/Actor/Stale.pack").as_std_path().exists(),
        "container-class files are cleared before any mod is processed"
    );
    assert_eq!(read(&out_root, "Misc/Keep.bin"), b"kept");
    assert_eq!(read(&out_root, "Misc/New.bin"), b"new");
}
