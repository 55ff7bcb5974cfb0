use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn framebatch_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("framebatch"))
}

const FRAME: &str = "021D_04972_131313";

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

/// Archive tree at `<root>/21/<frame>` with geometry, two raw
/// acquisitions, and one archived co-registered acquisition.
fn seed_archive(root: &Path) {
    let archive = root.join("21").join(FRAME);
    write(&archive, "geo/20200101.lt", "lut");
    write(&archive, "DEM/dem.tif", "heights");
    write(&archive, "SLC/20200101/20200101.slc", "primary");
    write(&archive, "SLC/20200101/20200101.slc.mli.par", "range_looks: 20");
    write(&archive, "SLC/20200110/20200110.slc", "later acquisition");
    write(&archive, "RSLC/20200105/20200105.IW1.rslc", "swath");
}

#[test]
fn init_provisions_the_frame_cache() {
    let source = TempDir::new().expect("source");
    let cache = TempDir::new().expect("cache");
    seed_archive(source.path());

    framebatch_cmd()
        .args(["init", "--frame", FRAME])
        .arg("--source-dir")
        .arg(source.path())
        .arg("--cache-dir")
        .arg(cache.path())
        .assert()
        .success()
        .stdout(contains("Primary reference: 20200101"));

    let frame_dir = cache.path().join(FRAME);
    assert!(frame_dir.join("geo/20200101.lt").is_file());
    assert!(frame_dir.join("DEM/dem.tif").is_file());
    assert!(frame_dir.join("SLC/20200101/20200101.slc").is_file());
    assert!(
        !frame_dir.join("SLC/20200110").exists(),
        "only the primary acquisition is staged"
    );
    assert!(fs::symlink_metadata(frame_dir.join("RSLC/20200101/20200101.rslc"))
        .expect("link metadata")
        .file_type()
        .is_symlink());
    assert!(
        !frame_dir.join("RSLC/20200105").exists(),
        "archived references are not imported without --import-references"
    );
}

#[test]
fn init_can_import_archived_references() {
    let source = TempDir::new().expect("source");
    let cache = TempDir::new().expect("cache");
    seed_archive(source.path());

    framebatch_cmd()
        .args(["init", "--frame", FRAME, "--import-references"])
        .arg("--source-dir")
        .arg(source.path())
        .arg("--cache-dir")
        .arg(cache.path())
        .assert()
        .success()
        .stdout(contains("Imported 1 co-registered reference(s)"));

    let imported = cache.path().join(FRAME).join("RSLC/20200105");
    assert!(fs::symlink_metadata(&imported)
        .expect("link metadata")
        .file_type()
        .is_symlink());
}

#[test]
fn init_without_cache_configuration_fails() {
    let source = TempDir::new().expect("source");
    seed_archive(source.path());

    framebatch_cmd()
        .args(["init", "--frame", FRAME])
        .arg("--source-dir")
        .arg(source.path())
        .env_remove("BATCH_CACHE_DIR")
        .assert()
        .failure()
        .stderr(contains("BATCH_CACHE_DIR"));
}
