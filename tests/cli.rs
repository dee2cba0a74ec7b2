use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const TRIANGLE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";

fn write_png(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    image::RgbaImage::from_pixel(width, height, image::Rgba([40, 120, 200, 255]))
        .save(path)
        .expect("write png");
}

fn build_assets(with_texture: bool, with_skybox: bool) -> TempDir {
    let dir = tempfile::tempdir().expect("temp assets");
    let models = dir.path().join("Resources/Models");
    fs::create_dir_all(&models).expect("models dir");
    fs::write(models.join("luigidoll.obj"), TRIANGLE_OBJ).expect("write obj");
    if with_texture {
        write_png(&models.join("7c33ed83.png"), 4, 2);
    }
    if with_skybox {
        for suffix in ["px", "nx", "py", "ny", "pz", "nz"] {
            write_png(&dir.path().join(format!("Sky/sky_{suffix}.png")), 8, 8);
        }
    }
    dir
}

fn viewer() -> Command {
    Command::cargo_bin("orbit-viewer").expect("binary exists")
}

#[test]
fn summary_reports_model_texture_and_skybox() {
    let assets = build_assets(true, true);
    viewer()
        .arg(assets.path())
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Catalog: 3 model(s)"))
        .stdout(contains("Model luigidoll: 3 vertices, 1 triangles"))
        .stdout(contains("Texture: 4x2"))
        .stdout(contains("Skybox: 6 faces 8x8"));
}

#[test]
fn summary_falls_back_to_checkerboard_without_texture() {
    let assets = build_assets(false, false);
    viewer()
        .arg(assets.path())
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Texture: checkerboard"))
        .stdout(contains("Lookup texture 7c33ed83:"))
        .stdout(contains("Skybox: none"));
}

#[test]
fn missing_model_is_reported_but_not_fatal() {
    let assets = tempfile::tempdir().expect("temp assets");
    viewer()
        .arg(assets.path())
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Model luigidoll: unavailable"));
}

#[test]
fn config_file_replaces_catalog() {
    let assets = build_assets(false, false);
    fs::write(assets.path().join("cube.obj"), TRIANGLE_OBJ).expect("write obj");
    let config = assets.path().join("viewer.toml");
    fs::write(
        &config,
        "[skybox]\nenabled = false\n\n[[models]]\nname = \"cube\"\n",
    )
    .expect("write config");

    viewer()
        .arg(assets.path())
        .arg("--config")
        .arg(&config)
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Catalog: 1 model(s)"))
        .stdout(contains("Model cube: 3 vertices, 1 triangles"))
        .stdout(contains("Skybox: disabled"));
}

#[test]
fn missing_arguments_print_usage() {
    viewer()
        .assert()
        .failure()
        .stderr(contains("Usage: orbit-viewer <assets-dir>"));
}

#[test]
fn unknown_flag_is_rejected() {
    let assets = tempfile::tempdir().expect("temp assets");
    viewer()
        .arg(assets.path())
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"));
}
