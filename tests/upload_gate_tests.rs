//! Upload gate against the local filesystem store


use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use modelgate::application::upload_gate::{ResizeOptions, UploadGate, UploadOptions, UploadOutcome};
use modelgate::domain::inspection::{ModelFormat, ModelInspector};
use modelgate::infrastructure::storage::{LocalUploadStore, TEMP_DIR};
use test_fixtures::*;

struct Harness {
    gate: UploadGate,
    root: std::path::PathBuf,
    incoming: TempDir,
    _root_dir: TempDir,
}

async fn harness() -> Harness {
    let root_dir = TempDir::new().unwrap();
    let root = root_dir.path().join("uploads");
    let store = LocalUploadStore::with_durability(root.clone(), false);
    store.init().await.unwrap();
    Harness {
        gate: UploadGate::new(Arc::new(store), ModelInspector::default(), manual_clock()),
        root,
        incoming: TempDir::new().unwrap(),
        _root_dir: root_dir,
    }
}

fn stored(outcome: UploadOutcome) -> modelgate::application::upload_gate::StoredFileInfo {
    match outcome {
        UploadOutcome::Stored(info) => info,
        UploadOutcome::Rejected(r) => panic!("upload rejected: {}", r.message),
    }
}

/// Entries under the upload root other than the staging directory
fn stored_entries(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != TEMP_DIR)
        .collect()
}

#[tokio::test]
async fn test_text_upload_stored_with_random_name() {
    let h = harness().await;
    let body = b"meeting notes\n";
    let file = upload_from(h.incoming.path(), "notes.txt", body);

    let info = stored(
        h.gate
            .process(&file, "docs", &UploadOptions::generic())
            .await
            .unwrap(),
    );

    assert_eq!(info.name.len(), 32 + ".txt".len());
    assert!(info.name.ends_with(".txt"));
    assert_eq!(info.path, Path::new("docs").join(&info.name));
    assert_eq!(info.full_path, h.root.join("docs").join(&info.name));
    assert_eq!(std::fs::read(&info.full_path).unwrap(), body);
    assert_eq!(info.size, body.len() as u64);
    assert_eq!(info.checksum.as_hex(), hex::encode(Sha256::digest(body)));
    assert!(!file.temp_path.exists());
}

#[tokio::test]
async fn test_model_upload_keeps_readable_name() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "My Bracket.stl", &binary_stl(20));
    let options = UploadOptions::models().preserving_original_name();

    let info = stored(h.gate.process(&file, "models/", &options).await.unwrap());

    assert_eq!(info.name, "My_Bracket_1714564800.stl");
    assert_eq!(info.extension, "stl");
    let verdict = info.verdict.expect("inspected model carries a verdict");
    assert_eq!(verdict.format(), Some(ModelFormat::StlBinary));
    assert_eq!(verdict.metadata().triangles, Some(20));
}

#[tokio::test]
async fn test_same_name_in_same_second_keeps_both_files() {
    let h = harness().await;
    let options = UploadOptions::models().preserving_original_name();
    let first_body = binary_stl(20);
    let second_body = binary_stl(30);

    let first = upload_from(h.incoming.path(), "My Bracket.stl", &first_body);
    let first = stored(h.gate.process(&first, "models", &options).await.unwrap());
    let second = upload_from(h.incoming.path(), "My Bracket.stl", &second_body);
    let second = stored(h.gate.process(&second, "models", &options).await.unwrap());

    assert_eq!(first.name, "My_Bracket_1714564800.stl");
    assert_ne!(second.name, first.name);
    assert!(second.name.starts_with("My_Bracket_1714564800_"));
    assert!(second.name.ends_with(".stl"));
    assert_eq!(std::fs::read(&first.full_path).unwrap(), first_body);
    assert_eq!(std::fs::read(&second.full_path).unwrap(), second_body);
}

#[tokio::test]
async fn test_three_mf_upload() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "gear.3mf", &three_mf());

    let info = stored(
        h.gate
            .process(&file, "models", &UploadOptions::models())
            .await
            .unwrap(),
    );
    let verdict = info.verdict.unwrap();
    assert_eq!(verdict.metadata().title.as_deref(), Some("Gear"));
}

#[tokio::test]
async fn test_rejected_model_leaves_no_trace() {
    let h = harness().await;
    let body = format!("{}<?php system($_GET['c']); ?>\n", OBJ);
    let file = upload_from(h.incoming.path(), "evil.obj", body.as_bytes());

    let outcome = h
        .gate
        .process(&file, "models", &UploadOptions::models())
        .await
        .unwrap();

    assert!(!outcome.is_stored());
    assert!(stored_entries(&h.root).is_empty());
    assert!(file.temp_path.exists());
}

#[tokio::test]
async fn test_model_extension_refused_by_generic_options() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "part.stl", &binary_stl(4));

    let outcome = h
        .gate
        .process(&file, "docs", &UploadOptions::generic())
        .await
        .unwrap();
    assert!(outcome
        .message()
        .starts_with("Extensão de arquivo não permitida."));
}

#[tokio::test]
async fn test_image_resized_after_storage() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "banner.png", &png(64, 32));
    let options = UploadOptions::generic().with_resize(ResizeOptions {
        max_width: Some(16),
        max_height: None,
        quality: 90,
    });

    let info = stored(h.gate.process(&file, "images", &options).await.unwrap());

    assert_eq!(image::image_dimensions(&info.full_path).unwrap(), (16, 8));
    let on_disk = std::fs::read(&info.full_path).unwrap();
    assert_eq!(info.size, on_disk.len() as u64);
    assert_eq!(info.checksum.as_hex(), hex::encode(Sha256::digest(&on_disk)));
}

#[tokio::test]
async fn test_small_image_left_untouched() {
    let h = harness().await;
    let body = png(8, 8);
    let file = upload_from(h.incoming.path(), "icon.png", &body);
    let options = UploadOptions::generic().with_resize(ResizeOptions {
        max_width: Some(16),
        max_height: Some(16),
        quality: 90,
    });

    let info = stored(h.gate.process(&file, "images", &options).await.unwrap());
    assert_eq!(std::fs::read(&info.full_path).unwrap(), body);
}

#[tokio::test]
async fn test_traversal_destination_is_an_error() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "notes.txt", b"hello there\n");

    let err = h
        .gate
        .process(&file, "../escape", &UploadOptions::generic())
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "Diretório de destino inválido");
    assert!(file.temp_path.exists());
}

#[tokio::test]
async fn test_delete_file() {
    let h = harness().await;
    let file = upload_from(h.incoming.path(), "notes.txt", b"hello there\n");
    let info = stored(
        h.gate
            .process(&file, "docs", &UploadOptions::generic())
            .await
            .unwrap(),
    );

    let relative = info.path.to_string_lossy().into_owned();
    assert!(h.gate.delete_file(&relative).await.unwrap());
    assert!(!info.full_path.exists());
    assert!(!h.gate.delete_file(&relative).await.unwrap());

    let outside = h.root.parent().unwrap().join("keep.txt");
    std::fs::write(&outside, b"keep").unwrap();
    assert!(!h.gate.delete_file("../keep.txt").await.unwrap());
    assert!(outside.exists());
}
