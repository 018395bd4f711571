use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use scry_dl::catalog::ImageClient;
use scry_dl::error::ScryError;
use scry_dl::planner::DownloadTask;
use scry_dl::store::{Store, StoreAction};

#[derive(Default)]
struct CountingImages {
    calls: AtomicUsize,
}

impl ImageClient for CountingImages {
    fn download_image(&self, url: &str, sink: &mut dyn Write) -> Result<u64, ScryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = format!("jpeg:{url}");
        sink.write_all(body.as_bytes())
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        Ok(body.len() as u64)
    }
}

/// Writes half a body, then drops the connection.
struct BrokenImages;

impl ImageClient for BrokenImages {
    fn download_image(&self, _url: &str, sink: &mut dyn Write) -> Result<u64, ScryError> {
        sink.write_all(b"jpe")
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        Err(ScryError::Network("connection reset".to_string()))
    }
}

fn temp_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().join("downloads")).unwrap();
    (dir, Store::new(root))
}

fn task(name: &str, set_code: &str) -> DownloadTask {
    DownloadTask {
        name: name.to_string(),
        url: format!("https://img.example/{set_code}/{name}.jpg"),
        set_code: set_code.to_string(),
    }
}

#[test]
fn second_fetch_is_a_no_op() {
    let (_dir, store) = temp_store();
    let client = CountingImages::default();
    let task = task("Llanowar Elves", "dom");

    let first = store.fetch(&task, &client).unwrap();
    let second = store.fetch(&task, &client).unwrap();

    assert_eq!(first, StoreAction::Downloaded);
    assert_eq!(second, StoreAction::Existing);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);

    let content = fs::read_to_string(store.image_path(&task).unwrap()).unwrap();
    assert_eq!(content, "jpeg:https://img.example/dom/Llanowar Elves.jpg");
}

#[test]
fn images_land_in_uppercase_set_directory() {
    let (_dir, store) = temp_store();
    let client = CountingImages::default();

    store.fetch(&task("Opt", "dom"), &client).unwrap();

    let expected = store.root().join("DOM").join("Opt.full.jpg");
    assert!(expected.as_std_path().is_file());
}

#[test]
fn failed_download_leaves_nothing_behind() {
    let (_dir, store) = temp_store();
    let task = task("Shock", "m21");

    let result = store.fetch(&task, &BrokenImages);
    assert_matches!(result, Err(ScryError::Network(_)));

    assert!(!store.image_path(&task).unwrap().as_std_path().exists());
    let leftovers = fs::read_dir(store.set_dir("m21")).unwrap().count();
    assert_eq!(leftovers, 0);

    // a later attempt is not mistaken for an existing image
    let client = CountingImages::default();
    assert_eq!(store.fetch(&task, &client).unwrap(), StoreAction::Downloaded);
}

#[test]
fn name_without_usable_characters_fails_that_task_only() {
    let (_dir, store) = temp_store();
    let client = CountingImages::default();

    let result = store.fetch(&task("///", "unf"), &client);
    assert_matches!(result, Err(ScryError::Filesystem(_)));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(!store.root().join("UNF/.full.jpg").as_std_path().exists());

    assert_eq!(
        store.fetch(&task("Opt", "unf"), &client).unwrap(),
        StoreAction::Downloaded
    );
}

#[test]
fn write_bytes_atomic_creates_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("nested/conf/settings.json")).unwrap();

    Store::write_bytes_atomic(&path, b"{}").unwrap();

    assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "{}");
    assert!(!path.with_extension("tmp").as_std_path().exists());
}
