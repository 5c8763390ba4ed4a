//! Version resolution tests
//!
//! Fixtures are real archives packed from workspaces into directory boxes.
//! The two versions use the legacy timestamp spelling, which still orders
//! correctly and pins down the offset arithmetic.

use bead::{
    BeadBox, BeadError, BeadReference, Config, DirectoryBox, FreezeTime, MetaBead, NotFound,
    VersionResolver, Workspace, PHANTOM_KIND,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TS1: &str = "20150901_151015_1";
const TS2: &str = "20150901_151016_2";

/// Helper: A box holding versions TS1 and TS2 of `name`
fn two_version_box(root: &Path, box_name: &str, name: &str) -> DirectoryBox {
    let dir = root.join(box_name);
    fs::create_dir_all(&dir).unwrap();
    let bead_box = DirectoryBox::new(box_name, &dir);

    let ws = Workspace::new(root.join("workspaces").join(name));
    ws.create("test-kind").unwrap();
    for (freeze_time, content) in [(TS1, "version 1"), (TS2, "version 2")] {
        fs::write(ws.directory().join("main.py"), content).unwrap();
        bead_box.store(&ws, &FreezeTime::new(freeze_time)).unwrap();
    }
    bead_box
}

fn resolved_time(resolver: &VersionResolver<'_>, reference: &str) -> Result<String, BeadError> {
    resolver
        .resolve_str(reference)
        .map(|bead| bead.freeze_time().to_string())
}

#[test]
fn test_reference_forms() {
    let tmp = TempDir::new().unwrap();
    let bead_box = two_version_box(tmp.path(), "box", "name");
    let resolver = VersionResolver::single(&bead_box);

    assert_eq!(resolved_time(&resolver, "name").unwrap(), TS2);
    assert_eq!(resolved_time(&resolver, "name@").unwrap(), TS2);
    assert_eq!(resolved_time(&resolver, &format!("name@{}", TS1)).unwrap(), TS1);
    assert_eq!(resolved_time(&resolver, &format!("name@{}", TS2)).unwrap(), TS2);
    assert_eq!(resolved_time(&resolver, "name@-1").unwrap(), TS1);
    assert_eq!(resolved_time(&resolver, "name@+1").unwrap(), TS1);
    assert_eq!(resolved_time(&resolver, &format!("name@{}-1", TS2)).unwrap(), TS1);
    assert_eq!(resolved_time(&resolver, &format!("name@{}-0", TS2)).unwrap(), TS2);
}

#[test]
fn test_unmatched_references_are_not_found() {
    let tmp = TempDir::new().unwrap();
    let bead_box = two_version_box(tmp.path(), "box", "name");
    let resolver = VersionResolver::single(&bead_box);
    let too_far_back = format!("name@{}-2", TS2);

    for reference in [
        "name@no-such-timestamp",
        "name@-2",
        too_far_back.as_str(),
        "name@20000101_000000_0-0",
        "other@",
    ] {
        let err = resolved_time(&resolver, reference).unwrap_err();
        assert!(err.is_not_found(), "{} -> {:?}", reference, err);
    }
}

#[test]
fn test_unknown_name_resolves_to_phantom_head() {
    let tmp = TempDir::new().unwrap();
    let bead_box = two_version_box(tmp.path(), "box", "name");
    let resolver = VersionResolver::single(&bead_box);

    let head = resolver.resolve_str("unknown").unwrap();
    assert!(matches!(head, MetaBead::Phantom(_)));
    assert_eq!(head.kind(), PHANTOM_KIND);
    assert_eq!(head.content_id(), None);

    let err = resolver
        .resolve_real(&BeadReference::parse("unknown").unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        BeadError::NotFound(NotFound::UnknownName(name)) if name == "unknown"
    ));
}

#[test]
fn test_ordered_versions_for_display() {
    let tmp = TempDir::new().unwrap();
    let bead_box = two_version_box(tmp.path(), "box", "name");
    let resolver = VersionResolver::single(&bead_box);

    let times: Vec<_> = resolver
        .versions("name")
        .iter()
        .map(|bead| bead.freeze_time().to_string())
        .collect();
    assert_eq!(times, [TS2, TS1]);
    assert!(resolver.versions("unknown").is_empty());
}

#[test]
fn test_same_bead_in_two_boxes_is_deduplicated() {
    let tmp = TempDir::new().unwrap();
    let first = two_version_box(tmp.path(), "first", "name");
    let second = DirectoryBox::new("second", tmp.path().join("second"));
    fs::create_dir_all(second.directory()).unwrap();
    for entry in fs::read_dir(first.directory()).unwrap() {
        let path = entry.unwrap().path();
        fs::copy(&path, second.directory().join(path.file_name().unwrap())).unwrap();
    }

    let boxes: [&dyn BeadBox; 2] = [&first, &second];
    let resolver = VersionResolver::new(boxes);
    let versions = resolver.versions("name");
    assert_eq!(versions.len(), 2);
    assert!(versions
        .iter()
        .all(|bead| bead.as_real().map(|b| b.box_name.as_str()) == Some("first")));

    let boxes: [&dyn BeadBox; 2] = [&second, &first];
    let head = VersionResolver::new(boxes)
        .resolve_real(&BeadReference::parse("name").unwrap())
        .unwrap();
    assert_eq!(head.box_name, "second");
    assert_eq!(head.freeze_time.as_str(), TS2);
}

#[test]
fn test_versions_merge_across_boxes() {
    let tmp = TempDir::new().unwrap();
    let older = two_version_box(tmp.path(), "older", "name");
    let newer = DirectoryBox::new("newer", tmp.path().join("newer"));
    fs::create_dir_all(newer.directory()).unwrap();

    let ws = Workspace::new(tmp.path().join("workspaces").join("name"));
    fs::write(ws.directory().join("main.py"), "version 3").unwrap();
    newer
        .store(&ws, &FreezeTime::new("20150901_151017_3"))
        .unwrap();

    let mut config = Config::default();
    config.add_box("older", older.directory()).unwrap();
    config.add_box("newer", newer.directory()).unwrap();
    let registry = config.registry();
    let resolver = VersionResolver::from_registry(&registry);

    assert_eq!(resolved_time(&resolver, "name").unwrap(), "20150901_151017_3");
    assert_eq!(resolved_time(&resolver, "name@-2").unwrap(), TS1);

    let head = resolver
        .resolve_real(&BeadReference::parse("name").unwrap())
        .unwrap();
    assert_eq!(head.box_name, "newer");
    let archive = resolver.archive(&head).unwrap();
    assert_eq!(archive.box_name(), "newer");
    assert_eq!(archive.content_id().unwrap(), head.content_id);
}
