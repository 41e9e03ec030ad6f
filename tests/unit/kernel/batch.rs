use super::*;
use crate::models::{EntryKind, StableId};
use std::path::Path;

fn sid(n: u64) -> StableId {
    StableId::new(1, n)
}

fn entry(kind: EntryKind, path: &str, n: u64) -> Entry {
    Entry::new(kind, PathBuf::from(path), sid(n))
}

fn proj() -> (ProjectTree, NodeId) {
    let mut tree = ProjectTree::default();
    let root = tree
        .attach_root(entry(EntryKind::ProjectRoot, "/proj", 1))
        .unwrap();
    (tree, root)
}

fn no_destroy(_: &mut ProjectTree, _: NodeId) {
    panic!("nothing should be destroyed");
}

#[test]
fn batch_stays_open_until_every_scan_finishes() {
    let (mut tree, root) = proj();
    let mut batches = BatchAccumulator::default();
    let first = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    let second = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    assert_ne!(first, second);
    assert!(batches.is_open(root));

    assert!(!batches.finish_scan(root, first));
    assert!(batches.flush(&mut tree, root, no_destroy).is_none());
    assert!(batches.is_open(root));

    assert!(batches.finish_scan(root, second));
    assert!(batches.flush(&mut tree, root, no_destroy).is_some());
    assert!(!batches.is_open(root));
}

#[test]
fn flush_inserts_parents_before_children_and_sorts_once() {
    let (mut tree, root) = proj();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);

    let staged = batches.stage(
        root,
        scan,
        vec![
            entry(EntryKind::File, "/proj/z.txt", 2),
            entry(EntryKind::Folder, "/proj/src", 3),
            entry(EntryKind::File, "/proj/a.txt", 4),
        ],
    );
    assert_eq!(staged, Some(3));
    let staged = batches.stage(
        root,
        scan,
        vec![
            entry(EntryKind::File, "/proj/src/main.rs", 5),
            entry(EntryKind::File, "/proj/ghost/orphan.rs", 6),
        ],
    );
    assert_eq!(staged, Some(5));

    // Not in the tree until the flush.
    assert_eq!(tree.len(), 1);
    assert!(batches.finish_scan(root, scan));
    let report = batches.flush(&mut tree, root, no_destroy).unwrap();

    assert_eq!(report.inserted, 4);
    assert!(tree.lookup(Path::new("/proj/src/main.rs")).is_some());
    assert!(tree.lookup(Path::new("/proj/ghost/orphan.rs")).is_none());
    let names: Vec<_> = tree
        .children(root)
        .iter()
        .map(|&c| tree.entry(c).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["src", "a.txt", "z.txt"]);
    tree.check_invariants().unwrap();
}

#[test]
fn rescanning_is_idempotent() {
    let (mut tree, root) = proj();
    let existing = tree
        .add_under(root, entry(EntryKind::File, "/proj/a.txt", 2))
        .unwrap();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    batches.stage(root, scan, vec![entry(EntryKind::File, "/proj/a.txt", 2)]);
    batches.finish_scan(root, scan);

    let report = batches.flush(&mut tree, root, no_destroy).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(tree.lookup(Path::new("/proj/a.txt")), Some(existing));
}

#[test]
fn replaced_objects_are_destroyed_then_added() {
    let (mut tree, root) = proj();
    let old = tree
        .add_under(root, entry(EntryKind::File, "/proj/a.txt", 2))
        .unwrap();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    batches.stage(root, scan, vec![entry(EntryKind::File, "/proj/a.txt", 99)]);
    batches.finish_scan(root, scan);

    let mut destroyed = Vec::new();
    let report = batches
        .flush(&mut tree, root, |tree, node| {
            destroyed.push(node);
            tree.remove(node).unwrap();
        })
        .unwrap();
    assert_eq!(destroyed, vec![old]);
    assert_eq!(report.inserted, 1);
    let new = tree.lookup(Path::new("/proj/a.txt")).unwrap();
    assert_eq!(tree.stable_id(new), Some(sid(99)));
}

#[test]
fn rescan_drops_nodes_the_scan_did_not_see() {
    let (mut tree, root) = proj();
    let src = tree
        .add_under(root, entry(EntryKind::Folder, "/proj/src", 2))
        .unwrap();
    let kept = tree
        .add_under(src, entry(EntryKind::File, "/proj/src/kept.rs", 3))
        .unwrap();
    let gone = tree
        .add_under(src, entry(EntryKind::Folder, "/proj/src/gone", 4))
        .unwrap();
    tree.add_under(gone, entry(EntryKind::File, "/proj/src/gone/inner.rs", 5))
        .unwrap();
    let outside = tree
        .add_under(root, entry(EntryKind::File, "/proj/README", 6))
        .unwrap();

    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj/src"), ScanKind::Rescan);
    batches.stage(
        root,
        scan,
        vec![
            entry(EntryKind::File, "/proj/src/kept.rs", 3),
            entry(EntryKind::File, "/proj/src/new.rs", 7),
        ],
    );
    batches.finish_scan(root, scan);

    let mut destroyed = Vec::new();
    let report = batches
        .flush(&mut tree, root, |tree, node| {
            destroyed.push(node);
            tree.remove(node).unwrap();
        })
        .unwrap();
    assert_eq!(destroyed, vec![gone]);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.removed, 1);
    assert!(tree.contains(kept));
    assert!(tree.contains(outside));
    assert!(tree.lookup(Path::new("/proj/src/new.rs")).is_some());
    assert!(tree.lookup(Path::new("/proj/src/gone/inner.rs")).is_none());
    tree.check_invariants().unwrap();
}

#[test]
fn deferred_actions_come_back_in_arrival_order() {
    use crate::kernel::services::ports::FsNotification;
    use std::time::Instant;

    let (mut tree, root) = proj();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    let at = Instant::now();
    let first = FsNotification::created(Path::new("/proj"), PathBuf::from("/proj/1"));
    let second = FsNotification::removed(Path::new("/proj"), PathBuf::from("/proj/2"));
    assert!(batches.defer(root, Action::Fs { event: first.clone(), at }));
    assert!(batches.defer(
        root,
        Action::Rename {
            node: root,
            new_name: "renamed".into(),
        }
    ));
    assert!(batches.defer(root, Action::Fs { event: second.clone(), at }));

    batches.finish_scan(root, scan);
    let report = batches.flush(&mut tree, root, no_destroy).unwrap();
    assert_eq!(report.deferred.len(), 3);
    assert!(matches!(&report.deferred[0], Action::Fs { event, .. } if *event == first));
    assert!(matches!(&report.deferred[1], Action::Rename { node, .. } if *node == root));
    assert!(matches!(&report.deferred[2], Action::Fs { event, .. } if *event == second));
    assert!(!batches.defer(root, Action::Tick { now: at }));
}

#[test]
fn overlapping_rescans_of_one_directory_share_what_they_saw() {
    let (mut tree, root) = proj();
    let src = tree
        .add_under(root, entry(EntryKind::Folder, "/proj/src", 2))
        .unwrap();
    let a = tree
        .add_under(src, entry(EntryKind::File, "/proj/src/a.c", 3))
        .unwrap();

    let mut batches = BatchAccumulator::default();
    let first = batches.begin(root, PathBuf::from("/proj/src"), ScanKind::Rescan);
    let second = batches.begin(root, PathBuf::from("/proj/src"), ScanKind::Rescan);
    batches.stage(root, first, vec![entry(EntryKind::File, "/proj/src/a.c", 3)]);
    batches.finish_scan(root, first);
    batches.stage(root, second, vec![entry(EntryKind::File, "/proj/src/a.c", 3)]);
    assert!(batches.finish_scan(root, second));

    let report = batches.flush(&mut tree, root, no_destroy).unwrap();
    assert_eq!(report.removed, 0);
    assert!(tree.contains(a));
    tree.check_invariants().unwrap();
}

#[test]
fn cancelled_scans_ignore_late_chunks() {
    let (mut tree, root) = proj();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);
    batches.stage(root, scan, vec![entry(EntryKind::File, "/proj/a", 2)]);

    assert_eq!(batches.cancel_root(root), vec![scan]);
    assert!(!batches.is_open(root));
    assert_eq!(
        batches.stage(root, scan, vec![entry(EntryKind::File, "/proj/b", 3)]),
        None
    );
    assert!(!batches.finish_scan(root, scan));
    assert!(batches.flush(&mut tree, root, no_destroy).is_none());
    assert_eq!(tree.len(), 1);
}

#[test]
fn scans_belong_to_their_root() {
    let (mut tree, root) = proj();
    let other = tree
        .attach_root(entry(EntryKind::ProjectRoot, "/other", 50))
        .unwrap();
    let mut batches = BatchAccumulator::default();
    let scan = batches.begin(root, PathBuf::from("/proj"), ScanKind::Populate);

    assert!(batches.owns(root, scan));
    assert!(!batches.owns(other, scan));
    assert_eq!(batches.stage(other, scan, Vec::new()), None);
    assert!(!batches.is_open(other));
}
