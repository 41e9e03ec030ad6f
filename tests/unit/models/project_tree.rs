use super::*;

fn sid(n: u64) -> StableId {
    StableId::new(1, n)
}

fn file(path: &str, n: u64) -> Entry {
    Entry::new(EntryKind::File, PathBuf::from(path), sid(n))
}

fn folder(path: &str, n: u64) -> Entry {
    Entry::new(EntryKind::Folder, PathBuf::from(path), sid(n))
}

fn proj() -> (ProjectTree, NodeId) {
    let mut tree = ProjectTree::default();
    let root = tree
        .attach_root(Entry::new(EntryKind::ProjectRoot, PathBuf::from("/proj"), sid(1)))
        .unwrap();
    (tree, root)
}

fn child_names(tree: &ProjectTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .map(|&c| tree.entry(c).unwrap().name_lossy().into_owned())
        .collect()
}

#[test]
fn open_root_validates_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("plain.txt");
    std::fs::write(&file_path, "x").unwrap();

    let mut tree = ProjectTree::default();
    assert!(matches!(
        tree.open_root(&file_path),
        Err(TreeError::NotADirectory(_))
    ));
    assert!(matches!(
        tree.open_root(&dir.path().join("missing")),
        Err(TreeError::NotADirectory(_))
    ));
    #[cfg(unix)]
    assert!(matches!(
        tree.open_root(Path::new("/")),
        Err(TreeError::DeviceRoot(_))
    ));

    let root = tree.open_root(dir.path()).unwrap();
    assert_eq!(tree.load_state(root), Some(LoadState::Populating));
    assert_eq!(tree.entry(root).unwrap().kind, EntryKind::ProjectRoot);
    assert_eq!(
        tree.path_of(root).unwrap(),
        dir.path().canonicalize().unwrap().as_path()
    );
    assert!(tree.is_root(root));
}

#[test]
fn overlapping_roots_are_rejected() {
    let (mut tree, _root) = proj();
    let nested = folder("/proj/sub", 2);
    assert!(matches!(
        tree.attach_root(nested),
        Err(TreeError::AlreadyOpen(_))
    ));
    assert!(matches!(
        tree.attach_root(folder("/proj", 3)),
        Err(TreeError::AlreadyOpen(_))
    ));
    assert!(matches!(
        tree.attach_root(folder("/", 4)),
        Err(TreeError::DeviceRoot(_))
    ));
    // Sibling with a common string prefix is fine.
    let other = tree.attach_root(folder("/projects", 5)).unwrap();
    assert_eq!(tree.roots().len(), 2);
    assert_eq!(tree.roots()[1], other);
}

#[test]
fn children_stay_sorted() {
    let (mut tree, root) = proj();
    for (i, name) in ["file10.txt", "file2.txt", "B.md", "a.md"].iter().enumerate() {
        tree.add_under(root, file(&format!("/proj/{name}"), 10 + i as u64))
            .unwrap();
    }
    tree.add_under(root, folder("/proj/src", 20)).unwrap();
    tree.add_under(root, folder("/proj/Docs", 21)).unwrap();

    assert_eq!(
        child_names(&tree, root),
        vec!["Docs", "src", "a.md", "B.md", "file2.txt", "file10.txt"]
    );
    tree.check_invariants().unwrap();
}

#[test]
fn add_under_rejects_duplicates_and_files_as_parents() {
    let (mut tree, root) = proj();
    let readme = tree.add_under(root, file("/proj/README", 2)).unwrap();

    assert!(matches!(
        tree.add_under(root, file("/proj/README", 3)),
        Err(TreeError::DuplicateName(_))
    ));
    assert!(matches!(
        tree.add_under(readme, file("/proj/README/x", 4)),
        Err(TreeError::ParentNotDirectory)
    ));
    assert_eq!(tree.len(), 2);
    tree.check_invariants().unwrap();
}

#[test]
fn add_under_derives_the_path_from_the_parent() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/elsewhere/src", 2)).unwrap();
    assert_eq!(tree.path_of(src), Some(Path::new("/proj/src")));
    assert_eq!(tree.lookup(Path::new("/proj/src")), Some(src));
    assert_eq!(tree.lookup(Path::new("/elsewhere/src")), None);
}

#[test]
fn stale_handles_are_inert() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    tree.remove(src).unwrap();

    assert!(!tree.contains(src));
    assert!(tree.path_of(src).is_none());
    assert!(tree.children(src).is_empty());
    assert!(matches!(
        tree.add_under(src, file("/proj/src/a.c", 3)),
        Err(TreeError::InvalidNodeId)
    ));
    assert!(tree.close_root(src).is_empty());

    let removed = tree.close_root(root);
    assert_eq!(removed, vec![sid(1)]);
    assert!(tree.close_root(root).is_empty());
    assert!(tree.is_empty());
}

#[test]
fn rename_keeps_identity_and_rewrites_descendants() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    let a = tree.add_under(src, file("/proj/src/a.c", 3)).unwrap();
    let nested = tree.add_under(src, folder("/proj/src/net", 4)).unwrap();
    let b = tree.add_under(nested, file("/proj/src/net/b.c", 5)).unwrap();

    tree.rename(src, "lib".into()).unwrap();

    assert_eq!(tree.lookup(Path::new("/proj/lib")), Some(src));
    assert_eq!(tree.lookup(Path::new("/proj/lib/a.c")), Some(a));
    assert_eq!(tree.lookup(Path::new("/proj/lib/net/b.c")), Some(b));
    assert_eq!(tree.lookup(Path::new("/proj/src")), None);
    assert_eq!(tree.lookup(Path::new("/proj/src/a.c")), None);
    assert_eq!(tree.stable_id(a), Some(sid(3)));
    tree.check_invariants().unwrap();
}

#[test]
fn rename_to_the_same_name_is_a_no_op() {
    let (mut tree, root) = proj();
    let a = tree.add_under(root, file("/proj/a.c", 2)).unwrap();
    tree.rename(a, "a.c".into()).unwrap();
    assert_eq!(tree.lookup(Path::new("/proj/a.c")), Some(a));
    tree.check_invariants().unwrap();
}

#[test]
fn rename_resorts_the_parent() {
    let (mut tree, root) = proj();
    let a = tree.add_under(root, file("/proj/a.txt", 2)).unwrap();
    tree.add_under(root, file("/proj/m.txt", 3)).unwrap();
    tree.rename(a, "z.txt".into()).unwrap();
    assert_eq!(child_names(&tree, root), vec!["m.txt", "z.txt"]);
    tree.check_invariants().unwrap();
}

#[test]
fn reparent_into_own_subtree_is_a_cycle() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    let sub = tree.add_under(src, folder("/proj/src/sub", 3)).unwrap();

    assert!(matches!(
        tree.reparent(src, sub, "src".into()),
        Err(TreeError::CycleDetected)
    ));
    assert!(matches!(
        tree.reparent(src, src, "x".into()),
        Err(TreeError::CycleDetected)
    ));
    assert_eq!(tree.path_of(src), Some(Path::new("/proj/src")));
    assert_eq!(tree.parent(sub), Some(src));
    tree.check_invariants().unwrap();
}

#[test]
fn failed_reparent_leaves_the_tree_untouched() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    let docs = tree.add_under(root, folder("/proj/docs", 3)).unwrap();
    let a = tree.add_under(src, file("/proj/src/a.c", 4)).unwrap();
    tree.add_under(docs, file("/proj/docs/a.c", 5)).unwrap();
    let before = tree.rows(None);

    assert!(matches!(
        tree.reparent(a, docs, "a.c".into()),
        Err(TreeError::DuplicateName(_))
    ));
    assert!(matches!(
        tree.reparent(a, docs, "x/y".into()),
        Err(TreeError::InvalidName(_))
    ));
    assert!(matches!(
        tree.rename(root, "other".into()),
        Err(TreeError::RootImmovable)
    ));
    assert_eq!(tree.rows(None), before);
    tree.check_invariants().unwrap();
}

#[test]
fn reparent_moves_between_folders() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    let docs = tree.add_under(root, folder("/proj/docs", 3)).unwrap();
    let a = tree.add_under(src, file("/proj/src/a.c", 4)).unwrap();

    tree.reparent(a, docs, "guide.c".into()).unwrap();
    assert_eq!(tree.parent(a), Some(docs));
    assert_eq!(tree.lookup(Path::new("/proj/docs/guide.c")), Some(a));
    assert!(tree.children(src).is_empty());
    tree.check_invariants().unwrap();
}

#[test]
fn remove_drops_the_whole_subtree_from_the_index() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    tree.add_under(src, file("/proj/src/a.c", 3)).unwrap();
    tree.add_under(src, file("/proj/src/b.c", 4)).unwrap();

    let mut removed = tree.remove(src).unwrap();
    removed.sort();
    assert_eq!(removed, vec![sid(2), sid(3), sid(4)]);
    assert_eq!(tree.lookup(Path::new("/proj/src/a.c")), None);
    assert_eq!(tree.len(), 1);
    tree.check_invariants().unwrap();
}

#[test]
fn removing_a_root_closes_it() {
    let (mut tree, root) = proj();
    let other = tree.attach_root(folder("/other", 9)).unwrap();
    tree.add_under(root, file("/proj/a", 2)).unwrap();

    tree.remove(root).unwrap();
    assert_eq!(tree.roots(), &[other]);
    assert_eq!(tree.len(), 1);
    tree.check_invariants().unwrap();
}

#[test]
fn unsorted_batch_insert_matches_sorted_inserts() {
    let names = ["z.rs", "lib", "a10.rs", "A2.rs", "bin", "main.rs", "Build"];

    let (mut sorted, sorted_root) = proj();
    let (mut batched, batched_root) = proj();
    for (i, name) in names.iter().enumerate() {
        let path = format!("/proj/{name}");
        let is_dir = !name.contains('.');
        let entry = if is_dir {
            folder(&path, 10 + i as u64)
        } else {
            file(&path, 10 + i as u64)
        };
        sorted.add_under(sorted_root, entry.clone()).unwrap();
        batched.add_under_unsorted(batched_root, entry).unwrap();
    }
    batched.sort_children(batched_root);

    let strip = |tree: &ProjectTree| {
        tree.rows(None)
            .into_iter()
            .map(|r| (r.depth, r.name, r.kind))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&sorted), strip(&batched));
    batched.check_invariants().unwrap();
}

#[test]
fn rows_flatten_depth_first_and_filter_with_ancestors() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    tree.add_under(src, file("/proj/src/Parser.rs", 3)).unwrap();
    tree.add_under(src, file("/proj/src/lexer.rs", 4)).unwrap();
    tree.add_under(root, file("/proj/README.md", 5)).unwrap();

    let all: Vec<(u16, String)> = tree
        .rows(None)
        .into_iter()
        .map(|r| (r.depth, r.name.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(
        all,
        vec![
            (0, "proj".to_string()),
            (1, "src".to_string()),
            (2, "lexer.rs".to_string()),
            (2, "Parser.rs".to_string()),
            (1, "README.md".to_string()),
        ]
    );

    let filtered: Vec<String> = tree
        .rows(Some("parser"))
        .into_iter()
        .map(|r| r.name.to_string_lossy().into_owned())
        .collect();
    assert_eq!(filtered, vec!["proj", "src", "Parser.rs"]);

    assert_eq!(tree.rows(Some("  ")).len(), 5);
    assert!(tree.rows(Some("nothing-matches")).is_empty());
}

#[test]
fn lookup_and_queries() {
    let (mut tree, root) = proj();
    let src = tree.add_under(root, folder("/proj/src", 2)).unwrap();
    let a = tree.add_under(src, file("/proj/src/a.c", 3)).unwrap();

    assert_eq!(tree.root_of(a), Some(root));
    assert_eq!(tree.root_for_path(Path::new("/proj/src/new.c")), Some(root));
    assert_eq!(tree.root_for_path(Path::new("/elsewhere")), None);
    assert_eq!(tree.find_by_stable_id(sid(3)), Some(a));
    assert_eq!(tree.subtree(src), vec![src, a]);
    assert_eq!(tree.subtree_stable_ids(src), vec![sid(2), sid(3)]);
    assert!(tree.is_ancestor(root, a));
    assert!(!tree.is_ancestor(a, root));
}

#[test]
fn hard_links_share_a_stable_id() {
    let (mut tree, root) = proj();
    let a = tree.add_under(root, file("/proj/a.c", 7)).unwrap();
    let b = tree.add_under(root, file("/proj/b.c", 7)).unwrap();
    assert_eq!(tree.nodes_with_stable_id(sid(7)), &[a, b]);
    assert_eq!(tree.find_by_stable_id(sid(7)), Some(a));

    tree.remove(a).unwrap();
    assert_eq!(tree.find_by_stable_id(sid(7)), Some(b));
    tree.check_invariants().unwrap();

    tree.remove(b).unwrap();
    assert_eq!(tree.find_by_stable_id(sid(7)), None);
    assert!(tree.nodes_with_stable_id(sid(7)).is_empty());
    tree.check_invariants().unwrap();
}

/// Tiny deterministic generator so the sequence test needs no extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

#[test]
fn invariants_hold_over_random_operation_sequences() {
    for seed in 0..8u64 {
        let (mut tree, root) = proj();
        let mut rng = Lcg(seed);
        let mut serial = 100u64;

        for _ in 0..300 {
            let nodes: Vec<NodeId> = tree.subtree(root);
            let dirs: Vec<NodeId> = nodes.iter().copied().filter(|&n| tree.is_dir(n)).collect();
            let name: OsString = format!("n{}", rng.next(12)).into();
            serial += 1;

            match rng.next(5) {
                0 | 1 => {
                    let parent = dirs[rng.next(dirs.len())];
                    let path = tree.path_of(parent).unwrap().join(&name);
                    let entry = if rng.next(2) == 0 {
                        Entry::new(EntryKind::Folder, path, sid(serial))
                    } else {
                        Entry::new(EntryKind::File, path, sid(serial))
                    };
                    let _ = tree.add_under(parent, entry);
                }
                2 => {
                    let node = nodes[rng.next(nodes.len())];
                    let _ = tree.rename(node, name);
                }
                3 => {
                    let node = nodes[rng.next(nodes.len())];
                    let target = dirs[rng.next(dirs.len())];
                    let _ = tree.reparent(node, target, name);
                }
                _ => {
                    let node = nodes[rng.next(nodes.len())];
                    if node != root {
                        tree.remove(node).unwrap();
                    }
                }
            }

            tree.check_invariants()
                .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
            for row in tree.rows(None) {
                let path = tree.path_of(row.id).unwrap().to_path_buf();
                assert_eq!(tree.lookup(&path), Some(row.id));
            }
        }
    }
}
