use std::fs;
use std::path::Path;

use duscope_scan::{NeverCancel, NoProgress, Node, NodeNote, ScanConfig, Scanner};
use tempfile::TempDir;

fn write_sized(path: &Path, len: usize) {
    fs::write(path, vec![b'x'; len]).unwrap();
}

fn scan(config: ScanConfig) -> Node {
    Scanner::new(config).scan(&NeverCancel, &NoProgress)
}

fn child<'a>(node: &'a Node, name: &str) -> &'a Node {
    node.children()
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no child named {name} under {}", node.path))
}

#[test]
fn test_example_tree() {
    let temp = TempDir::new().unwrap();
    write_sized(&temp.path().join("a.txt"), 100);
    fs::create_dir(temp.path().join("sub")).unwrap();
    write_sized(&temp.path().join("sub/b.txt"), 50);

    let root = scan(ScanConfig::new(temp.path()));

    assert_eq!(root.size, 150);
    let names: Vec<_> = root.children().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "sub"]);

    let sub = child(&root, "sub");
    assert_eq!(sub.size, 50);
    assert_eq!(sub.child_count(), 1);
    assert_eq!(child(sub, "b.txt").size, 50);
    assert!(child(&root, "a.txt").children.is_none());
}

#[test]
fn test_directory_sizes_are_exact_sums() {
    let temp = TempDir::new().unwrap();
    let root_path = temp.path();
    let mut expected = 0;
    for (i, dir) in ["a", "a/b", "a/b/c", "d"].iter().enumerate() {
        fs::create_dir_all(root_path.join(dir)).unwrap();
        for j in 0..3 {
            let len = (i + 1) * 10 + j;
            write_sized(&root_path.join(dir).join(format!("f{j}")), len);
            expected += len as u64;
        }
    }

    let root = scan(ScanConfig::new(root_path));

    assert_eq!(root.size, expected);
    assert_eq!(root.file_count(), 12);
    for node in root.iter() {
        assert!(node.note.is_none(), "unexpected note at {}", node.path);
        if node.is_dir() {
            let sum: u64 = node.children().iter().map(|c| c.size).sum();
            assert_eq!(node.size, sum);
            for pair in node.children().windows(2) {
                assert!(pair[0].size >= pair[1].size);
            }
        }
    }
}

#[test]
fn test_paths_are_absolute_and_nested() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    write_sized(&temp.path().join("sub/f"), 1);

    let root = scan(ScanConfig::new(temp.path()));
    let sub = child(&root, "sub");
    let f = child(sub, "f");

    assert!(Path::new(&root.path).is_absolute());
    assert_eq!(Path::new(&f.path), temp.path().join("sub/f"));
    assert!(root.find(&f.path).is_some());
}

#[test]
fn test_max_depth_zero() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    write_sized(&temp.path().join("sub/f"), 10);

    let config = ScanConfig::builder()
        .root(temp.path())
        .max_depth(0u32)
        .build()
        .unwrap();
    let root = scan(config);

    assert_eq!(root.note, Some(NodeNote::MaxDepthReached));
    assert!(root.children.is_none());
    assert_eq!(root.size, fs::metadata(temp.path()).unwrap().len());
}

#[test]
fn test_max_depth_cuts_nested_directories() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("a/b")).unwrap();
    write_sized(&temp.path().join("a/top"), 7);
    write_sized(&temp.path().join("a/b/deep"), 1000);

    let config = ScanConfig::builder()
        .root(temp.path())
        .max_depth(1u32)
        .build()
        .unwrap();
    let root = scan(config);

    let a = child(&root, "a");
    assert!(a.note.is_none());
    let b = child(a, "b");
    assert_eq!(b.note, Some(NodeNote::MaxDepthReached));
    assert!(b.children.is_none());
    assert_eq!(b.size, fs::metadata(temp.path().join("a/b")).unwrap().len());
    assert_eq!(child(a, "top").size, 7);
}

#[test]
fn test_exclude_hidden() {
    let temp = TempDir::new().unwrap();
    write_sized(&temp.path().join(".hidden"), 30);
    fs::create_dir(temp.path().join(".cache")).unwrap();
    write_sized(&temp.path().join(".cache/blob"), 500);
    write_sized(&temp.path().join("shown"), 5);

    let root = scan(ScanConfig::new(temp.path()));
    assert_eq!(root.size, 5);
    assert!(root.children().iter().all(|c| !c.name.starts_with('.')));

    let config = ScanConfig::builder()
        .root(temp.path())
        .exclude_hidden(false)
        .build()
        .unwrap();
    let root = scan(config);
    assert_eq!(root.size, 535);
    assert_eq!(child(&root, ".hidden").size, 30);
    assert_eq!(child(&root, ".cache").size, 500);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_terminates() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("a")).unwrap();
    write_sized(&temp.path().join("a/f"), 10);
    std::os::unix::fs::symlink(temp.path(), temp.path().join("a/loop")).unwrap();

    let config = ScanConfig::builder()
        .root(temp.path())
        .follow_symlinks(true)
        .build()
        .unwrap();
    let root = scan(config);

    let a = child(&root, "a");
    let looped = child(a, "loop");
    assert_eq!(looped.note, Some(NodeNote::SkippedCycle));
    assert_eq!(looped.size, 0);
    assert!(looped.children.is_none());
    assert_eq!(root.size, 10);
}

#[cfg(unix)]
#[test]
fn test_symlinks_skipped_unless_followed() {
    let temp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write_sized(&outside.path().join("payload"), 64);
    std::os::unix::fs::symlink(outside.path(), temp.path().join("ext")).unwrap();
    write_sized(&temp.path().join("own"), 1);

    let root = scan(ScanConfig::new(temp.path()));
    assert_eq!(root.size, 1);
    assert_eq!(root.child_count(), 1);

    let config = ScanConfig::builder()
        .root(temp.path())
        .follow_symlinks(true)
        .build()
        .unwrap();
    let root = scan(config);
    assert_eq!(root.size, 65);
    assert_eq!(child(child(&root, "ext"), "payload").size, 64);
}

#[cfg(unix)]
#[test]
fn test_broken_symlink_followed_is_zero_sized() {
    let temp = TempDir::new().unwrap();
    std::os::unix::fs::symlink(temp.path().join("nowhere"), temp.path().join("dangling")).unwrap();

    let config = ScanConfig::builder()
        .root(temp.path())
        .follow_symlinks(true)
        .build()
        .unwrap();
    let root = scan(config);

    let dangling = child(&root, "dangling");
    assert_eq!(dangling.size, 0);
    assert!(dangling.note.is_none());
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let locked = temp.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_sized(&locked.join("f"), 10);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can still list the directory.
    let readable = fs::read_dir(&locked).is_ok();

    let root = scan(ScanConfig::new(temp.path()));
    let node = child(&root, "locked");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if readable {
        assert!(node.note.is_none());
        return;
    }
    assert_eq!(node.note, Some(NodeNote::UnreadableDirectory));
    assert!(node.children.is_none());
    assert_eq!(node.size, fs::metadata(&locked).unwrap().len());
}

#[cfg(unix)]
#[test]
fn test_symlinked_root_is_walked_as_its_target() {
    let temp = TempDir::new().unwrap();
    let real = temp.path().join("real");
    fs::create_dir_all(real.join("nested")).unwrap();
    write_sized(&real.join("f"), 1000);
    write_sized(&real.join("nested/g"), 24);
    // A link inside the target is still skipped when links are not followed.
    std::os::unix::fs::symlink(&real, real.join("self")).unwrap();
    let link = temp.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let root = scan(ScanConfig::new(&link));

    assert!(root.note.is_none());
    assert_eq!(root.size, 1024);
    assert_eq!(root.name, "link");
    assert_eq!(Path::new(&root.path), link);
    assert_eq!(child(&root, "f").size, 1000);
    assert_eq!(child(child(&root, "nested"), "g").size, 24);
    assert!(root.children().iter().all(|c| c.name != "self"));
}

#[cfg(unix)]
#[test]
fn test_dangling_root_link_is_a_leaf() {
    let temp = TempDir::new().unwrap();
    let link = temp.path().join("dangling");
    std::os::unix::fs::symlink(temp.path().join("nowhere"), &link).unwrap();

    let root = scan(ScanConfig::new(&link));

    assert!(root.note.is_none());
    assert!(root.children.is_none());
    assert_eq!(root.size, fs::symlink_metadata(&link).unwrap().len());
}

#[test]
fn test_parent_dir_root_keeps_dotdot_name() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    write_sized(&temp.path().join("top"), 9);

    let root = scan(ScanConfig::new(temp.path().join("sub/..")));

    assert_eq!(root.name, "..");
    assert_eq!(root.size, 9);
}
