use super::*;

#[test]
fn removed_after_success() {
    let root = tempfile::tempdir().unwrap();
    let wd = WorkDir::create(Some(root.path()), false).unwrap();
    let path = wd.path().to_path_buf();
    std::fs::write(wd.clip(1), b"x").unwrap();
    assert!(path.starts_with(root.path()));
    assert_eq!(wd.finish(true).unwrap(), None);
    assert!(!path.exists());
}

#[test]
fn kept_after_failure_even_without_keep_flag() {
    let root = tempfile::tempdir().unwrap();
    let wd = WorkDir::create(Some(root.path()), false).unwrap();
    let path = wd.path().to_path_buf();
    assert_eq!(wd.finish(false).unwrap(), Some(path.clone()));
    assert!(path.is_dir());
}

#[test]
fn kept_after_success_when_requested() {
    let root = tempfile::tempdir().unwrap();
    let wd = WorkDir::create(Some(root.path()), true).unwrap();
    let kept = wd.finish(true).unwrap().unwrap();
    assert!(kept.is_dir());
}

#[test]
fn deterministic_intermediate_names() {
    let wd = WorkDir::create(None, false).unwrap();
    assert!(wd.clip(7).ends_with("segment_007.mp4"));
    assert!(wd.placeholder(12).ends_with("placeholder_012.png"));
    assert!(
        wd.path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("coursereel_")
    );
}

#[test]
fn missing_temp_root_is_created() {
    let root = tempfile::tempdir().unwrap();
    let nested = root.path().join("a/b");
    let wd = WorkDir::create(Some(&nested), false).unwrap();
    assert!(wd.path().starts_with(&nested));
}
