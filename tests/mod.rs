//! Main test module for easyarchive
//!
//! This module includes all test suites:
//! - Integration tests for whole archive cycles
//! - Property-based tests for comparison and ordering invariants
//! - Stress tests for the bounded worker pool

pub mod integration;
pub mod stress;

#[cfg(test)]
mod edge_cases {
    use ::easyarchive::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_files_share_a_digest_but_not_an_identity() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a"), "").unwrap();
        let before = collect(temp_dir.path()).unwrap();

        // Same count, same digest, different name
        fs::rename(temp_dir.path().join("a"), temp_dir.path().join("b")).unwrap();
        let after = collect(temp_dir.path()).unwrap();

        assert_eq!(before.as_slice()[0].digest_hex, after.as_slice()[0].digest_hex);
        assert!(changed(&before, &after).is_changed());
    }

    #[test]
    fn test_unicode_filenames() {
        let temp_dir = TempDir::new().unwrap();
        let names = ["файл.txt", "文件.txt", "ファイル.txt", "🚀.txt", "file with spaces.txt"];

        let mut written = Vec::new();
        for name in &names {
            if fs::write(temp_dir.path().join(name), name.as_bytes()).is_ok() {
                written.push(name.to_string());
            }
        }

        let snapshot = collect(temp_dir.path()).unwrap();
        let mut expected = written.clone();
        expected.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        assert_eq!(snapshot.filenames(), expected);
    }

    #[test]
    fn test_touch_without_content_change_is_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("same.txt");
        fs::write(&path, "identical").unwrap();
        let before = collect(temp_dir.path()).unwrap();

        // Rewrite with the same bytes; only timestamps move
        fs::write(&path, "identical").unwrap();
        let after = collect(temp_dir.path()).unwrap();

        assert_eq!(changed(&before, &after), ChangeResult::Unchanged);
    }

    #[test]
    fn test_subdirectories_ignored_in_flat_mode() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("top.txt"), "top").unwrap();
        let before = collect(temp_dir.path()).unwrap();

        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested").join("inner.txt"), "inner").unwrap();
        let after = collect(temp_dir.path()).unwrap();

        assert_eq!(changed(&before, &after), ChangeResult::Unchanged);

        let recursive = FingerprintCollector::new().with_recursive(true);
        assert_eq!(
            recursive.collect(temp_dir.path()).unwrap().filenames(),
            vec!["nested/inner.txt", "top.txt"]
        );
    }
}
