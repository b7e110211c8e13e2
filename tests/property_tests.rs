use std::collections::BTreeMap;
use std::fs;

use dupe_quarantine::{ScanOptions, TransactionRecord, scan_with_options};
use proptest::prelude::*;
use tempfile::TempDir;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_one_original_per_distinct_content(
        contents in prop::collection::vec(prop::sample::select(vec!["aa", "ab", "ba", "", "abc"]), 1..24)
    ) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let mut by_content: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (i, content) in contents.iter().enumerate() {
            let name = format!("f{:02}.txt", i);
            fs::write(root.join(&name), content).unwrap();
            by_content.entry(*content).or_default().push(name);
        }

        let report = scan_with_options(&root, &ScanOptions::new().dry_run(true)).unwrap();

        let flagged: Vec<String> = report
            .records
            .iter()
            .map(|r| match r {
                TransactionRecord::DryRun { duplicate, .. } => {
                    duplicate.file_name().unwrap().to_string_lossy().into_owned()
                }
                other => panic!("unexpected record {:?}", other),
            })
            .collect();

        prop_assert_eq!(flagged.len(), contents.len() - by_content.len());
        for names in by_content.values() {
            // Walk order is by file name, so the first name in each group wins
            prop_assert!(!flagged.contains(&names[0]));
            for name in &names[1..] {
                prop_assert!(flagged.contains(name));
            }
        }
    }
}
