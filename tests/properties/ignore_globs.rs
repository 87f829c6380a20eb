//! Property tests for ignore glob translation.

use std::path::Path;

use proptest::prelude::*;
use regex::bytes::Regex;

use podsync::ignores::glob_to_regex;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: any glob is rejected, skipped, or translates to a regex that compiles.
    #[test]
    fn property_translation_always_compiles(glob in "(?s).{0,64}") {
        if let Ok(Some(pattern)) = glob_to_regex(Path::new("/work/app"), &glob) {
            prop_assert!(Regex::new(&pattern).is_ok(), "pattern: {}", pattern);
        }
    }

    /// PROPERTY: a literal name is ignored at any depth under the base and never outside it.
    #[test]
    fn property_literal_name_matches_under_base_only(
        name in "[A-Za-z0-9_-]{1,12}",
        depth in proptest::collection::vec("[a-z]{1,6}", 0..4),
    ) {
        let pattern = glob_to_regex(Path::new("/work/app"), &name).unwrap().unwrap();
        let re = Regex::new(&pattern).unwrap();

        let mut inside = String::from("/work/app");
        for dir in &depth {
            inside.push('/');
            inside.push_str(dir);
        }
        inside.push('/');
        inside.push_str(&name);

        prop_assert!(re.is_match(inside.as_bytes()));
        let outside = format!("/other/{}", name);
        prop_assert!(!re.is_match(outside.as_bytes()));
    }
}
