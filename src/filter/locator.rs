//! Mapping from logical test names to the artifacts built for them

use super::{ArtifactIndex, FilterError, IndexedArtifact};

/// Finds the artifacts that belong to a logical test
///
/// `test_name` is the logical name with the `test-suite :: ` prefix and the
/// `.test` suffix already removed, e.g. `SingleSource/Benchmarks/Misc/fp-convert`.
pub trait ArtifactLocator {
    fn locate<'a>(
        &self,
        test_name: &str,
        index: &'a ArtifactIndex,
    ) -> Result<Vec<&'a IndexedArtifact>, FilterError>;
}

/// The llvm-test-suite CMake build layout
///
/// A test `<dir>/<leaf>` compiles its sources into
/// `<dir>/CMakeFiles/<leaf>.dir/`. SingleSource tests have exactly one
/// source, normally named after the test.
#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeLayout;

fn split_test_name(test_name: &str) -> (&str, &str) {
    match test_name.rfind('/') {
        Some(idx) => (&test_name[..idx], &test_name[idx + 1..]),
        None => ("", test_name),
    }
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", dir, rest)
    }
}

impl CMakeLayout {
    /// `<dir>/CMakeFiles/<leaf>.dir/`
    pub fn object_dir(test_name: &str) -> String {
        let (dir, leaf) = split_test_name(test_name);
        join(dir, &format!("CMakeFiles/{}.dir/", leaf))
    }

    fn locate_single_source<'a>(
        &self,
        test_name: &str,
        index: &'a ArtifactIndex,
    ) -> Result<Vec<&'a IndexedArtifact>, FilterError> {
        let (dir, leaf) = split_test_name(test_name);
        let object_dir = Self::object_dir(test_name);

        // Source named after the test, then any source in the object dir,
        // then a flat layout without CMakeFiles.
        let mut found = index.exact(&format!("{}{}", object_dir, leaf));
        if found.is_empty() {
            found = index.with_prefix(&object_dir);
        }
        if found.is_empty() {
            found = index.exact(&join(dir, leaf));
        }

        if found.len() != 1 {
            return Err(FilterError::AmbiguousArtifacts {
                test: test_name.to_string(),
                found: found.len(),
            });
        }
        Ok(found)
    }
}

impl ArtifactLocator for CMakeLayout {
    fn locate<'a>(
        &self,
        test_name: &str,
        index: &'a ArtifactIndex,
    ) -> Result<Vec<&'a IndexedArtifact>, FilterError> {
        if test_name.starts_with("SingleSource") {
            return self.locate_single_source(test_name, index);
        }

        let object_dir = Self::object_dir(test_name);
        let found = index.with_prefix(&object_dir);
        if found.is_empty() {
            return Err(FilterError::MissingArtifacts {
                test: test_name.to_string(),
                expected: object_dir,
            });
        }
        Ok(found)
    }
}
