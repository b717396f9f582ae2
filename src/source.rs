//! Source text lookup by file name.

use std::collections::HashMap;
use std::fs;
use std::rc::Rc;
use tracing::warn;

/// Lines of source files, read from disk on first use.
///
/// Programs loaded by the CLI are registered up front so the display never
/// has to go back to disk for them. Files that cannot be read are remembered
/// as missing.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: HashMap<String, Option<Rc<[String]>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `source` as the text of `filename`.
    pub fn register(&mut self, filename: &str, source: &str) {
        self.files
            .insert(filename.to_string(), Some(split_lines(source)));
    }

    /// All lines of `filename`, or `None` when it cannot be read.
    pub fn lines(&mut self, filename: &str) -> Option<Rc<[String]>> {
        if let Some(cached) = self.files.get(filename) {
            return cached.clone();
        }
        let loaded = match fs::read_to_string(filename) {
            Ok(text) => Some(split_lines(&text)),
            Err(e) => {
                warn!("Failed to read source {}: {}", filename, e);
                None
            }
        };
        self.files.insert(filename.to_string(), loaded.clone());
        loaded
    }

    /// Line `number` (1-based) of `filename`.
    pub fn line(&mut self, filename: &str, number: u32) -> Option<String> {
        let index = (number as usize).checked_sub(1)?;
        self.lines(filename)?.get(index).cloned()
    }
}

fn split_lines(text: &str) -> Rc<[String]> {
    text.lines().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn registered_sources_are_served_from_memory() {
        let mut cache = SourceCache::new();
        cache.register("<memory>", "a = 1;\nb = 2;\n");
        assert_eq!(cache.line("<memory>", 2).as_deref(), Some("b = 2;"));
        assert_eq!(cache.line("<memory>", 0), None);
        assert_eq!(cache.line("<memory>", 3), None);
    }

    #[test]
    fn files_are_read_on_first_use() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first\nsecond\n").unwrap();
        let path = file.path().display().to_string();

        let mut cache = SourceCache::new();
        assert_eq!(cache.line(&path, 1).as_deref(), Some("first"));
        assert_eq!(cache.lines(&path).map(|lines| lines.len()), Some(2));
    }

    #[test]
    fn unreadable_files_have_no_lines() {
        let mut cache = SourceCache::new();
        assert!(cache.lines("/no/such/file.sw").is_none());
        assert!(cache.line("/no/such/file.sw", 1).is_none());
    }
}
