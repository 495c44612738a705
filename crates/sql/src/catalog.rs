//! Table resolution
//!
//! A [`TableResolver`] maps a table name to a fresh line supplier over that
//! table's input, and lists the tables it knows about.

use crate::error::{Error, Result};
use crate::reader::{BoxedLines, ReaderLines, VecLines};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub trait TableResolver: Send + Sync {
    /// Opens a new line supplier over the table's input.
    fn open(&self, table: &str) -> Result<BoxedLines>;

    /// Names of the tables that can be opened.
    fn table_names(&self) -> Result<Vec<String>>;
}

/// Resolves tables to files in a directory: table `people` is the file
/// `people.csv` (with the configured extension). Names match the file name
/// exactly, or case-insensitively when there is no exact match.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    dir: PathBuf,
    extension: String,
}

impl DirectoryResolver {
    pub fn new(dir: impl AsRef<Path>, extension: impl Into<String>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::Io(format!("{} is not a directory", dir.display())));
        }
        Ok(Self {
            dir,
            extension: extension.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, table: &str) -> Result<PathBuf> {
        let exact = self.dir.join(format!("{}{}", table, self.extension));
        if exact.is_file() {
            return Ok(exact);
        }
        let wanted = format!("{}{}", table, self.extension).to_lowercase();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.to_lowercase() == wanted);
            if matches && path.is_file() {
                return Ok(path);
            }
        }
        Err(Error::TableNotFound(table.to_string()))
    }
}

impl TableResolver for DirectoryResolver {
    fn open(&self, table: &str) -> Result<BoxedLines> {
        let path = self.locate(table)?;
        let file = File::open(&path)
            .map_err(|e| Error::Io(format!("cannot open {}: {}", path.display(), e)))?;
        tracing::debug!("Opened {} for table {}", path.display(), table);
        Ok(Box::new(ReaderLines::new(BufReader::new(file))))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if let Some(table) = name.strip_suffix(&self.extension)
                && !table.is_empty()
            {
                names.push(table.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Tables held in memory as text, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    tables: BTreeMap<String, (String, String)>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        let name = name.into();
        self.tables.insert(name.to_uppercase(), (name, text.into()));
    }
}

impl TableResolver for MemoryResolver {
    fn open(&self, table: &str) -> Result<BoxedLines> {
        let (_, text) = self
            .tables
            .get(&table.to_uppercase())
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        Ok(Box::new(VecLines::from_text(text)))
    }

    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.values().map(|(name, _)| name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::LineSupplier;
    use std::fs;

    fn read_all(mut lines: BoxedLines) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_directory_resolver() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("people.csv"), "ID,NAME\n1,ann\n")?;
        fs::write(dir.path().join("Orders.csv"), "ID\n")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let resolver = DirectoryResolver::new(dir.path(), ".csv")?;
        assert_eq!(resolver.table_names()?, vec!["Orders", "people"]);
        assert_eq!(read_all(resolver.open("people")?), vec!["ID,NAME", "1,ann"]);
        assert_eq!(read_all(resolver.open("ORDERS")?), vec!["ID"]);
        assert!(matches!(
            resolver.open("missing"),
            Err(Error::TableNotFound(name)) if name == "missing"
        ));
        Ok(())
    }

    #[test]
    fn test_directory_must_exist() {
        assert!(DirectoryResolver::new("/definitely/not/here", ".csv").is_err());
    }

    #[test]
    fn test_memory_resolver() -> Result<()> {
        let resolver = MemoryResolver::new()
            .with_table("people", "ID\n1\n2")
            .with_table("Animals", "NAME");
        assert_eq!(resolver.table_names()?, vec!["Animals", "people"]);
        assert_eq!(read_all(resolver.open("PEOPLE")?), vec!["ID", "1", "2"]);
        assert_eq!(
            resolver.open("cars").err(),
            Some(Error::TableNotFound("cars".into()))
        );
        Ok(())
    }
}
