//! Local storage for downloaded pay statements.
//!
//! Mirrors how the files end up organized by hand: `2024-01-31.pdf` either
//! directly in the output directory or tucked into a `2024/` year folder.
//! Either location counts as already downloaded.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::models::PayStatement;

pub struct StatementStore {
    root: PathBuf,
}

impl StatementStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// Whether the statement already exists on disk, either at the top level
    /// or inside its year folder.
    pub fn is_downloaded(&self, statement: &PayStatement) -> bool {
        let name = statement.file_name();
        if self.root.join(&name).exists() {
            return true;
        }
        self.root.join(statement.year()).join(&name).exists()
    }

    /// The statements still missing locally, oldest first.
    pub fn plan<'a>(&self, statements: &'a [PayStatement]) -> Vec<&'a PayStatement> {
        let mut needed: Vec<&PayStatement> = statements
            .iter()
            .filter(|s| !self.is_downloaded(s))
            .collect();
        needed.sort_by_key(|s| s.pay_date);
        needed
    }

    /// Write the statement bytes under their final name, going through a
    /// `.part` temporary so an interrupted write never leaves a torn file
    /// under the statement's name. The file handle is released on every exit
    /// path.
    pub fn save(&self, statement: &PayStatement, bytes: &[u8]) -> Result<PathBuf> {
        let final_path = self.root.join(statement.file_name());
        let part_path = final_path.with_extension("pdf.part");

        if let Err(e) = write_file(&part_path, bytes) {
            let _ = fs::remove_file(&part_path);
            return Err(e);
        }

        fs::rename(&part_path, &final_path)
            .with_context(|| format!("Failed to move {} into place", final_path.display()))?;
        debug!(path = %final_path.display(), bytes = bytes.len(), "Statement saved");
        Ok(final_path)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn statement(date: &str) -> PayStatement {
        PayStatement {
            pay_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            document_url: format!("https://my.adp.com/v1_0/O/A/payStatement/{}", date),
        }
    }

    #[test]
    fn test_new_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("stubs");
        StatementStore::new(root.clone()).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_save_writes_non_empty_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatementStore::new(dir.path().to_path_buf()).unwrap();
        let s = statement("2024-01-31");

        let path = store.save(&s, b"%PDF-1.7 fake statement").unwrap();
        assert_eq!(path, dir.path().join("2024-01-31.pdf"));
        assert!(!fs::read(&path).unwrap().is_empty());
        // No .part temporary left behind
        assert!(!dir.path().join("2024-01-31.pdf.part").exists());
    }

    #[test]
    fn test_is_downloaded_top_level_and_year_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatementStore::new(dir.path().to_path_buf()).unwrap();

        let top = statement("2024-01-31");
        let filed = statement("2023-12-29");
        assert!(!store.is_downloaded(&top));
        assert!(!store.is_downloaded(&filed));

        fs::write(dir.path().join("2024-01-31.pdf"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("2023")).unwrap();
        fs::write(dir.path().join("2023").join("2023-12-29.pdf"), b"x").unwrap();

        assert!(store.is_downloaded(&top));
        assert!(store.is_downloaded(&filed));
    }

    #[test]
    fn test_plan_skips_present_and_sorts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatementStore::new(dir.path().to_path_buf()).unwrap();

        // Portal lists newest first; one of them is already on disk
        let listed = vec![
            statement("2024-02-29"),
            statement("2024-01-31"),
            statement("2023-12-29"),
        ];
        fs::write(dir.path().join("2024-01-31.pdf"), b"x").unwrap();

        let needed = store.plan(&listed);
        let dates: Vec<String> = needed.iter().map(|s| s.pay_date.to_string()).collect();
        assert_eq!(dates, vec!["2023-12-29", "2024-02-29"]);
    }
}
