use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::common::DisplayColor;
use crate::storage::ensure_parent_dir;

/// Colors never handed out automatically: they vanish on common terminal
/// backgrounds or read as "no color".
const RESERVED: [DisplayColor; 3] = [DisplayColor::White, DisplayColor::Black, DisplayColor::Gray];

/// Per-alias color assignments kept in a small JSON file, so a user keeps
/// their color across sessions.
pub struct ColorBook {
    path: PathBuf,
}

impl ColorBook {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> BTreeMap<String, DisplayColor> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(mapping) => mapping,
            Err(err) => {
                log::warn!("Ignoring unreadable color book {}: {err}", self.path.display());
                BTreeMap::new()
            }
        }
    }

    fn save(&self, mapping: &BTreeMap<String, DisplayColor>) -> std::io::Result<()> {
        ensure_parent_dir(&self.path)?;
        let json = serde_json::to_string_pretty(mapping)?;
        fs::write(&self.path, json)
    }

    /// The color saved for `alias`, or a freshly picked one that is then
    /// saved. Fresh picks prefer colors no other alias uses yet.
    pub fn load_or_assign(&self, alias: &str) -> DisplayColor {
        let mut mapping = self.load();
        if let Some(color) = mapping.get(alias) {
            return *color;
        }

        let color = pick_color(&mapping);
        mapping.insert(alias.to_string(), color);
        if let Err(err) = self.save(&mapping) {
            log::warn!("Could not save color book {}: {err}", self.path.display());
        }
        color
    }
}

fn pick_color(mapping: &BTreeMap<String, DisplayColor>) -> DisplayColor {
    let assignable: Vec<DisplayColor> = DisplayColor::ALL
        .into_iter()
        .filter(|color| !RESERVED.contains(color))
        .collect();
    let unused: Vec<DisplayColor> = assignable
        .iter()
        .copied()
        .filter(|color| !mapping.values().any(|taken| taken == color))
        .collect();

    let pool = if unused.is_empty() { &assignable } else { &unused };
    let index = (Uuid::new_v4().as_u128() % pool.len() as u128) as usize;
    pool[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_sticky_per_alias() {
        let dir = tempfile::tempdir().unwrap();
        let book = ColorBook::new(dir.path().join("colors.json"));

        let first = book.load_or_assign("alice");
        assert!(!RESERVED.contains(&first));
        assert_eq!(book.load_or_assign("alice"), first);

        let reopened = ColorBook::new(dir.path().join("colors.json"));
        assert_eq!(reopened.load_or_assign("alice"), first);
    }

    #[test]
    fn fresh_aliases_get_distinct_colors_while_any_are_free() {
        let dir = tempfile::tempdir().unwrap();
        let book = ColorBook::new(dir.path().join("colors.json"));

        let mut seen = Vec::new();
        for i in 0..(DisplayColor::ALL.len() - RESERVED.len()) {
            let color = book.load_or_assign(&format!("user-{i}"));
            assert!(!seen.contains(&color), "{color} handed out twice");
            seen.push(color);
        }

        let overflow = book.load_or_assign("one-too-many");
        assert!(!RESERVED.contains(&overflow));
    }

    #[test]
    fn corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors.json");
        fs::write(&path, "not json").unwrap();

        let color = ColorBook::new(&path).load_or_assign("bob");
        let saved: BTreeMap<String, DisplayColor> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.get("bob"), Some(&color));
    }
}
