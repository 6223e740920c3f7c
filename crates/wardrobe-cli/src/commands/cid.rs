//! Content identifier command

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use wardrobe_core::{identify_file, identify_named_set};

pub fn run(paths: &[PathBuf], folder: bool) -> Result<()> {
    if !folder {
        for path in paths {
            let id = identify_file(path)
                .with_context(|| format!("cannot identify {}", path.display()))?;
            println!("{}  {}", id, path.display());
        }
        return Ok(());
    }

    let entries = folder_entries(paths)?;
    let id = identify_named_set(&entries)?;
    println!("{}", id);
    Ok(())
}

/// Name and bytes of every file, with directories expanded to their visible
/// files in name order
fn folder_entries(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut children: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && !is_hidden(p))
                .collect();
            children.sort();
            files.extend(children);
        } else {
            files.push(path.clone());
        }
    }

    files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("unusable file name: {}", path.display()))?
                .to_string();
            let bytes =
                fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
            Ok((name, bytes))
        })
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_core::identify;

    #[test]
    fn test_folder_entries_expand_directories() {
        let dir = std::env::temp_dir().join(format!("wardrobe_cid_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("b.png"), b"b").unwrap();
        fs::write(dir.join("a.glb"), b"a").unwrap();
        fs::write(dir.join(".DS_Store"), b"x").unwrap();

        let entries = folder_entries(&[dir.clone()]).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a.glb", "b.png"]);

        let expected = identify_named_set(&[("b.png", b"b"), ("a.glb", b"a")]).unwrap();
        assert_eq!(identify_named_set(&entries).unwrap(), expected);
        assert_ne!(expected, identify(b"a"));

        let _ = fs::remove_dir_all(&dir);
    }
}
