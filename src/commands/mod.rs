//! Command implementations

pub mod kinds;
pub mod list;
pub mod plan;
pub mod run;
pub mod sweep;

use acctest::Scenario;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::paths;

/// Load every `*.toml` scenario under `dir`, sorted by path.
pub fn discover(dir: &Path) -> Result<Vec<Scenario>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            log::debug!("Found scenario file {}", path.display());
            found.push(acctest::file::load_file(path)?);
        }
    }
    Ok(found)
}

/// Scenarios from the directories listed in the config file.
pub fn configured(config: &Config) -> Result<Vec<Scenario>> {
    let mut found = Vec::new();
    for dir in &config.scenario_dirs {
        let dir = paths::expand(dir);
        if dir.is_dir() {
            found.extend(discover(&dir)?);
        } else {
            log::warn!("Scenario dir {} does not exist", dir.display());
        }
    }
    Ok(found)
}

/// Resolve what to run.
///
/// Files and `--dir` contents are taken as given. Names are looked up among
/// the built-ins, the `--dir` contents and the configured directories. With
/// nothing selected, every built-in runs.
pub fn select(
    config: &Config,
    names: &[String],
    files: &[PathBuf],
    dir: Option<&Path>,
) -> Result<Vec<Scenario>> {
    let mut selected = files
        .iter()
        .map(|path| acctest::file::load_file(path))
        .collect::<Result<Vec<_>>>()?;

    let mut pool = acctest::scenarios::builtins()?;
    if let Some(dir) = dir {
        let found = discover(dir)?;
        if names.is_empty() {
            selected.extend(found);
        } else {
            pool.extend(found);
        }
    }

    if names.is_empty() {
        if selected.is_empty() && dir.is_none() {
            selected = pool;
        }
    } else {
        pool.extend(configured(config)?);
        for name in names {
            let scenario = pool
                .iter()
                .find(|s| &s.name == name)
                .with_context(|| format!("unknown scenario '{name}' (see `panos-acc list`)"))?;
            selected.push(scenario.clone());
        }
    }

    let mut seen = HashSet::new();
    for scenario in &selected {
        if !seen.insert(scenario.name.as_str()) {
            bail!("scenario '{}' selected twice", scenario.name);
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SCENARIO: &str = r#"
name = "NAME"

[[step]]
[[step.resource]]
kind = "tag"
label = "t"
location = { shared = {} }
attributes = { name = "${var.prefix}-t" }
"#;

    fn write(dir: &Path, file: &str, name: &str) -> PathBuf {
        let path = dir.join(file);
        fs::write(&path, SCENARIO.replace("NAME", name)).unwrap();
        path
    }

    #[test]
    fn test_discover_sorted_and_recursive() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(dir.path(), "b.toml", "bravo");
        write(&dir.path().join("nested"), "a.toml", "nested_alpha");
        write(dir.path(), "a.toml", "alpha");
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let names: Vec<_> = discover(dir.path())
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["alpha", "bravo", "nested_alpha"]);
    }

    #[test]
    fn test_select_defaults_to_builtins() {
        let selected = select(&Config::default(), &[], &[], None).unwrap();
        assert_eq!(
            selected.len(),
            acctest::scenarios::builtins().unwrap().len()
        );
    }

    #[test]
    fn test_select_by_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "mine.toml", "mine");
        let names = vec!["address-rename".to_string(), "mine".to_string()];
        let selected = select(&Config::default(), &names, &[], Some(dir.path())).unwrap();
        let got: Vec<_> = selected.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(got, vec!["address-rename", "mine"]);
    }

    #[test]
    fn test_select_dir_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "one.toml", "one");
        let selected = select(&Config::default(), &[], &[], Some(dir.path())).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "one");
    }

    #[test]
    fn test_select_unknown_name() {
        let err = select(&Config::default(), &["nope".to_string()], &[], None).unwrap_err();
        assert!(err.to_string().contains("unknown scenario 'nope'"));
    }

    #[test]
    fn test_select_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let file = write(dir.path(), "dup.toml", "address-rename");
        let names = vec!["address-rename".to_string()];
        let err = select(&Config::default(), &names, &[file], None).unwrap_err();
        assert!(err.to_string().contains("selected twice"));
    }

    #[test]
    fn test_configured_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "c.toml", "from_config");
        let config = Config {
            scenario_dirs: vec![
                dir.path().display().to_string(),
                "/nonexistent/panos-acc".to_string(),
            ],
            ..Config::default()
        };
        let names = vec!["from_config".to_string()];
        let selected = select(&config, &names, &[], None).unwrap();
        assert_eq!(selected[0].name, "from_config");
    }
}
