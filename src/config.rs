//! Loads the project configuration. The project file (`tessera.yaml`) is
//! found by searching the working directory and its ancestors; an optional
//! environment file (`tessera.{env}.yaml`) next to it is merged on top. The
//! merged document is both the build configuration and the site data every
//! page is rendered against.

use crate::page_data::SiteData;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the project file.
pub const PROJECT_FILE: &str = "tessera.yaml";

/// The environment used when none is given.
pub const DEFAULT_ENV: &str = "local";

const ENV_PLACEHOLDER: &str = "{env}";

fn default_pretty() -> bool {
    true
}

#[derive(Deserialize)]
struct Project {
    #[serde(default, rename = "baseUrl")]
    base_url: String,

    #[serde(default = "default_pretty")]
    pretty: bool,

    #[serde(default)]
    cache: bool,

    #[serde(default)]
    threads: Option<usize>,

    #[serde(default)]
    build: BuildPaths,
}

#[derive(Deserialize, Default)]
struct BuildPaths {
    source: Option<String>,
    destination: Option<String>,
    cache: Option<String>,
}

/// Command-line settings that take precedence over the project file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub pretty: Option<bool>,
    pub cache: bool,
    pub threads: Option<usize>,
}

/// The resolved build configuration.
#[derive(Debug)]
pub struct Config {
    pub env: String,
    pub project_root: PathBuf,
    pub source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub cache_directory: PathBuf,

    /// Whether output paths use pretty URLs.
    pub pretty: bool,

    /// Whether the cache directory is kept between builds.
    pub use_cache: bool,

    /// The number of worker threads handling source files.
    pub threads: usize,

    /// Set when the project file points the output somewhere other than a
    /// `build_*` directory, in which case overwriting it should be confirmed.
    pub custom_destination: bool,

    pub site: SiteData,
}

impl Config {
    /// Searches `dir` and its ancestors for the project file and loads it.
    pub fn from_directory(dir: &Path, env: &str, overrides: &Overrides) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, env, overrides)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, env, overrides),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, env: &str, overrides: &Overrides) -> Result<Config> {
        let project_root = path
            .parent()
            .ok_or_else(|| {
                anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                )
            })?
            .to_owned();

        let mut data = load_mapping(path, "project")?;
        let env_path = project_root.join(format!("tessera.{}.yaml", env));
        if env_path.exists() {
            data = merge(data, load_mapping(&env_path, "environment")?);
        } else {
            data = merge(data, Mapping::new());
        }

        let project: Project = serde_yaml::from_value(Value::Mapping(data.clone()))?;
        if !project.base_url.is_empty() {
            url::Url::parse(&project.base_url)
                .with_context(|| format!("Invalid `baseUrl` '{}'", project.base_url))?;
        }

        let build_path = |configured: &Option<String>, default: &str| {
            let configured = configured.as_deref().unwrap_or(default);
            project_root.join(configured.replace(ENV_PLACEHOLDER, env))
        };
        let custom_destination = project
            .build
            .destination
            .as_deref()
            .map_or(false, |d| !d.starts_with("build_"));

        Ok(Config {
            env: env.to_owned(),
            source_directory: build_path(&project.build.source, "source"),
            output_directory: build_path(&project.build.destination, "build_{env}"),
            cache_directory: build_path(&project.build.cache, "cache"),
            pretty: overrides.pretty.unwrap_or(project.pretty),
            use_cache: overrides.cache || project.cache,
            threads: overrides
                .threads
                .or(project.threads)
                .unwrap_or_else(num_cpus::get)
                .max(1),
            custom_destination,
            site: SiteData::new(data),
            project_root,
        })
    }
}

fn load_mapping(path: &Path, kind: &str) -> Result<Mapping> {
    let file = File::open(path)
        .map_err(|e| anyhow!("Opening {} file `{}`: {}", kind, path.display(), e))?;
    let value: Value = serde_yaml::from_reader(file)
        .with_context(|| format!("Parsing {} file `{}`", kind, path.display()))?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(m) => Ok(m),
        _ => Err(anyhow!(
            "The {} file `{}` must contain a mapping",
            kind,
            path.display()
        )),
    }
}

/// Merges `overlay` over `base` key by key. Keys that end up `null` are
/// removed, which lets an environment file unset a base setting.
pub fn merge(mut base: Mapping, overlay: Mapping) -> Mapping {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(dir.join(name), content)
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), PROJECT_FILE, "title: Site\n")?;
        let config = Config::from_directory(dir.path(), DEFAULT_ENV, &Overrides::default())?;

        assert_eq!(dir.path().join("source"), config.source_directory);
        assert_eq!(dir.path().join("build_local"), config.output_directory);
        assert_eq!(dir.path().join("cache"), config.cache_directory);
        assert!(config.pretty);
        assert!(!config.use_cache);
        assert!(!config.custom_destination);
        assert!(config.threads >= 1);
        assert_eq!(Some("Site"), config.site.get("title").and_then(Value::as_str));
        Ok(())
    }

    #[test]
    fn test_search_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), PROJECT_FILE, "pretty: false\n")?;
        let nested = dir.path().join("source/blog");
        std::fs::create_dir_all(&nested)?;
        let config = Config::from_directory(&nested, DEFAULT_ENV, &Overrides::default())?;
        assert_eq!(dir.path(), config.project_root);
        assert!(!config.pretty);
        Ok(())
    }

    #[test]
    fn test_environment_overlay() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            dir.path(),
            PROJECT_FILE,
            "baseUrl: http://localhost\ntitle: Site\nanalytics: abc\nbuild:\n  destination: public_{env}\n",
        )?;
        write(
            dir.path(),
            "tessera.production.yaml",
            "baseUrl: https://example.org\nanalytics: null\ncache: true\n",
        )?;

        let config = Config::from_directory(dir.path(), "production", &Overrides::default())?;
        assert_eq!(
            Some("https://example.org"),
            config.site.get("baseUrl").and_then(Value::as_str)
        );
        assert_eq!(Some("Site"), config.site.get("title").and_then(Value::as_str));
        assert!(config.site.get("analytics").is_none());
        assert!(config.use_cache);
        assert!(config.custom_destination);
        assert_eq!(dir.path().join("public_production"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), PROJECT_FILE, "threads: 3\n")?;
        let overrides = Overrides {
            pretty: Some(false),
            cache: true,
            threads: Some(0),
        };
        let config = Config::from_directory(dir.path(), DEFAULT_ENV, &overrides)?;
        assert!(!config.pretty);
        assert!(config.use_cache);
        assert_eq!(1, config.threads);

        let config = Config::from_directory(dir.path(), DEFAULT_ENV, &Overrides::default())?;
        assert_eq!(3, config.threads);
        Ok(())
    }

    #[test]
    fn test_invalid_base_url() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), PROJECT_FILE, "baseUrl: not a url\n")?;
        assert!(Config::from_directory(dir.path(), DEFAULT_ENV, &Overrides::default()).is_err());
        Ok(())
    }

    #[test]
    fn test_merge() {
        let base: Mapping = serde_yaml::from_str("a: 1\nb: 2\nc: ~\n").unwrap();
        let overlay: Mapping = serde_yaml::from_str("b: 3\nd: 4\na: null\n").unwrap();
        let merged = merge(base, overlay);
        let expected: Mapping = serde_yaml::from_str("b: 3\nd: 4\n").unwrap();
        assert_eq!(expected, merged);
    }
}
