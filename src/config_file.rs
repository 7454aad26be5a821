use anyhow::{anyhow, Context, Result};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const PROJECT_FILE: &str = ".fancyrc";
const MAX_PROFILE_DEPTH: usize = 10;

/// INI configuration for fancy: a root `defaults` line prepended to every
/// invocation and named argument bundles under `[profiles]`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub defaults: Option<String>,
    pub profiles: HashMap<String, String>,
}

impl ConfigFile {
    /// Find project-level .fancyrc by walking up from the current directory
    pub fn find_project_config() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        Self::find_project_config_from(&current)
    }

    fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_FILE))
            .find(|path| path.exists())
    }

    /// User config file locations in order of preference:
    /// `$XDG_CONFIG_HOME/fancy/config.ini` (falling back to `~/.config`),
    /// then `~/.fancyrc`.
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let home = env::var("HOME").ok().map(PathBuf::from);

        let xdg_config = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| match &home {
                Some(h) => h.join(".config"),
                None => PathBuf::from(".config"),
            });

        let mut paths = vec![xdg_config.join("fancy").join("config.ini")];
        if let Some(home) = home {
            paths.push(home.join(PROJECT_FILE));
        }
        paths
    }

    /// Load with precedence project > user; missing files are not an error.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::get_user_config_paths()
            .into_iter()
            .find(|p| p.exists())
        {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(project_path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// An explicit `--config-file` replaces the search entirely.
    pub fn load_with_custom_path(custom_path: Option<&str>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(Path::new(path)),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse_ini_content(&content))
    }

    fn parse_ini_content(content: &str) -> Self {
        let mut config = Self::default();
        let mut current_section = String::new();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            // Unknown keys and sections are ignored
            match current_section.as_str() {
                "" if key == "defaults" => config.defaults = Some(value.to_string()),
                "profiles" => {
                    config.profiles.insert(key.to_string(), value.to_string());
                }
                _ => {}
            }
        }

        config
    }

    /// Merge two configurations, the overlay winning on conflicts
    fn merge_configs(base: Self, overlay: Self) -> Self {
        let mut profiles = base.profiles;
        profiles.extend(overlay.profiles);
        Self {
            defaults: overlay.defaults.or(base.defaults),
            profiles,
        }
    }

    /// Expand a profile into arguments; profiles may reference other
    /// profiles with `-p`/`--profile`.
    pub fn resolve_profile(
        &self,
        name: &str,
        seen: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Vec<String>> {
        if depth > MAX_PROFILE_DEPTH {
            return Err(anyhow!("Profile chain too deep: {} levels", depth));
        }
        if !seen.insert(name.to_string()) {
            return Err(anyhow!("Circular dependency detected in profile: {}", name));
        }

        let value = self
            .profiles
            .get(name)
            .ok_or_else(|| anyhow!("Unknown profile: {}", name))?;
        let args = shell_words::split(value)
            .with_context(|| format!("Invalid profile '{}': failed to parse arguments", name))?;

        let expanded = self.expand_profiles(args, seen, depth + 1)?;
        seen.remove(name);
        Ok(expanded)
    }

    fn expand_profiles(
        &self,
        args: Vec<String>,
        seen: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Vec<String>> {
        let mut result = Vec::with_capacity(args.len());
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let inline = arg.strip_prefix("--profile=").map(str::to_string);
            let name = match inline {
                Some(name) => Some(name),
                None if arg == "-p" || arg == "--profile" => args.next(),
                None => None,
            };

            match name {
                Some(name) => result.extend(self.resolve_profile(&name, seen, depth)?),
                None => result.push(arg),
            }
        }

        Ok(result)
    }

    /// Prepend `defaults` (after the program name) and expand profiles.
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let mut args = args.into_iter();
        let mut combined: Vec<String> = args.next().into_iter().collect();

        if let Some(defaults) = &self.defaults {
            let default_args = shell_words::split(defaults)
                .context("Invalid defaults: failed to parse arguments")?;
            combined.extend(default_args);
        }
        combined.extend(args);

        self.expand_profiles(combined, &mut HashSet::new(), 0)
    }
}

/// Value of `--config-file` in raw argv, if any.
pub fn extract_config_file_arg(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(path) = arg.strip_prefix("--config-file=") {
            return Some(path.to_string());
        }
        if arg == "--config-file" {
            return iter.next().cloned();
        }
    }
    None
}

/// Apply the config-file layer to raw argv unless `--ignore-config` is set.
pub fn apply_config_layer(raw_args: Vec<String>) -> Result<Vec<String>> {
    if raw_args.iter().any(|arg| arg == "--ignore-config") {
        return Ok(raw_args);
    }

    let config_path = extract_config_file_arg(&raw_args);
    let config = ConfigFile::load_with_custom_path(config_path.as_deref())?;
    config.process_args(raw_args)
}
