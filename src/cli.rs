use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "kufar-configuration.json";
pub const CACHE_FILE_NAME: &str = "cached-data.json";
pub const LOG_FILE_NAME: &str = "kufarwatch.log";

const CONFIG_PREFIX: &str = "--config=";
const CACHE_PREFIX: &str = "--cache=";
const LOG_PREFIX: &str = "--log=";

/// Paths given on the command line. `None` means "next to the executable".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub log: Option<PathBuf>,
    /// Arguments that matched no known flag
    pub unknown: Vec<String>,
}

/// Fully resolved file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub config: PathBuf,
    pub cache: PathBuf,
    pub log: PathBuf,
}

#[derive(Debug)]
pub enum CliError {
    NoExecutableDir,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NoExecutableDir => write!(
                f,
                "Cannot determine the executable's folder. Pass --config=, --cache= and --log= explicitly."
            ),
        }
    }
}

impl std::error::Error for CliError {}

impl CliArgs {
    /// Parse `--flag=value` arguments. The first item is the program name.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut parsed = Self::default();

        for arg in args.into_iter().skip(1) {
            if let Some(value) = arg.strip_prefix(CONFIG_PREFIX) {
                parsed.config = non_empty(value);
            } else if let Some(value) = arg.strip_prefix(CACHE_PREFIX) {
                parsed.cache = non_empty(value);
            } else if let Some(value) = arg.strip_prefix(LOG_PREFIX) {
                parsed.log = non_empty(value);
            } else {
                parsed.unknown.push(arg);
            }
        }

        parsed
    }

    pub fn from_env() -> Self {
        Self::parse(env::args())
    }

    /// Fill in missing paths with defaults inside `exe_dir`
    pub fn resolve(&self, exe_dir: Option<&Path>) -> Result<ResolvedPaths, CliError> {
        let default_in = |name: &str| -> Result<PathBuf, CliError> {
            exe_dir
                .map(|dir| dir.join(name))
                .ok_or(CliError::NoExecutableDir)
        };

        Ok(ResolvedPaths {
            config: match &self.config {
                Some(path) => path.clone(),
                None => default_in(CONFIG_FILE_NAME)?,
            },
            cache: match &self.cache {
                Some(path) => path.clone(),
                None => default_in(CACHE_FILE_NAME)?,
            },
            log: match &self.log {
                Some(path) => path.clone(),
                None => default_in(LOG_FILE_NAME)?,
            },
        })
    }
}

fn non_empty(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Folder containing the running binary
pub fn executable_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("kufarwatch")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_all_flags() {
        let parsed = CliArgs::parse(args(&[
            "--config=/etc/kw/config.json",
            "--cache=/var/lib/kw/cache.json",
            "--log=/var/log/kw.log",
        ]));

        assert_eq!(parsed.config, Some(PathBuf::from("/etc/kw/config.json")));
        assert_eq!(parsed.cache, Some(PathBuf::from("/var/lib/kw/cache.json")));
        assert_eq!(parsed.log, Some(PathBuf::from("/var/log/kw.log")));
        assert!(parsed.unknown.is_empty());
    }

    #[test]
    fn test_unknown_and_empty_flags() {
        let parsed = CliArgs::parse(args(&["--verbose", "--config="]));
        assert_eq!(parsed.config, None);
        assert_eq!(parsed.unknown, vec!["--verbose".to_string()]);
    }

    #[test]
    fn test_program_name_ignored() {
        let parsed = CliArgs::parse(vec!["--config=/x".to_string()]);
        assert_eq!(parsed.config, None);
    }

    #[test]
    fn test_resolve_defaults_next_to_executable() {
        let parsed = CliArgs::parse(args(&["--cache=/tmp/c.json"]));
        let resolved = parsed.resolve(Some(Path::new("/opt/kw"))).unwrap();

        assert_eq!(resolved.config, PathBuf::from("/opt/kw/kufar-configuration.json"));
        assert_eq!(resolved.cache, PathBuf::from("/tmp/c.json"));
        assert_eq!(resolved.log, PathBuf::from("/opt/kw/kufarwatch.log"));
    }

    #[test]
    fn test_resolve_without_exe_dir() {
        let partial = CliArgs::parse(args(&["--config=/a"]));
        assert!(matches!(partial.resolve(None), Err(CliError::NoExecutableDir)));

        let full = CliArgs::parse(args(&["--config=/a", "--cache=/b", "--log=/c"]));
        assert!(full.resolve(None).is_ok());
    }
}
