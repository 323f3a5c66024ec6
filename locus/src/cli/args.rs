//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::FilterConfig;
use crate::domain::ConfigError;

#[derive(Parser)]
#[command(
    name = "locus",
    about = "Check which source files a trace filter would profile",
    after_help = "\
EXAMPLES:
    locus -p mymodule -b ~/proj ~/proj/app.py        Decide one file
    locus --config filter.json --dump src/*.py       Filter from JSON, print it first
    locus -p proj --demo a.py proj/b.py main.py      Resolve a location from a simulated stack"
)]
pub struct Args {
    /// Source files to check (innermost first with --demo)
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,

    /// JSON filter description (patterns, base_path, profile_all)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path fragment to trace; repeatable, added to the config's patterns
    #[arg(short = 'p', long = "pattern", value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Directory whose files are traced (overrides the config)
    #[arg(short, long, value_name = "DIR")]
    pub base_path: Option<PathBuf>,

    /// Reserved "profile everything" mode
    #[arg(long)]
    pub profile_all: bool,

    /// Print the active filter before checking files
    #[arg(long)]
    pub dump: bool,

    /// Treat FILES as one call stack and resolve its location
    #[arg(long)]
    pub demo: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Merge the config file (if any) with command-line overrides.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed, or the
    /// merged configuration is invalid
    pub fn filter_config(&self) -> Result<FilterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FilterConfig::from_file(path)?,
            None => FilterConfig::default(),
        };

        config.patterns.extend(self.patterns.iter().cloned());
        if let Some(base_path) = &self.base_path {
            config.base_path.clone_from(base_path);
        }
        config.profile_all |= self.profile_all;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flags_only() {
        let args = Args::parse_from([
            "locus", "-p", "mymodule", "-p", "pkg/foo", "-b", "/proj", "x.py",
        ]);
        let config = args.filter_config().unwrap();
        assert_eq!(config, FilterConfig::new(["mymodule", "pkg/foo"], "/proj", false));
        assert_eq!(args.files, ["x.py"]);
    }

    #[test]
    fn test_flags_extend_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"patterns": ["from_file"], "base_path": "/old"}}"#).unwrap();

        let args = Args::parse_from([
            "locus",
            "--config",
            file.path().to_str().unwrap(),
            "-p",
            "from_flag",
            "--base-path",
            "/new",
            "--profile-all",
        ]);
        let config = args.filter_config().unwrap();
        assert_eq!(config, FilterConfig::new(["from_file", "from_flag"], "/new", true));
    }

    #[test]
    fn test_relative_base_path_rejected() {
        let args = Args::parse_from(["locus", "-b", "proj", "x.py"]);
        assert!(matches!(args.filter_config(), Err(ConfigError::Invalid(_))));
    }
}
