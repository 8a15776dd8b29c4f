use clap::Parser;

use crate::io::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "zipstream")]
#[command(version)]
#[command(about = "A streaming unzip utility that never seeks", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipstream data1.zip -x joe        extract all files except joe from data1.zip\n  \
  curl -s https://example.com/a.zip | zipstream -p - | more\n  \
  zipstream -l https://example.com/archive.zip   list files while downloading")]
pub struct Cli {
    /// ZIP file path, HTTP URL, or - for stdin
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely/show version info
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Trace every decoded record
    #[arg(long)]
    pub debug: bool,

    /// Read size for local files and stdin
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_stdin(&self) -> bool {
        self.file == "-"
    }

    pub fn is_list(&self) -> bool {
        self.list || self.verbose
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from(["zipstream", "-qq", "-d", "out", "--debug", "a.zip", "x.txt"]);
        assert_eq!(cli.file, "a.zip");
        assert_eq!(cli.files, vec!["x.txt"]);
        assert_eq!(cli.extract_dir.as_deref(), Some("out"));
        assert!(cli.debug);
        assert!(cli.is_very_quiet());
        assert!(!cli.is_list());
        assert_eq!(cli.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn source_kinds() {
        let cli = Cli::parse_from(["zipstream", "-l", "https://example.com/a.zip"]);
        assert!(cli.is_http_url());
        assert!(cli.is_list());

        let cli = Cli::parse_from(["zipstream", "-p", "-"]);
        assert!(cli.is_stdin());
        assert!(cli.is_quiet());
    }
}
