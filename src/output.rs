//! Entry consumers used by the command line tool.
//!
//! The parser only announces entries and their bytes; these handlers decide
//! what happens to them: print a listing, write them below a directory, or
//! copy them to a pipe.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cli::Cli;
use crate::zip::{Entry, EntryHandler, UnzipError};

/// Selection of entries by name.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    files: Vec<String>,
    exclude: Vec<String>,
}

impl EntryFilter {
    pub fn new(files: Vec<String>, exclude: Vec<String>) -> Self {
        Self { files, exclude }
    }

    pub fn from_cli(cli: &Cli) -> Self {
        Self::new(cli.files.clone(), cli.exclude.clone())
    }

    pub fn matches(&self, path: &str) -> bool {
        // If specific files are requested via positional arguments,
        // only include entries that match
        if !self.files.is_empty() {
            let matches = self.files.iter().any(|f| {
                if has_glob_chars(f) {
                    glob_match(f, path)
                } else {
                    // No wildcards: exact match on filename or full path
                    let basename = Path::new(path)
                        .file_name()
                        .map(|s| s.to_string_lossy())
                        .unwrap_or_default();
                    path == f.as_str() || basename == f.as_str()
                }
            });
            if !matches {
                return false;
            }
        }

        // Exclude files matching the -x patterns
        !self
            .exclude
            .iter()
            .any(|x| path.contains(x.as_str()) || glob_match(x, path))
    }
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Star matches zero or more characters
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}

/// Format a byte size into a human-readable string.
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

fn format_optional(size: Option<u64>) -> String {
    size.map_or_else(|| "?".to_string(), |s| s.to_string())
}

/// Prints one line per entry as local headers go by.
///
/// Sizes deferred to a data descriptor are unknown at that point and shown
/// as `?`.
pub struct ListHandler<W> {
    out: W,
    verbose: bool,
    total_uncompressed: u64,
    total_compressed: u64,
    file_count: usize,
}

impl<W: AsyncWrite + Unpin + Send> ListHandler<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            total_uncompressed: 0,
            total_compressed: 0,
            file_count: 0,
        }
    }

    pub async fn header(&mut self) -> Result<()> {
        if self.verbose {
            let line = format!(
                "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name\n{}\n",
                "Length",
                "Size",
                "Cmpr",
                "Date",
                "Time",
                "-".repeat(70)
            );
            self.out.write_all(line.as_bytes()).await?;
        }
        Ok(())
    }

    /// Print the summary line in verbose mode
    pub async fn footer(&mut self) -> Result<()> {
        if self.verbose {
            let total_ratio = if self.total_uncompressed > 0 {
                format!(
                    "{:>4}%",
                    100 - (self.total_compressed * 100 / self.total_uncompressed) as i64
                )
            } else {
                "  0%".to_string()
            };
            let line = format!(
                "{}\n{:>10}  {:>10}  {}  {:>21}  {} files\n",
                "-".repeat(70),
                self.total_uncompressed,
                self.total_compressed,
                total_ratio,
                "",
                self.file_count
            );
            self.out.write_all(line.as_bytes()).await?;
        }
        self.out.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EntryHandler for ListHandler<W> {
    async fn on_entry(&mut self, entry: &Entry) -> Result<()> {
        let line = if self.verbose {
            let (year, month, day) = entry.mod_date();
            let (hour, minute, _second) = entry.mod_time();

            // Compression ratio as percentage saved
            let ratio = match (entry.size, entry.compressed_size) {
                (Some(size), Some(compressed)) if size > 0 => {
                    format!("{:>4}%", 100 - (compressed * 100 / size) as i64)
                }
                _ => "  0%".to_string(),
            };

            if !entry.is_directory() {
                self.total_uncompressed += entry.size.unwrap_or(0);
                self.total_compressed += entry.compressed_size.unwrap_or(0);
                self.file_count += 1;
            }

            format!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}{}\n",
                format_optional(entry.size),
                format_optional(entry.compressed_size),
                ratio,
                year,
                month,
                day,
                hour,
                minute,
                entry.path,
                if entry.skip { "  (skipped)" } else { "" }
            )
        } else {
            format!("{}\n", entry.path)
        };
        self.out.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn on_data(&mut self, _index: usize, _data: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn on_end(&mut self, _index: usize) -> Result<()> {
        Ok(())
    }

    async fn on_entry_error(&mut self, _index: usize, _error: &UnzipError) -> Result<()> {
        Ok(())
    }
}

/// Resolve an entry path to a relative path that stays below the root.
///
/// Returns `None` when any component would climb out of the root or make
/// the path absolute, or when nothing but `.` remains.
pub fn enclosed_path(entry_path: &str) -> Option<PathBuf> {
    let normalized = entry_path.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

/// Where extracted entries go.
pub enum Target<W> {
    /// Write files below a directory
    Dir {
        root: PathBuf,
        junk_paths: bool,
        never_overwrite: bool,
        overwrite: bool,
    },
    /// Concatenate file contents into one writer
    Pipe(W),
}

/// What to do with the entry being announced, decided before any I/O.
enum Plan {
    Ignore,
    Pipe,
    CreateDir(PathBuf),
    File {
        path: PathBuf,
        never_overwrite: bool,
        overwrite: bool,
    },
}

enum Current {
    File(fs::File),
    Pipe,
    Ignore,
}

/// Writes selected entries to their target while the archive streams in.
pub struct ExtractHandler<W> {
    target: Target<W>,
    filter: EntryFilter,
    quiet: bool,
    current: Current,
    extracted: usize,
}

impl<W: AsyncWrite + Unpin + Send> ExtractHandler<W> {
    pub fn new(target: Target<W>, filter: EntryFilter, quiet: bool) -> Self {
        Self {
            target,
            filter,
            quiet,
            current: Current::Ignore,
            extracted: 0,
        }
    }

    /// Number of files written so far.
    pub fn extracted(&self) -> usize {
        self.extracted
    }

    pub fn into_target(self) -> Target<W> {
        self.target
    }

    fn plan(&self, entry: &Entry) -> Plan {
        if entry.skip || !self.filter.matches(&entry.path) {
            return Plan::Ignore;
        }
        let Target::Dir {
            root,
            junk_paths,
            never_overwrite,
            overwrite,
        } = &self.target
        else {
            return if entry.is_directory() {
                Plan::Ignore
            } else {
                Plan::Pipe
            };
        };

        let Some(relative) = enclosed_path(&entry.path) else {
            if !self.quiet {
                eprintln!("Skipping: {} (path leaves the target directory)", entry.path);
            }
            return Plan::Ignore;
        };

        if entry.is_directory() {
            return if *junk_paths {
                Plan::Ignore
            } else {
                Plan::CreateDir(root.join(relative))
            };
        }

        // Junk paths: use only the base filename, ignore directory structure
        let relative = match relative.file_name() {
            Some(name) if *junk_paths => PathBuf::from(name),
            _ => relative,
        };
        Plan::File {
            path: root.join(relative),
            never_overwrite: *never_overwrite,
            overwrite: *overwrite,
        }
    }
}

async fn open(plan: Plan, entry_path: &str, quiet: bool) -> Result<Current> {
    let (output_path, never_overwrite, overwrite) = match plan {
        Plan::Ignore => return Ok(Current::Ignore),
        Plan::Pipe => return Ok(Current::Pipe),
        Plan::CreateDir(dir) => {
            fs::create_dir_all(dir).await?;
            return Ok(Current::Ignore);
        }
        Plan::File {
            path,
            never_overwrite,
            overwrite,
        } => (path, never_overwrite, overwrite),
    };

    // Handle existing files based on overwrite options
    if fs::try_exists(&output_path).await? {
        if never_overwrite {
            if !quiet {
                eprintln!("Skipping: {} (file exists)", entry_path);
            }
            return Ok(Current::Ignore);
        }
        if !overwrite {
            if !quiet {
                eprintln!("Skipping: {} (use -o to overwrite)", entry_path);
            }
            return Ok(Current::Ignore);
        }
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    if !quiet {
        println!("  extracting: {}", entry_path);
    }
    Ok(Current::File(fs::File::create(&output_path).await?))
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EntryHandler for ExtractHandler<W> {
    async fn on_entry(&mut self, entry: &Entry) -> Result<()> {
        let plan = self.plan(entry);
        self.current = open(plan, &entry.path, self.quiet).await?;
        Ok(())
    }

    async fn on_data(&mut self, _index: usize, data: &[u8]) -> Result<()> {
        match (&mut self.current, &mut self.target) {
            (Current::File(file), _) => file.write_all(data).await?,
            (Current::Pipe, Target::Pipe(out)) => out.write_all(data).await?,
            _ => {}
        }
        Ok(())
    }

    async fn on_end(&mut self, _index: usize) -> Result<()> {
        match std::mem::replace(&mut self.current, Current::Ignore) {
            Current::File(mut file) => {
                file.flush().await?;
                self.extracted += 1;
            }
            Current::Pipe => {
                if let Target::Pipe(out) = &mut self.target {
                    out.flush().await?;
                }
                self.extracted += 1;
            }
            Current::Ignore => {}
        }
        Ok(())
    }

    async fn on_entry_error(&mut self, index: usize, error: &UnzipError) -> Result<()> {
        if !self.quiet {
            eprintln!("Skipping entry {}: {}", index, error);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob() {
        assert!(glob_match("*.txt", "readme.txt"));
        assert!(glob_match("file?.dat", "file1.dat"));
        assert!(glob_match("dir/*", "dir/a/b"));
        assert!(!glob_match("*.txt", "readme.md"));
    }

    #[test]
    fn filter_by_name_and_exclude() {
        let filter = EntryFilter::new(vec!["b.txt".into(), "*.md".into()], vec!["skip".into()]);
        assert!(filter.matches("dir/b.txt"));
        assert!(filter.matches("b.txt"));
        assert!(filter.matches("notes.md"));
        assert!(!filter.matches("a.txt"));
        assert!(!filter.matches("skip/notes.md"));

        let all = EntryFilter::default();
        assert!(all.matches("anything"));
    }

    #[test]
    fn enclosed_paths() {
        assert_eq!(enclosed_path("dir/a.txt"), Some(PathBuf::from("dir/a.txt")));
        assert_eq!(enclosed_path("./dir/./a.txt"), Some(PathBuf::from("dir/a.txt")));
        assert_eq!(enclosed_path("dir\\a.txt"), Some(PathBuf::from("dir/a.txt")));
        assert_eq!(enclosed_path("a/../../escaped.txt"), None);
        assert_eq!(enclosed_path("a\\..\\b"), None);
        assert_eq!(enclosed_path("/etc/passwd"), None);
        assert_eq!(enclosed_path("."), None);
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }
}
