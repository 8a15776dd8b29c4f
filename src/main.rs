//! Main entry point for the zipstream CLI application.
//!
//! This binary reads a ZIP archive front to back from a local file, stdin,
//! or an HTTP URL, and lists or extracts entries while the data arrives.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::path::{Path, PathBuf};

use zipstream::output::{format_size, EntryFilter, ExtractHandler, ListHandler, Target};
use zipstream::{ChunkSource, Cli, HttpStreamSource, ReaderSource, StreamExtractor, UnzipOptions};

/// Application entry point.
///
/// Parses command-line arguments and dispatches on the kind of source.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_module("zipstream", LevelFilter::Debug);
    }
    logger.init();

    let options = UnzipOptions::new()
        .debug(cli.debug)
        .drain_all(cli.is_list());

    if cli.is_http_url() {
        let source = HttpStreamSource::new(&cli.file).await?;
        let mut extractor = StreamExtractor::new(source, options);
        process_zip(&mut extractor, &cli).await?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            let source = extractor.source();
            let transferred = format_size(source.transferred_bytes());
            match source.content_length() {
                Some(total) => eprintln!(
                    "\nTotal bytes transferred: {} of {}",
                    transferred,
                    format_size(total)
                ),
                None => eprintln!("\nTotal bytes transferred: {}", transferred),
            }
        }
    } else if cli.is_stdin() {
        let source = ReaderSource::stdin().with_chunk_size(cli.chunk_size);
        process_zip(&mut StreamExtractor::new(source, options), &cli).await?;
    } else {
        let source = ReaderSource::open(Path::new(&cli.file))
            .await?
            .with_chunk_size(cli.chunk_size);
        process_zip(&mut StreamExtractor::new(source, options), &cli).await?;
    }

    Ok(())
}

/// Process a ZIP stream based on CLI options.
///
/// - List mode (`-l` or `-v`): Display entries as their headers arrive
/// - Pipe mode (`-p`): Write selected entries to stdout
/// - Extract mode: Write selected entries below `-d` or the current directory
async fn process_zip<S: ChunkSource>(extractor: &mut StreamExtractor<S>, cli: &Cli) -> Result<()> {
    if cli.is_list() {
        let mut handler = ListHandler::new(tokio::io::stdout(), cli.verbose);
        handler.header().await?;
        extractor.run(&mut handler).await?;
        return handler.footer().await;
    }

    let filter = EntryFilter::from_cli(cli);
    let target = if cli.pipe {
        Target::Pipe(tokio::io::stdout())
    } else {
        Target::Dir {
            root: cli
                .extract_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_default(),
            junk_paths: cli.junk_paths,
            never_overwrite: cli.never_overwrite,
            overwrite: cli.overwrite,
        }
    };

    let mut handler = ExtractHandler::new(target, filter, cli.is_quiet());
    extractor.run(&mut handler).await?;

    if !cli.is_very_quiet() && !cli.pipe {
        eprintln!(
            "{} of {} entries extracted",
            handler.extracted(),
            extractor.entries()
        );
    }
    Ok(())
}
