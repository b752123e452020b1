//! spread-view
//!
//! Opens a local EPUB through the headless engine and prints the spreads a
//! reader would see.

use anyhow::{bail, Result};
use clap::Parser;
use futures::executor::block_on;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epub_spread_viewer::{
    ArchiveEngine, Location, PathSource, ReaderConfig, ReaderSession, SelectedFile, TextDirection,
    Viewport,
};

#[derive(Parser, Debug)]
#[command(version, about = "Validate an EPUB and page through it in spreads")]
struct Cli {
    file: PathBuf,

    /// Number of forward page turns after the first spread
    #[arg(long, default_value_t = 3)]
    spreads: usize,

    /// Viewport width in pixels; below minSpreadWidth pages show singly
    #[arg(long, default_value_t = 1200)]
    width: u32,

    /// Right-to-left text direction
    #[arg(long)]
    rtl: bool,
}

fn describe(location: &Location) -> String {
    if location.start.index == location.end.index {
        format!("[{}] {}", location.start.index, location.start.href)
    } else {
        format!(
            "[{}-{}] {} | {}",
            location.start.index, location.end.index, location.start.href, location.end.href
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "epub_spread_viewer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = ReaderConfig::from_env()?;
    if cli.rtl {
        config.theme.direction = TextDirection::Rtl;
    }

    let name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file.display().to_string());
    let declared_type = mime_guess::from_path(&cli.file)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let session = ReaderSession::new(ArchiveEngine::new(), config);
    session.select_file(SelectedFile::new(
        name,
        declared_type,
        PathSource::new(&cli.file),
    ));
    println!("{}", session.status_message());

    let result = block_on(session.begin_validation_and_render(&Viewport::new(cli.width)));
    println!("{}", session.status_message());
    if let Err(e) = result {
        session.teardown();
        bail!(e);
    }

    if let Some(location) = session.current_location() {
        println!("{}", describe(&location));
    }
    for _ in 0..cli.spreads {
        let before = session.current_location();
        block_on(session.navigate_next());
        let after = session.current_location();
        if before == after {
            println!("(end of book)");
            break;
        }
        if let Some(location) = after {
            println!("{}", describe(&location));
        }
    }

    session.teardown();
    Ok(())
}
