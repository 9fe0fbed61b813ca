use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use pulsedeck::library::{MediaScanner, TrackStore};

#[derive(Parser)]
#[command(name = "pulsedeck-library")]
#[command(about = "Maintain the local track table")]
struct Args {
    /// Track table file
    #[arg(long, default_value = "library.json")]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a music directory and sync the track table with it
    Scan {
        /// Root of the music directory
        dir: String,
    },
    /// Print every stored track
    List,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut store = TrackStore::open(&args.db)?;

    match args.command {
        Command::Scan { dir } => {
            let scanned = MediaScanner::new().scan(&dir)?;
            if store.sync(scanned)? {
                info!("Track table replaced: {} tracks", store.len());
            } else {
                info!("Track table unchanged: {} tracks", store.len());
            }
        }
        Command::List => {
            for track in store.tracks() {
                let seconds = track.duration_ms / 1000;
                println!(
                    "{}  {} - {} [{}] {}:{:02}  {}",
                    track.id,
                    track.artist,
                    track.title,
                    track.album,
                    seconds / 60,
                    seconds % 60,
                    track.path.display()
                );
            }
            info!("{} tracks", store.len());
        }
    }

    Ok(())
}
