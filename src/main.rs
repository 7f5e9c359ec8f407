use log::warn;
use prettymd_preview::config::{EnvConfig, RenderOptions};
use prettymd_preview::convert::CmarkConverter;
use prettymd_preview::document::{DocumentSource, EditEvent, EditFeed, FileDocument};
use prettymd_preview::preview::{PreviewError, open_preview};
use prettymd_preview::server::{HttpViewHost, ServerConfig};
use std::env;
use std::error::Error;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args
        .get(1)
        .is_some_and(|arg| arg == "-h" || arg == "--help")
    {
        print_help();
        return Ok(());
    }

    let Some(path) = args.get(1) else {
        return Err(Box::new(PreviewError::MissingDocument) as Box<dyn Error>);
    };
    let document = FileDocument::open(path).map_err(|_| PreviewError::MissingDocument)?;
    let markdown = document.text()?;

    let options = RenderOptions::from_config(&EnvConfig::default());
    let host = HttpViewHost::bind(&ServerConfig::default()).await?;
    let feed = EditFeed::default();

    let title = document
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("markdown"));

    let session = open_preview(
        &markdown,
        document.identity(),
        &options,
        std::sync::Arc::new(CmarkConverter::default()),
        &host,
        &feed,
        &title,
    )?;

    println!("Markdown preview running at: {}", host.url());
    println!("Press Ctrl+C to stop.");

    let poll = tokio::spawn(follow_file(document, feed, content_hash(&markdown)));

    tokio::signal::ctrl_c().await?;
    poll.abort();
    session.close();
    host.stop().await;
    Ok(())
}

/// Edit events come from the editor in the library's intended embedding; the
/// standalone binary approximates them by polling the file for new content.
async fn follow_file(document: FileDocument, feed: EditFeed, mut last_hash: u64) {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let text = match tokio::fs::read_to_string(document.path()).await {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to re-read {}: {err}", document.identity());
                continue;
            }
        };

        let hash = content_hash(&text);
        if hash == last_hash {
            continue;
        }
        last_hash = hash;

        feed.publish(EditEvent {
            identity: document.identity(),
            new_text: text,
        });
    }
}

fn content_hash(input: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    hasher.finish()
}

fn print_help() {
    println!("prettymd-preview [path/to/file.md]");
    println!("Renders the file as styled HTML and live-updates the preview as the file changes.");
    println!();
    println!("Options are read from PRETTYMD_MAX_WIDTH, PRETTYMD_FONT_SIZE,");
    println!("PRETTYMD_FONT_FAMILY, PRETTYMD_THEME (warm|cool|dark|paper) and");
    println!("PRETTYMD_LINE_HEIGHT.");
}
