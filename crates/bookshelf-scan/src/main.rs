mod render;
mod sources;

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bookshelf_common::{ClientConfig, RecommendationClient, RecommendationSession};

use sources::ScanSource;

/// Upload bookshelf photos and print the recommended books.
///
/// The service location comes from `BOOKSHELF_BASE_URL`; per-phase timeouts
/// from `BOOKSHELF_{CONNECT,READ,WRITE}_TIMEOUT_SECS`.
#[derive(Parser, Debug)]
#[command(name = "bookshelf-scan")]
struct Args {
    /// JPEG photos to upload, in order. `-` reads one photo from stdin.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Where photos read from stdin are staged before upload.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Print each upload result as JSON instead of a book list.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries results; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    sources::validate_images(&args.images)?;

    let client = RecommendationClient::new(ClientConfig::from_env()?)?;
    let config = client.config();
    info!(
        endpoint = %config.endpoint(),
        connect_timeout_ms = config.connect_timeout.as_millis(),
        read_timeout_ms = config.read_timeout.as_millis(),
        write_timeout_ms = config.write_timeout.as_millis(),
        "recommendation client configured"
    );
    let session = RecommendationSession::new(client);

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let line = render::status_line(&updates.borrow_and_update());
            if let Some(line) = line {
                eprintln!("{line}");
            }
        }
    });

    let cache_dir = args
        .cache_dir
        .unwrap_or_else(|| std::env::temp_dir().join("bookshelf-scan"));

    let mut stdin = tokio::io::stdin();
    let mut failed = 0usize;
    for image in &args.images {
        let source = ScanSource::open(image, &cache_dir, &mut stdin).await?;

        let outcome = tokio::select! {
            outcome = session.submit(source.as_image_source()) => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(outcome) = outcome else {
            session.cancel();
            source.finish().await;
            warn!(image = %image.display(), "interrupted, remaining uploads skipped");
            failed += 1;
            break;
        };
        source.finish().await;

        match outcome {
            Some(Ok(books)) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&session.snapshot().result)?);
                } else {
                    print!("{}", render::render_books(&books));
                }
            }
            Some(Err(failure)) => {
                warn!(image = %image.display(), kind = ?failure.kind, "upload failed");
                failed += 1;
            }
            None => {}
        }
    }

    drop(session);
    let _ = printer.await;

    if failed > 0 {
        anyhow::bail!("{failed} of {} upload(s) failed", args.images.len());
    }
    info!(uploads = args.images.len(), "done");
    Ok(())
}
