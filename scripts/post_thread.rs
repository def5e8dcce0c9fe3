//! Thread Posting Script
//!
//! Reads post bodies from standard input and publishes them as a single post
//! or a thread. Posts are separated by lines containing only `---`.
//!
//! Credentials come from the settings file, falling back to
//! BSKY_IDENTIFIER / BSKY_APP_PASSWORD.
//!
//! ```bash
//! printf 'First post\n---\nSecond post\n' | cargo run --bin post_thread
//! ```

use std::io::{self, Read};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use skythread::{
    Credentials, FileSettingsStore, LogNotifier, PublishError, ServiceConfig, SessionManager,
    SettingsStore, ThreadPublisher, XrpcTransport, MAX_POST_GRAPHEMES,
};

const SEPARATOR: &str = "---";

/// Splits `input` into post bodies on separator lines.
fn split_segments(input: &str) -> Vec<String> {
    let mut segments = vec![String::new()];
    for line in input.lines() {
        if line.trim() == SEPARATOR {
            segments.push(String::new());
            continue;
        }
        if let Some(current) = segments.last_mut() {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    segments
        .into_iter()
        .map(|segment| segment.trim().to_string())
        .collect()
}

fn credentials(
    config: &ServiceConfig,
) -> Result<Credentials, Box<dyn std::error::Error + Send + Sync>> {
    let stored = FileSettingsStore::new(config.settings_path.clone())
        .load()?
        .credentials();
    if stored.is_complete() {
        return Ok(stored);
    }
    Ok(config.env_credentials().unwrap_or(stored))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🦋 Bluesky Thread Posting Tool");
    println!("==============================");

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    let segments = split_segments(&input);

    for (i, segment) in segments.iter().enumerate() {
        println!(
            "📏 Post {}: {} / {} graphemes",
            i + 1,
            skythread::thread::grapheme_len(segment),
            MAX_POST_GRAPHEMES
        );
    }

    let config = ServiceConfig::from_env();
    let transport = Arc::new(XrpcTransport::from_config(&config)?);
    let notifier = Arc::new(LogNotifier);

    let mut sessions = SessionManager::new(transport.clone(), notifier.clone());
    let session = sessions.login(&credentials(&config)?).await?.clone();
    println!("🔑 Logged in as {}", session.handle);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹️  Stopping after the current post...");
            on_ctrl_c.cancel();
        }
    });

    let mut publisher = ThreadPublisher::new(transport, notifier);
    match publisher
        .publish_with_cancel(&segments, &session, &cancel)
        .await
    {
        Ok(report) => {
            println!("\n🎉 Published {} post(s)", report.posts.len());
            for reference in &report.posts {
                println!("  {}", reference.uri);
            }
            Ok(())
        }
        Err(e) => {
            println!("\n💥 {}", e);
            if let PublishError::Submission { .. } | PublishError::Cancelled { .. } = e {
                for reference in e.published() {
                    println!("  already published: {}", reference.uri);
                }
            }
            Err(e.into())
        }
    }
}
