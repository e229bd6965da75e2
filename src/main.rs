use std::collections::HashSet;

use chrono::DateTime;
use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use nostr_sdk::prelude::*;

use timeline_sync::{
    domain::item::Item,
    infrastructure::{
        cli::Cli,
        config::Config,
        nostr::{page_filter, push_filter, Note, NostrPageFetcher, NostrPushSource},
    },
    integration::runtime::{TimelineHandle, TimelineSnapshot},
    model::timeline::{pagination::Status, Timeline},
    utils::{initialize_logging, initialize_panic_handler},
};

fn print_note(note: &Note) {
    let created_at = i64::try_from(note.created_at().as_u64())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    let author = note.author().to_hex();
    let author = author.get(..8).unwrap_or(&author);
    let content = note.content().replace('\n', " ");

    println!("{created_at}  {author}  {content}");
}

/// Wait for the fetch started after `before` to settle
async fn settle(
    handle: &TimelineHandle<Note>,
    before: &TimelineSnapshot<Note>,
) -> Result<TimelineSnapshot<Note>> {
    handle
        .wait_until(|s| {
            !s.status.is_fetching()
                && (s.cursor != before.cursor || !s.has_more || s.last_error != before.last_error)
        })
        .await
        .ok_or_else(|| eyre!("timeline runtime stopped"))
}

async fn tokio_main() -> Result<()> {
    initialize_logging()?;

    initialize_panic_handler()?;

    let args = <Cli as Parser>::parse();

    let config = Config::new()?;
    let timeline_config = config.timeline.clone();
    let kind = args.kind.unwrap_or(timeline_config.kind);
    let limit = args.limit.unwrap_or(timeline_config.page_size);
    let relays = if args.relays.is_empty() {
        config.relays.clone()
    } else {
        args.relays.clone()
    };
    let authors = args
        .authors
        .iter()
        .map(|author| PublicKey::parse(author).wrap_err_with(|| format!("invalid author {author}")))
        .collect::<Result<Vec<_>>>()?;
    let channel = args
        .channel
        .as_deref()
        .map(|channel| EventId::parse(channel).wrap_err("invalid channel id"))
        .transpose()?;

    let client = Client::default();
    for relay in &relays {
        client
            .add_relay(relay.as_str())
            .await
            .wrap_err_with(|| format!("invalid relay {relay}"))?;
    }
    client.connect().await;
    tracing::info!(?relays, %kind, limit, "Connected to relays");

    let fetcher = NostrPageFetcher::new(client.clone(), page_filter(kind, &authors, channel))
        .timeout(timeline_config.fetch_timeout());
    let source = NostrPushSource::new(client.clone(), push_filter(kind, &authors, channel));
    let timeline = match &args.resume {
        Some(token) => Timeline::resume(kind, limit, token),
        None => Timeline::new(kind, limit),
    };
    let handle = TimelineHandle::spawn(
        timeline,
        fetcher,
        &source,
        timeline_config.runtime_options(),
    );

    handle.load_initial();
    let mut snapshot = handle
        .wait_until(|s| matches!(s.status, Status::Ready | Status::Error))
        .await
        .ok_or_else(|| eyre!("timeline runtime stopped"))?;
    if let Some(error) = &snapshot.last_error {
        return Err(eyre!("failed to load timeline: {error}"));
    }

    for _ in 0..args.pages {
        if !snapshot.has_more {
            break;
        }
        let before = snapshot;
        handle.load_more();
        snapshot = settle(&handle, &before).await?;
        if let Some(error) = &snapshot.last_error {
            eprintln!("Failed to load older notes: {error}");
            break;
        }
    }

    let mut printed: HashSet<String> = HashSet::new();
    for note in &snapshot.items {
        print_note(note);
        printed.insert(note.id().to_owned());
    }

    if !args.no_follow {
        println!("-- following live notes, press Ctrl-C to stop --");
        let mut updates = handle.subscribe();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    for note in &snapshot.items {
                        if printed.insert(note.id().to_owned()) {
                            print_note(note);
                        }
                    }
                }
            }
        }
    }

    if let Some(token) = handle.snapshot().cursor {
        println!("Resume with: --resume {token}");
    }

    handle.shutdown().await;
    client.disconnect().await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = tokio_main().await {
        eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
        Err(e)
    } else {
        Ok(())
    }
}
