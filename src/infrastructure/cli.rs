use clap::Parser;

use crate::{domain::order::TimelineKind, utils::version};

#[derive(Parser, Debug)]
#[command(author, version = version(), about)]
pub struct Cli {
    #[arg(short, long, value_name = "KIND", help = "Timeline kind: feed or chat")]
    pub kind: Option<TimelineKind>,

    #[arg(short, long, value_name = "COUNT", help = "Items per page")]
    pub limit: Option<usize>,

    #[arg(
        short,
        long = "relay",
        value_name = "URL",
        help = "Relay to connect to (repeatable, overrides the config)"
    )]
    pub relays: Vec<String>,

    #[arg(
        short,
        long = "author",
        value_name = "PUBKEY",
        help = "Only show notes from this author (npub or hex, repeatable)"
    )]
    pub authors: Vec<String>,

    #[arg(long, value_name = "EVENT_ID", help = "Channel to read in chat mode")]
    pub channel: Option<String>,

    #[arg(
        short,
        long,
        value_name = "COUNT",
        default_value_t = 1,
        help = "Older pages to load after the first one"
    )]
    pub pages: usize,

    #[arg(long, value_name = "TOKEN", help = "Resume from a cursor token")]
    pub resume: Option<String>,

    #[arg(long, help = "Exit after paging instead of following live events")]
    pub no_follow: bool,
}
