use eyre::Context;
use std::io::IsTerminal;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use twitch_pack::settings::SettingsStore;
use twitch_pack::{connect_channel, follow_channel_flow, refresh_channel_data};

const USAGE: &str = "usage: twitch-pack-cli [status|videos|follow|update-channel-stats|delete-cache|disconnect]";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .init();

    let action = std::env::args().nth(1).unwrap_or_else(|| "status".to_string());
    let store = SettingsStore::open_default()?;

    match action.as_str() {
        "status" => {
            let client = connect_channel(&store).await?;
            let settings = store.load().await?;
            let channel = settings
                .channel
                .expect("connect_channel leaves a channel snapshot behind");

            println!("channel : {} <{}>", channel.display_name, channel.email.as_deref().unwrap_or("-"));
            println!("url     : {}", channel.url);
            println!("id      : {}", channel.id);
            println!("partner : {}", if channel.partner { "yes" } else { "no" });
            println!("followers: {} ({} from this site)", channel.followers, settings.followers_from_site);
            println!("views   : {}", channel.views);

            let status = client.stream_status().await.context("fetch stream status")?;
            println!("stream  : {status}");
        }
        "videos" => {
            let client = connect_channel(&store).await?;
            println!("== archive ==");
            for video in client.channel_archive().await? {
                println!("{} ({} views) {}", video.title, video.views, video.url);
            }
            println!("== highlights ==");
            for video in client.channel_highlights().await? {
                println!("{} ({} views) {}", video.title, video.views, video.url);
            }
        }
        "follow" => {
            let client = connect_channel(&store).await?;
            let followed = follow_channel_flow(&client, &store).await?;
            println!("followed: {}", if followed { "yes" } else { "no" });
        }
        "update-channel-stats" => {
            let mut client = connect_channel(&store).await?;
            let channel = refresh_channel_data(&mut client, &store, true).await?;
            println!("updated channel stats for {}", channel.display_name);
        }
        "delete-cache" => {
            // The cache is in-memory and lives for this run only; warm it,
            // evict, and fetch again so the eviction is visible.
            let client = connect_channel(&store).await?;
            client.stream_status().await.context("fetch stream status")?;
            client.cache().clear().await;
            let status = client.stream_status().await.context("refetch stream status")?;
            println!("in-memory cache cleared for this run; stream is {status}");
        }
        "disconnect" => {
            let mut settings = store.load().await?;
            settings.disconnect();
            store.save(&settings).await?;
            println!("disconnected from Twitch");
        }
        _ => {
            eprintln!("{USAGE}");
            eyre::bail!("unknown action: {action}");
        }
    }

    Ok(())
}
