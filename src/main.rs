use anyhow::{Context, Result};
use radiodeck::config::AppConfig;
use radiodeck::mpv::MpvBackend;
use radiodeck::storage::TomlFileStore;
use radiodeck::{App, Station, TrendingCategory};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  country <name>      list stations of a country
  search <text>       search stations by name
  tag <tag>           list stations by tag
  trending <votes|clicks|recent>
  home <country>      featured / popular / recent rails and genres
  play <n>            play entry n of the last list
  fav <n>             toggle favorite for entry n of the last list
  favs                list favorites (and make them the current list)
  pause               toggle play/pause
  stop                stop playback
  volume <0.0-1.0>    set volume
  status              show playback state
  news                fetch news
  quit";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;
    let storage = Arc::new(TomlFileStore::open(config.storage_path()?)?);
    let backend = Arc::new(MpvBackend::new(
        config.player.mpv_binary.clone(),
        config.socket_dir(),
    ));
    let app = App::new(config, backend, storage)?;

    println!("{HELP}");
    let mut listing: Vec<Station> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Read stdin")? {
        let line = line.trim();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();
        match cmd {
            "" => {}
            "country" => show(&mut listing, app.directory.by_country(arg).await),
            "search" => show(&mut listing, app.directory.search(arg).await),
            "tag" => show(&mut listing, app.directory.by_tag(arg).await),
            "trending" => match arg.parse::<TrendingCategory>() {
                Ok(category) => show(&mut listing, app.directory.trending(category).await),
                Err(e) => println!("{e}"),
            },
            "home" => {
                let feed = app.home_feed(arg).await;
                println!("genres: {}", feed.genres.join(", "));
                for (title, rail) in [
                    ("featured", &feed.featured),
                    ("popular", &feed.popular),
                    ("recent", &feed.recent),
                ] {
                    println!("-- {title}");
                    for s in rail {
                        println!("   {} ({} votes, {} clicks)", s.name.trim(), s.votes, s.clickcount);
                    }
                }
            }
            "play" => match pick(&listing, arg) {
                Some(s) => app.player.select_station(s).await,
                None => println!("no such entry"),
            },
            "fav" => match pick(&listing, arg) {
                Some(s) => {
                    let name = s.name.clone();
                    let now = app.favorites.toggle(s);
                    println!("{} {}", if now { "added" } else { "removed" }, name.trim());
                }
                None => println!("no such entry"),
            },
            "favs" => show(&mut listing, app.favorites.list()),
            "pause" => app.player.toggle_play_pause().await,
            "stop" => app.player.stop().await,
            "volume" => match arg.parse::<f32>() {
                Ok(v) => app.set_volume(v).await,
                Err(_) => println!("volume must be a number between 0 and 1"),
            },
            "status" => {
                let state = app.player.state();
                println!(
                    "{:?} {} volume={:.2} buffering={}",
                    state.phase,
                    state.label_text(),
                    state.volume,
                    state.is_buffering
                );
            }
            "news" => {
                let items = app.news.fetch_news().await;
                if items.is_empty() {
                    println!("no news");
                }
                for item in items {
                    println!("[{}] {} - {}", item.source, item.title, item.url);
                }
            }
            "quit" | "exit" => break,
            _ => println!("{HELP}"),
        }
    }

    app.shutdown().await;
    Ok(())
}

fn show(listing: &mut Vec<Station>, stations: Vec<Station>) {
    if stations.is_empty() {
        println!("no stations found");
    }
    for (i, s) in stations.iter().enumerate() {
        let tags = s.tag_list().join(", ");
        println!("{i:>3}  {}  [{} {}kbps] {}", s.name.trim(), s.codec, s.bitrate, tags);
    }
    *listing = stations;
}

fn pick(listing: &[Station], arg: &str) -> Option<Station> {
    match arg.parse::<usize>() {
        Ok(i) => listing.get(i).cloned(),
        Err(e) => {
            warn!(arg, error = %e, "invalid list index");
            None
        }
    }
}
