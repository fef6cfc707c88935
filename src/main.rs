use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytt::{output, utils, Cli, Commands, Config, TranscriptPipeline, VideoId};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "ytt=debug" } else { "ytt=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Get {
            videos,
            language,
            output,
            format,
            timestamps,
        } => {
            if output.is_some() && videos.len() > 1 {
                anyhow::bail!("--output supports a single video; pass one video or drop the flag");
            }

            let pipeline = TranscriptPipeline::new(&config)?;
            let ids = videos
                .iter()
                .map(|input| parse_video(input))
                .collect::<Result<Vec<_>>>()?;

            let spinner = if cli.quiet {
                ProgressBar::hidden()
            } else {
                ProgressBar::new_spinner()
            };
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap(),
            );
            spinner.set_message(format!("Retrieving {} transcript(s)...", ids.len()));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let fetches = ids.iter().map(|id| pipeline.get_transcript(id, &language));
            let results = futures_util::future::join_all(fetches).await;
            spinner.finish_and_clear();

            let mut failures = 0;
            for (id, result) in ids.iter().zip(results) {
                match result {
                    Ok(transcript) => match &output {
                        Some(path) => {
                            output::save_to_file(&transcript, path, format, timestamps).await?;
                            println!("Transcript saved to: {}", path.display());
                        }
                        None => {
                            if ids.len() > 1 {
                                println!("{}", style(format!("=== {id} ===")).bold());
                            }
                            output::print_to_console(&transcript, format, timestamps)?;
                        }
                    },
                    Err(err) => {
                        failures += 1;
                        eprintln!("{} {id}: {err}", style("error:").red().bold());
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{failures} of {} transcript(s) failed", ids.len());
            }
        }
        Commands::Tracks { video } => {
            let pipeline = TranscriptPipeline::new(&config)?;
            let id = parse_video(&video)?;
            let catalog = pipeline.list_tracks(&id).await?;

            if catalog.is_empty() {
                println!("No caption tracks for {id}");
            } else {
                println!("Caption tracks for {id}:");
                for track in &catalog.tracks {
                    println!(
                        "  {:<10} {:<16} {}",
                        style(&track.language).cyan().bold(),
                        style(track.kind.as_str()).dim(),
                        track.name
                    );
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written to: {}", Config::path()?.display());
            }
        }
    }

    Ok(())
}

/// Turn a CLI video argument (bare id or URL) into a validated id
fn parse_video(input: &str) -> Result<VideoId> {
    let id = utils::extract_video_id(input)
        .ok_or_else(|| anyhow::anyhow!("could not find a YouTube video id in '{input}'"))?;
    Ok(VideoId::parse(&id)?)
}
