use anyhow::{Context, Result, bail};
use clap::Parser;
use common::cli::{CommonArgs, utils};
use futures::future::join_all;
use twitter_sdk::TwitterClient;
use uuid::Uuid;

/// Post random tweets in concurrent rounds, to have something to erase
#[derive(Parser)]
#[command(name = "tweet-producer")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long, default_value_t = 10, help = "Tweets posted concurrently per round")]
    per_round: usize,

    #[arg(long, help = "Number of rounds (default: until a round fails)")]
    rounds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(&cli.common);

    let config = utils::load_config(cli.common.config.as_ref())?;
    utils::validate_config(&config)?;

    let client = TwitterClient::new(
        &config.api.base_url,
        &config.api.access_token,
        config.api.timeout,
    )
    .context("Failed to build API client")?;

    let mut round = 0;
    while cli.rounds.is_none_or(|rounds| round < rounds) {
        round += 1;
        let failed = post_round(&client, cli.per_round).await;
        if failed > 0 {
            bail!("{failed} of {} posts failed in round {round}", cli.per_round);
        }
    }

    log::info!("Posted {} tweets in {round} rounds", round * cli.per_round as u64);
    Ok(())
}

/// Post `count` random tweets concurrently, returning how many failed.
async fn post_round(client: &TwitterClient, count: usize) -> usize {
    let posts = (0..count).map(|_| {
        let status = Uuid::new_v4().to_string();
        async move {
            match client.post_tweet(&status).await {
                Ok(tweet) => {
                    log::info!("Posted tweet {}: {}", tweet.id, tweet.text);
                    true
                }
                Err(e) => {
                    log::error!("Failed to post tweet {status:?}: {e}");
                    false
                }
            }
        }
    });

    join_all(posts).await.into_iter().filter(|ok| !ok).count()
}
