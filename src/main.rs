use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::json;

use finansle::feed::DataFeed;
use finansle::game::{build_clues, Game, GuessOutcome};
use finansle::logging::{log, obj, v_str, Domain, Level};
use finansle::normalize::{normalize_daily, normalize_roster};
use finansle::roster::Roster;
use finansle::state::{today, Config};
use finansle::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("base_url", v_str(&cfg.data_base_url)), ("date", v_str(&today().to_string()))]),
    );

    let feed = DataFeed::new(&cfg.data_base_url)?;

    // Required documents abort startup on failure; enrichments degrade.
    let daily_raw = feed.fetch_daily().await.context("loading daily answer")?;
    let roster_raw = feed.fetch_roster().await.context("loading roster")?;
    let descriptions = feed.fetch_descriptions().await;
    let sectors = feed.fetch_sector_lookup().await;
    let financials = feed.fetch_financials().await;

    let mut answer = normalize_daily(&daily_raw)?;
    if answer.description.is_empty() {
        if let Some(desc) = descriptions.get(&answer.ticker) {
            answer.description = desc.clone();
        }
    }
    if answer.sector.is_empty() {
        if let Some(info) = sectors.get(&answer.ticker) {
            answer.sector = info.sector.clone();
            answer.industry = info.industry.clone();
        }
    }
    let roster = Roster::new(normalize_roster(&roster_raw)?);
    let clues = build_clues(&answer, financials.get(&answer.ticker));

    let store = Box::new(SqliteStore::open(&cfg.sqlite_path)?);
    let mut game = Game::new(answer, roster, clues, store, today(), cfg.max_attempts);

    println!("Finansle: guess today's company ({} attempts).", cfg.max_attempts);
    println!("Type a name or ticker; end with '?' for suggestions.\n");

    let stdin = std::io::stdin();
    while !game.session.game_over {
        print_clues(&game);
        print!("guess {}/{}> ", game.session.current_attempt, game.session.max_attempts);
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(()); // EOF: session stays resumable later today
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if let Some(fragment) = input.strip_suffix('?') {
            for entry in game.suggestions(fragment, cfg.suggestion_limit) {
                println!("  {} ({})", entry.name, entry.display_ticker);
            }
            continue;
        }

        match game.submit_guess(input) {
            Ok(GuessOutcome::Won { attempt }) => {
                println!("\nCorrect! {} in {} attempt(s).", game.answer.name, attempt);
            }
            Ok(GuessOutcome::Lost) => {
                println!(
                    "\nOut of attempts. The answer was {} ({}).",
                    game.answer.name, game.answer.display_ticker
                );
            }
            Ok(GuessOutcome::Incorrect { next_attempt, .. }) => {
                let last = game.guesses_recent_first().next().expect("guess recorded");
                println!("Wrong: {} ({}). Attempt {} next.", last.name, last.ticker, next_attempt);
            }
            Err(err) => println!("{}", err),
        }
    }

    println!("\n{}", game.share_grid());
    println!(
        "played {} · win rate {}% · streak {} (best {}) · avg attempts {}",
        game.stats.played,
        game.stats.win_rate(),
        game.stats.current_streak,
        game.stats.max_streak,
        game.stats.avg_attempts
    );

    if let Some(endpoint) = cfg.feedback_url.as_deref() {
        if let Ok(message) = std::env::var("FEEDBACK_MESSAGE") {
            let delivered = feed.submit_feedback(endpoint, &message).await.unwrap_or(false);
            log(
                Level::Info,
                Domain::Feed,
                "feedback_submitted",
                obj(&[("delivered", json!(delivered))]),
            );
        }
    }

    Ok(())
}

fn print_clues(game: &Game) {
    println!();
    for clue in game.unlocked_clues() {
        println!("  [{}] {}", clue.title, clue.value);
    }
}
