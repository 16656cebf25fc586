use clap::Parser;
use kenya_ai_pulse::{Credentials, Harvest, Platform, PulseError, RunSummary, visualize};
use std::path::PathBuf;
use std::process::ExitCode;

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging, defaulting to info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Secrets may live in a local .env file
    if let Err(e) = dotenvy::dotenv() {
        ::log::debug!("No .env file loaded: {}", e);
    }

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    let outcome = match args.command {
        Command::Visualize(ref visualize_args) => {
            let dir = args
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("visuals"));
            visualize(visualize_args.input.as_deref(), &dir).map(|report| {
                ::log::info!(
                    "Rendered {} files into {}; top terms: {:?}",
                    report.files.len(),
                    dir.display(),
                    report.top_keywords.iter().take(5).collect::<Vec<_>>()
                );
            })
        }
        _ => collect(&args).await.map(|summary| report(&summary)),
    };

    match outcome {
        Ok(()) => {
            ::log::info!(
                "Finished in {:.2} seconds",
                start_time.elapsed().as_secs_f64()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build the harvest for the chosen platform and run it
async fn collect(args: &Args) -> Result<RunSummary, PulseError> {
    let platform = match args.command {
        Command::Linkedin(_) => Platform::LinkedIn,
        _ => Platform::Twitter,
    };

    let mut harvest = Harvest::new(platform).with_credentials(Credentials::from_env());
    if let Some(path) = &args.config {
        harvest = harvest.with_config_file(path)?;
    }
    if let Some(dir) = &args.output_dir {
        harvest = harvest.with_output_dir(dir.clone());
    }

    match &args.command {
        Command::Linkedin(linkedin) => {
            println!("Note: LinkedIn scraping requires a WebDriver server (e.g., ChromeDriver).");
            if let Some(url) = &linkedin.webdriver_url {
                harvest = harvest.with_webdriver_url(url.clone());
            }
            if let Some(limit) = linkedin.limit {
                harvest = harvest.with_limit(limit);
            }
            if let Some(scrolls) = linkedin.scrolls {
                harvest = harvest.with_scroll_count(scrolls);
            }
            if linkedin.no_pacing {
                harvest = harvest.without_pacing();
            }
        }
        Command::Twitter(twitter) => {
            if let Some(limit) = twitter.limit {
                harvest = harvest.with_limit(limit);
            }
            if let Some(max_results) = twitter.max_results {
                harvest = harvest.with_max_results(max_results);
            }
            if twitter.filter {
                harvest = harvest.with_search_filter(true);
            }
        }
        Command::Visualize(_) => {}
    }

    harvest.run().await
}

fn report(summary: &RunSummary) {
    match &summary.persisted {
        Some(run) => ::log::info!(
            "{}: {} posts from {} sources, {} unique saved to {}",
            summary.platform,
            summary.collected,
            summary.sources,
            run.unique_count,
            run.table_path.display()
        ),
        None => ::log::warn!(
            "{}: no data saved ({} posts from {} sources)",
            summary.platform,
            summary.collected,
            summary.sources
        ),
    }
}
