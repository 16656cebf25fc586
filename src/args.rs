use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kenya-ai-pulse")]
#[command(about = "Collects AI and technology conversations in Kenya and charts them")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (defaults are used for missing keys)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output directory (snapshots, or rendered files for `visualize`)
    #[arg(short, long, global = true)]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape company pages through a WebDriver browser session
    Linkedin(LinkedinArgs),
    /// Query the recent-search API
    Twitter(TwitterArgs),
    /// Render charts and insights for a conversation table
    Visualize(VisualizeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct LinkedinArgs {
    /// WebDriver server URL (overrides config and WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Only visit the first N companies
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Number of scrolls per company page
    #[arg(long)]
    pub scrolls: Option<usize>,

    /// Skip the human-pacing delays
    #[arg(long)]
    pub no_pacing: bool,
}

#[derive(ClapArgs, Debug)]
pub struct TwitterArgs {
    /// Only run the first N queries
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Results per query (clamped to 10..=100)
    #[arg(long)]
    pub max_results: Option<u32>,

    /// Keep only results that mention a keyword
    #[arg(long)]
    pub filter: bool,
}

#[derive(ClapArgs, Debug)]
pub struct VisualizeArgs {
    /// CSV with text, sentiment, category and engagement_score columns
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}
