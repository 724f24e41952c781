//! Interactive reconstruction client
//!
//! Checks the server, then keeps asking for video paths until `exit`.

use anyhow::Context;
use clap::{ArgAction, Parser};
use drone_locate_reconstruct::{ClientConfig, GlbParams, ReconstructError, ReconstructionClient};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "drone-locate-reconstruct")]
#[command(about = "Upload drone videos to a 3D reconstruction server", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the reconstruction server
    #[arg(long, env = "RECONSTRUCT_SERVER_URL")]
    server_url: String,

    /// Directory reconstructed models are saved to
    #[arg(long, env = "RECONSTRUCT_OUTPUT_DIR", default_value = "reconstructions")]
    output_dir: PathBuf,

    /// Seconds to wait for one reconstruction
    #[arg(long, env = "RECONSTRUCT_TIMEOUT_SECS", default_value_t = 600)]
    timeout_secs: u64,

    /// Confidence threshold for kept points
    #[arg(long, default_value_t = 3.0)]
    conf_thres: f64,

    #[arg(long, default_value = "All")]
    frame_filter: String,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    mask_black_bg: bool,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    mask_white_bg: bool,

    /// Draw camera positions in the model
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    show_cam: bool,

    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    mask_sky: bool,

    #[arg(long, default_value = "Depthmap and Camera Branch")]
    prediction_mode: String,

    /// Videos to reconstruct; prompts interactively when none are given
    videos: Vec<PathBuf>,
}

impl Cli {
    fn params(&self) -> GlbParams {
        GlbParams {
            conf_thres: self.conf_thres,
            frame_filter: self.frame_filter.clone(),
            mask_black_bg: self.mask_black_bg,
            mask_white_bg: self.mask_white_bg,
            show_cam: self.show_cam,
            mask_sky: self.mask_sky,
            prediction_mode: self.prediction_mode.clone(),
        }
    }
}

async fn run_one(client: &ReconstructionClient, video: &Path) {
    match client.reconstruct(video).await {
        Ok(path) => println!("3D model saved to: {}", path.display()),
        Err(ReconstructError::Connection(url)) => {
            error!("Could not connect to the server at {}", url);
            eprintln!("Please ensure the server is running and the URL is correct.");
        }
        Err(ReconstructError::Timeout) => {
            error!("Request timed out: the server took too long to respond");
        }
        Err(e @ ReconstructError::HttpStatus { .. }) => error!("{}", e),
        Err(e) => error!("Reconstruction failed: {}", e),
    }
}

async fn prompt_loop(client: &ReconstructionClient) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Enter the full path to your local video file (or type 'exit' to quit): ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        let video = Path::new(input);
        if video.is_file() {
            run_one(client, video).await;
        } else {
            warn!("File not found: '{}'", input);
            println!("File not found: '{input}'. Please enter a valid path.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drone_locate_reconstruct=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::new(&cli.server_url, &cli.output_dir);
    config.timeout = Duration::from_secs(cli.timeout_secs);

    let client =
        ReconstructionClient::new(config, cli.params()).context("Failed to build HTTP client")?;

    if let Err(e) = client.health_check().await {
        error!("Server health check failed: {}", e);
        anyhow::bail!("Cannot proceed without a healthy server at {}", cli.server_url);
    }

    if cli.videos.is_empty() {
        prompt_loop(&client).await?;
    } else {
        for video in &cli.videos {
            run_one(&client, video).await;
        }
    }

    info!("Client finished");
    Ok(())
}
