use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aipocr::config::Config;
use aipocr::ocr::{ImageSource, ResultSeparator, SigningMode};
use aipocr::registry::ServiceRegistry;
use aipocr::OcrClient;

#[derive(Parser)]
#[command(name = "aipocr")]
#[command(about = "Recognize text in images with the Baidu AIP OCR API")]
struct Args {
    /// Image paths or http:// links
    #[arg(required = true)]
    images: Vec<String>,

    /// Service type, e.g. GENERAL_BASIC, ACCURATE, IDCARD
    #[arg(short = 't', long)]
    service_type: Option<String>,

    /// Region spec "x1,y1,x2,y2[;x1,y1,x2,y2...]"
    #[arg(short, long)]
    region: Option<String>,

    /// Print one recognized line per output line
    #[arg(long)]
    by_row: bool,

    /// per_request or cached
    #[arg(long)]
    signing: Option<SigningMode>,

    /// Print the raw JSON reply instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aipocr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();
    if let Some(service_type) = args.service_type {
        config.ocr.service_type = service_type;
    }
    if args.region.is_some() {
        config.ocr.region = args.region;
    }
    if args.by_row {
        config.ocr.separator = ResultSeparator::ByRow;
    }
    if let Some(signing) = args.signing {
        config.ocr.signing = signing;
    }

    tracing::info!("Building service registry...");
    let registry = Arc::new(ServiceRegistry::from_config(&config.ocr));
    let mut client = OcrClient::connect(&config, registry).await?;

    let mut failures = 0;
    for image in &args.images {
        let result = match ImageSource::parse(image) {
            Ok(source) if args.json => client
                .recognize_json(&source)
                .await
                .map(|v| serde_json::to_string_pretty(&v).unwrap_or_default()),
            Ok(source) => client.recognize_source(&source).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                if args.images.len() > 1 {
                    println!("==> {image} <==");
                }
                println!("{text}");
            }
            Err(e) => {
                failures += 1;
                tracing::error!("{}: {}", image, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} images failed", args.images.len());
    }
    Ok(())
}
