mod cli;

use clap::Parser;
use cli::{CleanupArgs, Cli, Commands, GenerateArgs};
use manualgen::api;
use manualgen::config::Config;
use manualgen::http::HttpClient;
use manualgen::manual::{DocumentRenderer, GenerationOptions, HtmlDocumentRenderer, embed_images};
use manualgen::session::{ApiClient, Session, VideoAsset};
use tracing::info;
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("manualgen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let config = Config::load()?;
            let address = args.address.unwrap_or(config.server.bind_addr);
            api::run(config, address).await?
        }
        Commands::Generate(args) => generate(args).await?,
        Commands::Cleanup(args) => cleanup(args).await?,
        Commands::Config => {
            let config = Config::load()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

async fn generate(args: GenerateArgs) -> Result<(), AnyError> {
    let config = Config::load_for_client()?;
    let language = args.language;
    let client = ApiClient::new(&args.server, &config.http)?;
    let video = VideoAsset::from_path(&args.file).await?;

    let mut session = Session::new(config.limits.clone(), true);
    session.set_consent(args.consent);
    session.set_options(GenerationOptions {
        language,
        detail_level: args.detail_level,
    });
    session.select_file(video).map_err(|e| e.message(language))?;

    let mut progress = session.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let status = progress.borrow_and_update().clone();
            info!(stage = ?status.stage, progress = status.progress, "{}", status.message);
        }
    });

    let outcome = session
        .generate(&client, &client)
        .await
        .map(|manual| manual.title.clone())
        .map_err(|e| e.message(language));
    reporter.abort();
    let title = outcome?;
    info!(%title, "Manual generated");

    tokio::fs::create_dir_all(&args.out_dir).await?;

    if args.format.markdown() {
        let export = session.download_markdown()?;
        let path = args.out_dir.join(&export.file_name);
        tokio::fs::write(&path, &export.bytes).await?;
        println!("{}", path.display());
    }

    if args.format.html() {
        let document = if args.embed_images {
            let http = HttpClient::new(&config.http)?;
            let manual = session.manual().ok_or("no manual was generated")?;
            HtmlDocumentRenderer.render(&embed_images(manual, &http).await)?
        } else {
            session.render_document(&HtmlDocumentRenderer)?
        };
        let path = args.out_dir.join(&document.file_name);
        tokio::fs::write(&path, &document.bytes).await?;
        println!("{}", path.display());
    }

    Ok(())
}

async fn cleanup(args: CleanupArgs) -> Result<(), AnyError> {
    let config = Config::load_for_client()?;
    let secret = config
        .cleanup
        .secret
        .as_deref()
        .ok_or("CLEANUP_SECRET environment variable is not set")?;

    let client = ApiClient::new(&args.server, &config.http)?;
    let response = client.cleanup(secret).await?;

    info!(message = %response.report.message, "Cleanup finished");
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
