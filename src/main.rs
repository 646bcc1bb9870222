use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bizdocs::api::{start_api_server, ApiContext};
use bizdocs::config::{AppConfig, APP_NAME, APP_VERSION};
use bizdocs::db;
use bizdocs::documents::{self, DocumentKind};
use bizdocs::face::{FaceDescriptor, DEFAULT_MATCH_THRESHOLD};
use bizdocs::push::{self, NotificationPayload, PushTransport, VapidSigner, WebPushClient};

#[derive(Parser)]
#[command(name = "bizdocs", version, about, long_about = None)]
struct Cli {
    /// SQLite database holding push subscriptions
    #[arg(long, global = true, env = "BIZDOCS_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API until interrupted
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
    /// Apply pending schema migrations and print the schema version
    Migrate,
    /// Render a document from a JSON record
    Render {
        /// purchase-order, quotation, delivery-challan or invoice
        kind: DocumentKind,
        input: PathBuf,
        /// Output file; defaults to the document number in the output directory
        output: Option<PathBuf>,
    },
    /// Send a notification to every subscriber of a role
    Notify {
        role: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Compare two face descriptors stored as JSON arrays
    FaceDistance {
        a: PathBuf,
        b: PathBuf,
        #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
        threshold: f32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    bizdocs::init_tracing(&config.log_filter);

    match cli.command {
        Command::Serve { bind } => {
            if let Some(addr) = bind {
                config.bind_addr = addr;
            }
            serve(config).await
        }
        Command::Migrate => {
            let conn = db::open_database(&config.database_path)?;
            println!(
                "{}: schema version {}",
                config.database_path.display(),
                db::get_current_version(&conn)
            );
            Ok(())
        }
        Command::Render { kind, input, output } => render(&config, kind, &input, output),
        Command::Notify { role, title, body, url } => {
            let transport = push_transport(&config)?
                .context("VAPID keys are not configured (BIZDOCS_VAPID_*)")?;
            let conn = Mutex::new(db::open_database(&config.database_path)?);
            let mut payload = NotificationPayload::new(title, body);
            if let Some(url) = url {
                payload = payload.with_url(url);
            }
            let report = push::notify_role(&conn, transport.as_ref(), &role, &payload).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::FaceDistance { a, b, threshold } => {
            let a = read_descriptor(&a)?;
            let b = read_descriptor(&b)?;
            let distance = a.distance(&b);
            println!("distance: {distance:.4}");
            println!("same person: {}", distance < threshold);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    tracing::info!("{APP_NAME} starting v{APP_VERSION}");

    let conn = db::open_database(&config.database_path)?;
    let mut ctx = ApiContext::new(conn, config.output_dir.clone());

    match push_transport(&config)? {
        Some(transport) => ctx = ctx.with_transport(transport),
        None => tracing::warn!("VAPID keys not configured, push delivery disabled"),
    }
    ctx = with_face_model(ctx, &config);

    let mut server = start_api_server(ctx, config.bind_addr)
        .await
        .map_err(anyhow::Error::msg)?;
    println!("Listening on http://{}", server.addr);

    tokio::signal::ctrl_c().await?;
    server.shutdown();
    server.wait().await;
    Ok(())
}

fn push_transport(config: &AppConfig) -> Result<Option<Arc<dyn PushTransport>>> {
    let Some(vapid) = &config.vapid else {
        return Ok(None);
    };
    let signer = VapidSigner::load(vapid)?;
    let client: Arc<dyn PushTransport> = Arc::new(WebPushClient::new(
        signer,
        config.push_ttl_secs,
        config.request_timeout,
    )?);
    Ok(Some(client))
}

#[cfg(feature = "onnx-faces")]
fn with_face_model(ctx: ApiContext, config: &AppConfig) -> ApiContext {
    match bizdocs::face::OnnxFaceEmbedder::load(&config.face_model_dir) {
        Ok(embedder) => ctx.with_embedder(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!("Face model not loaded: {e}");
            ctx
        }
    }
}

#[cfg(not(feature = "onnx-faces"))]
fn with_face_model(ctx: ApiContext, _config: &AppConfig) -> ApiContext {
    ctx
}

fn render(config: &AppConfig, kind: DocumentKind, input: &Path, output: Option<PathBuf>) -> Result<()> {
    let json = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let (stem, layout) = kind.layout_from_json(&json)?;
    let bytes = documents::render_pdf(&layout)?;
    let path = output.unwrap_or_else(|| config.output_dir.join(documents::output_file_name(&stem)));
    documents::write_atomically(&path, &bytes)?;
    println!("{kind} written to {}", path.display());
    Ok(())
}

fn read_descriptor(path: &Path) -> Result<FaceDescriptor> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<f32> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
    FaceDescriptor::new(values).with_context(|| format!("{} is not a face descriptor", path.display()))
}
