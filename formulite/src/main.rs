use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formulite::config::{Config, LogFormat};
use formulite::crypto::{CredentialCipher, KeyStore};
use formulite::export::{render_html, render_mathml, wrap_latex, LatexWrapper, PreviewTheme};
use formulite::recognition::{
    Credentials, ImageSource, ProviderKind, RecognitionClient, RecognitionReport,
};
use formulite::settings::SettingsStore;

const MISSING_CREDENTIALS: &str = "Please fill in a valid API ID and key in the settings.";
const RECOGNITION_FAILED: &str = "Recognition failed, please check network and API settings.";

#[derive(Parser)]
#[command(name = "formulite")]
#[command(about = "Recognize math formulas in images and convert them to LaTeX")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize the formula in an image file (`-` reads the image from stdin)
    Recognize {
        image: PathBuf,
        /// Service to use instead of the stored one (SimpleTex, TencentCloud, Aliyun)
        #[arg(long)]
        service: Option<ProviderKind>,
        /// API ID to use instead of the stored one
        #[arg(long, requires = "key")]
        id: Option<String>,
        /// API key to use instead of the stored one
        #[arg(long, requires = "id")]
        key: Option<String>,
    },
    /// Store the API service and credentials (the key is encrypted at rest)
    Configure {
        #[arg(long)]
        service: ProviderKind,
        #[arg(long)]
        id: String,
        #[arg(long)]
        key: String,
    },
    /// Wrap LaTeX in delimiters or render it as HTML or MathML
    Export {
        latex: String,
        #[arg(long, default_value_t = LatexWrapper::Display)]
        wrapper: LatexWrapper,
        /// Emit a MathJax HTML page instead of wrapped LaTeX
        #[arg(long, conflicts_with = "mathml")]
        html: bool,
        /// Emit MathML instead of wrapped LaTeX
        #[arg(long)]
        mathml: bool,
        /// Use the dark preview theme
        #[arg(long, requires = "html")]
        dark: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(config.logging.format);

    let store = SettingsStore::new(&config.storage.settings_path);
    let cipher = CredentialCipher::new(KeyStore::new(&config.storage.key_path));

    match args.command {
        Command::Recognize {
            image,
            service,
            id,
            key,
        } => {
            let settings = store.load()?;
            let kind = service.unwrap_or(settings.api.service);
            let credentials = match (id, key) {
                (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => {
                    Some(Credentials::new(id, key))
                }
                (Some(_), Some(_)) => None,
                _ => settings.credentials(&cipher),
            };

            let Some(credentials) = credentials else {
                eprintln!("{MISSING_CREDENTIALS}");
                return Ok(ExitCode::FAILURE);
            };

            let image = if image.as_os_str() == "-" {
                ImageSource::from_reader(tokio::io::stdin()).await?
            } else {
                ImageSource::Path(image)
            };

            let client = RecognitionClient::new(kind, &credentials, &config.recognition)?;
            let report = client.spawn_recognize(image).await?;

            match report {
                RecognitionReport::Recognized { lines } => {
                    for line in lines {
                        println!("{}", line.latex);
                    }
                }
                RecognitionReport::Failed { message } => {
                    tracing::warn!("Recognition failed: {}", message);
                    eprintln!("{RECOGNITION_FAILED}");
                    eprintln!("{message}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Configure { service, id, key } => {
            let mut settings = store.load()?;
            settings.set_credentials(&cipher, service, &id, &key)?;
            store.save(&settings)?;
            tracing::info!(
                service = %service,
                path = %store.path().display(),
                "API settings saved"
            );
        }
        Command::Export {
            latex,
            wrapper,
            html,
            mathml,
            dark,
        } => {
            let output = if html {
                let theme = if dark {
                    PreviewTheme::Dark
                } else {
                    PreviewTheme::Light
                };
                render_html(&latex, theme)?
            } else if mathml {
                render_mathml(&latex)?
            } else {
                wrap_latex(&latex, wrapper)?
            };
            println!("{output}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "formulite=info".into());

    // Logs go to stderr so stdout stays clean for exported output.
    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
