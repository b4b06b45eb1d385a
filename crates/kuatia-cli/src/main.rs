mod display;
mod setup;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, Subcommand};
use kuatia_core::{format_ruc, verify_ruc};
use kuatia_sync::{ClientConfig, SyncClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kuatia", version, about = "Electronic invoicing setup for the back office")]
struct Cli {
    /// Base URL of the back-office API.
    #[arg(
        long,
        env = "KUATIA_API_URL",
        default_value = "http://localhost:4000",
        global = true
    )]
    api_url: String,

    /// Bearer token for the back-office API.
    #[arg(long, env = "KUATIA_API_TOKEN", hide_env_values = true, global = true)]
    api_token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "KUATIA_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the check digit (DV) of a RUC.
    Dv {
        /// RUC digits without the DV, e.g. 80012345.
        ruc: String,
    },
    /// Verify a RUC written as <digits>-<dv>.
    Verify {
        ruc: String,
    },
    /// Run the fiscal registration wizard from a JSON answers file.
    Setup {
        #[arg(long)]
        answers: PathBuf,

        /// PKCS#12 signing certificate; required for the test and prod environments.
        #[arg(long)]
        certificate: Option<PathBuf>,

        #[arg(long, env = "KUATIA_CERT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the invoicing configuration stored by the backend.
    Show,
}

impl Cli {
    fn client(&self) -> anyhow::Result<SyncClient> {
        let mut config = ClientConfig::new(&self.api_url)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(token) = &self.api_token {
            config = config.with_token(token);
        }
        Ok(SyncClient::new(config)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("kuatia v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Dv { ruc } => match format_ruc(ruc) {
            Some(formatted) => println!("{formatted}"),
            None => bail!("RUC {ruc:?} must be a non-empty string of digits"),
        },
        Command::Verify { ruc } => {
            let ruc = verify_ruc(ruc)?;
            println!("{ruc} is valid");
        }
        Command::Setup {
            answers,
            certificate,
            password,
        } => {
            let answers = setup::load_answers(answers)?;
            let certificate = certificate
                .as_deref()
                .map(setup::load_certificate)
                .transpose()?;
            let client = cli.client()?;

            let outcome =
                setup::run_setup(answers, certificate, password.clone(), &client).await?;
            println!("Invoicing configuration saved.");
            if outcome.certificate_uploaded {
                println!("Certificate uploaded.");
            }
            if outcome.certificate_pending {
                println!(
                    "Certificate not uploaded: no password given (pass --password or set KUATIA_CERT_PASSWORD)."
                );
            }
            println!();
            display::print_config_card(&outcome.config, chrono::Local::now().date_naive());
        }
        Command::Show => match cli.client()?.pull_config().await? {
            Some(config) => {
                display::print_config_card(&config, chrono::Local::now().date_naive())
            }
            None => println!("No invoicing configuration stored."),
        },
    }

    Ok(())
}
