use ig_trading::core::config::ConfigError;
use ig_trading::{AuthProtocol, IgConfig, IgService};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "env-file")]
fn load_config() -> Result<IgConfig, ConfigError> {
    IgConfig::from_env_file("IG")
}

#[cfg(not(feature = "env-file"))]
fn load_config() -> Result<IgConfig, ConfigError> {
    IgConfig::from_env("IG")
}

/// Print every node and market of the navigation tree, optionally starting
/// below the node id given as the first argument.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let protocol = if config.acc_number.is_some() {
        AuthProtocol::V3
    } else {
        AuthProtocol::V2
    };

    let service = IgService::new(&config)?;
    service.create_session(protocol).await?;

    let root = std::env::args().nth(1);
    info!("Walking navigation tree from {}", root.as_deref().unwrap_or("the top level"));

    for entry in service.walk_navigation(root.as_deref()).await? {
        println!("{}", entry);
    }
    Ok(())
}
