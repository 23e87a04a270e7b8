//! Review server command — `reviewd serve`.

use anyhow::Result;

pub async fn cmd_serve(port: u16, bind: String) -> Result<()> {
    let remote = reviewd::config::RemoteConfig::from_env();

    reviewd::api::server::start_server(reviewd::api::server::ServerConfig { port, bind }, remote)
        .await?;

    Ok(())
}
