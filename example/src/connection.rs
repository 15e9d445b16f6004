use std::env::var;
use mapiro::{Config, Connection, ErrorKind, Result};

pub async fn main() -> Result<()> {
    let conn = match var("DATABASE_URL") {
        Ok(url) => Connection::connect(&url).await?,
        Err(_) => Connection::connect_with(Config::new()).await?,
    };
    conn.query("SELECT 1").await?;
    conn.close().await?;

    let conn = Connection::connect_env().await?;
    tracing::info!("monet_version: {:?}", conn.env().get("monet_version"));
    conn.query("SELECT 1").await?;

    // handles share the connection
    let other = conn.clone();
    other.query("SELECT 1").await?;

    let pending = conn.query("SELECT 2");
    conn.close().await?;
    pending.await?;

    let err = conn.query("SELECT 3").await.unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Closing | ErrorKind::Closed));

    let conn = Connection::connect_with(Config::from_env().debug(true).block_size(64)).await?;
    conn.fetch("SELECT 'a string longer than one sixty four byte block, so it is split on the wire'").await?;
    drop(conn);

    Ok(())
}
