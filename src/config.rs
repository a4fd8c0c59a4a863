use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env,
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_pool_size: u32,
    /// Shared key gating the snapshot refresh action. Unset means the
    /// action is open, which only makes sense in development.
    pub api_key: Option<String>,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    wells_listen_addr: Option<String>,
    #[serde(default)]
    wells_listen_host: Option<String>,
    #[serde(default)]
    wells_listen_port: Option<u16>,
    #[serde(default)]
    wells_database_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default = "default_pool_size")]
    wells_max_pool_size: u32,
    #[serde(default)]
    wells_api_key: Option<String>,
    #[serde(default = "default_snapshot_dir")]
    wells_snapshot_dir: PathBuf,
}

const fn default_pool_size() -> u32 {
    10
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse WELLS_* environment variables")?;

        let listen_addr = resolve_addr(
            raw.wells_listen_addr,
            raw.wells_listen_host,
            raw.wells_listen_port,
        )?;

        let database_url = raw
            .wells_database_url
            .or(raw.database_url)
            .or_else(|| env::var("DATABASE_URL").ok())
            .context("WELLS_DATABASE_URL or DATABASE_URL must be set")?;

        Ok(Self {
            listen_addr,
            database_url,
            max_pool_size: raw.wells_max_pool_size,
            api_key: raw.wells_api_key,
            snapshot_dir: raw.wells_snapshot_dir,
        })
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid WELLS_LISTEN_ADDR value")?
            .next()
            .context("WELLS_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8470);
    let combined = format!("{}:{}", host, port);
    combined
        .to_socket_addrs()
        .context("invalid listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_addr_wins_over_host_and_port() {
        let addr = resolve_addr(Some("127.0.0.1:9000".into()), Some("ignored".into()), Some(1))
            .expect("addr should resolve");
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn host_and_port_combine_with_defaults() {
        let addr = resolve_addr(None, None, None).expect("defaults should resolve");
        assert_eq!(addr.port(), 8470);
    }
}
