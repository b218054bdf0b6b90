use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use anyhow::Context;

use crate::search::SearchDialect;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub db_path: PathBuf,
    pub search_dialect: SearchDialect,
    /// `_limit` applied to list queries that do not set one.
    pub default_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            db_path: PathBuf::from("perfectweek.sled"),
            search_dialect: SearchDialect::default(),
            default_limit: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        Ok(Config {
            host: match env::var("PERFECTWEEK_HOST") {
                Ok(host) => host.parse().context("PERFECTWEEK_HOST is not an IP address")?,
                Err(_) => defaults.host,
            },
            port: match env::var("PERFECTWEEK_PORT") {
                Ok(port) => port.parse().context("PERFECTWEEK_PORT is not a port number")?,
                Err(_) => defaults.port,
            },
            db_path: env::var("PERFECTWEEK_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            search_dialect: match env::var("PERFECTWEEK_SEARCH_DIALECT") {
                Ok(dialect) => dialect.parse()?,
                Err(_) => defaults.search_dialect,
            },
            default_limit: match env::var("PERFECTWEEK_DEFAULT_LIMIT") {
                Ok(limit) => limit
                    .parse()
                    .context("PERFECTWEEK_DEFAULT_LIMIT is not a positive integer")?,
                Err(_) => defaults.default_limit,
            },
        })
    }
}
