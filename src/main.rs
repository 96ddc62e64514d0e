// rfbrute - concurrent credential bruteforcer for RFB (VNC) servers,
// RFC 6143 with support for common vendor deviations.
//
// For use against systems you are authorized to test.

mod cli;
mod dialer;
mod generator;
mod logger;
mod pool;
mod probe;
mod progress;
mod raw;
mod rfb;
mod utils;
mod wordlist;
mod worker;

use std::process;
use std::sync::Arc;

use clap::Parser;
use log::error;

use cli::{BruteMode, Cli};
use generator::PasswordSource;
use pool::ProxyPool;
use raw::RawIter;
use wordlist::Wordlist;
use worker::AttackConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_logger(cli.packet_debug);

    println!("rfbrute v{}\n", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    if cli.threads == 0 {
        return Err("thread count (-t) must be at least 1".to_string());
    }

    let dest_addr = utils::resolve_target(&cli.address, 5900)
        .await
        .map_err(|e| format!("failed to parse server address (-a): {e}"))?;

    let source: Box<dyn PasswordSource> = match cli.mode {
        BruteMode::Wordlist => {
            let path = cli.wordlist.as_ref().ok_or(
                "bruteforce mode (-m) \"wordlist\" provided, but wordlist path (-w) is missing",
            )?;

            Box::new(Wordlist::load(path).map_err(|e| format!("failed to read wordlist: {e}"))?)
        }
        BruteMode::Raw => {
            if cli.charset.is_empty() {
                return Err(
                    "bruteforce mode (-m) \"raw\" provided, but charset (--chars) is empty"
                        .to_string(),
                );
            }

            let (min_len, max_len) = utils::parse_num_range(&cli.range)
                .map_err(|e| format!("failed to parse length range (--range): {e}"))?;
            if min_len == 0 || max_len == 0 {
                return Err(
                    "failed to parse length range (--range): number range cannot include 0"
                        .to_string(),
                );
            } else if min_len < 0 || max_len < 0 {
                return Err("failed to parse length range (--range): number range cannot include negative integers".to_string());
            }

            Box::new(RawIter::new(&cli.charset, min_len as usize, max_len as usize))
        }
    };

    let proxy_pool = match &cli.proxies {
        Some(path) => {
            let pool = ProxyPool::from_file(path)
                .map_err(|e| format!("failed to read proxies file: {e}"))?;

            if pool.is_empty() {
                log::warn!("proxies file contained no usable proxy URLs");
            } else {
                log::info!("Loaded {} proxies", pool.len());
            }

            Some(Arc::new(pool))
        }
        None => None,
    };

    // Look before leaping, unless told otherwise
    if !cli.no_probe {
        probe::run(
            dest_addr,
            cli.conn_type,
            proxy_pool.as_deref(),
            cli.packet_debug,
        )
        .await?;
    }

    let cfg = AttackConfig {
        dest_addr,
        conn_type: cli.conn_type,
        threads: cli.threads,
        retries: cli.retries,
        delay_secs: cli.delay,
        start_index: cli.start,
        packet_debug: cli.packet_debug,
    };

    worker::run(cfg, source, proxy_pool).await
}
