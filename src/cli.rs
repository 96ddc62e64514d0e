// rfbrute - CLI flag definitions

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::dialer::ConnType;

#[derive(Parser)]
#[command(
    name = "rfbrute",
    about = "Concurrent credential bruteforcer for RFB (VNC) servers",
    version
)]
pub struct Cli {
    /// Target VNC server [address:port], port defaults to 5900 unless
    /// specified (e.g. "192.168.0.134", "10.13.33.37:5901")
    #[arg(short = 'a', long = "address")]
    pub address: String,

    /// Connection type to use
    #[arg(long = "conn", value_enum, default_value_t = ConnType::Tcp)]
    pub conn_type: ConnType,

    /// Path to a txt list of SOCKS(4/5) proxies to use for workers, one per
    /// line in the format "scheme://[username:pass@]host[:port]". If not
    /// provided, no proxies are used
    #[arg(long = "proxies")]
    pub proxies: Option<PathBuf>,

    /// Number of simultaneous worker threads. The target server may only be
    /// able to handle so many, or it may restrict 1 connection per IP, so
    /// proceed with caution
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Number of retry attempts per password for failed connections. -1
    /// means infinite retries
    #[arg(long = "retries", default_value_t = -1, allow_hyphen_values = true)]
    pub retries: i64,

    /// Delay in seconds between connections per worker thread
    #[arg(long = "delay", default_value_t = 0.0)]
    pub delay: f64,

    /// Start at index n in password iteration
    #[arg(long = "start", default_value_t = 0)]
    pub start: u64,

    /// Mode of bruteforce
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = BruteMode::Wordlist)]
    pub mode: BruteMode,

    /// If mode is wordlist, path to the wordlist file to source from
    #[arg(short = 'w', long = "wordlist")]
    pub wordlist: Option<PathBuf>,

    /// If mode is raw, the character set used for permutations
    #[arg(
        long = "chars",
        default_value = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890"
    )]
    pub charset: String,

    /// If mode is raw, min/max number range for password combination
    /// length. May be either a single number, or 2 numbers in the format
    /// "1-6"
    #[arg(long = "range", default_value = "1-6")]
    pub range: String,

    /// Don't perform an initial connection handshake probe
    #[arg(long = "no-probe", default_value_t = false)]
    pub no_probe: bool,

    /// Enables packet dump logging for debug (meant for use with one
    /// thread)
    #[arg(long = "packet-debug", default_value_t = false)]
    pub packet_debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BruteMode {
    Wordlist,
    Raw,
}

impl std::fmt::Display for BruteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BruteMode::Wordlist => "wordlist",
            BruteMode::Raw => "raw",
        })
    }
}
