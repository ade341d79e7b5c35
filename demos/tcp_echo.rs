//! # Demo: tcp_echo
//!
//! A TCP echo server driven by a [`Controller`]. Run serves connections until
//! close cancels the shared token; Ctrl-C (SIGINT) or SIGTERM triggers close.
//!
//! Demonstrates how to:
//! - Implement [`Job`] for a server type.
//! - Let close wait for `run` to wind down, bounded by `close_timeout`.
//!
//! ## Flow
//! ```text
//! main()
//!   └─► Controller::execute()
//!         ├─► EchoServer::run()   accept loop (until token cancelled)
//!         ├─► SIGINT / SIGTERM    ─► EchoServer::close()
//!         │                             ├─► cancel accept loop
//!         │                             └─► wait for `run` to report done
//!         └─► acknowledged        ─► Ok(())
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example tcp_echo
//! # in another terminal: nc 127.0.0.1 7007
//! ```

use std::time::Duration;

use async_trait::async_trait;
use jobvisor::{Config, Controller, Job, JobError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

struct EchoServer {
    addr: &'static str,
    stop: CancellationToken,
    done: Notify,
}

#[async_trait]
impl Job for EchoServer {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(&self) -> Result<(), JobError> {
        let listener = TcpListener::bind(self.addr).await?;
        println!("[echo] listening on {}", self.addr);

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    println!("[echo] connection from {peer}");
                    tokio::spawn(echo(stream, self.stop.clone()));
                }
            }
        }

        println!("[echo] accept loop stopped");
        self.done.notify_one();
        Ok(())
    }

    async fn close(&self, ctx: CancellationToken) -> Result<(), JobError> {
        self.stop.cancel();
        tokio::select! {
            _ = self.done.notified() => Ok(()),
            _ = ctx.cancelled() => Err(JobError::Canceled),
        }
    }
}

async fn echo(mut stream: TcpStream, stop: CancellationToken) {
    let mut buf = [0u8; 1024];
    loop {
        let n = tokio::select! {
            _ = stop.cancelled() => return,
            read = stream.read(&mut buf) => match read {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            },
        };
        if stream.write_all(&buf[..n]).await.is_err() {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server = EchoServer {
        addr: "127.0.0.1:7007",
        stop: CancellationToken::new(),
        done: Notify::new(),
    };
    let cfg = Config::default().with_close_timeout(Duration::from_secs(5));

    Controller::with_config(std::sync::Arc::new(server), cfg)
        .execute()
        .await?;
    println!("[echo] shut down cleanly");
    Ok(())
}
