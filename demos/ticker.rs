//! # Demo: ticker
//!
//! A closure-backed job that ticks every 500ms, closed from inside the program
//! after three seconds (or earlier by Ctrl-C). Lifecycle events are printed by
//! the built-in [`LogWriter`].
//!
//! ## Run
//! ```bash
//! cargo run --example ticker --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use jobvisor::{Controller, JobError, JobFn, LogWriter, Subscribe};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let stop = CancellationToken::new();
    let (r, c) = (stop.clone(), stop);

    let ticker = JobFn::new("ticker")
        .with_run(move || {
            let stop = r.clone();
            async move {
                let mut n = 0u32;
                while !stop.is_cancelled() {
                    n += 1;
                    println!("[ticker] tick #{n}");
                    tokio::select! {
                        _ = stop.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
                    }
                }
                Ok::<_, JobError>(())
            }
        })
        .with_close(move |_ctx| {
            let stop = c.clone();
            async move {
                stop.cancel();
                Ok(())
            }
        })
        .arc();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let ctl = Controller::builder(ticker).with_subscribers(subs).build();

    tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            if let Err(e) = ctl.signal_to_close() {
                eprintln!("[ticker] close request failed: {e}");
            }
        }
    });

    ctl.execute().await?;
    // let the subscriber worker print the last events
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
