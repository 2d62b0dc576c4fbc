use std::sync::Arc;

use clap::Parser as _;
use eth_watch::{
    cli::Cli,
    parser::{EthParser, Parser},
    poller::BlockPoller,
    server::build_app,
    storage::{AddressesMapStorage, TransactionsMapStorage},
    utils::wait_for_flag,
};
use eyre::{eyre, WrapErr};
use tokio::{net::TcpListener, sync::watch};
use tracing::{error, info, warn};

// We use jemalloc for performance reasons
#[cfg(all(feature = "jemalloc", unix))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Enable backtraces unless a RUST_BACKTRACE value has already been explicitly provided.
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let cli = Cli::parse();
    cli.init_tracing();

    let config = cli.poller.to_config();
    info!("Polling blocks from {}", config.endpoint);
    let poller = BlockPoller::new(config.create_block_source(), &config);
    let parser: Arc<EthParser> = Arc::new(Parser::new(
        poller,
        TransactionsMapStorage::new(cli.storage_reset),
        AddressesMapStorage::new(),
    ));
    parser.init().await.wrap_err("could not init parser")?;

    let mut pipeline = tokio::spawn({
        let parser = parser.clone();
        async move { parser.run().await }
    });

    let listener = TcpListener::bind(&cli.server_addr)
        .await
        .wrap_err_with(|| format!("could not listen on {}", cli.server_addr))?;
    info!("Starting HTTP server on {}", listener.local_addr()?);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let serve = axum::serve(listener, build_app(parser.clone()))
        .with_graceful_shutdown(async move { wait_for_flag(&mut stop_rx).await });
    let server = tokio::spawn(async move { serve.await });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.wrap_err("could not listen for interrupt")?;
            info!("Got interrupt, shutting down");
        }
        result = &mut pipeline => {
            error!("Block pipeline stopped unexpectedly");
            stop_tx.send_replace(true);
            if tokio::time::timeout(cli.shutdown_timeout(), parser.shutdown()).await.is_err() {
                warn!("Could not shut down within {:?}", cli.shutdown_timeout());
            }
            return result?.wrap_err("block pipeline failed");
        }
    }

    let shutdown = async {
        stop_tx.send_replace(true);
        server.await?.wrap_err("HTTP server failed")?;
        info!("HTTP server shut down");

        parser.shutdown().await;
        pipeline.await?.wrap_err("block pipeline failed")?;
        Ok::<_, eyre::Report>(())
    };
    tokio::time::timeout(cli.shutdown_timeout(), shutdown)
        .await
        .map_err(|_| eyre!("could not shut down within {:?}", cli.shutdown_timeout()))??;

    info!("Shut down successfully");
    Ok(())
}
