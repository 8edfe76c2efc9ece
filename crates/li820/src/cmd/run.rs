use std::thread::JoinHandle;

use li820_publish::http::MetricsServer;
use li820_publish::{AnalyzerMetrics, PublishWorker, Publisher};
use li820_sampler::{handoff, DeviceSession, SessionError};
use li820_transport::DeviceStream;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cmd::RunArgs;
use crate::exit::{
    io_error, publish_error, session_error, transport_error, CliError, CliResult, INTERNAL,
    SUCCESS,
};

pub fn run(args: RunArgs) -> CliResult<i32> {
    let device = &args.device;
    let config = device.session.session_config();

    let stream = DeviceStream::open(
        &device.device,
        &device.serial_settings(),
        config.frame_tag.as_str(),
    )
    .map_err(|err| transport_error("open device failed", err))?;

    let metrics = li820_publish::register(&config.site);
    let publisher =
        Publisher::bind(&args.publish).map_err(|err| publish_error("publish bind failed", err))?;
    for endpoint in publisher.endpoints() {
        info!(%endpoint, "publishing records");
    }

    let (records_tx, records_rx) = handoff(args.queue);
    let worker = PublishWorker::new(records_rx, publisher, metrics)
        .spawn()
        .map_err(|err| publish_error("start publisher failed", err))?;

    info!(
        device = %device.device,
        tag = %config.frame_tag,
        site = %config.site,
        queue = args.queue,
        "starting sampler"
    );
    let session = DeviceSession::with_frame_config(stream, config, device.frame_config());
    let sampler = session
        .spawn(records_tx)
        .map_err(|err| session_error("start sampler failed", err))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("li820-http")
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let outcome = runtime.block_on(serve_until_stopped(&args.metrics_addr, metrics, sampler));
    // The sampler may still be parked in a device read; process exit closes the device.
    runtime.shutdown_background();

    if worker.is_finished() {
        if let Ok(stats) = worker.join() {
            info!(
                published = stats.published,
                dropped = stats.dropped,
                "publisher finished"
            );
        }
    }
    outcome
}

async fn serve_until_stopped(
    addr: &str,
    metrics: &'static AnalyzerMetrics,
    sampler: JoinHandle<SessionError>,
) -> CliResult<i32> {
    let server = MetricsServer::bind(addr)
        .await
        .map_err(|err| publish_error("metrics bind failed", err))?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut http = tokio::spawn(server.serve(metrics, async move {
        let _ = stop_rx.await;
    }));
    let sampler_done = tokio::task::spawn_blocking(move || sampler.join());

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("interrupt received; shutting down");
                Ok(SUCCESS)
            }
            Err(err) => Err(io_error("signal handler setup failed", err)),
        },
        joined = sampler_done => match joined {
            Ok(Ok(reason)) => Err(session_error("sampler stopped", reason)),
            Ok(Err(_)) | Err(_) => Err(CliError::new(INTERNAL, "sampler thread panicked")),
        },
        served = &mut http => {
            return match served {
                Ok(Ok(())) => Ok(SUCCESS),
                Ok(Err(err)) => Err(publish_error("metrics server failed", err)),
                Err(err) => Err(CliError::new(INTERNAL, format!("metrics server task failed: {err}"))),
            };
        }
    };

    let _ = stop_tx.send(());
    match http.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "metrics server stopped with error"),
        Err(err) => warn!(error = %err, "metrics server task failed"),
    }
    outcome
}
