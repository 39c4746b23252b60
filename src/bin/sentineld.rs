//! sentineld - ROI intrusion monitor daemon
//!
//! This daemon:
//! 1. Loads configuration (SENTINEL_CONFIG file + env overrides)
//! 2. Opens the configured frame source
//! 3. Drives `IntrusionMonitor::tick` at a fixed interval
//! 4. Renders per-box classifications and the INTRUSION/SECURE banner
//! 5. Stops cleanly on Ctrl-C

use anyhow::{anyhow, Result};
use std::io::IsTerminal;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Instant;

use roi_sentinel::config::SentinelConfig;
use roi_sentinel::ui::ConsoleSink;
use roi_sentinel::{
    DetectorBackend, FrameSource, IntrusionMonitor, RoiHandle, ScriptedBackend, SyntheticConfig,
    SyntheticSource, TickOutcome,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SentinelConfig::load()?;
    log::info!(
        "sentineld {} starting: roi={} vertices, target={}, tick={}ms",
        env!("CARGO_PKG_VERSION"),
        cfg.roi.vertices().len(),
        cfg.target_label,
        cfg.tick_interval.as_millis()
    );

    let mut source = SyntheticSource::new(SyntheticConfig {
        url: cfg.source.url.clone(),
        width: cfg.source.width,
        height: cfg.source.height,
        warmup_polls: cfg.source.warmup_polls,
    })?;
    source.connect()?;

    let mut backend = match &cfg.detector.script_path {
        Some(path) => {
            log::info!("detector script: {}", path.display());
            ScriptedBackend::from_json_file(path)?
        }
        None => {
            log::warn!("no detector script configured; every frame reports zero objects");
            ScriptedBackend::repeating(Vec::new())
        }
    }
    .with_latency(cfg.detector.latency);
    backend.warm_up()?;

    let monitor = IntrusionMonitor::with_backend(RoiHandle::new(cfg.roi.clone()), backend)
        .with_target_label(cfg.target_label.clone());
    monitor.subscribe(ConsoleSink::new(
        cfg.ui_mode,
        std::io::stderr().is_terminal(),
        !std::io::stdout().is_terminal(),
    ))?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let mut last_health_log = Instant::now();
    log::info!("sentineld running (Ctrl-C to stop)");

    loop {
        match monitor.tick(&mut source)? {
            TickOutcome::Evaluated(eval) => {
                log::debug!(
                    "frame {}: {} targets, intrusion={}",
                    eval.frame_seq,
                    eval.classifications.len(),
                    eval.intrusion
                );
            }
            TickOutcome::NotReady => log::debug!("frame not ready"),
            TickOutcome::Busy | TickOutcome::DetectorUnavailable => {}
        }

        if last_health_log.elapsed() >= cfg.health_log_interval {
            let stats = monitor.stats()?;
            log::info!(
                "source={} healthy={} frames={} evaluations={} not_ready={} detector_failures={} alerts={} intrusion={}",
                source.url(),
                source.is_healthy(),
                source.frames_captured(),
                stats.evaluations,
                stats.not_ready,
                stats.detector_failures,
                stats.alerts_raised,
                monitor.intrusion()?
            );
            last_health_log = Instant::now();
        }

        match rx.recv_timeout(cfg.tick_interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    log::info!("shutdown signal received, stopping");
    Ok(())
}
