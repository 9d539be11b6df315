use tracing_subscriber::EnvFilter;

use taggame::TagEngine;
use taggame::shared::SharedEngine;
use taggame_driver::{
    DriverCommand, DriverConfig, DriverEvent, FrameRecorder, read_recording, spawn_driver,
};

#[tokio::main]
async fn main() {
    // Log format comes from the environment since config loading already logs
    if std::env::var("TAGGAME_LOG_JSON").is_ok_and(|v| v == "true") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    let args: Vec<String> = std::env::args().collect();
    if let [_, command, path] = args.as_slice()
        && command == "replay"
    {
        replay(path);
        return;
    }

    let config = DriverConfig::load();
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    let engine = match TagEngine::new(config.engine.clone()) {
        Ok(engine) => SharedEngine::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build engine");
            std::process::exit(1);
        },
    };

    tracing::info!(
        players = config.engine.player_count,
        rl_player = %config.engine.rl_player_name,
        "Tag driver starting"
    );

    let mut recorder = match config.record_path.as_deref().map(FrameRecorder::create) {
        Some(Ok(recorder)) => Some(recorder),
        Some(Err(e)) => {
            tracing::error!(error = %e, "Failed to open recording");
            std::process::exit(1);
        },
        None => None,
    };

    let (cmd_tx, mut event_rx, handle) = spawn_driver(engine, config);

    let mut observer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                DriverEvent::Frame(frame) => {
                    if let Some(tagger) = frame.tagger() {
                        tracing::trace!(tick = frame.tick, tagger = %tagger.name, "Frame");
                    }
                    if let Some(rec) = recorder.as_mut()
                        && let Err(e) = rec.record(&frame)
                    {
                        tracing::warn!(error = %e, "Recording stopped");
                        recorder = None;
                    }
                },
                DriverEvent::Transition {
                    tick,
                    observation_json,
                    reward,
                    ..
                } => {
                    tracing::trace!(tick, reward, observation = %observation_json, "Transition");
                },
                DriverEvent::EpisodeEnded { episode, tick, .. } => {
                    tracing::debug!(episode, tick, "Episode ended");
                },
                DriverEvent::Stopped(_) => break,
            }
        }
        if let Some(rec) = recorder {
            let frames = rec.frames();
            match rec.finish() {
                Ok(_) => tracing::info!(frames, "Recording saved"),
                Err(e) => tracing::warn!(error = %e, "Failed to flush recording"),
            }
        }
    });

    let observer_done = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping tick loop");
            let _ = cmd_tx.send(DriverCommand::Stop);
            false
        }
        _ = &mut observer => true,
    };

    let result = handle.await;
    // Let the observer drain and flush the recording
    if !observer_done {
        let _ = observer.await;
    }

    match result {
        Ok(Ok(summary)) => {
            tracing::info!(
                ticks = summary.ticks,
                episodes = summary.episodes,
                tag_transfers = summary.tag_transfers,
                "Tag driver finished"
            );
        },
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Tag driver failed");
            std::process::exit(1);
        },
        Err(e) => {
            tracing::error!(error = %e, "Tick loop task panicked");
            std::process::exit(1);
        },
    }
}

/// Summarize a recording written with `record_path`.
fn replay(path: &str) {
    let frames = match read_recording(path) {
        Ok(frames) => frames,
        Err(e) => {
            tracing::error!(path, error = %e, "Failed to read recording");
            std::process::exit(1);
        },
    };
    let mut transfers = 0u64;
    let mut tagger: Option<String> = None;
    for frame in &frames {
        let current = frame.tagger().map(|t| t.name.clone());
        if tagger.is_some() && current != tagger {
            transfers += 1;
        }
        tagger = current;
    }
    tracing::info!(
        path,
        frames = frames.len(),
        first_tick = frames.first().map(|f| f.tick),
        last_tick = frames.last().map(|f| f.tick),
        tag_transfers = transfers,
        "Replayed recording"
    );
}
