use crate::audio::{AudioBackend, AudioHandle, AudioStatus};
use crate::config::PlayerConfig;
use crate::models::Station;
use crate::visualizer::SyntheticEnvelope;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub phase: PlaybackPhase,
    pub station: Option<Station>,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub volume: f32,
    /// Only meaningful for finite media; stays 0 for live radio.
    pub position_ms: u64,
    pub duration_ms: u64,
    pub envelope: Vec<f32>,
}

impl PlaybackState {
    fn idle(volume: f32, envelope: Vec<f32>) -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            station: None,
            is_playing: false,
            is_buffering: false,
            volume,
            position_ms: 0,
            duration_ms: 0,
            envelope,
        }
    }

    pub fn is_current(&self, stationuuid: &str) -> bool {
        self.station
            .as_ref()
            .is_some_and(|s| s.stationuuid == stationuuid)
    }

    pub fn label_text(&self) -> String {
        if let Some(st) = &self.station {
            let name = st.name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
        "radio".to_string()
    }
}

#[derive(Debug, Clone)]
enum PlayerCommand {
    SelectStation(Station),
    TogglePlayPause,
    Stop,
    SetVolume(f32),
    Shutdown,
}

struct Request {
    cmd: PlayerCommand,
    done: Option<oneshot::Sender<()>>,
}

enum InternalMsg {
    Acquired {
        generation: u64,
        volume: f32,
        res: Result<Box<dyn AudioHandle>>,
    },
    Status {
        generation: u64,
        status: AudioStatus,
    },
}

/// Handle to the playback controller task.
///
/// Owns at most one audio output at a time. Each method returns once the
/// controller has applied the command's synchronous part; acquisition of a
/// newly selected station continues in the background.
pub struct PlayerService {
    cmd_tx: mpsc::UnboundedSender<Request>,
    state_rx: watch::Receiver<PlaybackState>,
    task: Option<JoinHandle<()>>,
}

impl PlayerService {
    /// Spawns the controller on the current tokio runtime.
    pub fn start(backend: Arc<dyn AudioBackend>, config: &PlayerConfig) -> Self {
        let envelope = SyntheticEnvelope::new(config.envelope_bands);
        let volume = config.default_volume.clamp(0.0, 1.0);
        let (state_tx, state_rx) = watch::channel(PlaybackState::idle(volume, envelope.neutral()));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let controller = Controller {
            backend,
            state_tx,
            internal_tx,
            handle: None,
            generation: 0,
            envelope,
        };
        let task = tokio::spawn(controller.run(cmd_rx, internal_rx, config.envelope_tick()));

        Self {
            cmd_tx,
            state_rx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_rx.clone()
    }

    pub async fn select_station(&self, station: Station) {
        self.request(PlayerCommand::SelectStation(station)).await;
    }

    pub async fn toggle_play_pause(&self) {
        self.request(PlayerCommand::TogglePlayPause).await;
    }

    pub async fn stop(&self) {
        self.request(PlayerCommand::Stop).await;
    }

    pub async fn set_volume(&self, volume: f32) {
        self.request(PlayerCommand::SetVolume(volume)).await;
    }

    /// Releases the audio output and waits for the controller to exit.
    pub async fn shutdown(mut self) {
        self.request(PlayerCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = ?e, "player controller task failed");
            }
        }
    }

    async fn request(&self, cmd: PlayerCommand) {
        let (done_tx, done_rx) = oneshot::channel();
        let req = Request {
            cmd,
            done: Some(done_tx),
        };
        if self.cmd_tx.send(req).is_err() {
            warn!("player controller is not running");
            return;
        }
        let _ = done_rx.await;
    }
}

impl Drop for PlayerService {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.cmd_tx.send(Request {
                cmd: PlayerCommand::Shutdown,
                done: None,
            });
        }
    }
}

struct Controller {
    backend: Arc<dyn AudioBackend>,
    state_tx: watch::Sender<PlaybackState>,
    internal_tx: mpsc::UnboundedSender<InternalMsg>,
    handle: Option<Box<dyn AudioHandle>>,
    /// Bumped on every selection, stop and shutdown. Acquisitions and status
    /// updates carrying an older value are stale.
    generation: u64,
    envelope: SyntheticEnvelope,
}

impl Controller {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Request>,
        mut internal_rx: mpsc::UnboundedReceiver<InternalMsg>,
        tick: Duration,
    ) {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let playing = self.state_tx.borrow().phase == PlaybackPhase::Playing;
            tokio::select! {
                req = cmd_rx.recv() => {
                    let Some(req) = req else {
                        self.shutdown().await;
                        return;
                    };
                    let last = matches!(req.cmd, PlayerCommand::Shutdown);
                    self.handle_command(req.cmd).await;
                    if let Some(done) = req.done {
                        let _ = done.send(());
                    }
                    if last {
                        return;
                    }
                }
                Some(msg) = internal_rx.recv() => {
                    self.handle_internal(msg).await;
                }
                _ = ticker.tick(), if playing => {
                    let frame = self.envelope.sample();
                    self.state_tx.send_modify(|s| s.envelope = frame);
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: PlayerCommand) {
        match cmd {
            PlayerCommand::SelectStation(station) => self.select_station(station).await,
            PlayerCommand::TogglePlayPause => self.toggle_play_pause().await,
            PlayerCommand::Stop => self.stop().await,
            PlayerCommand::SetVolume(v) => self.set_volume(v).await,
            PlayerCommand::Shutdown => self.shutdown().await,
        }
    }

    async fn select_station(&mut self, station: Station) {
        self.release().await;
        self.generation += 1;
        let generation = self.generation;

        let neutral = self.envelope.neutral();
        let mut volume = 1.0;
        self.state_tx.send_modify(|s| {
            volume = s.volume;
            s.phase = PlaybackPhase::Loading;
            s.station = Some(station.clone());
            s.is_playing = false;
            s.is_buffering = true;
            s.position_ms = 0;
            s.duration_ms = 0;
            s.envelope = neutral;
        });

        let uri = station.playable_url().to_string();
        info!(stationuuid = %station.stationuuid, %uri, generation, "loading station");

        let (status_tx, mut status_rx) = mpsc::unbounded_channel();
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            while let Some(status) = status_rx.recv().await {
                if internal.send(InternalMsg::Status { generation, status }).is_err() {
                    break;
                }
            }
        });

        let backend = Arc::clone(&self.backend);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let res = backend.acquire(&uri, volume, true, status_tx).await;
            let _ = internal.send(InternalMsg::Acquired {
                generation,
                volume,
                res,
            });
        });
    }

    async fn toggle_play_pause(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            debug!("toggle ignored, no audio output held");
            return;
        };
        let playing = self.state_tx.borrow().is_playing;
        let res = if playing {
            handle.pause().await
        } else {
            handle.play().await
        };
        match res {
            Ok(()) => self.state_tx.send_modify(|s| {
                s.is_playing = !playing;
                s.phase = if playing {
                    PlaybackPhase::Paused
                } else {
                    PlaybackPhase::Playing
                };
            }),
            Err(e) => warn!(error = ?e, "failed to toggle playback"),
        }
    }

    async fn stop(&mut self) {
        let idle = self.handle.is_none() && self.state_tx.borrow().station.is_none();
        if idle {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.stop().await {
                warn!(error = ?e, "failed to stop audio output");
            }
        }
        self.release().await;
        self.generation += 1;
        self.reset_idle();
        info!("playback stopped");
    }

    async fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "ignoring non-finite volume");
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.state_tx.send_modify(|s| s.volume = volume);
        if let Some(handle) = self.handle.as_mut() {
            if let Err(e) = handle.set_volume(volume).await {
                warn!(error = ?e, "failed to apply volume");
            }
        }
    }

    async fn shutdown(&mut self) {
        self.release().await;
        self.generation += 1;
        self.reset_idle();
    }

    async fn handle_internal(&mut self, msg: InternalMsg) {
        match msg {
            InternalMsg::Acquired {
                generation,
                volume,
                res,
            } => {
                if generation != self.generation {
                    if let Ok(mut stale) = res {
                        debug!(generation, "releasing superseded audio output");
                        if let Err(e) = stale.unload().await {
                            warn!(error = ?e, "failed to release superseded audio output");
                        }
                    }
                    return;
                }
                match res {
                    Ok(mut handle) => {
                        // Volume may have moved while the output was loading.
                        let target = self.state_tx.borrow().volume;
                        if target != volume {
                            if let Err(e) = handle.set_volume(target).await {
                                warn!(error = ?e, "failed to apply volume");
                            }
                        }
                        self.handle = Some(handle);
                        self.state_tx.send_modify(|s| {
                            s.phase = PlaybackPhase::Playing;
                            s.is_playing = true;
                        });
                    }
                    Err(e) => {
                        warn!(error = ?e, "error playing station");
                        self.state_tx.send_modify(|s| s.is_buffering = false);
                    }
                }
            }
            InternalMsg::Status { generation, status } => {
                if generation != self.generation {
                    return;
                }
                self.apply_status(status);
            }
        }
    }

    fn apply_status(&mut self, status: AudioStatus) {
        if let Some(error) = &status.error {
            warn!(%error, "playback error");
        }
        if !status.is_loaded || self.state_tx.borrow().station.is_none() {
            return;
        }
        let held = self.handle.is_some();
        self.state_tx.send_modify(|s| {
            s.is_buffering = status.is_buffering;
            if let Some(d) = status.duration_ms.filter(|d| *d > 0) {
                s.duration_ms = d;
            }
            if let Some(p) = status.position_ms {
                s.position_ms = p;
            }
            if held {
                s.is_playing = status.is_playing;
                s.phase = if status.is_playing {
                    PlaybackPhase::Playing
                } else {
                    PlaybackPhase::Paused
                };
            }
        });
    }

    async fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.unload().await {
                warn!(error = ?e, "failed to release audio output");
            }
        }
    }

    fn reset_idle(&self) {
        let neutral = self.envelope.neutral();
        self.state_tx.send_modify(|s| {
            let volume = s.volume;
            *s = PlaybackState::idle(volume, neutral);
        });
    }
}
