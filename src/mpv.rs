use crate::audio::{AudioBackend, AudioHandle, AudioStatus, StatusSender};
use crate::storage::ensure_private_dir;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
enum MpvCommand {
    SetPause(bool),
    SetVolume(f32),
    Stop,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
enum MpvEvent {
    Pause(bool),
    Buffering(bool),
    Duration(Option<f64>),
    TimePos(Option<f64>),
    EndFile { error: Option<String> },
}

/// Audio output backed by one `mpv` process per acquired stream, driven over
/// its JSON IPC socket.
#[derive(Debug, Clone)]
pub struct MpvBackend {
    binary: String,
    socket_dir: PathBuf,
}

impl MpvBackend {
    pub fn new(binary: impl Into<String>, socket_dir: PathBuf) -> Self {
        Self {
            binary: binary.into(),
            socket_dir,
        }
    }

    fn socket_path(&self) -> PathBuf {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        self.socket_dir.join(format!("mpv-{suffix}.sock"))
    }
}

#[async_trait]
impl AudioBackend for MpvBackend {
    async fn acquire(
        &self,
        uri: &str,
        volume: f32,
        autoplay: bool,
        status: StatusSender,
    ) -> Result<Box<dyn AudioHandle>> {
        ensure_private_dir(&self.socket_dir)?;
        let socket_path = self.socket_path();
        let (mut child, mut stream) =
            spawn_and_connect(&self.binary, &socket_path, uri, volume, autoplay).await?;
        if let Err(e) = send_observers(&mut stream).await {
            let _ = child.kill().await;
            let _ = tokio::fs::remove_file(&socket_path).await;
            return Err(e);
        }

        let initial = AudioStatus {
            is_loaded: true,
            is_playing: autoplay,
            is_buffering: true,
            ..Default::default()
        };
        let _ = status.send(initial.clone());

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            if let Err(e) = io_loop(&mut child, stream, cmd_rx, &status, initial).await {
                let _ = status.send(AudioStatus::failed(e.to_string()));
            }
            let _ = child.kill().await;
        });

        Ok(Box::new(MpvHandle {
            cmd_tx,
            task: Some(task),
            socket_path,
        }))
    }
}

pub struct MpvHandle {
    cmd_tx: mpsc::UnboundedSender<MpvCommand>,
    task: Option<JoinHandle<()>>,
    socket_path: PathBuf,
}

impl MpvHandle {
    fn command(&self, cmd: MpvCommand) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| anyhow!("mpv task is not running"))
    }
}

#[async_trait]
impl AudioHandle for MpvHandle {
    async fn play(&mut self) -> Result<()> {
        self.command(MpvCommand::SetPause(false))
    }

    async fn pause(&mut self) -> Result<()> {
        self.command(MpvCommand::SetPause(true))
    }

    async fn stop(&mut self) -> Result<()> {
        self.command(MpvCommand::Stop)
    }

    async fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.command(MpvCommand::SetVolume(volume))
    }

    async fn unload(&mut self) -> Result<()> {
        let _ = self.command(MpvCommand::Quit);
        if let Some(task) = self.task.take() {
            task.await.context("Join mpv task")?;
        }
        match tokio::fs::remove_file(&self.socket_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Remove mpv socket: {:?}", self.socket_path)),
        }
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.cmd_tx.send(MpvCommand::Quit);
        }
    }
}

async fn spawn_and_connect(
    binary: &str,
    socket_path: &Path,
    uri: &str,
    volume: f32,
    autoplay: bool,
) -> Result<(Child, UnixStream)> {
    let _ = tokio::fs::remove_file(socket_path).await;

    let mut cmd = Command::new(binary);
    cmd.arg("--idle=yes")
        .arg("--no-terminal")
        .arg("--no-video")
        .arg("--force-window=no")
        .arg(format!("--volume={}", volume_percent(volume)))
        .arg(format!(
            "--input-ipc-server={}",
            socket_path
                .to_str()
                .ok_or_else(|| anyhow!("Invalid socket path"))?
        ))
        .kill_on_drop(true);
    if !autoplay {
        cmd.arg("--pause");
    }
    let mut child = cmd.arg("--").arg(uri).spawn().context("Failed to spawn mpv")?;

    let start = tokio::time::Instant::now();
    let stream = loop {
        match UnixStream::connect(socket_path).await {
            Ok(s) => break s,
            Err(e) => {
                if start.elapsed() > Duration::from_secs(3) {
                    let _ = child.kill().await;
                    return Err(e).context("Timed out connecting to mpv IPC socket");
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    };

    Ok((child, stream))
}

async fn send_observers(stream: &mut UnixStream) -> Result<()> {
    for (id, property) in ["pause", "paused-for-cache", "duration", "time-pos"]
        .into_iter()
        .enumerate()
    {
        let mut buf = serde_json::to_vec(&mpv_cmd(vec![
            serde_json::json!("observe_property"),
            serde_json::json!(id + 1),
            serde_json::json!(property),
        ]))
        .context("Serialize mpv IPC request")?;
        buf.push(b'\n');
        stream.write_all(&buf).await.context("Write mpv IPC request")?;
    }
    Ok(())
}

async fn io_loop(
    child: &mut Child,
    stream: UnixStream,
    mut cmd_rx: mpsc::UnboundedReceiver<MpvCommand>,
    status_tx: &StatusSender,
    mut status: AudioStatus,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            exit = child.wait() => {
                let exit = exit.context("mpv wait failed")?;
                return Err(anyhow!("mpv exited: {exit}"));
            }
            maybe_line = reader.next_line() => {
                let line = maybe_line.context("mpv IPC read error")?;
                let Some(line) = line else {
                    return Err(anyhow!("mpv IPC closed"));
                };
                let Ok(ev) = parse_event(&line) else { continue; };
                debug!(event = ?ev, "mpv event");
                if apply_event(&mut status, ev) {
                    let _ = status_tx.send(status.clone());
                    status.error = None;
                }
            }
            cmd = cmd_rx.recv() => {
                let request = match cmd {
                    Some(MpvCommand::SetPause(p)) => mpv_cmd(vec![
                        serde_json::json!("set_property"),
                        serde_json::json!("pause"),
                        serde_json::json!(p),
                    ]),
                    Some(MpvCommand::SetVolume(v)) => mpv_cmd(vec![
                        serde_json::json!("set_property"),
                        serde_json::json!("volume"),
                        serde_json::json!(volume_percent(v)),
                    ]),
                    Some(MpvCommand::Stop) => mpv_cmd(vec![serde_json::json!("stop")]),
                    Some(MpvCommand::Quit) | None => {
                        if let Err(e) = child.kill().await {
                            warn!(error = ?e, "failed to kill mpv");
                        }
                        return Ok(());
                    }
                };
                send_json_half(&mut write_half, request).await?;
            }
        }
    }
}

/// Folds one IPC event into the running status. Returns whether it changed.
fn apply_event(status: &mut AudioStatus, ev: MpvEvent) -> bool {
    let before = status.clone();
    match ev {
        MpvEvent::Pause(p) => status.is_playing = !p,
        MpvEvent::Buffering(b) => status.is_buffering = b,
        MpvEvent::Duration(d) => status.duration_ms = d.map(secs_to_ms),
        MpvEvent::TimePos(t) => status.position_ms = t.map(secs_to_ms),
        MpvEvent::EndFile { error: Some(e) } => {
            status.is_playing = false;
            status.is_buffering = false;
            status.error = Some(e);
        }
        MpvEvent::EndFile { error: None } => {
            status.is_playing = false;
            status.is_buffering = false;
        }
    }
    *status != before
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

fn volume_percent(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u32
}

fn mpv_cmd(command: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "command": command })
}

async fn send_json_half(
    write_half: &mut tokio::net::unix::OwnedWriteHalf,
    v: serde_json::Value,
) -> Result<()> {
    let mut buf = serde_json::to_vec(&v).context("Serialize mpv IPC request")?;
    buf.push(b'\n');
    write_half.write_all(&buf).await.context("Write mpv IPC request")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct MpvIncoming {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    file_error: Option<String>,
}

fn parse_event(line: &str) -> Result<MpvEvent> {
    let incoming: MpvIncoming = serde_json::from_str(line).context("Invalid mpv IPC JSON")?;
    match incoming.event.as_deref() {
        Some("property-change") => {}
        Some("end-file") => {
            let error = match incoming.reason.as_deref() {
                Some("error") => Some(
                    incoming
                        .file_error
                        .unwrap_or_else(|| "playback error".to_string()),
                ),
                _ => None,
            };
            return Ok(MpvEvent::EndFile { error });
        }
        _ => return Err(anyhow!("Not a property-change event")),
    }
    let data = incoming.data;
    match incoming.name.as_deref() {
        Some("pause") => Ok(MpvEvent::Pause(
            data.and_then(|v| v.as_bool()).unwrap_or(false),
        )),
        Some("paused-for-cache") => Ok(MpvEvent::Buffering(
            data.and_then(|v| v.as_bool()).unwrap_or(false),
        )),
        Some("duration") => Ok(MpvEvent::Duration(data.and_then(|v| v.as_f64()))),
        Some("time-pos") => Ok(MpvEvent::TimePos(data.and_then(|v| v.as_f64()))),
        _ => Err(anyhow!("Unrecognized property-change")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pause() {
        let line = r#"{"event":"property-change","name":"pause","data":true}"#;
        assert_eq!(parse_event(line).unwrap(), MpvEvent::Pause(true));
    }

    #[test]
    fn parses_live_stream_duration_as_none() {
        let line = r#"{"event":"property-change","id":3,"name":"duration"}"#;
        assert_eq!(parse_event(line).unwrap(), MpvEvent::Duration(None));
    }

    #[test]
    fn parses_end_file_error() {
        let line = r#"{"event":"end-file","reason":"error","file_error":"loading failed"}"#;
        assert_eq!(
            parse_event(line).unwrap(),
            MpvEvent::EndFile {
                error: Some("loading failed".to_string())
            }
        );
        let eof = r#"{"event":"end-file","reason":"eof"}"#;
        assert_eq!(parse_event(eof).unwrap(), MpvEvent::EndFile { error: None });
    }

    #[test]
    fn ignores_command_replies() {
        assert!(parse_event(r#"{"request_id":0,"error":"success"}"#).is_err());
    }

    #[test]
    fn folds_events_into_status() {
        let mut status = AudioStatus {
            is_loaded: true,
            is_playing: true,
            is_buffering: true,
            ..Default::default()
        };
        assert!(apply_event(&mut status, MpvEvent::Buffering(false)));
        assert!(!apply_event(&mut status, MpvEvent::Buffering(false)));
        assert!(apply_event(&mut status, MpvEvent::TimePos(Some(1.25))));
        assert_eq!(status.position_ms, Some(1250));
        assert!(apply_event(&mut status, MpvEvent::Pause(true)));
        assert!(!status.is_playing);
    }

    #[test]
    fn volume_maps_to_percent() {
        assert_eq!(volume_percent(0.5), 50);
        assert_eq!(volume_percent(1.7), 100);
        assert_eq!(volume_percent(-1.0), 0);
    }
}
