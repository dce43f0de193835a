use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Status notification pushed by a live audio handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub duration_ms: Option<u64>,
    pub position_ms: Option<u64>,
    pub error: Option<String>,
}

impl AudioStatus {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

pub type StatusSender = mpsc::UnboundedSender<AudioStatus>;

/// Platform audio output. Each acquisition yields one independent resource.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn acquire(
        &self,
        uri: &str,
        volume: f32,
        autoplay: bool,
        status: StatusSender,
    ) -> Result<Box<dyn AudioHandle>>;
}

#[async_trait]
pub trait AudioHandle: Send {
    async fn play(&mut self) -> Result<()>;
    async fn pause(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
    async fn set_volume(&mut self, volume: f32) -> Result<()>;
    /// Releases the resource. The handle must not be used afterwards.
    async fn unload(&mut self) -> Result<()>;
}
