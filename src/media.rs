use crate::error::CallError;
use crate::logger::log;
use crate::peer::types::PeerId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

/// The pair of local tracks produced by a capture backend.
pub struct MediaTracks {
    pub audio: Arc<TrackLocalStaticSample>,
    pub video: Arc<TrackLocalStaticSample>,
}

/// Seam to the platform capture device. Acquisition is a single call; retry
/// and permission-prompt UX belong to the presentation layer, not here.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Camera and microphone tracks.
    async fn user_media(&self) -> Result<MediaTracks, CallError>;
    /// A display-capture video track for screen sharing.
    async fn display_media(&self) -> Result<Arc<TrackLocalStaticSample>, CallError>;
}

/// Capture backend for headless deployments: every acquisition is denied.
pub struct NullCapture;

#[async_trait]
impl MediaCapture for NullCapture {
    async fn user_media(&self) -> Result<MediaTracks, CallError> {
        Err(CallError::CaptureDenied)
    }

    async fn display_media(&self) -> Result<Arc<TrackLocalStaticSample>, CallError> {
        Err(CallError::CaptureDenied)
    }
}

/// The process-wide capture stream, shared by reference across all sessions
/// that attached it.
///
/// The enabled flags are the mute state. Toggling flips one shared flag with
/// no renegotiation: the sample pump consults the flag before writing, so the
/// change is visible to every peer at once. The camera track stays owned here
/// while a screen track is substituted on the senders.
pub struct LocalMediaSource {
    audio: Arc<TrackLocalStaticSample>,
    video: Arc<TrackLocalStaticSample>,
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
}

impl LocalMediaSource {
    pub fn new(tracks: MediaTracks) -> Arc<Self> {
        Arc::new(Self {
            audio: tracks.audio,
            video: tracks.video,
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(true),
        })
    }

    pub fn audio_track(&self) -> Arc<TrackLocalStaticSample> {
        self.audio.clone()
    }

    pub fn video_track(&self) -> Arc<TrackLocalStaticSample> {
        self.video.clone()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::Relaxed)
    }

    pub fn video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::Relaxed)
    }

    fn toggle_audio(&self) -> bool {
        let now = !self.audio_enabled();
        self.audio_enabled.store(now, Ordering::Relaxed);
        now
    }

    fn toggle_video(&self) -> bool {
        let now = !self.video_enabled();
        self.video_enabled.store(now, Ordering::Relaxed);
        now
    }
}

/// Owns the single local capture stream and mutates outgoing tracks across
/// all sessions: mute toggles and screen-share substitution.
pub struct MediaSourceManager {
    capture: Arc<dyn MediaCapture>,
    source: Option<Arc<LocalMediaSource>>,
    screen_track: Option<Arc<TrackLocalStaticSample>>,
}

impl MediaSourceManager {
    pub fn new(capture: Arc<dyn MediaCapture>) -> Self {
        Self {
            capture,
            source: None,
            screen_track: None,
        }
    }

    /// Acquires the capture stream. At most one is active; a second call
    /// returns the existing source.
    pub async fn start(&mut self) -> Result<Arc<LocalMediaSource>, CallError> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        let tracks = self.capture.user_media().await?;
        let source = LocalMediaSource::new(tracks);
        self.source = Some(source.clone());
        log("local media source acquired");
        Ok(source)
    }

    pub fn source(&self) -> Option<Arc<LocalMediaSource>> {
        self.source.clone()
    }

    /// Flips the shared audio flag. Returns the new enabled state, or None if
    /// no media is active. No signaling message is produced.
    pub fn toggle_audio(&self) -> Option<bool> {
        let enabled = self.source.as_ref()?.toggle_audio();
        log(&format!("audio {}", if enabled { "unmuted" } else { "muted" }));
        Some(enabled)
    }

    pub fn toggle_video(&self) -> Option<bool> {
        let enabled = self.source.as_ref()?.toggle_video();
        log(&format!(
            "camera {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        Some(enabled)
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen_track.is_some()
    }

    /// Acquires a display track and substitutes it, in place, on every
    /// session's outgoing video sender. A failure on one sender is logged and
    /// does not block substitution on the others.
    pub async fn start_screen_share(
        &mut self,
        senders: &[(PeerId, Arc<RTCRtpSender>)],
    ) -> Result<(), CallError> {
        if self.screen_track.is_some() {
            return Ok(());
        }
        let screen = self.capture.display_media().await?;
        Self::substitute(senders, screen.clone(), "screen").await;
        self.screen_track = Some(screen);
        Ok(())
    }

    /// Restores the camera track on every sender, symmetric to
    /// `start_screen_share`. No-op when not sharing.
    pub async fn stop_screen_share(&mut self, senders: &[(PeerId, Arc<RTCRtpSender>)]) {
        if self.screen_track.take().is_none() {
            return;
        }
        if let Some(source) = &self.source {
            Self::substitute(senders, source.video_track(), "camera").await;
        }
    }

    async fn substitute(
        senders: &[(PeerId, Arc<RTCRtpSender>)],
        track: Arc<TrackLocalStaticSample>,
        label: &str,
    ) {
        for (peer_id, sender) in senders {
            let replacement = track.clone() as Arc<dyn TrackLocal + Send + Sync>;
            match sender.replace_track(Some(replacement)).await {
                Ok(()) => log(&format!("{label} track substituted for {peer_id}")),
                Err(e) => log(&format!("{label} track substitution for {peer_id}: {e}")),
            }
        }
    }

    /// Drops the capture stream and any active screen share. Called on
    /// hangup.
    pub fn release(&mut self) {
        self.source = None;
        self.screen_track = None;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FakeCapture;
    use super::*;

    #[tokio::test]
    async fn toggle_is_visible_through_every_handle() {
        let mut manager = MediaSourceManager::new(Arc::new(FakeCapture));
        let source = manager.start().await.unwrap();
        let other_handle = source.clone();

        assert!(other_handle.audio_enabled());
        assert_eq!(manager.toggle_audio(), Some(false));
        assert!(!other_handle.audio_enabled());
        assert_eq!(manager.toggle_audio(), Some(true));
        assert!(other_handle.audio_enabled());
    }

    #[tokio::test]
    async fn second_start_reuses_the_active_source() {
        let mut manager = MediaSourceManager::new(Arc::new(FakeCapture));
        let first = manager.start().await.unwrap();
        let second = manager.start().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn capture_denial_is_its_own_condition() {
        let mut manager = MediaSourceManager::new(Arc::new(NullCapture));
        match manager.start().await {
            Err(CallError::CaptureDenied) => {}
            Err(e) => panic!("wrong error: {e}"),
            Ok(_) => panic!("expected CaptureDenied"),
        }
        assert!(manager.source().is_none());
    }

    #[tokio::test]
    async fn toggle_without_media_is_none() {
        let manager = MediaSourceManager::new(Arc::new(NullCapture));
        assert_eq!(manager.toggle_audio(), None);
        assert_eq!(manager.toggle_video(), None);
    }
}
