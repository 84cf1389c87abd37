//! Shared track
//!
//! The single fan-out point of a stream. The publisher relay loop is the only
//! writer; every attached viewer reads through its own bounded queue, so a
//! viewer that falls behind drops its own oldest packets instead of stalling
//! the writer or the other viewers.

use super::{RtpPacket, TransportError};
use tokio::sync::{broadcast, watch};
use webrtc::api::media_engine::MIME_TYPE_H264;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;

pub struct SharedTrack {
    track_id: String,
    stream_id: String,
    codec: RTCRtpCodecCapability,
    packets: broadcast::Sender<RtpPacket>,
    closed: watch::Sender<bool>,
}

impl SharedTrack {
    /// Create an H.264 video track for a stream.
    /// `queue_depth` bounds each reader's backlog.
    pub fn new(stream_id: &str, queue_depth: usize) -> Self {
        let (packets, _) = broadcast::channel(queue_depth.max(1));
        let (closed, _) = watch::channel(false);

        // Only the mime type is pinned; fmtp comes from whatever the viewer negotiates
        let codec = RTCRtpCodecCapability {
            mime_type: MIME_TYPE_H264.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        };

        Self {
            track_id: "video".to_string(),
            stream_id: stream_id.to_string(),
            codec,
            packets,
            closed,
        }
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn codec(&self) -> &RTCRtpCodecCapability {
        &self.codec
    }

    /// Publish a packet to every current reader. Returns how many readers
    /// were handed the packet; zero readers is not an error.
    pub fn write_packet(&self, packet: RtpPacket) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::RelayWrite(format!(
                "track {} of stream {} is closed",
                self.track_id, self.stream_id
            )));
        }

        Ok(self.packets.send(packet).unwrap_or(0))
    }

    /// Start reading. Only packets written after this call are observed.
    pub fn subscribe(&self) -> TrackSubscription {
        TrackSubscription {
            packets: self.packets.subscribe(),
            closed: self.closed.subscribe(),
            dropped: 0,
        }
    }

    pub fn reader_count(&self) -> usize {
        self.packets.receiver_count()
    }

    /// Stop accepting writes and end every subscription
    pub fn close(&self) {
        if !self.closed.send_replace(true) {
            tracing::debug!(stream_id = %self.stream_id, "Shared track closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// One reader of a [`SharedTrack`]
pub struct TrackSubscription {
    packets: broadcast::Receiver<RtpPacket>,
    closed: watch::Receiver<bool>,
    dropped: u64,
}

impl TrackSubscription {
    /// Next packet in write order, or `None` once the track is closed or gone
    pub async fn recv(&mut self) -> Option<RtpPacket> {
        loop {
            if *self.closed.borrow() {
                return None;
            }

            tokio::select! {
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                result = self.packets.recv() => match result {
                    Ok(packet) => return Some(packet),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        self.dropped += n;
                        tracing::warn!("Track reader lagged, skipped {} packets", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    /// Packets skipped because this reader fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::rtp::header::Header;

    fn packet(seq: u16) -> RtpPacket {
        RtpPacket {
            header: Header {
                sequence_number: seq,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let track = SharedTrack::new("s1", 64);
        let mut first = track.subscribe();
        let mut second = track.subscribe();

        for seq in 1..=10 {
            assert_eq!(track.write_packet(packet(seq)).unwrap(), 2);
        }
        track.close();

        // Closing ends the subscription without draining the backlog
        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_every_reader_sees_packets_in_write_order() {
        let track = SharedTrack::new("s1", 64);
        let mut first = track.subscribe();
        let mut second = track.subscribe();

        for seq in 1..=5 {
            track.write_packet(packet(seq)).unwrap();
        }

        for expected in 1..=5 {
            assert_eq!(first.recv().await.unwrap().header.sequence_number, expected);
        }
        for expected in 1..=5 {
            assert_eq!(second.recv().await.unwrap().header.sequence_number, expected);
        }
    }

    #[tokio::test]
    async fn test_write_without_readers_is_not_an_error() {
        let track = SharedTrack::new("s1", 8);
        assert_eq!(track.write_packet(packet(1)).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let track = SharedTrack::new("s1", 8);
        track.close();
        assert!(matches!(
            track.write_packet(packet(1)),
            Err(TransportError::RelayWrite(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_reader_lags_without_blocking_writer() {
        let track = SharedTrack::new("s1", 4);
        let mut slow = track.subscribe();

        for seq in 1..=20 {
            track.write_packet(packet(seq)).unwrap();
        }

        // Only the newest `queue_depth` packets survive, still in order
        let mut seen = vec![];
        for _ in 0..4 {
            seen.push(slow.recv().await.unwrap().header.sequence_number);
        }
        assert_eq!(seen, vec![17, 18, 19, 20]);
        assert_eq!(slow.dropped(), 16);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_reader() {
        let track = std::sync::Arc::new(SharedTrack::new("s1", 8));
        let mut reader = track.subscribe();

        let handle = tokio::spawn(async move { reader.recv().await });
        tokio::task::yield_now().await;
        track.close();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_none());
    }
}
