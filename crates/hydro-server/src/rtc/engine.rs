//! webrtc-rs backed negotiation engine
//!
//! One [`RtcEngine`] per process: it owns the ICE listeners and the webrtc
//! `API` object every peer connection is created from.

use super::{
    FeedbackChannel, InboundTrack, MediaKind, NegotiationEngine,
    NegotiationSession, RtpPacket, SharedTrack, TransportError, TransportEvent,
};
use crate::state::RtcConfig;
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{mpsc, watch, Mutex, OnceCell};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice::udp_mux::{UDPMuxDefault, UDPMuxParams};
use webrtc::ice::udp_network::UDPNetwork;
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_local::{TrackLocal, TrackLocalWriter};
use webrtc::track::track_remote::TrackRemote;

/// Which ICE listeners came up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportModes {
    pub udp: bool,
    pub tcp: bool,
}

pub struct RtcEngine {
    api: API,
    ice_servers: Vec<RTCIceServer>,
    modes: TransportModes,
    // Only reserves the port; webrtc-rs has no ICE-TCP mux, so no media is served on it
    _reliable_listener: Option<TcpListener>,
}

impl RtcEngine {
    /// Build the engine and bind its listeners. A listener that fails to
    /// bind only disables that transport mode.
    pub async fn initialize(config: &RtcConfig) -> Result<Self, TransportError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| TransportError::Construction(format!("codec registration: {}", e)))?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| TransportError::Construction(format!("interceptors: {}", e)))?;

        let mut setting_engine = SettingEngine::default();
        let mut modes = TransportModes::default();

        let udp_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.udp_port));
        match UdpSocket::bind(udp_addr).await {
            Ok(socket) => {
                let mux = UDPMuxDefault::new(UDPMuxParams::new(socket));
                setting_engine.set_udp_network(UDPNetwork::Muxed(mux));
                modes.udp = true;
                tracing::info!(port = config.udp_port, "RTC: UDP mux active");
            }
            Err(e) => {
                tracing::warn!(port = config.udp_port, error = %e, "RTC: UDP bind failed");
            }
        }

        let tcp_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.tcp_port));
        let reliable_listener = match TcpListener::bind(tcp_addr).await {
            Ok(listener) => {
                modes.tcp = true;
                tracing::info!(port = config.tcp_port, "RTC: TCP listener active");
                Some(listener)
            }
            Err(e) => {
                tracing::warn!(
                    port = config.tcp_port,
                    error = %e,
                    "RTC: TCP bind failed (non-critical)"
                );
                None
            }
        };

        if !config.public_ips.is_empty() {
            setting_engine.set_nat_1to1_ips(config.public_ips.clone(), RTCIceCandidateType::Host);
            tracing::info!(ips = ?config.public_ips, "RTC: NAT 1:1 rewriting enabled");
        }

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let ice_servers = config
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        Ok(Self {
            api,
            ice_servers,
            modes,
            _reliable_listener: reliable_listener,
        })
    }

    pub fn transport_modes(&self) -> TransportModes {
        self.modes
    }
}

#[async_trait]
impl NegotiationEngine for RtcEngine {
    async fn new_session(&self) -> Result<Arc<dyn NegotiationSession>, TransportError> {
        let config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };

        let peer_connection = self
            .api
            .new_peer_connection(config)
            .await
            .map_err(|e| TransportError::Construction(e.to_string()))?;

        Ok(Arc::new(WebRtcSession::new(Arc::new(peer_connection))))
    }
}

/// Engine that is built on first use and shared afterwards
pub struct LazyEngine {
    config: RtcConfig,
    engine: OnceCell<RtcEngine>,
}

impl LazyEngine {
    pub fn new(config: RtcConfig) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
        }
    }

    async fn engine(&self) -> Result<&RtcEngine, TransportError> {
        self.engine
            .get_or_try_init(|| async {
                tracing::info!("Initializing RTC engine");
                RtcEngine::initialize(&self.config).await
            })
            .await
    }

    /// `None` until the first session has been requested
    pub fn transport_modes(&self) -> Option<TransportModes> {
        self.engine.get().map(RtcEngine::transport_modes)
    }
}

#[async_trait]
impl NegotiationEngine for LazyEngine {
    async fn new_session(&self) -> Result<Arc<dyn NegotiationSession>, TransportError> {
        self.engine().await?.new_session().await
    }
}

/// Negotiation session over a webrtc-rs peer connection
pub struct WebRtcSession {
    peer_connection: Arc<RTCPeerConnection>,
    events: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    shutdown: watch::Sender<bool>,
}

impl WebRtcSession {
    fn new(peer_connection: Arc<RTCPeerConnection>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let track_tx = event_tx.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let inbound: Arc<dyn InboundTrack> = Arc::new(WebRtcInboundTrack { track });
            let _ = track_tx.send(TransportEvent::Track(inbound));
            Box::pin(async {})
        }));

        peer_connection.on_peer_connection_state_change(Box::new(move |state| {
            let _ = event_tx.send(TransportEvent::StateChanged(state.into()));
            Box::pin(async {})
        }));

        let (shutdown, _) = watch::channel(false);

        Self {
            peer_connection,
            events: Mutex::new(Some(event_rx)),
            shutdown,
        }
    }
}

#[async_trait]
impl NegotiationSession for WebRtcSession {
    async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events.lock().await.take()
    }

    async fn set_remote_offer(&self, sdp: &str) -> Result<(), TransportError> {
        let offer = RTCSessionDescription::offer(sdp.to_owned())
            .map_err(|e| TransportError::InvalidDescription(e.to_string()))?;

        self.peer_connection
            .set_remote_description(offer)
            .await
            .map_err(|e| TransportError::InvalidDescription(e.to_string()))
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .map_err(|e| TransportError::Negotiation(format!("create answer: {}", e)))?;

        let sdp = answer.sdp.clone();

        self.peer_connection
            .set_local_description(answer)
            .await
            .map_err(|e| TransportError::Negotiation(format!("set local description: {}", e)))?;

        Ok(sdp)
    }

    async fn gathering_complete(&self) -> Result<(), TransportError> {
        let mut done = self.peer_connection.gathering_complete_promise().await;
        let _ = done.recv().await;
        Ok(())
    }

    async fn local_description(&self) -> Option<String> {
        self.peer_connection
            .local_description()
            .await
            .map(|description| description.sdp)
    }

    async fn attach_outbound(
        &self,
        track: &Arc<SharedTrack>,
    ) -> Result<Box<dyn FeedbackChannel>, TransportError> {
        // Each viewer gets its own local track fed from its own queue on the shared track
        let local_track = Arc::new(TrackLocalStaticRTP::new(
            track.codec().clone(),
            track.track_id().to_string(),
            track.stream_id().to_string(),
        ));

        let sender = self
            .peer_connection
            .add_track(Arc::clone(&local_track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .map_err(|e| TransportError::Negotiation(format!("add track: {}", e)))?;

        let mut subscription = track.subscribe();
        let mut shutdown = self.shutdown.subscribe();
        let stream_id = track.stream_id().to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    packet = subscription.recv() => match packet {
                        Some(packet) => {
                            if let Err(e) = local_track.write_rtp(&packet).await {
                                tracing::warn!(stream_id = %stream_id, "Viewer write failed: {}", e);
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            tracing::debug!(
                stream_id = %stream_id,
                dropped = subscription.dropped(),
                "Viewer forwarder stopped"
            );
        });

        Ok(Box::new(WebRtcFeedback { sender }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shutdown.send_replace(true);
        self.peer_connection
            .close()
            .await
            .map_err(|e| TransportError::Negotiation(format!("close: {}", e)))
    }
}

struct WebRtcInboundTrack {
    track: Arc<TrackRemote>,
}

#[async_trait]
impl InboundTrack for WebRtcInboundTrack {
    fn kind(&self) -> MediaKind {
        self.track.kind().into()
    }

    async fn read_packet(&self) -> Result<RtpPacket, TransportError> {
        self.track
            .read_rtp()
            .await
            .map(|(packet, _attributes)| packet)
            .map_err(|e| TransportError::Read(e.to_string()))
    }
}

struct WebRtcFeedback {
    sender: Arc<RTCRtpSender>,
}

#[async_trait]
impl FeedbackChannel for WebRtcFeedback {
    async fn read_feedback(&self) -> Result<usize, TransportError> {
        let mut buf = vec![0u8; 1500];
        self.sender
            .read(&mut buf)
            .await
            .map(|(packets, _attributes)| packets.len())
            .map_err(|_| TransportError::Closed)
    }
}
