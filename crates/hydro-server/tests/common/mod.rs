//! In-memory negotiation transport for driving the ingest core without sockets
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use hydro_server::rtc::{
    FeedbackChannel, InboundTrack, MediaKind, NegotiationEngine, NegotiationSession, RtpPacket,
    SharedTrack, TransportError, TransportEvent,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

pub const ANSWER_SDP: &str = "v=0\r\no=- 2 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n\
a=candidate:1 1 udp 2130706431 127.0.0.1 50000 typ host\r\n";

pub fn packet(sequence_number: u16) -> RtpPacket {
    let mut packet = RtpPacket::default();
    packet.header.version = 2;
    packet.header.sequence_number = sequence_number;
    packet.payload = Bytes::from(vec![0u8; 16]);
    packet
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// [`eventually`] for checks that need to await
pub async fn eventually_async<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[derive(Default)]
pub struct FakeEngine {
    sessions: Mutex<Vec<Arc<FakeSession>>>,
    fail_new_session: AtomicBool,
    reject_offer: AtomicBool,
    hold_gathering: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_new_session(&self, fail: bool) {
        self.fail_new_session.store(fail, Ordering::SeqCst);
    }

    pub fn reject_offer(&self, reject: bool) {
        self.reject_offer.store(reject, Ordering::SeqCst);
    }

    /// Sessions created from now on never finish gathering
    pub fn hold_gathering(&self, hold: bool) {
        self.hold_gathering.store(hold, Ordering::SeqCst);
    }

    /// Every session handed out so far, in creation order
    pub fn sessions(&self) -> Vec<Arc<FakeSession>> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn session(&self, index: usize) -> Arc<FakeSession> {
        Arc::clone(&self.sessions.lock().unwrap()[index])
    }
}

#[async_trait]
impl NegotiationEngine for FakeEngine {
    async fn new_session(&self) -> Result<Arc<dyn NegotiationSession>, TransportError> {
        if self.fail_new_session.load(Ordering::SeqCst) {
            return Err(TransportError::Construction("no ports left".to_string()));
        }

        let session = Arc::new(FakeSession::new(
            self.reject_offer.load(Ordering::SeqCst),
            self.hold_gathering.load(Ordering::SeqCst),
        ));
        self.sessions.lock().unwrap().push(Arc::clone(&session));
        Ok(session)
    }
}

pub struct FakeSession {
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    reject_offer: bool,
    hold_gathering: bool,
    remote_offer: Mutex<Option<String>>,
    answered: AtomicBool,
    closed: watch::Sender<bool>,
    received: Arc<Mutex<Vec<u16>>>,
}

impl FakeSession {
    fn new(reject_offer: bool, hold_gathering: bool) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        Self {
            events_tx,
            events_rx: tokio::sync::Mutex::new(Some(events_rx)),
            reject_offer,
            hold_gathering,
            remote_offer: Mutex::new(None),
            answered: AtomicBool::new(false),
            closed,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Push a transport event as if the remote side caused it
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn remote_offer(&self) -> Option<String> {
        self.remote_offer.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Sequence numbers delivered to this session's outbound attachment
    pub fn received(&self) -> Vec<u16> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl NegotiationSession for FakeSession {
    async fn take_events(&self) -> Option<mpsc::UnboundedReceiver<TransportEvent>> {
        self.events_rx.lock().await.take()
    }

    async fn set_remote_offer(&self, sdp: &str) -> Result<(), TransportError> {
        if self.reject_offer {
            return Err(TransportError::InvalidDescription(
                "missing media section".to_string(),
            ));
        }
        *self.remote_offer.lock().unwrap() = Some(sdp.to_string());
        Ok(())
    }

    async fn create_answer(&self) -> Result<String, TransportError> {
        if self.remote_offer.lock().unwrap().is_none() {
            return Err(TransportError::Negotiation("no remote offer".to_string()));
        }
        self.answered.store(true, Ordering::SeqCst);
        Ok(ANSWER_SDP.to_string())
    }

    async fn gathering_complete(&self) -> Result<(), TransportError> {
        if self.hold_gathering {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<String> {
        self.answered
            .load(Ordering::SeqCst)
            .then(|| ANSWER_SDP.to_string())
    }

    async fn attach_outbound(
        &self,
        track: &Arc<SharedTrack>,
    ) -> Result<Box<dyn FeedbackChannel>, TransportError> {
        let mut subscription = track.subscribe();
        let received = Arc::clone(&self.received);
        tokio::spawn(async move {
            while let Some(packet) = subscription.recv().await {
                received.lock().unwrap().push(packet.header.sequence_number);
            }
        });

        Ok(Box::new(FakeFeedback {
            closed: self.closed.subscribe(),
        }))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.send_replace(true);
        Ok(())
    }
}

struct FakeFeedback {
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl FeedbackChannel for FakeFeedback {
    async fn read_feedback(&self) -> Result<usize, TransportError> {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
        Err(TransportError::Closed)
    }
}

/// Remote track fed from a channel; dropping the sender ends it
pub struct FakeTrack {
    kind: MediaKind,
    packets: tokio::sync::Mutex<mpsc::UnboundedReceiver<RtpPacket>>,
}

impl FakeTrack {
    pub fn new(kind: MediaKind) -> (Arc<Self>, mpsc::UnboundedSender<RtpPacket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let track = Arc::new(Self {
            kind,
            packets: tokio::sync::Mutex::new(rx),
        });
        (track, tx)
    }
}

#[async_trait]
impl InboundTrack for FakeTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn read_packet(&self) -> Result<RtpPacket, TransportError> {
        self.packets
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| TransportError::Read("EOF".to_string()))
    }
}
