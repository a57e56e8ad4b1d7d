use ledger_core::{Message, PeerId, SyncEngine, Transport};
use std::sync::Mutex;

/// Transport that records everything the engine tries to send.
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(PeerId, Message)>>,
    pub broadcasts: Mutex<Vec<Message>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<(PeerId, Message)> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn broadcasts(&self) -> Vec<Message> {
        self.broadcasts.lock().expect("broadcast lock").clone()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("sent lock").clear();
        self.broadcasts.lock().expect("broadcast lock").clear();
    }
}

impl Transport for RecordingTransport {
    fn send(&self, peer: PeerId, message: &Message) {
        self.sent
            .lock()
            .expect("sent lock")
            .push((peer, message.clone()));
    }

    fn broadcast(&self, message: &Message) {
        self.broadcasts
            .lock()
            .expect("broadcast lock")
            .push(message.clone());
    }
}

/// Engine that has mined `count` blocks on top of genesis.
pub fn engine_with_blocks(count: usize, tag: &str) -> SyncEngine {
    let sink = RecordingTransport::default();
    let mut engine = SyncEngine::default();
    for i in 0..count {
        engine.on_local_mine(format!("{tag}-{i}"), &sink);
    }
    engine
}
