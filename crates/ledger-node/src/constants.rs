pub const DEFAULT_HTTP_PORT: u16 = 6973;
pub const DEFAULT_P2P_PORT: u16 = 6974;
pub const EVENT_QUEUE_CAPACITY: usize = 1024;
pub const PEER_OUTBOX_CAPACITY: usize = 256;
pub const CONNECT_TIMEOUT_SECS: u64 = 5;
