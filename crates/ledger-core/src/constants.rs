pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_TIMESTAMP: u64 = 1_465_154_705;
pub const GENESIS_DATA: &str = "Insert time relevant information here";
pub const MSG_QUERY_LATEST: u8 = 0;
pub const MSG_QUERY_ALL: u8 = 1;
pub const MSG_CHAIN_DATA: u8 = 2;
