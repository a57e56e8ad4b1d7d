mod helpers;

use helpers::{engine_with_blocks, RecordingTransport};
use ledger_core::chain::is_valid_chain;
use ledger_core::{
    genesis_block, Block, ChainError, Message, PeerId, RejectReason, SyncEngine, SyncOutcome,
    ValidationError,
};
use rand::Rng;

const SENDER: PeerId = PeerId(7);

#[tokio::test]
async fn test_single_block_extends_genesis() -> anyhow::Result<()> {
    let transport = RecordingTransport::default();
    let mut node = SyncEngine::default();
    let block = Block::new(
        1,
        genesis_block().hash,
        ledger_core::now_secs(),
        "hello".into(),
    );

    let outcome = node.on_peer_message(SENDER, Message::ChainData(vec![block.clone()]), &transport);

    assert_eq!(outcome, SyncOutcome::Appended);
    assert_eq!(node.chain().len(), 2);
    assert_eq!(node.chain().latest(), &block);
    assert_eq!(transport.broadcasts(), vec![Message::ChainData(vec![block])]);
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_repeated_announcement_is_noop() -> anyhow::Result<()> {
    let transport = RecordingTransport::default();
    let mut node = SyncEngine::default();
    let block = node.chain().propose_next("once");
    let message = Message::ChainData(vec![block]);

    assert_eq!(
        node.on_peer_message(SENDER, message.clone(), &transport),
        SyncOutcome::Appended
    );
    transport.clear();
    let before = node.chain().blocks().to_vec();

    assert_eq!(
        node.on_peer_message(SENDER, message, &transport),
        SyncOutcome::NotNewer
    );
    assert_eq!(node.chain().blocks(), &before[..]);
    assert!(transport.broadcasts().is_empty());
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_out_of_contiguity_block_queries_sender() -> anyhow::Result<()> {
    let transport = RecordingTransport::default();
    let mut node = engine_with_blocks(1, "local");
    let stray = Block::new(7, "ab".repeat(32), ledger_core::now_secs(), "far ahead".into());

    let outcome = node.on_peer_message(SENDER, Message::ChainData(vec![stray]), &transport);

    assert_eq!(outcome, SyncOutcome::RequestedFullChain);
    assert_eq!(node.chain().len(), 2);
    assert_eq!(transport.sent(), vec![(SENDER, Message::QueryAll)]);
    assert!(transport.broadcasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_linked_block_with_bad_hash_is_rejected() -> anyhow::Result<()> {
    let transport = RecordingTransport::default();
    let mut node = SyncEngine::default();
    let mut block = node.chain().propose_next("honest");
    block.data = "forged".into();

    let outcome = node.on_peer_message(SENDER, Message::ChainData(vec![block]), &transport);

    assert_eq!(
        outcome,
        SyncOutcome::Rejected(RejectReason::Block(ValidationError::HashMismatch))
    );
    assert_eq!(node.chain().len(), 1);
    assert!(transport.broadcasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_longest_chain_convergence() -> anyhow::Result<()> {
    let a = engine_with_blocks(5, "a");
    let mut b = engine_with_blocks(3, "b");
    let transport = RecordingTransport::default();
    let forked_tip = b.chain().latest().clone();

    // A announces its tip; B cannot link it and asks for everything.
    let announce = Message::ChainData(vec![a.chain().latest().clone()]);
    assert_eq!(
        b.on_peer_message(SENDER, announce, &transport),
        SyncOutcome::RequestedFullChain
    );
    assert_eq!(transport.sent(), vec![(SENDER, Message::QueryAll)]);

    let full = Message::ChainData(a.chain().blocks().to_vec());
    assert_eq!(b.on_peer_message(SENDER, full, &transport), SyncOutcome::Replaced);

    assert_eq!(b.chain().len(), 6);
    assert_eq!(b.chain().blocks(), a.chain().blocks());
    assert!(!b.chain().blocks().contains(&forked_tip));
    assert_eq!(
        transport.broadcasts(),
        vec![Message::ChainData(vec![a.chain().latest().clone()])]
    );
    Ok(())
}

#[tokio::test]
async fn test_equal_length_never_replaces() -> anyhow::Result<()> {
    let a = engine_with_blocks(3, "a");
    let mut b = engine_with_blocks(3, "b");
    let transport = RecordingTransport::default();
    let before = b.chain().blocks().to_vec();

    let outcome = b.on_peer_message(
        SENDER,
        Message::ChainData(a.chain().blocks().to_vec()),
        &transport,
    );

    assert_eq!(outcome, SyncOutcome::NotNewer);
    assert_eq!(b.chain().blocks(), &before[..]);
    assert!(transport.broadcasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_shorter_chain_is_ignored() -> anyhow::Result<()> {
    let a = engine_with_blocks(2, "a");
    let mut b = engine_with_blocks(4, "b");
    let transport = RecordingTransport::default();
    let before = b.chain().blocks().to_vec();

    let outcome = b.on_peer_message(
        SENDER,
        Message::ChainData(a.chain().blocks().to_vec()),
        &transport,
    );

    assert_eq!(outcome, SyncOutcome::NotNewer);
    assert_eq!(b.chain().blocks(), &before[..]);
    assert!(transport.broadcasts().is_empty());
    assert!(transport.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_longer_but_tampered_chain_is_discarded() -> anyhow::Result<()> {
    let a = engine_with_blocks(5, "a");
    let mut b = engine_with_blocks(2, "b");
    let transport = RecordingTransport::default();
    let mut blocks = a.chain().blocks().to_vec();
    blocks[3].data = "rewritten history".into();

    let outcome = b.on_peer_message(SENDER, Message::ChainData(blocks), &transport);

    assert_eq!(
        outcome,
        SyncOutcome::Rejected(RejectReason::Chain(ChainError::InvalidLink {
            position: 3,
            source: ValidationError::HashMismatch,
        }))
    );
    assert_eq!(b.chain().len(), 3);
    assert!(transport.broadcasts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_any_payload_mutation_invalidates_chain() -> anyhow::Result<()> {
    let a = engine_with_blocks(8, "a");
    let mut rng = rand::thread_rng();
    for _ in 0..32 {
        let mut blocks = a.chain().blocks().to_vec();
        // Non-tip, non-genesis block.
        let target = rng.gen_range(1..blocks.len() - 1);
        let mut bytes = blocks[target].data.clone().into_bytes();
        let pos = rng.gen_range(0..bytes.len());
        bytes[pos] = if bytes[pos] == b'z' { b'y' } else { b'z' };
        blocks[target].data = String::from_utf8(bytes)?;
        assert!(is_valid_chain(&blocks).is_err());
    }
    assert!(is_valid_chain(a.chain().blocks()).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_malformed_frames_leave_state_untouched() -> anyhow::Result<()> {
    let transport = RecordingTransport::default();
    let mut node = engine_with_blocks(1, "local");
    for raw in ["", "{}", "{\"type\":3}", "{\"type\":2,\"data\":\"[]\"}", "[0]"] {
        assert_eq!(
            node.on_raw_message(SENDER, raw, &transport),
            SyncOutcome::Malformed
        );
    }
    assert_eq!(node.chain().len(), 2);
    assert!(transport.sent().is_empty());
    assert!(transport.broadcasts().is_empty());

    let raw = Message::QueryLatest.encode()?;
    assert_eq!(
        node.on_raw_message(SENDER, &raw, &transport),
        SyncOutcome::Replied
    );
    Ok(())
}
