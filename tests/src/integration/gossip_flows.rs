//! # Gossip Flow Tests
//!
//! End-to-end dissemination through the public ports: transactions enter
//! through local submission or peer messages and leave as wire frames
//! handed to the transport, one broadcast task per peer.
//!
//! ## Flows Tested
//!
//! 1. **Local submission → all peers**: admission order preserved per peer
//! 2. **Peer gossip → re-broadcast**: inbound frames reach the other peers
//! 3. **Protocol violations**: malformed frames and unknown groups get the
//!    sender reported to the transport
//! 4. **Eviction**: removed transactions stop relaying but stay suppressed

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout};

    use relay_gossip::ports::outbound::{AdmissionCheck, GossipTransport, PeerStateView};
    use relay_gossip::wire::{self, GossipMessage, TxMessage};
    use relay_gossip::{
        BroadcastConfig, ChannelId, GossipError, GroupConfig, GroupId, Height, PeerId,
        ProtocolViolation, RejectReason, TxGossipApi, TxGossipService,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Admission check that accepts everything unless told otherwise.
    struct OpenAdmission {
        accept: AtomicBool,
    }

    impl OpenAdmission {
        fn new() -> Self {
            Self {
                accept: AtomicBool::new(true),
            }
        }

        fn reject_all(&self) {
            self.accept.store(false, Ordering::SeqCst);
        }
    }

    impl AdmissionCheck for OpenAdmission {
        fn check_tx(&self, _tx: &[u8]) -> Result<(), RejectReason> {
            if self.accept.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(RejectReason::new("rejected by test policy"))
            }
        }
    }

    /// Height view with every peer pinned at the local height, so catch-up
    /// never interferes with these flows.
    struct FlatHeights {
        height: Height,
    }

    impl PeerStateView for FlatHeights {
        fn local_height(&self) -> Height {
            self.height
        }

        fn peer_height(&self, _peer: &PeerId) -> Option<Height> {
            Some(self.height)
        }
    }

    /// Transport that records every frame and violation it is handed.
    struct RecordingTransport {
        frames: Mutex<Vec<(PeerId, ChannelId, Vec<u8>)>>,
        delivered: watch::Sender<u64>,
        stopped: Mutex<Vec<(PeerId, String)>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            let (delivered, _) = watch::channel(0);
            Self {
                frames: Mutex::new(Vec::new()),
                delivered,
                stopped: Mutex::new(Vec::new()),
            }
        }

        fn frames_for(&self, peer: &PeerId) -> Vec<Vec<u8>> {
            self.frames
                .lock()
                .iter()
                .filter(|(to, _, _)| to == peer)
                .map(|(_, _, bytes)| bytes.clone())
                .collect()
        }

        fn total(&self) -> u64 {
            *self.delivered.borrow()
        }

        async fn wait_for_frames(&self, count: u64) {
            let mut rx = self.delivered.subscribe();
            rx.wait_for(|&sent| sent >= count)
                .await
                .expect("transport dropped while waiting");
        }

        fn stopped_peers(&self) -> Vec<(PeerId, String)> {
            self.stopped.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl GossipTransport for RecordingTransport {
        async fn send_tx(&self, peer: &PeerId, channel: ChannelId, bytes: Vec<u8>) -> bool {
            self.frames.lock().push((*peer, channel, bytes));
            self.delivered.send_modify(|sent| *sent += 1);
            true
        }

        fn stop_peer(&self, peer: &PeerId, violation: ProtocolViolation) {
            self.stopped.lock().push((*peer, violation.to_string()));
        }
    }

    type FlowService = TxGossipService<OpenAdmission, FlatHeights, RecordingTransport>;

    fn create_peer(tag: u8) -> PeerId {
        PeerId::new([tag; 32])
    }

    fn create_service(
        groups: Vec<GroupConfig>,
    ) -> (FlowService, Arc<OpenAdmission>, Arc<RecordingTransport>) {
        let admission = Arc::new(OpenAdmission::new());
        let heights = Arc::new(FlatHeights { height: 10 });
        let transport = Arc::new(RecordingTransport::new());
        let config = BroadcastConfig {
            catchup_backoff_ms: 10,
            ..BroadcastConfig::default()
        };
        let service = TxGossipService::new(
            groups,
            config,
            Arc::clone(&admission),
            heights,
            Arc::clone(&transport),
        )
        .expect("valid test configuration");
        (service, admission, transport)
    }

    fn encode_frame(group: u32, tx: &[u8]) -> Vec<u8> {
        wire::encode(&GossipMessage::Tx(TxMessage {
            group: GroupId(group),
            tx: tx.to_vec(),
        }))
        .expect("encodable test frame")
    }

    /// Decodes a recorded frame back into its group and transaction bytes.
    fn decode_frame(frame: &[u8]) -> (GroupId, Vec<u8>) {
        match wire::decode(frame, usize::MAX).expect("recorded frame decodes") {
            GossipMessage::Tx(message) => (message.group, message.tx),
        }
    }

    // =============================================================================
    // FLOWS: LOCAL SUBMISSION
    // =============================================================================

    /// Every connected peer receives every admitted transaction, in
    /// admission order.
    #[tokio::test]
    async fn test_local_submission_reaches_every_connected_peer() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        service.start();
        let peers = [create_peer(1), create_peer(2), create_peer(3)];
        for peer in peers {
            service.on_peer_connected(peer);
        }

        service.admit(GroupId(0), b"tx-alpha".to_vec(), 10).unwrap();
        service.admit(GroupId(0), b"tx-beta".to_vec(), 10).unwrap();

        timeout(Duration::from_secs(2), transport.wait_for_frames(6))
            .await
            .expect("all six frames relayed");

        for peer in peers {
            let txs: Vec<Vec<u8>> = transport
                .frames_for(&peer)
                .iter()
                .map(|frame| decode_frame(frame).1)
                .collect();
            assert_eq!(txs, vec![b"tx-alpha".to_vec(), b"tx-beta".to_vec()]);
        }

        service.shutdown().await;
    }

    /// A transaction gossiped to us by one peer is admitted and relayed on
    /// to the other peers.
    #[tokio::test]
    async fn test_transaction_received_from_peer_is_rebroadcast() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        let sender = create_peer(1);
        let receiver = create_peer(2);
        service.on_peer_connected(sender);
        service.on_peer_connected(receiver);

        service.on_message_received(&sender, &encode_frame(0, b"tx-gossiped"));

        timeout(Duration::from_secs(2), async {
            loop {
                if !transport.frames_for(&receiver).is_empty() {
                    break;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("other peer received the relayed transaction");

        let frames = transport.frames_for(&receiver);
        assert_eq!(decode_frame(&frames[0]), (GroupId(0), b"tx-gossiped".to_vec()));
        assert!(transport.stopped_peers().is_empty());

        service.shutdown().await;
    }

    /// Groups are isolated: the same payload can sit in two groups, and
    /// each relayed frame names the group it came from.
    #[tokio::test]
    async fn test_groups_are_isolated_on_the_shared_channel() {
        let (service, _, transport) = create_service(vec![
            GroupConfig::new(GroupId(0)),
            GroupConfig::new(GroupId(1)),
        ]);
        let peer = create_peer(1);
        service.on_peer_connected(peer);

        service.admit(GroupId(0), b"tx-shared".to_vec(), 10).unwrap();
        service.admit(GroupId(1), b"tx-shared".to_vec(), 10).unwrap();

        timeout(Duration::from_secs(2), transport.wait_for_frames(2))
            .await
            .expect("both frames relayed");

        let mut seen: Vec<(GroupId, Vec<u8>)> = transport
            .frames_for(&peer)
            .iter()
            .map(|frame| decode_frame(frame))
            .collect();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                (GroupId(0), b"tx-shared".to_vec()),
                (GroupId(1), b"tx-shared".to_vec()),
            ]
        );

        service.shutdown().await;
    }

    /// A transaction the admission check refuses goes nowhere, and the
    /// sender is not penalized for it.
    #[tokio::test]
    async fn test_rejected_transaction_is_not_relayed() {
        let (service, admission, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        let sender = create_peer(1);
        let receiver = create_peer(2);
        service.on_peer_connected(sender);
        service.on_peer_connected(receiver);

        admission.reject_all();
        service.on_message_received(&sender, &encode_frame(0, b"tx-bad"));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.total(), 0);
        assert!(transport.stopped_peers().is_empty());

        service.shutdown().await;
    }

    // =============================================================================
    // FLOWS: PROTOCOL VIOLATIONS
    // =============================================================================

    /// Undecodable bytes report the sender to the transport; the service
    /// keeps working for everyone else.
    #[tokio::test]
    async fn test_malformed_frame_reports_the_sender() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        let offender = create_peer(1);
        let bystander = create_peer(2);
        service.on_peer_connected(offender);
        service.on_peer_connected(bystander);

        service.on_message_received(&offender, &[0xDE, 0xAD, 0xBE, 0xEF]);

        let stopped = transport.stopped_peers();
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].0, offender);
        assert!(stopped[0].1.contains("malformed"));

        // Dissemination is unaffected.
        service.admit(GroupId(0), b"tx-after".to_vec(), 10).unwrap();
        timeout(Duration::from_secs(2), transport.wait_for_frames(2))
            .await
            .expect("later transaction still relayed");

        service.shutdown().await;
    }

    /// A frame whose enum tag is out of range decodes to an error, not a
    /// panic, and counts as a violation.
    #[tokio::test]
    async fn test_unknown_message_tag_is_a_violation() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        let offender = create_peer(1);

        // Variant tags are encoded as a little-endian u32; 7 names no
        // variant of the message enum.
        let mut evil = bincode::serialize(&7u32).expect("serializable tag");
        evil.extend_from_slice(b"junk");
        service.on_message_received(&offender, &evil);

        let stopped = transport.stopped_peers();
        assert_eq!(stopped.len(), 1);
        assert!(stopped[0].1.contains("malformed"));
    }

    /// A well-formed frame naming a group we never registered is a
    /// violation by the sender.
    #[tokio::test]
    async fn test_unknown_group_reports_the_sender() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);
        let offender = create_peer(1);

        service.on_message_received(&offender, &encode_frame(9, b"tx-stray"));

        let stopped = transport.stopped_peers();
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].0, offender);
        assert!(stopped[0].1.contains("unknown group 9"));
    }

    // =============================================================================
    // FLOWS: EVICTION
    // =============================================================================

    /// Evicting a transaction before any peer walks past it means no peer
    /// ever sees it, while the duplicate cache keeps suppressing its key.
    #[tokio::test]
    async fn test_evicted_transaction_stops_relaying_but_stays_suppressed() {
        let (service, _, transport) = create_service(vec![GroupConfig::new(GroupId(0))]);

        let admitted = service.admit(GroupId(0), b"tx-mined".to_vec(), 10).unwrap();
        service.evict(GroupId(0), admitted.node).unwrap();

        let peer = create_peer(1);
        service.on_peer_connected(peer);
        sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.total(), 0);

        // Still a duplicate after eviction.
        let err = service
            .admit(GroupId(0), b"tx-mined".to_vec(), 11)
            .unwrap_err();
        assert!(matches!(err, GossipError::DuplicateTransaction { .. }));

        // Fresh content flows past the hole.
        service.admit(GroupId(0), b"tx-next".to_vec(), 11).unwrap();
        timeout(Duration::from_secs(2), transport.wait_for_frames(1))
            .await
            .expect("later transaction relayed");
        let frames = transport.frames_for(&peer);
        assert_eq!(decode_frame(&frames[0]), (GroupId(0), b"tx-next".to_vec()));

        service.shutdown().await;
    }
}
