//! Property tests for the wire codec.
//!
//! The codec must be total: for any input — valid encodings, truncated
//! prefixes, random garbage — `decode` returns a value or a
//! `ProtocolError`. It must never panic and never read past the packet.

use netforge_protocol::{ClientId, EntityId, Reliability, ToClient, ToServer};
use proptest::prelude::*;

fn reliability() -> impl Strategy<Value = Reliability> {
    prop_oneof![
        Just(Reliability::UnreliableOrdered),
        Just(Reliability::Reliable),
        Just(Reliability::UnreliableUnordered),
    ]
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..64)
}

fn to_client() -> impl Strategy<Value = ToClient> {
    prop_oneof![
        any::<u32>().prop_map(|id| ToClient::Connection {
            client_id: ClientId(id)
        }),
        payload().prop_map(|payload| ToClient::ClientMessage { payload }),
        (any::<u32>(), payload()).prop_map(|(id, payload)| ToClient::EntityMessage {
            entity_id: EntityId(id),
            payload,
        }),
        "[ -~]{0,40}".prop_map(|message| ToClient::Error { message }),
        (any::<u32>(), any::<u32>(), payload()).prop_map(|(id, owner, user_data)| {
            ToClient::EntityCreated {
                entity_id: EntityId(id),
                owner: ClientId(owner),
                user_data,
            }
        }),
        Just(ToClient::EntityChangedOwnership),
    ]
}

fn to_server() -> impl Strategy<Value = ToServer> {
    prop_oneof![
        payload().prop_map(|payload| ToServer::ServerMessage { payload }),
        (reliability(), any::<u32>(), payload()).prop_map(|(reliability, id, payload)| {
            ToServer::RelayEntityMessage {
                reliability,
                entity_id: EntityId(id),
                payload,
            }
        }),
        (reliability(), any::<u32>(), payload()).prop_map(|(reliability, id, payload)| {
            ToServer::BroadcastEntityMessage {
                reliability,
                entity_id: EntityId(id),
                payload,
            }
        }),
        (reliability(), payload()).prop_map(|(reliability, payload)| {
            ToServer::RelayClientMessage {
                reliability,
                payload,
            }
        }),
        (reliability(), payload()).prop_map(|(reliability, payload)| {
            ToServer::BroadcastClientMessage {
                reliability,
                payload,
            }
        }),
        payload().prop_map(|user_data| ToServer::CreateEntityRequest { user_data }),
        Just(ToServer::GiveEntityOwnershipRequest),
    ]
}

proptest! {
    #[test]
    fn to_client_round_trips(message in to_client()) {
        let decoded = ToClient::decode(&message.encode()).expect("decode");
        prop_assert_eq!(decoded, message);
    }

    #[test]
    fn to_server_round_trips(message in to_server()) {
        let decoded = ToServer::decode(&message.encode()).expect("decode");
        prop_assert_eq!(decoded, message);
    }

    /// Decoding any prefix of a valid encoding must return cleanly —
    /// either a (possibly shorter) message or a ProtocolError.
    #[test]
    fn to_client_prefixes_decode_or_error(message in to_client(), cut in 0usize..96) {
        let bytes = message.encode();
        let cut = cut.min(bytes.len());
        let _ = ToClient::decode(&bytes[..cut]);
    }

    #[test]
    fn to_server_prefixes_decode_or_error(message in to_server(), cut in 0usize..96) {
        let bytes = message.encode();
        let cut = cut.min(bytes.len());
        let _ = ToServer::decode(&bytes[..cut]);
    }

    /// Random garbage never panics either direction.
    #[test]
    fn garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = ToClient::decode(&bytes);
        let _ = ToServer::decode(&bytes);
    }
}
