//! Wire format tests.
//!
//! Byte layouts are pinned with inline snapshots so an accidental change to
//! an opcode value or the digit order shows up as a diff.

use doorlock_proto::{Credential, Decoder, Message, Opcode, ProtocolError};
use proptest::prelude::*;

fn hex_of(message: &Message) -> String {
    hex::encode(message.to_bytes())
}

#[test]
fn check_password_layout() {
    let message = Message::CheckPassword(Credential::new([1, 2, 3, 4, 5]));
    insta::assert_snapshot!(hex_of(&message), @"410102030405");
}

#[test]
fn new_password_layout() {
    let message = Message::NewPassword(Credential::new([9, 9, 9, 9, 9]));
    insta::assert_snapshot!(hex_of(&message), @"210909090909");
}

#[test]
fn signal_layouts() {
    let encoded: Vec<String> = [
        Opcode::Ready,
        Opcode::OverwritePassword,
        Opcode::DoorManipulation,
        Opcode::Wrong3Times,
        Opcode::PasswordNotSaved,
    ]
    .iter()
    .map(|op| hex_of(&Message::Signal(*op)))
    .collect();
    insta::assert_snapshot!(encoded.join(" "), @"10 30 40 44 11");
}

#[test]
fn decode_rejects_malformed_slices() {
    assert_eq!(Message::decode(&[]), Err(ProtocolError::Empty));
    assert_eq!(Message::decode(&[0x10, 0x10]), Err(ProtocolError::TrailingBytes(1)));
    assert_eq!(
        Message::decode(&[0x41, 1, 2]),
        Err(ProtocolError::Truncated { opcode: Opcode::CheckPassword, expected: 5, actual: 2 })
    );
    assert_eq!(Message::decode(&[0x41, 1, 2, 3, 4, 5, 6]), Err(ProtocolError::TrailingBytes(1)));
    assert_eq!(Message::decode(&[0x7F]), Err(ProtocolError::UnknownOpcode(0x7F)));
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        prop::sample::select(Opcode::ALL.to_vec())
            .prop_filter("signal opcodes only", |op| !op.carries_credential())
            .prop_map(Message::Signal),
        any::<[u8; 5]>().prop_map(|d| Message::CheckPassword(Credential::new(d))),
        any::<[u8; 5]>().prop_map(|d| Message::NewPassword(Credential::new(d))),
    ]
}

proptest! {
    #[test]
    fn stream_decodes_in_order(messages in prop::collection::vec(arb_message(), 0..16)) {
        let mut stream = bytes::BytesMut::new();
        for message in &messages {
            message.encode(&mut stream);
        }

        let mut decoder = Decoder::new();
        let mut decoded = Vec::new();
        for byte in stream.iter() {
            if let Some(message) = decoder.push(*byte).map_err(|e| TestCaseError::fail(e.to_string()))? {
                decoded.push(message);
            }
        }

        prop_assert!(!decoder.is_partial());
        prop_assert_eq!(decoded, messages);
    }

    #[test]
    fn slice_decode_matches_stream_decode(message in arb_message()) {
        let bytes = message.to_bytes();
        prop_assert_eq!(bytes.len(), message.encoded_len());
        prop_assert_eq!(Message::decode(&bytes), Ok(message));
    }
}
