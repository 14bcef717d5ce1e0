//! Feed arbitrary byte streams to the decoder.
//!
//! Every message it yields must re-encode to bytes that decode to the same
//! message, and a reset must always leave it ready for a fresh message.

#![no_main]

use doorlock_proto::{Decoder, Message};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = Decoder::new();
    for &byte in data {
        match decoder.push(byte) {
            Ok(Some(message)) => {
                let encoded = message.to_bytes();
                assert_eq!(encoded.len(), message.encoded_len());
                assert_eq!(Message::decode(&encoded).ok(), Some(message));
                assert!(!decoder.is_partial());
            },
            Ok(None) => assert!(decoder.is_partial()),
            Err(_) => {
                decoder.reset();
                assert!(!decoder.is_partial());
            },
        }
    }
});
