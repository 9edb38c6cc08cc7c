//! Property tests for framing and sequencing

use odlink_usb::{Request, Response, SequenceCounter};
use proptest::prelude::*;

proptest! {
    #[test]
    fn request_frames_decode_to_themselves(
        sequence in 0u16..4096,
        endpoint in 0u16..0x8000,
        expected in any::<u16>(),
        payload in proptest::collection::vec(any::<u8>(), 0..64),
        checksum in any::<u16>(),
        read in any::<bool>(),
    ) {
        let request = if read {
            Request::read(sequence, endpoint, expected, payload.clone(), checksum).unwrap()
        } else {
            Request::write(sequence, endpoint, expected, payload.clone(), checksum).unwrap()
        };
        let frame = request.encode();

        prop_assert_eq!(frame.len(), 8 + payload.len());
        prop_assert_eq!(frame.len(), request.encoded_len());
        let decoded = Request::decode(&frame).unwrap();
        prop_assert_eq!(decoded.endpoint(), endpoint);
        prop_assert_eq!(decoded.is_read(), read);
        prop_assert_eq!(decoded, request);
    }

    #[test]
    fn sequence_numbers_advance_and_wrap(start in 0u16..4096, steps in 1usize..10_000) {
        let mut counter = SequenceCounter::starting_after(start);
        let mut previous = start;
        for _ in 0..steps {
            let next = counter.next();
            prop_assert!(next < 4096);
            prop_assert_eq!(next, (previous + 1) % 4096);
            previous = next;
        }
    }

    #[test]
    fn responses_match_masked_sequence(
        sequence in 0u16..4096,
        direction in any::<bool>(),
        payload in proptest::collection::vec(any::<u8>(), 0..16),
    ) {
        let echoed = if direction { sequence | 0x8000 } else { sequence };
        let response = Response::decode(&Response { sequence: echoed, payload: payload.clone() }.encode()).unwrap();

        prop_assert!(response.answers(sequence));
        prop_assert!(!response.answers((sequence + 1) % 4096));
        prop_assert_eq!(response.payload, payload);
    }
}
