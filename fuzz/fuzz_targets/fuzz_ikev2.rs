#![no_main]
use libfuzzer_sys::fuzz_target;

use ikev2::encoder::Encode;
use ikev2::parser::Parse;
use ikev2_wire::Ike;

fuzz_target!(|data: &[u8]| {
    match Ike::parse(data) {
        // Anything that decodes must encode back to the same bytes
        Ok(packet) => {
            let encoded = Ike::encode(&packet).expect("decoded packet re-encodes");
            assert_eq!(Ike::parse(&encoded).ok(), Some(packet));
        }
        Err(e) => eprintln!("IKEv2: Error parsing {:?}", e),
    }
});
