//! Payment confirmation signatures.
//!
//! The processor signs `"{remote_order_id}|{remote_payment_id}"` with
//! HMAC-SHA256 under the shared webhook secret and sends the hex digest
//! back with the redirect. We recompute and compare in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn payment_signature(remote_order_id: &str, remote_payment_id: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(remote_order_id.as_bytes());
    mac.update(b"|");
    mac.update(remote_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_payment_signature(
    remote_order_id: &str,
    remote_payment_id: &str,
    supplied: &str,
    secret: &str,
) -> bool {
    let Ok(supplied_bytes) = hex::decode(supplied) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(remote_order_id.as_bytes());
    mac.update(b"|");
    mac.update(remote_payment_id.as_bytes());
    mac.verify_slice(&supplied_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_webhook_secret";

    #[test]
    fn signature_round_trips() {
        let sig = payment_signature("order_abc", "pay_xyz", SECRET);
        assert!(verify_payment_signature("order_abc", "pay_xyz", &sig, SECRET));
    }

    #[test]
    fn any_mutation_fails_verification() {
        let sig = payment_signature("order_abc", "pay_xyz", SECRET);

        // Flip a single hex nibble at every position.
        for i in 0..sig.len() {
            let mut mutated: Vec<u8> = sig.bytes().collect();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            if mutated == sig {
                continue;
            }
            assert!(
                !verify_payment_signature("order_abc", "pay_xyz", &mutated, SECRET),
                "mutated signature at position {} verified",
                i
            );
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = payment_signature("order_abc", "pay_xyz", SECRET);
        assert!(!verify_payment_signature("order_abc", "pay_xyz", &sig, "other_secret"));
    }

    #[test]
    fn swapped_ids_fail() {
        let sig = payment_signature("order_abc", "pay_xyz", SECRET);
        assert!(!verify_payment_signature("pay_xyz", "order_abc", &sig, SECRET));
    }

    #[test]
    fn non_hex_signature_fails() {
        assert!(!verify_payment_signature("order_abc", "pay_xyz", "not-hex!", SECRET));
        assert!(!verify_payment_signature("order_abc", "pay_xyz", "", SECRET));
    }
}
