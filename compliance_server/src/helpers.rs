use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Hex-encoded HMAC-SHA256 of `data` under `secret`. This is the signature scheme the gateway
/// uses for identity headers.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    let digest = mac.finalize().into_bytes();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_is_stable_and_keyed() {
        let a = calculate_hmac("key", b"payload");
        assert_eq!(a, calculate_hmac("key", b"payload"));
        assert_ne!(a, calculate_hmac("other", b"payload"));
        assert_ne!(a, calculate_hmac("key", b"payload2"));
        assert_eq!(a.len(), 64);
    }
}
