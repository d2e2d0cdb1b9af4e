//! secp256k1 ECDSA signing and verification over a 32-byte digest.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

/// Sign a 32-byte digest, returning a DER-encoded ECDSA signature.
pub fn sign(private_key: &SecretKey, digest: &[u8; 32]) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_digest(*digest);
    secp.sign_ecdsa(&message, private_key).serialize_der().to_vec()
}

/// Verify a DER-encoded ECDSA signature over a 32-byte digest.
///
/// Never panics -- a malformed signature or public key simply fails to
/// verify (malformed DER is a decode failure the caller should treat as advisory
/// here; see `keyfile::verify`).
pub fn verify(public_key: &PublicKey, digest: &[u8; 32], signature: &[u8]) -> bool {
    let secp = Secp256k1::verification_only();
    let Ok(sig) = Signature::from_der(signature) else {
        return false;
    };
    let message = Message::from_digest(*digest);
    secp.verify_ecdsa(&message, &sig, public_key).is_ok()
}
