//! Authentication plugins.
//!
//! - `mysql_native_password`: `SHA1(pw) XOR SHA1(seed + SHA1(SHA1(pw)))`
//! - `caching_sha2_password`: `SHA256(pw) XOR SHA256(SHA256(SHA256(pw)) + seed)`
//!   for the fast path; the full path sends the password RSA-encrypted with
//!   the server's public key, since connections here are not TLS.

use rand::rngs::OsRng;
use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use mysqlmodel_core::{ConnectionError, ConnectionErrorKind, Error, Result};

/// Authentication plugin names.
pub mod plugins {
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
    pub const SHA256_PASSWORD: &str = "sha256_password";
}

/// Status bytes of the caching_sha2_password exchange.
pub mod caching_sha2 {
    /// Client asks for the server's RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    /// Password matched the server-side cache
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// Cache miss; the cleartext password must be sent securely
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// Scramble length used by both plugins.
pub const SCRAMBLE_LEN: usize = 20;

fn digest<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// The server sends the 20-byte scramble followed by a NUL.
fn trim_seed(seed: &[u8]) -> &[u8] {
    match seed {
        [head @ .., 0] if head.len() == SCRAMBLE_LEN => head,
        _ if seed.len() > SCRAMBLE_LEN => &seed[..SCRAMBLE_LEN],
        _ => seed,
    }
}

/// `mysql_native_password` response (20 bytes, empty for an empty password).
pub fn mysql_native_password(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let stage1 = digest::<Sha1>(&[password.as_bytes()]);
    let stage2 = digest::<Sha1>(&[&stage1]);
    let stage3 = digest::<Sha1>(&[trim_seed(seed), &stage2]);
    xor(&stage1, &stage3)
}

/// `caching_sha2_password` fast-auth response (32 bytes, empty for an
/// empty password).
pub fn caching_sha2_password(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let hash = digest::<Sha256>(&[password.as_bytes()]);
    let hash_hash = digest::<Sha256>(&[&hash]);
    let scramble = digest::<Sha256>(&[&hash_hash, trim_seed(seed)]);
    xor(&hash, &scramble)
}

/// Initial auth response for `plugin`, or `None` if the plugin is unknown.
pub fn scramble_for(plugin: &str, password: &str, seed: &[u8]) -> Option<Vec<u8>> {
    match plugin {
        plugins::MYSQL_NATIVE_PASSWORD => Some(mysql_native_password(password, seed)),
        plugins::CACHING_SHA2_PASSWORD => Some(caching_sha2_password(password, seed)),
        _ => None,
    }
}

/// Encrypt the NUL-terminated password, XORed with the rotating seed,
/// with the server's RSA public key (PKCS#8 or PKCS#1 PEM).
///
/// caching_sha2_password on MySQL 8.0.5+ expects OAEP padding.
pub fn sha256_password_rsa(
    password: &str,
    seed: &[u8],
    public_key_pem: &[u8],
    use_oaep: bool,
) -> Result<Vec<u8>> {
    let seed = trim_seed(seed);
    if seed.is_empty() {
        return Err(auth_error("empty authentication seed"));
    }
    let mut plain = password.as_bytes().to_vec();
    plain.push(0);
    for (i, b) in plain.iter_mut().enumerate() {
        *b ^= seed[i % seed.len()];
    }

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|e| auth_error(format!("server public key is not PEM text: {e}")))?;
    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| auth_error(format!("cannot parse server public key: {e}")))?;

    let encrypted = if use_oaep {
        key.encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &plain)
    } else {
        key.encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, &plain)
    };
    encrypted.map_err(|e| auth_error(format!("RSA encryption failed: {e}")))
}

fn auth_error(message: impl Into<String>) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Authentication,
        message: message.into(),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: [u8; 20] = [
        0x3d, 0x4c, 0x2b, 0x7e, 0x11, 0x5a, 0x60, 0x09, 0x21, 0x6f, 0x44, 0x33, 0x12, 0x58, 0x7b,
        0x0e, 0x2a, 0x19, 0x55, 0x70,
    ];

    #[test]
    fn native_password_verifies_like_the_server() {
        let response = mysql_native_password("secret", &SEED);
        assert_eq!(response.len(), 20);

        // The server stores SHA1(SHA1(pw)) and recovers SHA1(pw) from the response.
        let stored = digest::<Sha1>(&[&digest::<Sha1>(&[b"secret"])]);
        let recovered = xor(&response, &digest::<Sha1>(&[&SEED, &stored]));
        assert_eq!(digest::<Sha1>(&[&recovered]), stored);
    }

    #[test]
    fn caching_sha2_verifies_like_the_server() {
        let response = caching_sha2_password("secret", &SEED);
        assert_eq!(response.len(), 32);

        let stored = digest::<Sha256>(&[&digest::<Sha256>(&[b"secret"])]);
        let recovered = xor(&response, &digest::<Sha256>(&[&stored, &SEED]));
        assert_eq!(digest::<Sha256>(&[&recovered]), stored);
    }

    #[test]
    fn trailing_nul_is_ignored() {
        let mut with_nul = SEED.to_vec();
        with_nul.push(0);
        assert_eq!(
            caching_sha2_password("pw", &with_nul),
            caching_sha2_password("pw", &SEED)
        );
        assert_eq!(
            mysql_native_password("pw", &with_nul),
            mysql_native_password("pw", &SEED)
        );
    }

    #[test]
    fn empty_password_sends_nothing() {
        assert!(mysql_native_password("", &SEED).is_empty());
        assert!(caching_sha2_password("", &SEED).is_empty());
    }

    #[test]
    fn plugin_dispatch() {
        assert_eq!(
            scramble_for(plugins::MYSQL_NATIVE_PASSWORD, "pw", &SEED).map(|r| r.len()),
            Some(20)
        );
        assert_eq!(
            scramble_for(plugins::CACHING_SHA2_PASSWORD, "pw", &SEED).map(|r| r.len()),
            Some(32)
        );
        assert!(scramble_for("mysql_clear_password", "pw", &SEED).is_none());
    }

    #[test]
    fn rsa_rejects_garbage_key() {
        let err = sha256_password_rsa("pw", &SEED, b"not a key", true).unwrap_err();
        assert!(err.is_connection_error());
    }
}
