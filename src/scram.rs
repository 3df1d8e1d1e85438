//! SCRAM-SHA-256 client (RFC 5802/7677), used for the `SASL` authentication path (§4.4).
//!
//! Channel binding (`-PLUS`) is not offered: this crate doesn't inspect the TLS session's
//! peer certificate/exporter, so the client always advertises the bare `SCRAM-SHA-256`
//! mechanism with a `n,,` GS2 header (no channel binding).

use base64::engine::general_purpose::STANDARD as base64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{err_protocol, Error};

const MECHANISM: &str = "SCRAM-SHA-256";

pub(crate) fn supports(mechanisms: &[String]) -> bool {
    mechanisms.iter().any(|m| m == MECHANISM)
}

pub(crate) fn mechanism() -> &'static str {
    MECHANISM
}

/// Drives the three SCRAM round-trips: client-first, (receive server-first), client-final,
/// (receive server-final). Holds onto the auth message and salted password between steps so
/// the final server signature can be verified.
pub(crate) struct ScramSha256 {
    client_nonce: String,
    client_first_bare: String,
    salted_password: Option<[u8; 32]>,
    auth_message: Option<String>,
}

impl ScramSha256 {
    pub(crate) fn new() -> Self {
        let client_nonce = random_nonce();
        let client_first_bare = format!("n=,r={client_nonce}");

        Self {
            client_nonce,
            client_first_bare,
            salted_password: None,
            auth_message: None,
        }
    }

    /// `SASLInitialResponse` payload: `n,,n=,r=<client-nonce>`.
    pub(crate) fn client_first_message(&self) -> String {
        format!("n,,{}", self.client_first_bare)
    }

    /// Consumes the server-first-message (`r=<nonce>,s=<salt>,i=<iterations>`) and returns
    /// the `SASLResponse` payload (`c=biws,r=<nonce>,p=<proof>`).
    pub(crate) fn process_server_first(
        &mut self,
        password: &str,
        server_first: &str,
    ) -> crate::Result<String> {
        let mut nonce = None;
        let mut salt = None;
        let mut iterations = None;

        for field in server_first.split(',') {
            if let Some(v) = field.strip_prefix("r=") {
                nonce = Some(v);
            } else if let Some(v) = field.strip_prefix("s=") {
                salt = Some(v);
            } else if let Some(v) = field.strip_prefix("i=") {
                iterations = Some(v);
            }
        }

        let nonce = nonce.ok_or_else(|| err_protocol!("SCRAM server-first missing nonce"))?;
        let salt = salt.ok_or_else(|| err_protocol!("SCRAM server-first missing salt"))?;
        let iterations = iterations
            .ok_or_else(|| err_protocol!("SCRAM server-first missing iteration count"))?;

        if !nonce.starts_with(&self.client_nonce) {
            return Err(err_protocol!(
                "SCRAM server nonce does not extend the client nonce"
            ));
        }

        let salt = base64
            .decode(salt)
            .map_err(|e| err_protocol!("invalid SCRAM salt encoding: {e}"))?;
        let iterations: u32 = iterations
            .parse()
            .map_err(|_| err_protocol!("invalid SCRAM iteration count: {iterations:?}"))?;

        let normalized_password = stringprep::saslprep(password)
            .map_err(|_| Error::Authentication("password contains invalid SASLprep characters".into()))?;

        let salted_password = hi(normalized_password.as_bytes(), &salt, iterations);
        let client_key = hmac_sha256(&salted_password, b"Client Key");
        let stored_key = sha256(&client_key);

        // GS2 header re-encoded as base64 for the channel-binding field: "biws" == base64("n,,").
        let client_final_without_proof = format!("c=biws,r={nonce}");

        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare, server_first, client_final_without_proof
        );

        let client_signature = hmac_sha256(&stored_key, auth_message.as_bytes());
        let client_proof = xor(&client_key, &client_signature);

        self.salted_password = Some(salted_password);
        self.auth_message = Some(auth_message);

        Ok(format!(
            "{client_final_without_proof},p={}",
            base64.encode(client_proof)
        ))
    }

    /// Verifies the server-final-message (`v=<signature>`) proves the server also knows the
    /// salted password, guarding against a server impersonation attack.
    pub(crate) fn verify_server_final(&self, server_final: &str) -> crate::Result<()> {
        let salted_password = self
            .salted_password
            .ok_or_else(|| err_protocol!("SCRAM verify called before client-final was sent"))?;
        let auth_message = self
            .auth_message
            .as_ref()
            .ok_or_else(|| err_protocol!("SCRAM verify called before client-final was sent"))?;

        let signature_b64 = server_final
            .strip_prefix("v=")
            .ok_or_else(|| err_protocol!("SCRAM server-final missing verifier"))?;

        let expected = base64
            .decode(signature_b64)
            .map_err(|e| err_protocol!("invalid SCRAM server signature encoding: {e}"))?;

        let server_key = hmac_sha256(&salted_password, b"Server Key");
        let actual = hmac_sha256(&server_key, auth_message.as_bytes());

        if actual.as_slice() != expected.as_slice() {
            return Err(Error::Authentication(
                "SCRAM server signature does not match; possible impersonation".into(),
            ));
        }

        Ok(())
    }
}

fn random_nonce() -> String {
    let bytes: [u8; 18] = rand::thread_rng().gen();
    base64.encode(bytes)
}

/// `Hi(password, salt, i)`: iterated HMAC, per RFC 5802 §2.2 (the PBKDF2 core with HMAC-SHA-256
/// as the pseudorandom function).
fn hi(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(password).expect("HMAC accepts any key length");
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut u = mac.finalize().into_bytes();

    let mut result = u;

    for _ in 1..iterations {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(password).expect("HMAC accepts any key length");
        mac.update(&u);
        u = mac.finalize().into_bytes();

        for (r, b) in result.iter_mut().zip(u.iter()) {
            *r ^= b;
        }
    }

    result.into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives the client side against a hand-rolled server that implements the same RFC 5802
    /// math, checking that the proof the client sends is what an honest server would accept and
    /// that the server signature the client verifies is what an honest server would send.
    #[test]
    fn it_round_trips_against_a_reference_server_computation() {
        let mut client = ScramSha256::new();

        let first = client.client_first_message();
        assert!(first.starts_with("n,,n=,r="));

        let salt = b"W22ZaJ0SNY7soEsUEjb6gQ==test".to_vec();
        let iterations = 4096u32;
        let server_nonce = format!("{}server-half", client.client_nonce);
        let server_first = format!(
            "r={server_nonce},s={},i={iterations}",
            base64.encode(&salt)
        );

        let client_final = client.process_server_first("pencil", &server_first).unwrap();
        assert!(client_final.starts_with(&format!("c=biws,r={server_nonce},p=")));

        let proof_b64 = client_final.rsplit("p=").next().unwrap();
        let proof = base64.decode(proof_b64).unwrap();

        // Reference server-side computation of StoredKey/ServerKey from the same password.
        let salted_password = hi(
            stringprep::saslprep("pencil").unwrap().as_bytes(),
            &salt,
            iterations,
        );
        let client_key = hmac_sha256(&salted_password, b"Client Key");
        let stored_key = sha256(&client_key);
        let client_first_bare = format!("n=,r={}", client.client_nonce);
        let client_final_without_proof = format!("c=biws,r={server_nonce}");
        let auth_message = format!("{client_first_bare},{server_first},{client_final_without_proof}");
        let client_signature = hmac_sha256(&stored_key, auth_message.as_bytes());
        let expected_proof = xor(&client_key, &client_signature);
        assert_eq!(proof, expected_proof);

        let server_key = hmac_sha256(&salted_password, b"Server Key");
        let server_signature = hmac_sha256(&server_key, auth_message.as_bytes());
        let server_final = format!("v={}", base64.encode(server_signature));

        client.verify_server_final(&server_final).unwrap();
    }

    #[test]
    fn it_rejects_a_forged_server_signature() {
        let mut client = ScramSha256::new();
        let server_nonce = format!("{}server-half", client.client_nonce);
        let server_first = format!(
            "r={server_nonce},s={},i=4096",
            base64.encode(b"somesalt")
        );
        client.process_server_first("pencil", &server_first).unwrap();

        let bogus_final = format!("v={}", base64.encode([0u8; 32]));
        assert!(client.verify_server_final(&bogus_final).is_err());
    }

    #[test]
    fn it_rejects_a_server_nonce_that_does_not_extend_the_client_nonce() {
        let mut client = ScramSha256::new();
        let bogus = "r=not-my-nonce,s=c2FsdA==,i=4096";
        assert!(client.process_server_first("pw", bogus).is_err());
    }
}
