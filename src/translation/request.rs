/*!
 * Request body construction and signing for the translation endpoint.
 *
 * The field layout below is dictated by the service and must be reproduced
 * byte-for-byte; the body is signed once, right after serialization.
 */

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::wire::WireWriter;

type HmacSha256 = Hmac<Sha256>;

const FIELD_VIDEO_URL: u32 = 3;
const FIELD_FIRST_REQUEST: u32 = 5;
const FIELD_DURATION: u32 = 6;
const FIELD_UNKNOWN_7: u32 = 7;
const FIELD_REQUEST_LANG: u32 = 8;
const FIELD_UNKNOWN_9: u32 = 9;
const FIELD_UNKNOWN_10: u32 = 10;
const FIELD_RESPONSE_LANG: u32 = 14;
const FIELD_UNKNOWN_15: u32 = 15;
const FIELD_UNKNOWN_16: u32 = 16;
const FIELD_UNKNOWN_17: u32 = 17;

/// Parameters of a single translation request
#[derive(Debug, Clone)]
pub struct TranslationRequest<'a> {
    pub video_url: &'a str,
    pub duration_secs: f64,
    pub request_language: &'a str,
    pub response_language: &'a str,
}

impl TranslationRequest<'_> {
    /// Serialize to the fixed wire layout
    pub fn encode(&self) -> Vec<u8> {
        WireWriter::new()
            .string(FIELD_VIDEO_URL, self.video_url)
            .bool(FIELD_FIRST_REQUEST, true)
            .double(FIELD_DURATION, self.duration_secs)
            .int32(FIELD_UNKNOWN_7, 1)
            .string(FIELD_REQUEST_LANG, self.request_language)
            .int32(FIELD_UNKNOWN_9, 0)
            .int32(FIELD_UNKNOWN_10, 0)
            .string(FIELD_RESPONSE_LANG, self.response_language)
            .int32(FIELD_UNKNOWN_15, 0)
            .int32(FIELD_UNKNOWN_16, 1)
            .int32(FIELD_UNKNOWN_17, 0)
            .into_bytes()
    }

    /// Serialize and sign in one step
    pub fn sign(&self, signing_key: &[u8]) -> SignedRequest {
        SignedRequest::new(self.encode(), signing_key)
    }
}

/// A serialized body together with its signature and correlation token
///
/// The body is not mutable after construction, so the signature always
/// matches the bytes that get sent.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    body: Vec<u8>,
    signature: String,
    token: String,
}

impl SignedRequest {
    pub fn new(body: Vec<u8>, signing_key: &[u8]) -> Self {
        let signature = sign_body(signing_key, &body);
        Self {
            body,
            signature,
            token: correlation_token(),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Lowercase hex HMAC-SHA256 of `body`
pub fn sign_body(signing_key: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_key).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Random UUID rendered without separators
pub fn correlation_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
