/*!
 * Client for the video translation service.
 *
 * The service speaks a small tagged binary format over HTTPS. It is split
 * into several submodules:
 *
 * - `wire`: encode/decode primitives for the binary format
 * - `video_id`: recognition of supported video URL shapes
 * - `request`: request body layout and HMAC signing
 * - `client`: the signed round trip and the polling loop
 */

// Re-export main types for easier usage
pub use self::client::{TranslationClient, TranslationResult, TranslationStatus};
pub use self::request::{SignedRequest, TranslationRequest};
pub use self::video_id::extract_video_id;
pub use self::wire::{WireMessage, WireValue, WireWriter};

// Submodules
pub mod client;
pub mod request;
pub mod video_id;
pub mod wire;
