/*!
 * Tests for the translation wire format and client
 */

use std::time::Duration;

use ytdub::app_config::TranslationConfig;
use ytdub::errors::{TranslationError, TransportError};
use ytdub::media::LimitedRetry;
use ytdub::providers::mock::{MockTransport, RecordingSleeper};
use ytdub::translation::request::sign_body;
use ytdub::translation::wire::{encode_varint, read_varint};
use ytdub::translation::{TranslationClient, TranslationStatus, WireMessage, WireValue, WireWriter};
use crate::common;

#[test]
fn test_varint_withLargeValue_shouldRoundTripAcrossTenBytes() {
    let mut buffer = Vec::new();
    encode_varint(u64::MAX, &mut buffer);
    assert_eq!(buffer.len(), 10);
    assert_eq!(read_varint(&buffer, 0), Some((u64::MAX, 10)));
    assert_eq!(read_varint(&buffer[..9], 0), None);
}

#[test]
fn test_wireMessage_decode_withResponseFields_shouldExposeTypedValues() {
    let body = WireWriter::new()
        .string(1, "https://cdn.example.com/a.mp3")
        .int32(4, 1)
        .double(6, 600.5)
        .bool(5, true)
        .into_bytes();

    let message = WireMessage::decode(&body);

    assert_eq!(message.len(), 4);
    assert_eq!(message.get_string(1).unwrap().as_deref(), Some("https://cdn.example.com/a.mp3"));
    assert_eq!(message.get_int(4).unwrap(), Some(1));
    assert_eq!(message.get_double(6).unwrap(), Some(600.5));
    assert_eq!(message.get(5), Some(&WireValue::VarInt(1)));
    assert!(message.get_string(4).is_err());
}

#[test]
fn test_client_request_shouldSendSignedLayoutWithHeaders() {
    let config = TranslationConfig::default();
    let transport = MockTransport::new().with_post(common::waiting_response());
    let sleeper = RecordingSleeper::default();
    let client = TranslationClient::new(&transport, &sleeper, &config);

    let result = client.request_translation(common::VIDEO_URL, 600.0).unwrap();
    assert_eq!(result.status, TranslationStatus::Waiting);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.url, config.endpoint);

    let body = WireMessage::decode(&request.body);
    assert_eq!(body.get_string(3).unwrap().as_deref(), Some(common::VIDEO_URL));
    assert_eq!(body.get_double(6).unwrap(), Some(600.0));
    assert_eq!(body.get_string(8).unwrap().as_deref(), Some("en"));
    assert_eq!(body.get_string(14).unwrap().as_deref(), Some("ru"));

    let expected_signature = sign_body(config.signing_key.as_bytes(), &request.body);
    assert_eq!(request.header("Vtrans-Signature"), Some(expected_signature.as_str()));
    assert_eq!(request.header("Content-Type"), Some("application/x-protobuf"));
    let token = request.header("Sec-Vtrans-Token").unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_client_poll_withImmediateReady_shouldNotSleep() {
    let config = TranslationConfig::default();
    let transport = MockTransport::new().with_post(common::ready_response(common::AUDIO_URL));
    let sleeper = RecordingSleeper::default();
    let client = TranslationClient::new(&transport, &sleeper, &config);

    assert_eq!(client.poll(common::VIDEO_URL, 600.0).unwrap(), common::AUDIO_URL);
    assert!(sleeper.calls().is_empty());
}

#[test]
fn test_client_poll_withSmallCap_shouldTimeOutAfterCapRequests() {
    let config = TranslationConfig {
        max_poll_attempts: 3,
        poll_interval_secs: 7,
        ..TranslationConfig::default()
    };
    let transport = MockTransport::new()
        .with_post(common::waiting_response())
        .with_post(common::waiting_response())
        .with_post(common::waiting_response())
        .with_post(common::ready_response(common::AUDIO_URL));
    let sleeper = RecordingSleeper::default();
    let client = TranslationClient::new(&transport, &sleeper, &config);

    let result = client.poll(common::VIDEO_URL, 600.0);

    assert!(matches!(result, Err(TranslationError::Timeout { attempts: 3 })));
    assert_eq!(transport.post_calls(), 3);
    assert_eq!(sleeper.calls(), vec![Duration::from_secs(7); 2]);
}

#[test]
fn test_client_poll_withErrorStatus_shouldSurfaceServiceMessage() {
    let config = TranslationConfig::default();
    let transport = MockTransport::new().with_post(common::failed_response("Video is too long"));
    let sleeper = RecordingSleeper::default();
    let client = TranslationClient::new(&transport, &sleeper, &config);

    match client.poll(common::VIDEO_URL, 600.0) {
        Err(TranslationError::Semantic { message, .. }) => assert_eq!(message, "Video is too long"),
        other => panic!("expected semantic failure, got {:?}", other),
    }
    assert_eq!(transport.post_calls(), 1);
}

#[test]
fn test_client_pollWithPolicy_withNetworkBlips_shouldNotCountThemAsAttempts() {
    let config = TranslationConfig {
        max_poll_attempts: 2,
        ..TranslationConfig::default()
    };
    let transport = MockTransport::new()
        .with_post_error(TransportError::Connection("reset".to_string()))
        .with_post(common::waiting_response())
        .with_post_error(TransportError::Timeout("30s".to_string()))
        .with_post(common::ready_response(common::AUDIO_URL));
    let sleeper = RecordingSleeper::default();
    let policy = LimitedRetry {
        max_attempts: 3,
        delay: Duration::from_secs(1),
    };
    let client = TranslationClient::new(&transport, &sleeper, &config);

    let url = client.poll_with_policy(common::VIDEO_URL, 600.0, &policy).unwrap();

    assert_eq!(url, common::AUDIO_URL);
    assert_eq!(transport.post_calls(), 4);
}

#[test]
fn test_client_effectiveDuration_withUnknownDuration_shouldUseFallback() {
    let config = TranslationConfig::default();
    let transport = MockTransport::new();
    let sleeper = RecordingSleeper::default();
    let client = TranslationClient::new(&transport, &sleeper, &config);

    assert_eq!(client.effective_duration(None), 341.0);
    assert_eq!(client.effective_duration(Some(0.0)), 341.0);
    assert_eq!(client.effective_duration(Some(95.5)), 95.5);
}
