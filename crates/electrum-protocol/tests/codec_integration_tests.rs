//! Integration tests for LineCodec with Tokio streams.
//!
//! These tests drive the codec through real duplex streams to check framing
//! across partial writes, peer close, and bidirectional traffic.

use electrum_core::Error;
use electrum_protocol::LineCodec;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio_util::codec::{Framed, FramedRead};

/// Helper function to create a framed duplex stream for testing.
fn create_framed_duplex(
    buffer_size: usize,
) -> (
    Framed<DuplexStream, LineCodec>,
    Framed<DuplexStream, LineCodec>,
) {
    let (client, server) = tokio::io::duplex(buffer_size);
    let client_framed = Framed::new(client, LineCodec::new());
    let server_framed = Framed::new(server, LineCodec::new());
    (client_framed, server_framed)
}

#[tokio::test]
async fn test_codec_request_response() {
    let (mut client, mut server) = create_framed_duplex(1024);

    let request = &b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"server.ping\",\"params\":[]}\n"[..];
    client.send(request).await.unwrap();

    let received = server.next().await.unwrap().unwrap();
    assert_eq!(received.as_bytes(), request);

    server
        .send(&b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":null}\n"[..])
        .await
        .unwrap();

    let response = client.next().await.unwrap().unwrap();
    assert_eq!(response.payload(), b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":null}");
}

#[tokio::test]
async fn test_codec_frames_split_across_writes() {
    let (mut writer, reader) = tokio::io::duplex(64);
    let mut frames = FramedRead::new(reader, LineCodec::new());

    tokio::spawn(async move {
        for chunk in [&b"{\"id\""[..], &b":1}\n{\"i"[..], &b"d\":2}"[..], &b"\n"[..]] {
            writer.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
    });

    let first = frames.next().await.unwrap().unwrap();
    let second = frames.next().await.unwrap().unwrap();
    assert_eq!(first.as_bytes(), b"{\"id\":1}\n");
    assert_eq!(second.as_bytes(), b"{\"id\":2}\n");

    // Writer dropped: clean end of stream
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn test_codec_partial_fragment_at_close() {
    let (mut writer, reader) = tokio::io::duplex(64);
    let mut frames = FramedRead::new(reader, LineCodec::new());

    writer.write_all(b"{\"id\":1}\n{\"id\":2").await.unwrap();
    drop(writer);

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.as_bytes(), b"{\"id\":1}\n");

    match frames.next().await {
        Some(Err(Error::UnterminatedFrame { len })) => assert_eq!(len, 7),
        other => panic!("Expected UnterminatedFrame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_codec_frame_larger_than_duplex_buffer() {
    let (mut writer, reader) = tokio::io::duplex(16);
    let mut frames = FramedRead::new(reader, LineCodec::new());

    let mut line = vec![b'a'; 64 * 1024];
    line.push(b'\n');
    let expected = line.clone();

    tokio::spawn(async move {
        writer.write_all(&line).await.unwrap();
    });

    let frame = frames.next().await.unwrap().unwrap();
    assert_eq!(frame.as_bytes(), &expected[..]);
}

#[tokio::test]
async fn test_codec_size_limit_over_stream() {
    let (mut writer, reader) = tokio::io::duplex(64);
    let mut frames = FramedRead::new(reader, LineCodec::with_max_frame_size(8));

    writer.write_all(b"0123456789\n").await.unwrap();

    assert!(matches!(
        frames.next().await,
        Some(Err(Error::FrameTooLarge { max_size: 8, .. }))
    ));
}
