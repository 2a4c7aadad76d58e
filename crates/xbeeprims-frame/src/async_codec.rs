//! `tokio-util` codec adapter for async runtimes.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{
    decode_frame, encode_frame_limited, Decoded, Frame, MAX_FRAME_LENGTH, MAX_REQUEST_DATA,
};
use crate::error::FrameError;

/// Decodes and encodes API frames on a `Framed` stream.
///
/// Discarded frames are logged and skipped, matching [`crate::FrameReader`].
/// Outgoing frames may carry up to [`MAX_REQUEST_DATA`] bytes so a full
/// payload fits behind any request header.
#[derive(Debug, Clone)]
pub struct ApiCodec {
    max_frame_length: usize,
}

impl ApiCodec {
    pub fn new() -> Self {
        Self::with_max_frame_length(MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(max_frame_length: usize) -> Self {
        Self { max_frame_length }
    }
}

impl Default for ApiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ApiCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        while let Some(decoded) = decode_frame(src, self.max_frame_length) {
            match decoded {
                Decoded::Frame(frame) => return Ok(Some(frame)),
                Decoded::Discarded(error) => debug!(%error, "discarding frame"),
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for ApiCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame_limited(item.frame_type, &item.payload, MAX_REQUEST_DATA, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::encode_frame;

    #[tokio::test]
    async fn framed_read_skips_garbage() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&[0x00, 0x7E, 0x00, 0x02, 0x8A, 0x00, 0x00]);
        encode_frame(0x8A, &[0x00], &mut wire).unwrap();
        encode_frame(0x89, &[0x01, 0x00], &mut wire).unwrap();

        let bytes = wire.to_vec();
        let mut framed = FramedRead::new(bytes.as_slice(), ApiCodec::new());

        let first = framed.next().await.unwrap().unwrap();
        assert_eq!(first, Frame::new(0x8A, vec![0x00]));
        let second = framed.next().await.unwrap().unwrap();
        assert_eq!(second.frame_type, 0x89);
        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn framed_write_escapes() {
        let mut out = Vec::new();
        {
            let mut framed = FramedWrite::new(&mut out, ApiCodec::default());
            framed.send(Frame::new(0x08, vec![0x01, 0x7E])).await.unwrap();
        }

        let mut wire = BytesMut::from(out.as_slice());
        let mut codec = ApiCodec::new();
        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), &[0x01, 0x7E]);
        assert!(out.contains(&0x7D));
    }

    #[tokio::test]
    async fn framed_write_fits_request_header() {
        let mut out = Vec::new();
        {
            let mut framed = FramedWrite::new(&mut out, ApiCodec::new());
            framed
                .send(Frame::new(0x17, vec![0x20; MAX_REQUEST_DATA]))
                .await
                .unwrap();
        }

        let mut wire = BytesMut::from(out.as_slice());
        let mut codec = ApiCodec::with_max_frame_length(MAX_REQUEST_DATA + 1);
        let frame = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(frame.payload.len(), MAX_REQUEST_DATA);
    }
}
