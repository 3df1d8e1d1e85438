use bytes::{Buf as _, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{err_protocol, Error};
use crate::io::{BufMut, Encode};

const HEADER_LEN: usize = 5;

/// A buffered stream over a socket that understands Postgres's length-prefixed framing.
///
/// Read side: `rbuf` holds zero or more complete frames followed by at most one partial frame
/// (§4.1). `peek_frame_header` inspects the next frame's tag/length without consuming; `recv_frame`
/// waits for and consumes one whole frame. Write side: `write` appends a length-patched frame to
/// `wbuf`; `flush` pushes it to the socket in one write.
pub(crate) struct BufStream<S> {
    stream: S,
    wbuf: Vec<u8>,
    rbuf: BytesMut,
}

impl<S> BufStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: S) -> Self {
        Self {
            stream,
            wbuf: Vec::with_capacity(512),
            rbuf: BytesMut::with_capacity(4096),
        }
    }

    pub(crate) fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Append one length-prefixed frame for `message` to the write buffer. Does not touch the
    /// socket; call [`BufStream::flush`] to send.
    pub(crate) fn write<T: Encode>(&mut self, message: T) {
        let len_offset = self.wbuf.begin_frame(message.tag());
        message.encode(&mut self.wbuf);
        self.wbuf.patch_frame_len(len_offset);
    }

    /// Write a raw, already-framed buffer (used for `StartupMessage`/`SSLRequest`/
    /// `CancelRequest`, which have no leading tag byte and are encoded whole by the caller).
    pub(crate) fn write_raw(&mut self, bytes: &[u8]) {
        self.wbuf.extend_from_slice(bytes);
    }

    pub(crate) async fn flush(&mut self) -> crate::Result<()> {
        if !self.wbuf.is_empty() {
            self.stream.write_all(&self.wbuf).await?;
            self.stream.flush().await?;
            self.wbuf.clear();
        }
        Ok(())
    }

    /// Ensure at least `cnt` bytes are buffered in `rbuf`, reading from the socket as needed.
    async fn ensure_buffered(&mut self, cnt: usize) -> crate::Result<()> {
        while self.rbuf.len() < cnt {
            self.rbuf.reserve(cnt - self.rbuf.len());

            let mut scratch = [0u8; 4096];
            let n = self.stream.read(&mut scratch).await?;

            if n == 0 {
                return Err(Error::Connection(
                    "server closed the connection unexpectedly".into(),
                ));
            }

            self.rbuf.extend_from_slice(&scratch[..n]);
        }

        Ok(())
    }

    /// Peek the tag and payload length of the next frame without consuming it.
    pub(crate) async fn peek_frame_header(&mut self) -> crate::Result<(u8, usize)> {
        self.ensure_buffered(HEADER_LEN).await?;

        let tag = self.rbuf[0];
        let len = u32::from_be_bytes(self.rbuf[1..5].try_into().unwrap());

        let len = len
            .checked_sub(4)
            .ok_or_else(|| err_protocol!("frame length {len} is smaller than the header itself"))?;

        Ok((tag, len as usize))
    }

    /// Consume one whole frame (header + payload) and return its tag and payload bytes.
    pub(crate) async fn recv_frame(&mut self) -> crate::Result<(u8, Bytes)> {
        let (tag, payload_len) = self.peek_frame_header().await?;

        self.ensure_buffered(HEADER_LEN + payload_len).await?;

        self.rbuf.advance(HEADER_LEN);
        let payload = self.rbuf.split_to(payload_len).freeze();

        Ok((tag, payload))
    }
}
