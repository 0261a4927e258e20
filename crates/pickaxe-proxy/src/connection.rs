use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pickaxe_protocol_core::{read_varint, varint_len, write_varint};
use std::io::{Read as _, Write as _};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::trace;

const DISABLED: i32 = -1;

/// Largest uncompressed packet the protocol allows.
const MAX_DATA_LENGTH: i32 = 1 << 21;

/// Compression threshold of one socket, shared by its two halves. The
/// halves live on different tasks and switch at different points of the
/// login, so each consults it per frame.
#[derive(Debug, Clone)]
pub struct CompressionState(Arc<AtomicI32>);

impl CompressionState {
    pub fn new() -> Self {
        Self(Arc::new(AtomicI32::new(DISABLED)))
    }

    pub fn enable(&self, threshold: i32) {
        self.0.store(threshold.max(0), Ordering::Release);
    }

    pub fn threshold(&self) -> Option<i32> {
        match self.0.load(Ordering::Acquire) {
            DISABLED => None,
            threshold => Some(threshold),
        }
    }
}

/// Split a socket into framed halves sharing one compression state.
pub fn split(stream: TcpStream) -> (ConnectionReader, ConnectionWriter, CompressionState) {
    let compression = CompressionState::new();
    let (read_half, write_half) = stream.into_split();
    (
        ConnectionReader {
            stream: read_half,
            read_buf: BytesMut::with_capacity(4096),
            compression: compression.clone(),
        },
        ConnectionWriter {
            stream: write_half,
            compression: compression.clone(),
        },
        compression,
    )
}

pub struct ConnectionReader {
    stream: OwnedReadHalf,
    read_buf: BytesMut,
    compression: CompressionState,
}

impl ConnectionReader {
    /// Read a single packet frame, returning (packet_id, payload).
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        loop {
            if let Some(result) = try_parse_packet(&mut self.read_buf, self.compression.threshold())? {
                return Ok(result);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("Connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }
}

pub struct ConnectionWriter {
    stream: OwnedWriteHalf,
    compression: CompressionState,
}

impl ConnectionWriter {
    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload, self.compression.threshold())?;
        self.stream.write_all(&frame).await?;
        Ok(())
    }

    /// Compress frames written after this call, and frames read by the
    /// other half from now on.
    pub fn enable_compression(&self, threshold: i32) {
        self.compression.enable(threshold);
    }

    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

fn try_parse_packet(read_buf: &mut BytesMut, compression_threshold: Option<i32>) -> anyhow::Result<Option<(i32, BytesMut)>> {
    if read_buf.is_empty() {
        return Ok(None);
    }

    let mut peek = read_buf.clone();
    let length = match read_varint(&mut peek) {
        Ok(len) => usize::try_from(len).map_err(|_| anyhow::anyhow!("Negative frame length {}", len))?,
        Err(_) => return Ok(None),
    };

    let varint_bytes = read_buf.len() - peek.len();

    if peek.remaining() < length {
        return Ok(None);
    }

    read_buf.advance(varint_bytes);
    let mut packet_data = read_buf.split_to(length);

    if compression_threshold.is_some() {
        let data_length = read_varint(&mut packet_data)?;
        if !(0..=MAX_DATA_LENGTH).contains(&data_length) {
            return Err(anyhow::anyhow!("Bad uncompressed length {}", data_length));
        }
        if data_length > 0 {
            let mut decompressed = vec![0u8; data_length as usize];
            let mut decoder = ZlibDecoder::new(&packet_data[..]);
            decoder.read_exact(&mut decompressed)?;
            packet_data = BytesMut::from(&decompressed[..]);
        }
    }

    let packet_id = read_varint(&mut packet_data)?;
    trace!("Read packet id=0x{:02X} len={}", packet_id, packet_data.len());

    Ok(Some((packet_id, packet_data)))
}

fn build_frame(packet_id: i32, payload: &[u8], compression_threshold: Option<i32>) -> anyhow::Result<BytesMut> {
    let mut packet_buf = BytesMut::new();
    write_varint(&mut packet_buf, packet_id);
    packet_buf.extend_from_slice(payload);

    let mut frame = BytesMut::new();

    if let Some(threshold) = compression_threshold {
        let uncompressed_len = packet_buf.len() as i32;
        if uncompressed_len >= threshold {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&packet_buf)?;
            let compressed = encoder.finish()?;

            let data_length_size = varint_len(uncompressed_len);
            let total_length = data_length_size + compressed.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, uncompressed_len);
            frame.extend_from_slice(&compressed);
        } else {
            let total_length = 1 + packet_buf.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, 0);
            frame.extend_from_slice(&packet_buf);
        }
    } else {
        write_varint(&mut frame, packet_buf.len() as i32);
        frame.extend_from_slice(&packet_buf);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncompressed_frame() {
        let mut buf = build_frame(0x10, &[1, 2, 3], None).unwrap();
        assert_eq!(&buf[..], &[4, 0x10, 1, 2, 3]);
        let (id, payload) = try_parse_packet(&mut buf, None).unwrap().unwrap();
        assert_eq!(id, 0x10);
        assert_eq!(&payload[..], &[1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_small_packets_stay_uncompressed_below_threshold() {
        let buf = build_frame(0x01, &[9], Some(256)).unwrap();
        // length, data length 0, id, payload
        assert_eq!(&buf[..], &[3, 0, 0x01, 9]);
    }

    #[test]
    fn test_large_packets_are_compressed() {
        let payload = vec![7u8; 1024];
        let mut buf = build_frame(0x22, &payload, Some(256)).unwrap();
        assert!(buf.len() < payload.len());
        let (id, parsed) = try_parse_packet(&mut buf, Some(256)).unwrap().unwrap();
        assert_eq!(id, 0x22);
        assert_eq!(&parsed[..], &payload[..]);
    }

    #[test]
    fn test_oversized_data_length_is_rejected() {
        let mut body = BytesMut::new();
        write_varint(&mut body, MAX_DATA_LENGTH + 1);
        body.extend_from_slice(&[0x78, 0x9C]);
        let mut buf = BytesMut::new();
        write_varint(&mut buf, body.len() as i32);
        buf.extend_from_slice(&body);
        assert!(try_parse_packet(&mut buf, Some(256)).is_err());
    }

    #[test]
    fn test_partial_frame_waits_for_more_data() {
        let frame = build_frame(0x05, &[1, 2, 3, 4], None).unwrap();
        let mut buf = BytesMut::from(&frame[..3]);
        assert!(try_parse_packet(&mut buf, None).unwrap().is_none());
        buf.extend_from_slice(&frame[3..]);
        assert_eq!(try_parse_packet(&mut buf, None).unwrap().unwrap().0, 0x05);
    }

    #[test]
    fn test_compression_state_is_shared() {
        let state = CompressionState::new();
        let other = state.clone();
        assert_eq!(other.threshold(), None);
        state.enable(256);
        assert_eq!(other.threshold(), Some(256));
    }
}
