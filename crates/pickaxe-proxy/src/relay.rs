use crate::connection::{self, CompressionState, ConnectionReader, ConnectionWriter};
use crate::routes::Routes;
use anyhow::{anyhow, Result};
use pickaxe_protocol_core::{
    read_varint, Direction, Envelope, Outcome, Pipeline, PipelineConfig, ProtocolInfo, RawFrame, State, Transformed,
    UserConnection,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Login clientbound: the server switches compression on.
const SET_COMPRESSION: i32 = 0x03;

enum Outbound {
    Packet(Envelope),
    /// Takes effect for every frame written after it.
    EnableCompression(i32),
}

/// Where transformed packets go, by direction.
#[derive(Clone)]
struct Sinks {
    client: mpsc::UnboundedSender<Outbound>,
    server: mpsc::UnboundedSender<Outbound>,
}

impl Sinks {
    fn send(&self, envelope: Envelope) -> Result<()> {
        let sink = match envelope.direction() {
            Direction::Clientbound => &self.client,
            Direction::Serverbound => &self.server,
        };
        sink.send(Outbound::Packet(envelope))
            .map_err(|_| anyhow!("Writer task has stopped"))
    }

    /// Injected packets first, then the packet itself.
    fn deliver(&self, transformed: Transformed) -> Result<bool> {
        for envelope in transformed.injected {
            self.send(envelope)?;
        }
        match transformed.outcome {
            Outcome::Deliver(envelope) => {
                self.send(envelope)?;
                Ok(true)
            }
            Outcome::Cancelled => Ok(false),
        }
    }
}

/// Relay one client to the backend until either side closes.
pub async fn handle_connection(
    client: TcpStream,
    peer: SocketAddr,
    backend: String,
    routes: Arc<Routes>,
    pipeline_config: Arc<PipelineConfig>,
) {
    if let Err(e) = relay(client, peer, &backend, routes, pipeline_config).await {
        debug!("Connection {} ended: {}", peer, e);
    }
}

async fn relay(
    client: TcpStream,
    peer: SocketAddr,
    backend: &str,
    routes: Arc<Routes>,
    pipeline_config: Arc<PipelineConfig>,
) -> Result<()> {
    let server = TcpStream::connect(backend).await?;
    let (client_reader, client_writer, _) = connection::split(client);
    let (server_reader, server_writer, server_compression) = connection::split(server);

    let backend_protocol = routes.backend().number;
    let user = UserConnection::new(pipeline_config, ProtocolInfo::new(backend_protocol, backend_protocol));
    let pipeline = Arc::new(Pipeline::new(Arc::new(user)));
    pipeline.initialize(vec![routes.base()])?;
    debug!("[{}] relaying {} to {}", pipeline.user().id(), peer, backend);

    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let sinks = Sinks {
        client: client_tx,
        server: server_tx,
    };

    let client_writer = tokio::spawn(write_loop(client_writer, client_rx));
    let server_writer = tokio::spawn(write_loop(server_writer, server_rx));

    let result = tokio::select! {
        result = clientbound(server_reader, server_compression, pipeline.clone(), sinks.clone()) => result,
        result = serverbound(client_reader, pipeline.clone(), routes, sinks) => result,
    };

    client_writer.abort();
    server_writer.abort();
    if let Some(name) = pipeline.user().username() {
        info!("{} disconnected", name);
    }
    result
}

async fn write_loop(writer: ConnectionWriter, rx: mpsc::UnboundedReceiver<Outbound>) {
    if let Err(e) = write_all(writer, rx).await {
        debug!("Writer error: {}", e);
    }
}

async fn write_all(mut writer: ConnectionWriter, mut rx: mpsc::UnboundedReceiver<Outbound>) -> Result<()> {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Packet(envelope) => {
                let payload = envelope.payload()?;
                writer.write_packet(envelope.id(), &payload).await?;
            }
            Outbound::EnableCompression(threshold) => writer.enable_compression(threshold),
        }
    }
    writer.shutdown().await
}

async fn clientbound(
    mut reader: ConnectionReader,
    compression: CompressionState,
    pipeline: Arc<Pipeline>,
    sinks: Sinks,
) -> Result<()> {
    loop {
        let (id, payload) = reader.read_packet().await?;
        let state = pipeline.user().info().sender_state(Direction::Clientbound);

        // Both ends compress from here on. The server already does; the
        // client does once it has read this packet uncompressed.
        let threshold = if state == State::Login && id == SET_COMPRESSION {
            let threshold = read_varint(&mut payload.clone())?;
            compression.enable(threshold);
            Some(threshold)
        } else {
            None
        };

        let frame = RawFrame {
            direction: Direction::Clientbound,
            state,
            id,
            payload,
        };
        let mut replacements = Vec::new();
        if state == State::Play && pipeline.filter(frame.clone(), &mut replacements)? {
            for envelope in replacements {
                let state = envelope.state();
                sinks.deliver(pipeline.transform(Direction::Clientbound, state, envelope)?)?;
            }
            continue;
        }

        let delivered = sinks.deliver(pipeline.transform(Direction::Clientbound, state, frame.into_envelope())?)?;
        if let Some(threshold) = threshold {
            if !delivered {
                return Err(anyhow!("Compression packet was cancelled"));
            }
            sinks
                .client
                .send(Outbound::EnableCompression(threshold))
                .map_err(|_| anyhow!("Writer task has stopped"))?;
        }
    }
}

async fn serverbound(mut reader: ConnectionReader, pipeline: Arc<Pipeline>, routes: Arc<Routes>, sinks: Sinks) -> Result<()> {
    loop {
        let (id, payload) = reader.read_packet().await?;
        let state = pipeline.user().info().sender_state(Direction::Serverbound);
        let envelope = Envelope::from_raw(Direction::Serverbound, state, id, payload);
        let transformed = pipeline.transform(Direction::Serverbound, state, envelope)?;

        if state == State::Handshake {
            let (client_protocol, next) = {
                let info = pipeline.user().info();
                (info.client_protocol, info.server_state)
            };
            match routes.chain(client_protocol) {
                Some(chain) => {
                    if !chain.is_empty() {
                        debug!(
                            "[{}] protocol {} joins through {} translators",
                            pipeline.user().id(),
                            client_protocol,
                            chain.len()
                        );
                    }
                    pipeline.append_many(chain)?;
                }
                None if next == State::Login => {
                    return Err(anyhow!(
                        "No translators from protocol {} to {}",
                        client_protocol,
                        routes.backend()
                    ));
                }
                None => warn!("Status request from unsupported protocol {}", client_protocol),
            }
        }

        sinks.deliver(transformed)?;
    }
}
