use anyhow::{Context, Result, anyhow};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use super::barrier::BarrierCoordinator;
use super::protocol::{FabricReply, FabricRequest};
use crate::table::store::SlotStore;

const CONNECT_ATTEMPTS: usize = 40;
const CONNECT_BASE_DELAY_MS: u64 = 150;
const CONNECT_MAX_DELAY_MS: u64 = 1200;

/// Remote operations are tiny; anything close to this is a corrupt frame.
const MAX_FRAME_BYTES: u32 = 1 << 20;

async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let bytes = bincode::serialize(msg).context("encoding frame")?;
    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame; `None` on a cleanly closed connection.
async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e).context("reading frame length"),
    };
    if len > MAX_FRAME_BYTES {
        return Err(anyhow!("frame of {} bytes exceeds the protocol limit", len));
    }
    let mut buf = vec![0u8; len as usize];
    reader
        .read_exact(&mut buf)
        .await
        .context("reading frame body")?;
    let msg = bincode::deserialize(&buf).context("decoding frame")?;
    Ok(Some(msg))
}

/// One persistent connection to a peer rank.
///
/// Requests and responses strictly alternate on the stream, so operations
/// issued to one target complete in issue order.
struct PeerClient {
    addr: SocketAddr,
    stream: Mutex<TcpStream>,
}

impl PeerClient {
    /// Connects with bounded retry; peers of a job start at different times.
    async fn connect(addr: SocketAddr) -> Result<Self> {
        let mut delay_ms = CONNECT_BASE_DELAY_MS;
        let mut attempt = 0;
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(Self {
                        addr,
                        stream: Mutex::new(stream),
                    });
                }
                Err(e) => {
                    attempt += 1;
                    if attempt == CONNECT_ATTEMPTS {
                        return Err(e).with_context(|| format!("connecting to peer {}", addr));
                    }
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(CONNECT_MAX_DELAY_MS);
                }
            }
        }
    }

    async fn call(&self, req: &FabricRequest) -> Result<FabricReply> {
        let mut stream = self.stream.lock().await;
        write_frame(&mut *stream, req).await?;
        read_frame(&mut *stream)
            .await?
            .ok_or_else(|| anyhow!("peer {} closed the connection mid-call", self.addr))
    }
}

/// Applies an incoming remote operation to this rank's slot store.
///
/// This is the only path that mutates the store. Self-addressed operations
/// run through it as well, so a local insert and a remote insert are the
/// same code.
async fn dispatch(
    req: FabricRequest,
    store: &SlotStore,
    coordinator: Option<&BarrierCoordinator>,
) -> FabricReply {
    if let Some(slot) = req.slot()
        && slot >= store.slots()
    {
        return FabricReply::Rejected {
            reason: format!("slot {} out of range ({} local slots)", slot, store.slots()),
        };
    }
    match req {
        FabricRequest::InsertSlot { slot, entry } => {
            if store.try_reserve(slot) {
                store.write_entry(slot, entry);
                FabricReply::Inserted
            } else {
                FabricReply::Occupied
            }
        }
        FabricRequest::ReadSlot { slot } => {
            let (used, entry) = store.read_slot(slot);
            FabricReply::Slot { used, entry }
        }
        FabricRequest::ReserveSlot { slot } => FabricReply::Reserved {
            won: store.try_reserve(slot),
        },
        FabricRequest::BarrierArrive { rank } => match coordinator {
            Some(coordinator) => {
                tracing::debug!("rank {} arrived at barrier", rank);
                match coordinator.arrive().await {
                    Ok(()) => FabricReply::BarrierRelease,
                    Err(e) => FabricReply::Rejected {
                        reason: e.to_string(),
                    },
                }
            }
            None => FabricReply::Rejected {
                reason: "barrier coordinator lives on rank 0".to_string(),
            },
        },
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    store: Arc<SlotStore>,
    coordinator: Option<Arc<BarrierCoordinator>>,
) -> Result<()> {
    stream.set_nodelay(true)?;
    while let Some(req) = read_frame::<_, FabricRequest>(&mut stream).await? {
        let reply = dispatch(req, &store, coordinator.as_deref()).await;
        write_frame(&mut stream, &reply).await?;
    }
    Ok(())
}

/// A bound, not yet joined, rank endpoint.
///
/// Binding and joining are split so a caller can learn the ephemeral port
/// before the roster is assembled (tests bind `127.0.0.1:0`).
pub struct RankListener {
    listener: TcpListener,
}

impl RankListener {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding rank listener on {}", addr))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Joins the job: starts serving incoming operations, then connects to
    /// every peer in the roster. Returns once the mesh is complete.
    pub async fn join(
        self,
        rank: u32,
        roster: &[SocketAddr],
        store: Arc<SlotStore>,
    ) -> Result<Arc<ClusterFabric>> {
        let world = u32::try_from(roster.len()).context("roster too large")?;
        if rank >= world {
            return Err(anyhow!("rank {} out of range for {} ranks", rank, world));
        }

        let coordinator = (rank == 0).then(|| Arc::new(BarrierCoordinator::new(world)));

        // Serve before dialing out, or two ranks connecting to each other
        // would wait on one another forever.
        let accept_store = store.clone();
        let accept_coordinator = coordinator.clone();
        let listener = self.listener;
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        let store = accept_store.clone();
                        let coordinator = accept_coordinator.clone();
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, store, coordinator).await {
                                tracing::warn!("connection from {} failed: {}", peer_addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });

        let mut peers = Vec::with_capacity(roster.len());
        for (peer_rank, addr) in roster.iter().enumerate() {
            if peer_rank as u32 == rank {
                peers.push(None);
                continue;
            }
            let client = PeerClient::connect(*addr)
                .await
                .with_context(|| format!("rank {} joining rank {}", rank, peer_rank))?;
            peers.push(Some(client));
        }
        tracing::info!("rank {} joined a {}-rank job", rank, world);

        Ok(Arc::new(ClusterFabric {
            rank,
            world,
            peers,
            store,
            coordinator,
        }))
    }
}

/// The joined mesh: this rank's identity, its slot store, and one client
/// connection per peer.
pub struct ClusterFabric {
    rank: u32,
    world: u32,
    peers: Vec<Option<PeerClient>>,
    store: Arc<SlotStore>,
    coordinator: Option<Arc<BarrierCoordinator>>,
}

impl ClusterFabric {
    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn world(&self) -> u32 {
        self.world
    }

    pub fn store(&self) -> &Arc<SlotStore> {
        &self.store
    }

    /// Sends a remote operation to `target` and awaits its reply.
    pub async fn call(&self, target: u32, req: FabricRequest) -> Result<FabricReply> {
        if target >= self.world {
            return Err(anyhow!(
                "target rank {} out of range for {} ranks",
                target,
                self.world
            ));
        }
        if target == self.rank {
            return Ok(dispatch(req, &self.store, self.coordinator.as_deref()).await);
        }
        let peer = self.peers[target as usize]
            .as_ref()
            .ok_or_else(|| anyhow!("no connection to rank {}", target))?;
        peer.call(&req).await
    }

    /// Process-wide barrier. Returns once every rank of the job has arrived.
    pub async fn barrier(&self) -> Result<()> {
        match &self.coordinator {
            Some(coordinator) => coordinator.arrive().await,
            None => match self
                .call(0, FabricRequest::BarrierArrive { rank: self.rank })
                .await?
            {
                FabricReply::BarrierRelease => Ok(()),
                FabricReply::Rejected { reason } => {
                    Err(anyhow!("barrier rejected by rank 0: {}", reason))
                }
                other => Err(anyhow!("unexpected barrier reply: {:?}", other)),
            },
        }
    }
}
