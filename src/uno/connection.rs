//! One URP bridge over a TCP socket, driven by a single logical thread.
//!
//! Calls are strictly sequential: a request is written, then incoming
//! messages are consumed until the matching reply arrives. Requests the peer
//! sends in the meantime are limited to protocol negotiation and reference
//! counting, anything else fails the call.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::error::UrpError;
use super::marshal::{InboundCaches, Marshal, Unmarshal};
use super::types::{Oid, UnoType, Value, RUNTIME_EXCEPTION};

// first header byte
const LONG_HEADER: u8 = 0x80;
const REQUEST: u8 = 0x40;
const NEW_TYPE: u8 = 0x20;
const EXCEPTION: u8 = 0x20;
const NEW_OID: u8 = 0x10;
const NEW_TID: u8 = 0x08;
const FUNCTION_ID16: u8 = 0x04;
const MORE_FLAGS: u8 = 0x01;
// short header
const FUNCTION_ID14: u8 = 0x40;
// second header byte
const MUST_REPLY: u8 = 0x80;

pub(crate) const QUERY_INTERFACE: u16 = 0;
const ACQUIRE: u16 = 1;
const RELEASE: u16 = 2;

const PROTOCOL_PROPERTIES: &str = "com.sun.star.bridge.XProtocolProperties";
const REQUEST_CHANGE: u16 = 4;

const MAX_BLOCK_SIZE: u32 = 64 * 1024 * 1024;

struct InboundRequest {
    interface: UnoType,
    tid: Bytes,
    function_id: u16,
    must_reply: bool,
}

enum Inbound {
    Request(InboundRequest),
    Reply { tid: Bytes, exception: bool },
}

pub(crate) struct UrpConnection {
    stream: TcpStream,
    tid: Bytes,
    call_timeout: Duration,
    block: Bytes,
    block_remaining: u32,
    caches: InboundCaches,
    last_type: Option<UnoType>,
    last_oid: Option<Oid>,
    last_tid: Option<Bytes>,
    poisoned: bool,
}

impl UrpConnection {
    /// Connect failures are returned as plain I/O errors so callers can tell
    /// an unreachable endpoint apart from a broken conversation.
    pub async fn open(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        call_timeout: Duration,
    ) -> io::Result<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            tid: Bytes::from(format!("cuecard-{}", uuid::Uuid::new_v4()).into_bytes()),
            call_timeout,
            block: Bytes::new(),
            block_remaining: 0,
            caches: InboundCaches::default(),
            last_type: None,
            last_oid: None,
            last_tid: None,
            poisoned: false,
        })
    }

    /// Synchronous call of `function_id` on `oid` viewed through `interface`
    pub async fn call(
        &mut self,
        oid: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
        ret: &UnoType,
    ) -> Result<Value, UrpError> {
        self.call_with(oid, interface, function_id, args, |r| r.value(ret))
            .await
    }

    /// Like `call` for an `any` result, keeping the type the value travelled as
    pub async fn call_any(
        &mut self,
        oid: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
    ) -> Result<(UnoType, Value), UrpError> {
        self.call_with(oid, interface, function_id, args, |r| r.any())
            .await
    }

    async fn call_with<T>(
        &mut self,
        oid: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
        decode: impl FnOnce(&mut Unmarshal<'_>) -> Result<T, UrpError>,
    ) -> Result<T, UrpError> {
        if self.poisoned {
            return Err(UrpError::Poisoned);
        }

        let limit = self.call_timeout;
        let result = match tokio::time::timeout(
            limit,
            self.exchange(oid, interface, function_id, args, decode),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(UrpError::Timeout(limit)),
        };

        // a failed call can leave half a reply in the block buffer
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn exchange<T>(
        &mut self,
        oid: &Oid,
        interface: &str,
        function_id: u16,
        args: &[Value],
        decode: impl FnOnce(&mut Unmarshal<'_>) -> Result<T, UrpError>,
    ) -> Result<T, UrpError> {
        let mut m = Marshal::new();
        m.u8(LONG_HEADER | REQUEST | NEW_TYPE | NEW_OID | NEW_TID | FUNCTION_ID16);
        m.u16(function_id);
        m.uno_type(&UnoType::interface(interface));
        m.oid(Some(oid));
        m.tid(&self.tid);
        for arg in args {
            m.value(arg);
        }
        self.send(m.finish()).await?;

        loop {
            match self.read_message().await? {
                Inbound::Request(request) => self.answer(request).await?,
                Inbound::Reply { tid, exception } => {
                    if tid != self.tid {
                        return Err(UrpError::protocol("reply addressed to a foreign thread"));
                    }
                    let mut r = Unmarshal::new(&mut self.block, &mut self.caches);
                    if exception {
                        let raised = r.uno_type()?;
                        return Err(UrpError::RemoteException(raised.name().into_owned()));
                    }
                    return decode(&mut r);
                }
            }
        }
    }

    async fn send(&mut self, message: Bytes) -> Result<(), UrpError> {
        let mut header = Marshal::new();
        header.u32(message.len() as u32);
        header.u32(1);
        self.stream.write_all(&header.finish()).await?;
        self.stream.write_all(&message).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_block(&mut self) -> Result<(), UrpError> {
        let mut header = [0u8; 8];
        self.stream.read_exact(&mut header).await?;
        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let count = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if size > MAX_BLOCK_SIZE {
            return Err(UrpError::protocol(format!("block of {size} bytes")));
        }

        let mut body = vec![0u8; size as usize];
        self.stream.read_exact(&mut body).await?;
        self.block = Bytes::from(body);
        self.block_remaining = count;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Inbound, UrpError> {
        while self.block_remaining == 0 {
            self.read_block().await?;
        }
        self.block_remaining -= 1;

        let mut r = Unmarshal::new(&mut self.block, &mut self.caches);
        let flags = r.u8()?;

        if flags & LONG_HEADER == 0 {
            let function_id = if flags & FUNCTION_ID14 != 0 {
                (u16::from(flags & 0x3F) << 8) | u16::from(r.u8()?)
            } else {
                u16::from(flags & 0x3F)
            };
            let interface = self
                .last_type
                .clone()
                .ok_or_else(|| UrpError::protocol("short request without prior type"))?;
            let tid = self
                .last_tid
                .clone()
                .ok_or_else(|| UrpError::protocol("short request without prior TID"))?;
            if self.last_oid.is_none() {
                return Err(UrpError::protocol("short request without prior OID"));
            }
            return Ok(Inbound::Request(InboundRequest {
                interface,
                tid,
                function_id,
                must_reply: !is_oneway(function_id),
            }));
        }

        if flags & REQUEST == 0 {
            let tid = if flags & NEW_TID != 0 {
                r.tid()?
            } else {
                self.last_tid
                    .clone()
                    .ok_or_else(|| UrpError::protocol("reply without prior TID"))?
            };
            self.last_tid = Some(tid.clone());
            return Ok(Inbound::Reply {
                tid,
                exception: flags & EXCEPTION != 0,
            });
        }

        let must_reply = if flags & MORE_FLAGS != 0 {
            Some(r.u8()? & MUST_REPLY != 0)
        } else {
            None
        };
        let function_id = if flags & FUNCTION_ID16 != 0 {
            r.u16()?
        } else {
            u16::from(r.u8()?)
        };
        if flags & NEW_TYPE != 0 {
            self.last_type = Some(r.uno_type()?);
        }
        if flags & NEW_OID != 0 {
            let oid = r
                .oid()?
                .ok_or_else(|| UrpError::protocol("request on null OID"))?;
            self.last_oid = Some(oid);
        }
        if flags & NEW_TID != 0 {
            self.last_tid = Some(r.tid()?);
        }

        let interface = self
            .last_type
            .clone()
            .ok_or_else(|| UrpError::protocol("request without type"))?;
        let tid = self
            .last_tid
            .clone()
            .ok_or_else(|| UrpError::protocol("request without TID"))?;
        if self.last_oid.is_none() {
            return Err(UrpError::protocol("request without OID"));
        }

        Ok(Inbound::Request(InboundRequest {
            interface,
            tid,
            function_id,
            must_reply: must_reply.unwrap_or_else(|| !is_oneway(function_id)),
        }))
    }

    /// The peer opens with a protocol-properties negotiation. Answering it with a
    /// RuntimeException is the legacy-peer path and switches it straight to
    /// normal mode with default properties.
    async fn answer(&mut self, request: InboundRequest) -> Result<(), UrpError> {
        let name = request.interface.name();
        if name == PROTOCOL_PROPERTIES && request.function_id == REQUEST_CHANGE {
            let random = Unmarshal::new(&mut self.block, &mut self.caches).i32()?;
            tracing::trace!(random, "declining protocol property negotiation");
            return self
                .reply_runtime_exception(&request.tid, "protocol properties not supported")
                .await;
        }

        if !request.must_reply && matches!(request.function_id, ACQUIRE | RELEASE) {
            return Ok(());
        }

        Err(UrpError::protocol(format!(
            "unexpected request {}#{} from peer",
            name, request.function_id
        )))
    }

    async fn reply_runtime_exception(&mut self, tid: &[u8], message: &str) -> Result<(), UrpError> {
        let mut m = Marshal::new();
        m.u8(LONG_HEADER | EXCEPTION | NEW_TID);
        m.tid(tid);
        // any(RuntimeException { Message, Context })
        m.uno_type(&UnoType::Exception(RUNTIME_EXCEPTION.into()));
        m.string(message);
        m.oid(None);
        self.send(m.finish()).await
    }
}

fn is_oneway(function_id: u16) -> bool {
    matches!(function_id, ACQUIRE | RELEASE)
}
