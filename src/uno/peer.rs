//! Scripted URP peer that plays the office side of a bridge in unit tests.
//!
//! It answers the bootstrap (initial object, service manager, type
//! description manager), `queryInterface` from a table of supported
//! interfaces, and the reflection calls that describe registered interfaces.
//! Everything else is answered by handlers keyed on object and function id.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::error::UrpError;
use super::marshal::{InboundCaches, Marshal, Unmarshal};
use super::types::{Oid, UnoType, Value, XINTERFACE};

const LONG_HEADER: u8 = 0x80;
const REQUEST: u8 = 0x40;
const NEW_TYPE: u8 = 0x20;
const EXCEPTION: u8 = 0x20;
const NEW_OID: u8 = 0x10;
const NEW_TID: u8 = 0x08;

pub(crate) const INITIAL_OBJECT: &str = "StarOffice.ComponentContext";
pub(crate) const CONTEXT: &str = "ctx";
pub(crate) const SERVICE_MANAGER: &str = "smgr";
const TYPE_MANAGER: &str = "tdm";
// com.sun.star.uno.TypeClass.INTERFACE_METHOD
const METHOD_TYPE_CLASS: i32 = 25;

#[derive(Debug, Clone)]
pub(crate) struct PeerRequest {
    pub function_id: u16,
    pub interface: String,
    pub oid: String,
    tid: Bytes,
    args: Bytes,
}

impl PeerRequest {
    fn arg<T>(&self, f: impl FnOnce(&mut Unmarshal<'_>) -> Result<T, UrpError>) -> T {
        let mut args = self.args.clone();
        let mut caches = InboundCaches::default();
        let mut r = Unmarshal::new(&mut args, &mut caches);
        f(&mut r).unwrap()
    }

    pub fn type_arg(&self) -> String {
        self.arg(|r| r.uno_type()).name().into_owned()
    }

    pub fn string_arg(&self) -> String {
        self.arg(|r| r.string())
    }

    pub fn long_arg(&self) -> i32 {
        self.arg(|r| r.i32())
    }

    pub fn is(&self, oid: &str, interface: &str, function_id: u16) -> bool {
        self.oid == oid && self.interface == interface && self.function_id == function_id
    }
}

pub(crate) enum PeerReply {
    /// Value of the method's declared return type
    Value(Value),
    Any(UnoType, Value),
    Exception(&'static str),
}

type Handler = Box<dyn FnMut(&PeerRequest) -> PeerReply + Send>;

pub(crate) struct ScriptedOffice {
    interfaces: HashMap<String, (Vec<String>, Vec<String>)>,
    objects: HashMap<String, Vec<String>>,
    handlers: HashMap<(String, u16), Handler>,
}

impl ScriptedOffice {
    pub fn new() -> Self {
        let mut office = Self {
            interfaces: HashMap::new(),
            objects: HashMap::new(),
            handlers: HashMap::new(),
        };
        office.object(CONTEXT, &["com.sun.star.uno.XComponentContext"]);
        office.object(TYPE_MANAGER, &["com.sun.star.container.XHierarchicalNameAccess"]);
        office
    }

    /// Describe `name` to the type description manager
    pub fn interface(&mut self, name: &str, bases: &[&str], methods: &[&str]) -> &mut Self {
        self.interfaces.insert(
            name.to_string(),
            (
                bases.iter().map(|b| b.to_string()).collect(),
                methods.iter().map(|m| m.to_string()).collect(),
            ),
        );
        self
    }

    /// Interfaces `queryInterface` reports for `oid`
    pub fn object(&mut self, oid: &str, interfaces: &[&str]) -> &mut Self {
        self.objects.insert(
            oid.to_string(),
            interfaces.iter().map(|i| i.to_string()).collect(),
        );
        self
    }

    pub fn on(
        &mut self,
        oid: &str,
        function_id: u16,
        handler: impl FnMut(&PeerRequest) -> PeerReply + Send + 'static,
    ) -> &mut Self {
        self.handlers
            .insert((oid.to_string(), function_id), Box::new(handler));
        self
    }

    /// Accept one bridge and serve it until the client hangs up. Returns every
    /// request received, in order.
    pub async fn serve(mut self, listener: TcpListener) -> Vec<PeerRequest> {
        let (mut stream, _) = listener.accept().await.unwrap();
        write_message(&mut stream, &request_change()).await;

        let mut log = Vec::new();
        while let Some(mut block) = read_block(&mut stream).await {
            let mut caches = InboundCaches::default();
            let mut r = Unmarshal::new(&mut block, &mut caches);
            let flags = r.u8().unwrap();
            if flags & REQUEST == 0 {
                // the client's answer to requestChange
                continue;
            }
            let function_id = r.u16().unwrap();
            let interface = r.uno_type().unwrap().name().into_owned();
            let oid = r.oid().unwrap().unwrap().as_str().to_string();
            let tid = r.tid().unwrap();
            let request = PeerRequest {
                function_id,
                interface,
                oid,
                tid,
                args: block,
            };

            let reply = self.dispatch(&request);
            write_message(&mut stream, &encode_reply(&request.tid, reply)).await;
            log.push(request);
        }
        log
    }

    fn dispatch(&mut self, request: &PeerRequest) -> PeerReply {
        if request.interface == XINTERFACE && request.function_id == 0 {
            return self.query(request);
        }
        if let Some(handler) = self
            .handlers
            .get_mut(&(request.oid.clone(), request.function_id))
        {
            return handler(request);
        }
        self.reflect(request)
            .unwrap_or(PeerReply::Exception("com.sun.star.uno.RuntimeException"))
    }

    fn query(&self, request: &PeerRequest) -> PeerReply {
        // the office hands out its initial object as a bare XInterface
        if request.oid == INITIAL_OBJECT {
            return PeerReply::Any(UnoType::interface(XINTERFACE), object(CONTEXT));
        }
        let wanted = request.type_arg();
        let supported = self
            .objects
            .get(&request.oid)
            .is_some_and(|interfaces| interfaces.contains(&wanted));
        if supported {
            PeerReply::Any(UnoType::interface(&wanted), object(&request.oid))
        } else {
            PeerReply::Any(UnoType::Void, Value::Void)
        }
    }

    fn reflect(&self, request: &PeerRequest) -> Option<PeerReply> {
        let reply = match (request.interface.as_str(), request.function_id) {
            ("com.sun.star.uno.XComponentContext", 4) if request.oid == CONTEXT => {
                PeerReply::Value(object(SERVICE_MANAGER))
            }
            ("com.sun.star.uno.XComponentContext", 3) if request.oid == CONTEXT => {
                PeerReply::Any(UnoType::interface(XINTERFACE), object(TYPE_MANAGER))
            }
            ("com.sun.star.container.XHierarchicalNameAccess", 3) => {
                let name = request.string_arg();
                if !self.interfaces.contains_key(&name) {
                    return Some(PeerReply::Exception(
                        "com.sun.star.container.NoSuchElementException",
                    ));
                }
                PeerReply::Any(
                    UnoType::interface("com.sun.star.reflection.XInterfaceTypeDescription2"),
                    object(&format!("td:{name}")),
                )
            }
            ("com.sun.star.reflection.XInterfaceTypeDescription2", 8) => {
                let (bases, _) = self.described(&request.oid)?;
                PeerReply::Value(Value::Sequence(
                    bases.iter().map(|b| object(&format!("td:{b}"))).collect(),
                ))
            }
            ("com.sun.star.reflection.XInterfaceTypeDescription2", 7) => {
                let name = request.oid.strip_prefix("td:")?;
                let (_, methods) = self.interfaces.get(name)?;
                // listed in reverse, getPosition carries the declaration order
                PeerReply::Value(Value::Sequence(
                    (0..methods.len())
                        .rev()
                        .map(|i| object(&format!("m:{name}#{i}")))
                        .collect(),
                ))
            }
            ("com.sun.star.reflection.XTypeDescription", 4) => {
                PeerReply::Value(Value::String(request.oid.strip_prefix("td:")?.to_string()))
            }
            ("com.sun.star.reflection.XTypeDescription", 3) => {
                PeerReply::Value(Value::Enum(METHOD_TYPE_CLASS))
            }
            ("com.sun.star.reflection.XInterfaceMemberTypeDescription", 6) => {
                let (_, index) = member(&request.oid)?;
                PeerReply::Value(Value::Long(index as i32))
            }
            ("com.sun.star.reflection.XInterfaceMemberTypeDescription", 5) => {
                let (name, index) = member(&request.oid)?;
                let (_, methods) = self.interfaces.get(name)?;
                PeerReply::Value(Value::String(methods.get(index)?.clone()))
            }
            _ => return None,
        };
        Some(reply)
    }

    fn described(&self, oid: &str) -> Option<&(Vec<String>, Vec<String>)> {
        self.interfaces.get(oid.strip_prefix("td:")?)
    }
}

pub(crate) fn object(oid: &str) -> Value {
    Value::Object(Some(Oid::new(oid)))
}

fn member(oid: &str) -> Option<(&str, usize)> {
    let (name, index) = oid.strip_prefix("m:")?.split_once('#')?;
    Some((name, index.parse().ok()?))
}

fn request_change() -> Bytes {
    let mut m = Marshal::new();
    m.u8(LONG_HEADER | REQUEST | NEW_TYPE | NEW_OID | NEW_TID);
    m.u8(4);
    m.uno_type(&UnoType::interface("com.sun.star.bridge.XProtocolProperties"));
    m.oid(Some(&Oid::new("UrpProtocolProperties")));
    m.tid(b"office-thread");
    m.value(&Value::Long(7));
    m.finish()
}

fn encode_reply(tid: &[u8], reply: PeerReply) -> Bytes {
    let mut m = Marshal::new();
    match reply {
        PeerReply::Value(value) => {
            m.u8(LONG_HEADER | NEW_TID);
            m.tid(tid);
            m.value(&value);
        }
        PeerReply::Any(ty, value) => {
            m.u8(LONG_HEADER | NEW_TID);
            m.tid(tid);
            m.uno_type(&ty);
            m.value(&value);
        }
        PeerReply::Exception(name) => {
            m.u8(LONG_HEADER | EXCEPTION | NEW_TID);
            m.tid(tid);
            m.uno_type(&UnoType::Exception(name.into()));
            m.string("");
            m.oid(None);
        }
    }
    m.finish()
}

async fn read_block(stream: &mut TcpStream) -> Option<Bytes> {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header).await.ok()?;
    let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let mut body = vec![0u8; size];
    stream.read_exact(&mut body).await.ok()?;
    Some(Bytes::from(body))
}

async fn write_message(stream: &mut TcpStream, message: &[u8]) {
    let mut out = (message.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(message);
    stream.write_all(&out).await.unwrap();
}
