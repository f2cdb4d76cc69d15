use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use airlock_transport::{LocalStream, TransportError, UnixDomainSocket};
use airlock_wire::{FrameConfig, FrameReader, FrameWriter, Request, Response, Value, WireError};
use tracing::{debug, info, warn};

use crate::error::{DispatchError, Result, RpcError};
use crate::registry::Resolve;
use crate::shutdown::ShutdownHandle;

/// What to do with a connection whose request does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Answer with a response whose `error` describes the decode failure.
    #[default]
    Reply,
    /// Close the connection without a response.
    Drop,
}

/// Server behavior configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Read/write limits applied to every connection.
    pub frame: FrameConfig,
    /// Handling of requests that fail to decode.
    pub malformed: MalformedPolicy,
    /// Permission mode of the socket file.
    pub socket_mode: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            malformed: MalformedPolicy::default(),
            socket_mode: UnixDomainSocket::DEFAULT_SOCKET_MODE,
        }
    }
}

/// Outcome of one accepted connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    /// The client closed without sending anything. No response was sent.
    Empty,
    /// The request did not decode; `replied` tells whether an error response went out.
    Malformed { replied: bool },
    /// The request was dispatched and `response` was written back.
    Answered { method: String, response: Response },
    /// The connection arrived after shutdown was requested and was not read.
    Shutdown,
}

/// Single-threaded RPC server bound to a local socket.
///
/// Each accepted connection carries exactly one request and one response and
/// is closed before the next connection is accepted. There is no read or
/// write timeout unless one is configured in [`ServerConfig::frame`], so a
/// client that connects and stays silent blocks every other client.
pub struct RpcServer<R> {
    socket: Option<UnixDomainSocket>,
    path: PathBuf,
    registry: R,
    config: ServerConfig,
    shutdown: ShutdownHandle,
}

impl<R: Resolve> RpcServer<R> {
    /// Bind to `path` with default configuration.
    pub fn bind(path: impl AsRef<Path>, registry: R) -> Result<Self> {
        Self::bind_with_config(path, registry, ServerConfig::default())
    }

    /// Bind to `path`, replacing any stale artifact left there.
    pub fn bind_with_config(
        path: impl AsRef<Path>,
        registry: R,
        config: ServerConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let socket =
            UnixDomainSocket::bind_with_mode(&path, config.socket_mode).map_err(RpcError::Bind)?;

        info!(
            ?path,
            methods = ?registry.method_names(),
            "rpc server started"
        );

        Ok(Self {
            socket: Some(socket),
            shutdown: ShutdownHandle::new(&path),
            path,
            registry,
            config,
        })
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Methods this server dispatches to.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Configuration the server was bound with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle that stops [`serve`](Self::serve) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve connections until shutdown is requested.
    ///
    /// The socket is closed and its file removed before this returns, whether
    /// the loop ended through shutdown or through an error.
    pub fn serve(&mut self) -> Result<()> {
        let result = self.accept_loop();
        self.stop();
        result
    }

    fn accept_loop(&self) -> Result<()> {
        while !self.shutdown.is_shutdown() {
            match self.serve_one() {
                Ok(Exchange::Shutdown) | Err(RpcError::Stopped) => break,
                Ok(_) => {}
                Err(RpcError::Transport(TransportError::Accept(err))) => {
                    if self.shutdown.is_shutdown() {
                        break;
                    }
                    if err.kind() == ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(TransportError::Accept(err).into());
                }
                Err(err) => warn!(error = %err, "connection failed"),
            }
        }
        debug!(path = ?self.path, "accept loop finished");
        Ok(())
    }

    /// Accept one connection and process it to completion (blocking).
    pub fn serve_one(&self) -> Result<Exchange> {
        let socket = self.socket.as_ref().ok_or(RpcError::Stopped)?;
        let stream = socket.accept()?;

        if self.shutdown.is_shutdown() {
            debug!("connection arrived during shutdown; not processing");
            return Ok(Exchange::Shutdown);
        }

        if let Some((uid, gid, pid)) = stream.peer_credentials() {
            debug!(uid, gid, pid, "client connected");
        }

        let connection = Connection { stream };
        self.exchange(&connection)
    }

    fn exchange(&self, connection: &Connection) -> Result<Exchange> {
        let frame_config = self.config.frame.clone();
        let mut reader =
            FrameReader::with_config_stream(connection.stream.try_clone()?, frame_config.clone())?;
        let mut writer = FrameWriter::with_config_stream(connection.stream.try_clone()?, frame_config)?;

        let request = match reader.read_request() {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("client closed without sending a request");
                return Ok(Exchange::Empty);
            }
            Err(err @ WireError::Io(_)) => return Err(err.into()),
            Err(err) => {
                warn!(error = %err, "received malformed request");
                return match self.config.malformed {
                    MalformedPolicy::Drop => Ok(Exchange::Malformed { replied: false }),
                    MalformedPolicy::Reply => {
                        writer.write_message(&Response::err(err.to_string()))?;
                        Ok(Exchange::Malformed { replied: true })
                    }
                };
            }
        };

        info!(method = %request.method, args = request.args.len(), "received request");
        debug!(method = %request.method, args = ?request.args, "request arguments");

        let response = dispatch(&self.registry, &request);
        let size = writer.write_message(&response)?;

        if response.is_error() {
            info!(method = %request.method, error = %response.error, "sent error response");
        } else {
            info!(method = %request.method, size, "sent response");
            debug!(method = %request.method, result = ?response.result, "response result");
        }

        Ok(Exchange::Answered {
            method: request.method,
            response,
        })
    }

    /// Stop accepting, close the listener and remove the socket file.
    ///
    /// Safe to call any number of times; later calls do nothing.
    pub fn stop(&mut self) {
        self.shutdown.mark();
        if let Some(socket) = self.socket.take() {
            info!(path = ?self.path, "rpc server stopped");
            drop(socket);
        }
    }

    /// Whether the server still holds its listening socket.
    pub fn is_running(&self) -> bool {
        self.socket.is_some()
    }
}

impl<R> Drop for RpcServer<R> {
    fn drop(&mut self) {
        self.shutdown.mark();
        // Dropping the socket removes its file.
        self.socket.take();
    }
}

/// One accepted connection. Closed when dropped, on every exit path.
struct Connection {
    stream: LocalStream,
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.stream.close() {
            debug!(error = %err, "closing connection failed");
        }
    }
}

/// Resolve and invoke `request` against `registry`, producing the response.
///
/// Unknown methods, method failures and method panics all become a response
/// with `error` set; nothing here fails the server. A panic still passes
/// through the process panic hook first, so the default hook reports it on
/// stderr before it is turned into a response.
pub fn dispatch<R: Resolve + ?Sized>(registry: &R, request: &Request) -> Response {
    match invoke(registry, request) {
        Ok(value) => Response::ok(value),
        Err(err) => Response::err(err.to_string()),
    }
}

fn invoke<R: Resolve + ?Sized>(
    registry: &R,
    request: &Request,
) -> std::result::Result<Value, DispatchError> {
    let method = request.method.as_str();
    let callable = registry
        .resolve(method)
        .ok_or_else(|| DispatchError::MethodNotFound(method.to_string()))?;

    match panic::catch_unwind(AssertUnwindSafe(|| callable(&request.args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) if err.message().is_empty() => {
            Err(DispatchError::CallFailed(format!("method {method} failed")))
        }
        Ok(Err(err)) => Err(DispatchError::CallFailed(err.0)),
        Err(payload) => Err(DispatchError::CallFailed(format!(
            "method {method} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::os::unix::net::UnixListener;
    use std::thread::{self, JoinHandle};

    use super::*;
    use crate::args::{arg_i64, expect_arity};
    use crate::client::Client;
    use crate::registry::{CallError, Registry};

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/airlock-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("rpc.sock")
    }

    fn cleanup(sock_path: &Path) {
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    fn test_registry() -> Registry {
        Registry::new()
            .with("Add", |args| {
                expect_arity(args, 2)?;
                Ok(Value::Integer(arg_i64(args, 0)? + arg_i64(args, 1)?))
            })
            .with("Divide", |args| {
                expect_arity(args, 2)?;
                let (a, b) = (arg_i64(args, 0)?, arg_i64(args, 1)?);
                if b == 0 {
                    return Err(CallError::new("division by zero"));
                }
                Ok(Value::Integer(a / b))
            })
            .with("Nothing", |_| Ok(Value::Nil))
            .with("Boom", |_| panic!("kaboom"))
            .with("Silent", |_| Err(CallError::new("")))
    }

    fn spawn_server(
        sock_path: &Path,
        config: ServerConfig,
    ) -> (ShutdownHandle, JoinHandle<Result<()>>) {
        let mut server = RpcServer::bind_with_config(sock_path, test_registry(), config)
            .expect("server should bind");
        let handle = server.shutdown_handle();
        let join = thread::spawn(move || server.serve());
        (handle, join)
    }

    fn stop_server(handle: ShutdownHandle, join: JoinHandle<Result<()>>) {
        handle.shutdown();
        join.join()
            .expect("server thread should finish")
            .expect("serve should end cleanly");
    }

    fn raw_exchange(sock_path: &Path, bytes: &[u8]) -> Option<Response> {
        let mut stream = UnixDomainSocket::connect(sock_path).expect("client should connect");
        stream.write_all(bytes).expect("raw bytes should send");
        FrameReader::new(stream)
            .read_response()
            .expect("response read should not fail")
    }

    #[test]
    fn add_returns_sum() {
        let sock_path = make_sock_path("add");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = Client::new(&sock_path)
            .request(&Request::new("Add", vec![2.into(), 3.into()]))
            .expect("call should succeed");
        assert_eq!(response.result, Value::Integer(5));
        assert_eq!(response.error, "");

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn nil_result_is_success() {
        let sock_path = make_sock_path("nil");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let value = Client::new(&sock_path)
            .call("Nothing", vec![])
            .expect("nil result is not an error");
        assert_eq!(value, Value::Nil);

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn divide_by_zero_reports_failure() {
        let sock_path = make_sock_path("div");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = Client::new(&sock_path)
            .request(&Request::new("Divide", vec![10.into(), 0.into()]))
            .expect("exchange should succeed");
        assert_eq!(response, Response::err("division by zero"));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn unknown_method_reports_not_found() {
        let sock_path = make_sock_path("unknown");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = Client::new(&sock_path)
            .request(&Request::new("Unknown", vec![]))
            .expect("exchange should succeed");
        assert!(response.result.is_nil());
        assert_eq!(response.error, "Method Unknown not found");

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn argument_errors_are_reported() {
        let sock_path = make_sock_path("args");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = Client::new(&sock_path)
            .request(&Request::new("Add", vec![2.into(), "three".into()]))
            .expect("exchange should succeed");
        assert_eq!(response.error, "argument 1: expected integer, got string");

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn panicking_method_reports_error_and_server_continues() {
        let sock_path = make_sock_path("panic");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());
        let client = Client::new(&sock_path);

        let response = client
            .request(&Request::new("Boom", vec![]))
            .expect("exchange should succeed");
        assert_eq!(response.error, "method Boom panicked: kaboom");

        let sum = client.call("Add", vec![1.into(), 1.into()]).expect("server still serves");
        assert_eq!(sum, Value::Integer(2));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn empty_failure_message_still_signals_error() {
        let sock_path = make_sock_path("silent");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = Client::new(&sock_path)
            .request(&Request::new("Silent", vec![]))
            .expect("exchange should succeed");
        assert!(response.is_error());
        assert_eq!(response.error, "method Silent failed");

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn malformed_request_gets_error_reply_and_server_continues() {
        let sock_path = make_sock_path("malformed");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let response = raw_exchange(&sock_path, &[0xc1]).expect("reply policy answers");
        assert!(response.result.is_nil());
        assert!(
            response.error.starts_with("malformed message"),
            "unexpected error: {}",
            response.error
        );

        let sum = Client::new(&sock_path)
            .call("Add", vec![2.into(), 2.into()])
            .expect("server still serves");
        assert_eq!(sum, Value::Integer(4));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn deeply_nested_request_is_rejected_and_server_continues() {
        let sock_path = make_sock_path("nested");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        // {"func": "Add", "args": [[[...nil...]]]} nested 1000 levels
        let mut bytes = vec![0x82, 0xa4, b'f', b'u', b'n', b'c', 0xa3, b'A', b'd', b'd'];
        bytes.extend_from_slice(&[0xa4, b'a', b'r', b'g', b's']);
        bytes.extend(std::iter::repeat(0x91).take(1000));
        bytes.push(0xc0);

        let response = raw_exchange(&sock_path, &bytes).expect("reply policy answers");
        assert!(response.result.is_nil());
        assert!(
            response.error.starts_with("malformed message"),
            "unexpected error: {}",
            response.error
        );

        let sum = Client::new(&sock_path)
            .call("Add", vec![1.into(), 2.into()])
            .expect("server still serves");
        assert_eq!(sum, Value::Integer(3));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn oversized_request_gets_error_reply_and_server_continues() {
        let sock_path = make_sock_path("oversized");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let big = "x".repeat(airlock_wire::DEFAULT_MAX_FRAME_SIZE + 100);
        let bytes = airlock_wire::encode(&Request::new("Add", vec![big.into()]))
            .expect("request should encode");
        assert!(bytes.len() > airlock_wire::DEFAULT_MAX_FRAME_SIZE);

        let response = raw_exchange(&sock_path, &bytes).expect("reply policy answers");
        assert!(response.result.is_nil());
        assert_eq!(
            response.error,
            format!(
                "message exceeds max frame size ({} bytes)",
                airlock_wire::DEFAULT_MAX_FRAME_SIZE
            )
        );

        let sum = Client::new(&sock_path)
            .call("Add", vec![5.into(), 6.into()])
            .expect("server still serves");
        assert_eq!(sum, Value::Integer(11));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn malformed_request_is_dropped_with_drop_policy() {
        let sock_path = make_sock_path("drop");
        let config = ServerConfig {
            malformed: MalformedPolicy::Drop,
            ..ServerConfig::default()
        };
        let (handle, join) = spawn_server(&sock_path, config);

        assert!(raw_exchange(&sock_path, &[0xc1]).is_none());

        let sum = Client::new(&sock_path)
            .call("Add", vec![2.into(), 5.into()])
            .expect("server still serves");
        assert_eq!(sum, Value::Integer(7));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn empty_connection_is_abandoned() {
        let sock_path = make_sock_path("empty");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());

        let stream = UnixDomainSocket::connect(&sock_path).expect("client should connect");
        drop(stream);

        let sum = Client::new(&sock_path)
            .call("Add", vec![3.into(), 4.into()])
            .expect("server still serves");
        assert_eq!(sum, Value::Integer(7));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn sequential_clients_are_served_in_order() {
        let sock_path = make_sock_path("seq");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());
        let client = Client::new(&sock_path);

        for i in 0..5i64 {
            let value = client.call("Add", vec![i.into(), 10.into()]).unwrap();
            assert_eq!(value, Value::Integer(i + 10));
        }

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn serve_one_reports_exchange() {
        let sock_path = make_sock_path("one");
        let server = RpcServer::bind(&sock_path, test_registry()).expect("server should bind");

        let path = sock_path.clone();
        let client = thread::spawn(move || {
            Client::new(&path).call("Add", vec![2.into(), 3.into()])
        });

        let exchange = server.serve_one().expect("exchange should complete");
        assert_eq!(
            exchange,
            Exchange::Answered {
                method: "Add".to_string(),
                response: Response::ok(5),
            }
        );
        assert_eq!(client.join().unwrap().unwrap(), Value::Integer(5));

        drop(server);
        cleanup(&sock_path);
    }

    #[test]
    fn shutdown_unblocks_accept_and_removes_socket() {
        let sock_path = make_sock_path("shutdown");
        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());
        assert!(sock_path.exists());

        stop_server(handle.clone(), join);
        assert!(!sock_path.exists(), "socket file should be removed");

        // A second request after the server is gone is harmless.
        handle.shutdown();
        cleanup(&sock_path);
    }

    #[test]
    fn stop_is_idempotent() {
        let sock_path = make_sock_path("stop");
        let mut server = RpcServer::bind(&sock_path, test_registry()).expect("server should bind");
        assert!(server.is_running());

        server.stop();
        server.stop();
        assert!(!server.is_running());
        assert!(!sock_path.exists());
        assert!(matches!(server.serve_one(), Err(RpcError::Stopped)));
        assert!(server.serve().is_ok());

        cleanup(&sock_path);
    }

    #[test]
    fn drop_removes_socket() {
        let sock_path = make_sock_path("dropped");
        let server = RpcServer::bind(&sock_path, test_registry()).expect("server should bind");
        assert!(sock_path.exists());

        drop(server);
        assert!(!sock_path.exists());
        cleanup(&sock_path);
    }

    #[test]
    fn bind_replaces_stale_socket() {
        let sock_path = make_sock_path("stale");
        drop(UnixListener::bind(&sock_path).expect("stale socket should bind"));
        assert!(sock_path.exists());

        let (handle, join) = spawn_server(&sock_path, ServerConfig::default());
        let sum = Client::new(&sock_path)
            .call("Add", vec![2.into(), 3.into()])
            .expect("fresh server answers");
        assert_eq!(sum, Value::Integer(5));

        stop_server(handle, join);
        cleanup(&sock_path);
    }

    #[test]
    fn bind_failure_is_reported() {
        let sock_path = make_sock_path("bindfail");
        std::fs::create_dir_all(&sock_path).expect("directory should be creatable");

        let result = RpcServer::bind(&sock_path, test_registry());
        assert!(matches!(result, Err(RpcError::Bind(_))));

        cleanup(&sock_path);
    }

    #[test]
    fn dispatch_without_server() {
        let registry = test_registry();
        assert_eq!(
            dispatch(&registry, &Request::new("Add", vec![2.into(), 3.into()])),
            Response::ok(5)
        );
        assert_eq!(
            dispatch(&registry, &Request::new("Unknown", vec![])),
            Response::err("Method Unknown not found")
        );
    }
}
