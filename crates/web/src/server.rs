use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use lookout_http::connection::HttpConnection;
use lookout_http::protocol::HttpError;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::environment::Environment;
use crate::error::ServerError;
use crate::offloader::Offloader;
use crate::router::Router;
use crate::routes::build_router;
use crate::tls::load_acceptor;

pub struct ServerBuilder {
    router: Option<Router>,
    address: Option<SocketAddr>,
    tls: Option<TlsAcceptor>,
    tcp_nodelay: bool,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, address: None, tls: None, tcp_nodelay: false }
    }

    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn tcp_nodelay(mut self, tcp_nodelay: bool) -> Self {
        self.tcp_nodelay = tcp_nodelay;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        Ok(Server { dispatcher: Arc::new(Dispatcher::new(router)), address, tls: self.tls, tcp_nodelay: self.tcp_nodelay })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("tls", &self.tls.is_some())
            .field("tcp_nodelay", &self.tcp_nodelay)
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
}

pub struct Server {
    dispatcher: Arc<Dispatcher>,
    address: SocketAddr,
    tls: Option<TlsAcceptor>,
    tcp_nodelay: bool,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("address", &self.address)
            .field("tls", &self.tls.is_some())
            .field("tcp_nodelay", &self.tcp_nodelay)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Everything the configuration describes: routes, listen address and TLS.
    ///
    /// Must be called from within a tokio runtime, whose blocking pool serves the
    /// offloaded work.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let handle = Handle::try_current().map_err(io::Error::other)?;
        let environment = Environment::capture();
        let router = build_router(config, &environment, &Offloader::from_handle(handle))?;

        let mut builder = Server::builder()
            .address(config.socket_addr()?)
            .router(router)
            .tcp_nodelay(config.server_info.tcp_no_delay);
        if let Some(tls) = &config.server_info.tls {
            builder = builder.tls(load_acceptor(tls)?);
        }

        Ok(builder.build()?)
    }

    pub async fn bind(self) -> Result<Listening, ServerError> {
        let listener =
            TcpListener::bind(self.address).await.map_err(|source| ServerError::Bind { address: self.address, source })?;
        info!(address = %listener.local_addr()?, routes = self.dispatcher.router().len(), tls = self.tls.is_some(), "start listening");
        Ok(Listening { listener, server: self })
    }

    /// Binds and serves until ctrl-c.
    pub async fn start(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await;
        Ok(())
    }
}

/// A bound server, not yet accepting.
#[derive(Debug)]
pub struct Listening {
    listener: TcpListener,
    server: Server,
}

impl Listening {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) {
        self.serve_until(ctrl_c()).await;
    }

    /// Accepts connections until `shutdown` completes. Connections already accepted
    /// keep running on their own tasks.
    pub async fn serve_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Listening { listener, server } = self;
        tokio::pin!(shutdown);

        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            if server.tcp_nodelay
                && let Err(e) = tcp_stream.set_nodelay(true)
            {
                warn!(peer = %remote_addr, cause = %e, "can't set TCP_NODELAY");
            }

            let dispatcher = Arc::clone(&server.dispatcher);
            match &server.tls {
                None => {
                    tokio::spawn(serve_plaintext(tcp_stream, remote_addr, dispatcher));
                }
                Some(acceptor) => {
                    tokio::spawn(serve_encrypted(acceptor.clone(), tcp_stream, remote_addr, dispatcher));
                }
            }
        }

        info!("stopped accepting connections");
    }
}

async fn serve_plaintext(tcp_stream: TcpStream, remote_addr: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let (reader, writer) = tcp_stream.into_split();
    let connection = HttpConnection::new(reader, writer, Some(remote_addr));
    log_outcome(remote_addr, connection.process(dispatcher).await);
}

async fn serve_encrypted(
    acceptor: TlsAcceptor,
    tcp_stream: TcpStream,
    remote_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
) {
    let tls_stream = match acceptor.accept(tcp_stream).await {
        Ok(tls_stream) => tls_stream,
        Err(e) => {
            warn!(peer = %remote_addr, cause = %e, "tls handshake failed");
            return;
        }
    };

    let (reader, writer) = tokio::io::split(tls_stream);
    let connection = HttpConnection::new(reader, writer, Some(remote_addr));
    log_outcome(remote_addr, connection.process(dispatcher).await);
}

fn log_outcome(remote_addr: SocketAddr, result: Result<(), HttpError>) {
    match result {
        Ok(()) => debug!(peer = %remote_addr, "connection closed"),
        Err(e) => warn!(peer = %remote_addr, cause = %e, "connection aborted"),
    }
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("ctrl-c received, shutting down"),
        Err(e) => {
            error!(cause = %e, "can't listen for ctrl-c, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_needs_router() {
        let result = Server::builder().address("127.0.0.1:0".parse().unwrap()).build();
        assert!(matches!(result, Err(ServerBuildError::MissingRouter)));
    }

    #[test]
    fn builder_needs_address() {
        let result = Server::builder().router(Router::builder().build().unwrap()).build();
        assert!(matches!(result, Err(ServerBuildError::MissingAddress)));
    }

    #[tokio::test]
    async fn bind_and_stop() {
        let server = Server::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .router(Router::builder().build().unwrap())
            .build()
            .unwrap();

        let listening = server.bind().await.unwrap();
        assert_ne!(listening.local_addr().unwrap().port(), 0);
        listening.serve_until(async {}).await;
    }
}
