use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::ajax::{ConnectionInfo, Dispatcher};
use crate::http::parser::{ParseError, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

const READ_CHUNK: usize = 4096;

pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    dispatcher: Arc<Dispatcher>,
    info: ConnectionInfo,
    request_timeout: Duration,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, dispatcher: Arc<Dispatcher>, request_timeout: Duration) -> Self {
        let info = ConnectionInfo {
            peer: stream.peer_addr().ok(),
            local: stream.local_addr().ok(),
        };

        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            state: ConnectionState::Reading,
            dispatcher,
            info,
            request_timeout,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    let read = timeout(self.request_timeout, self.read_request()).await;
                    match read {
                        Err(_) => {
                            tracing::debug!(peer = ?self.info.peer, "Read timed out, closing");
                            self.state = ConnectionState::Closed;
                        }
                        Ok(Ok(Some(req))) => {
                            self.state = ConnectionState::Processing(req);
                        }
                        Ok(Ok(None)) => {
                            self.state = ConnectionState::Closed;
                        }
                        Ok(Err(e)) => {
                            let response = match e.downcast_ref::<ParseError>() {
                                Some(ParseError::TooLarge) => Response::payload_too_large(),
                                Some(_) => Response::bad_request(),
                                None => return Err(e),
                            };
                            // Answer once, then drop the connection
                            tracing::debug!(error = %e, "Rejecting request");
                            let writer = ResponseWriter::new(&response);
                            self.state = ConnectionState::Writing(writer, false);
                        }
                    }
                }

                ConnectionState::Processing(req) => {
                    let keep_alive = req.keep_alive();
                    let response = Self::handle_request(
                        &self.dispatcher,
                        req,
                        &self.info,
                        self.request_timeout,
                    )
                    .await;

                    let writer = ResponseWriter::new(&response);
                    self.state = ConnectionState::Writing(writer, keep_alive);
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *keep_alive {
                        self.state = ConnectionState::Reading;
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    // Need more data
                }

                Err(e) => {
                    return Err(e.into());
                }
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Client closed connection
                return Ok(None);
            }
        }
    }

    /// Dispatch bounded by the request timeout. The dispatcher has no timeout
    /// of its own.
    async fn handle_request(
        dispatcher: &Dispatcher,
        req: &Request,
        info: &ConnectionInfo,
        request_timeout: Duration,
    ) -> Response {
        match timeout(request_timeout, dispatcher.handle(req, info)).await {
            Ok(response) => response,
            Err(_) => dispatcher.timed_out(req, info),
        }
    }
}
