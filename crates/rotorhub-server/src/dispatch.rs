//! Request dispatch.
//!
//! Each bidirectional channel carries exactly one [`Request`] frame and gets
//! one [`Response`] frame back, echoing the request id. An accepted
//! `OpenStream` request turns the rest of the channel into a character
//! stream driven by [`run_stream`].

use std::sync::Arc;

use rotorhub_core::{
    CoreError, Environment, ErrorKind, FrameTransport, Identity, SessionService, StreamError,
    StreamTicket, run_stream,
};
use rotorhub_proto::{ErrorPayload, Operation, Request, Response};
use tracing::{debug, error, warn};

use crate::{auth::IdentityProvider, error::ServerError};

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch {
    /// Send this response and finish the channel
    Reply(Response),
    /// Send `accepted`, then stream against the ticket's session
    Stream {
        /// Stream permission
        ticket: StreamTicket,
        /// Acceptance response
        accepted: Response,
    },
}

/// Routes requests to the session service.
pub struct Dispatcher<E: Environment> {
    service: Arc<SessionService<E>>,
    identities: Arc<dyn IdentityProvider>,
}

impl<E: Environment> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self { service: Arc::clone(&self.service), identities: Arc::clone(&self.identities) }
    }
}

impl<E: Environment> Dispatcher<E> {
    /// Dispatcher over `service`, resolving callers with `identities`.
    pub fn new(service: Arc<SessionService<E>>, identities: Arc<dyn IdentityProvider>) -> Self {
        Self { service, identities }
    }

    /// Session service.
    pub fn service(&self) -> &SessionService<E> {
        &self.service
    }

    /// Execute one request.
    pub async fn dispatch(&self, request: Request) -> Dispatch {
        let caller = self.identities.resolve(&request.credentials);
        let operation = request.operation.name();
        debug!(operation, user = %request.credentials.username, "dispatching");

        match self.execute(caller.as_ref(), request.operation).await {
            Ok(dispatch) => dispatch,
            Err(e) => Dispatch::Reply(error_response(operation, &e)),
        }
    }

    async fn execute(
        &self,
        caller: Option<&Identity>,
        operation: Operation,
    ) -> Result<Dispatch, CoreError> {
        let service = &self.service;
        let response = match operation {
            Operation::CreateMachine(request) => {
                let created = service.create(caller, request).await?;
                Response::Created { id: created.id.to_string(), settings: created.settings }
            },
            Operation::Encrypt { id, plaintext } => {
                let ciphertext = service.encrypt(caller, &id, &plaintext).await?;
                Response::Encrypted { plaintext, ciphertext }
            },
            Operation::UpdateSettings { id, request } => {
                let settings = service.update_settings(caller, &id, request).await?;
                Response::Settings { settings }
            },
            Operation::GetSettings { id } => {
                Response::Settings { settings: service.get_settings(caller, &id).await? }
            },
            Operation::Reset { id } => {
                service.reset(caller, &id).await?;
                Response::NoContent
            },
            Operation::Delete { id } => {
                service.delete(caller, &id).await?;
                Response::NoContent
            },
            Operation::OpenStream { id, preconfigure } => {
                let ticket = service.open_stream(caller, &id, preconfigure).await?;
                let accepted = Response::StreamAccepted { id: ticket.session_id().to_string() };
                return Ok(Dispatch::Stream { ticket, accepted });
            },
        };

        Ok(Dispatch::Reply(response))
    }

    /// Serve one channel: read the request, reply, and stream if accepted.
    ///
    /// # Errors
    ///
    /// - `ServerError::Protocol` if the first frame is not a valid request
    /// - `ServerError::Transport` if the channel fails
    /// - The error that terminated an accepted stream
    pub async fn serve<T: FrameTransport>(&self, transport: &mut T) -> Result<(), ServerError> {
        let Some(frame) = transport.recv().await? else {
            debug!("channel finished before a request arrived");
            return Ok(());
        };
        let request_id = frame.header.request_id();

        let request = match Request::from_frame(&frame) {
            Ok(request) => request,
            Err(e) => {
                warn!(request_id, error = %e, "undecodable request");
                let reply = ErrorPayload::new(ErrorPayload::INVALID_INPUT, e.to_string());
                transport.send(Response::Error(reply).into_frame(request_id)?).await?;
                return Err(e.into());
            },
        };

        match self.dispatch(request).await {
            Dispatch::Reply(response) => {
                transport.send(response.into_frame(request_id)?).await?;
                Ok(())
            },
            Dispatch::Stream { ticket, accepted } => {
                transport.send(accepted.into_frame(request_id)?).await?;

                match run_stream(ticket, transport).await {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        // Best effort; the channel may already be gone
                        let reply = Response::Error(stream_failure(&e));
                        if let Ok(frame) = reply.into_frame(request_id) {
                            let _ = transport.send(frame).await;
                        }
                        Err(ServerError::Internal(format!("stream terminated: {e}")))
                    },
                }
            },
        }
    }
}

/// Wire form of a failed operation.
pub fn error_response(operation: &str, err: &CoreError) -> Response {
    match err.kind() {
        ErrorKind::Unexpected => error!(operation, error = %err, "operation failed unexpectedly"),
        ErrorKind::DeviceFailure => error!(operation, error = %err, "device failure"),
        _ => warn!(operation, code = err.code(), error = %err, "operation rejected"),
    }

    Response::Error(core_failure(err))
}

/// Error payload for `err`. Unexpected failures never reveal their details.
fn core_failure(err: &CoreError) -> ErrorPayload {
    let message = match err.kind() {
        ErrorKind::Unexpected => "internal error".to_string(),
        _ => err.to_string(),
    };
    ErrorPayload::new(err.code(), message)
}

fn stream_failure(err: &StreamError) -> ErrorPayload {
    match err {
        StreamError::Core(core) => core_failure(core),
        StreamError::Protocol(e) => ErrorPayload::new(ErrorPayload::INVALID_INPUT, e.to_string()),
        StreamError::Transport(_) => ErrorPayload::new(ErrorPayload::INTERNAL, "internal error"),
    }
}
