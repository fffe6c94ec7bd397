//! End-to-end over real QUIC on localhost.

use std::{sync::Arc, time::Duration};

use quinn::{ClientConfig, Endpoint};
use rotorhub_core::{FrameTransport, FramedIo};
use rotorhub_proto::{
    ALPN_PROTOCOL, Credentials, Operation, Request, Response, SettingsRequest, StreamFrame,
};
use rotorhub_server::{CredentialStore, Server, ServerRuntimeConfig};
use tokio::time::timeout;

#[derive(Debug)]
struct AcceptAnyCert;

impl rustls::client::danger::ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn client_endpoint() -> Endpoint {
    let mut crypto = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(crypto).unwrap();
    let config = ClientConfig::new(Arc::new(quic_crypto));
    let mut endpoint = Endpoint::client("127.0.0.1:0".parse().unwrap()).unwrap();
    endpoint.set_default_client_config(config);
    endpoint
}

async fn round_trip(connection: &quinn::Connection, request: Request) -> Response {
    let (send, recv) = connection.open_bi().await.unwrap();
    let mut framed = FramedIo::new(recv, send);
    framed.send(request.into_frame(1).unwrap()).await.unwrap();
    let frame = framed.recv().await.unwrap().unwrap();
    Response::from_frame(&frame).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_encrypt_and_stream_over_quic() {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        credentials: CredentialStore::from_specs(&["alice:secret"]).unwrap(),
        ..ServerRuntimeConfig::default()
    };
    let server = Arc::new(Server::bind(config).unwrap());
    let addr = server.local_addr().unwrap();
    let server_task = {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.run().await })
    };

    let endpoint = client_endpoint();
    let connection = endpoint.connect(addr, "localhost").unwrap().await.unwrap();
    let alice = Credentials::new("alice", "secret");

    let created = round_trip(
        &connection,
        Request::new(alice.clone(), Operation::CreateMachine(SettingsRequest::random(3))),
    )
    .await;
    let Response::Created { id, .. } = created else { panic!("create failed: {created:?}") };

    let encrypted = round_trip(
        &connection,
        Request::new(
            alice.clone(),
            Operation::Encrypt { id: id.clone(), plaintext: "HELLO".into() },
        ),
    )
    .await;
    let Response::Encrypted { ciphertext, .. } = encrypted else {
        panic!("encrypt failed: {encrypted:?}")
    };
    round_trip(&connection, Request::new(alice.clone(), Operation::Reset { id: id.clone() })).await;

    // Stream the same text; the rotors start from the same position
    let (send, recv) = connection.open_bi().await.unwrap();
    let mut stream = FramedIo::new(recv, send);
    let open =
        Request::new(alice.clone(), Operation::OpenStream { id: id.clone(), preconfigure: None });
    stream.send(open.into_frame(2).unwrap()).await.unwrap();
    let accepted = Response::from_frame(&stream.recv().await.unwrap().unwrap()).unwrap();
    assert_eq!(accepted, Response::StreamAccepted { id: id.clone() });

    stream.send(StreamFrame::text("HELLO").into_frame()).await.unwrap();
    let mut streamed = String::new();
    for _ in 0..5 {
        let frame = timeout(Duration::from_secs(5), stream.recv()).await.unwrap().unwrap().unwrap();
        let StreamFrame::Data { payload, .. } = StreamFrame::from_frame(frame).unwrap() else {
            panic!("expected data frame")
        };
        streamed.push_str(std::str::from_utf8(&payload).unwrap());
    }
    assert_eq!(streamed, ciphertext);
    stream.send(StreamFrame::Close.into_frame()).await.unwrap();

    let denied = round_trip(
        &connection,
        Request::new(Credentials::new("alice", "wrong"), Operation::GetSettings { id }),
    )
    .await;
    assert_eq!(denied.error_code(), Some(401));

    server.shutdown();
    let stopped = timeout(Duration::from_secs(5), server_task).await.unwrap().unwrap();
    assert!(stopped.is_ok());
}

#[test]
fn server_refuses_to_start_without_users() {
    let config = ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        ..ServerRuntimeConfig::default()
    };
    assert!(Server::bind(config).is_err());
}
