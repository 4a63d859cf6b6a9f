//! Tests driving [`Session`] against a scripted stand-in for the live
//! subscription gateway.

use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

use sha2::{Digest, Sha256};

use dbn_live::{ErrorSink, Error, RecordSink, SType, Schema, Session};

/// Small enough that loopback sockets satisfy the receive buffer check on
/// stock kernel settings.
const TEST_CAPACITY: usize = 64 * 1024;

const API_KEY: &str = "my_api_key12345";

/// What the scripted gateway does once a session has authenticated.
enum AfterAuth {
    /// Reject authentication with `success=0`.
    Deny,
    /// Accept, then serve the given bytes as the start of the DBN stream.
    Serve(Vec<u8>),
    /// Accept, then close without an answer to the subscription requests.
    Hangup,
}

/// Runs a one-connection gateway which performs the control-phase handshake
/// and returns every line the client sent.
fn spawn_gateway(after_auth: AfterAuth) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut received = Vec::new();

        write_line(&stream, "lsg_version=0.19.0\n");
        write_line(&stream, "cram=XYZ\n");
        received.push(read_line(&mut reader));

        match after_auth {
            AfterAuth::Deny => {
                write_line(&stream, "success=0|error=Authentication failed\n");
            }
            AfterAuth::Serve(stream_bytes) => {
                write_line(&stream, "success=1|session_id=5\n");
                loop {
                    let line = read_line(&mut reader);
                    let done = line.starts_with("start_session");
                    received.push(line);
                    if done {
                        break;
                    }
                }
                (&stream).write_all(&stream_bytes).unwrap();
            }
            AfterAuth::Hangup => {
                write_line(&stream, "success=1\n");
            }
        }
        received
    });
    (addr, handle)
}

fn write_line(mut stream: &TcpStream, line: &str) {
    stream.write_all(line.as_bytes()).unwrap();
}

fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line
}

fn session() -> (Session, Arc<Mutex<Vec<(bool, String)>>>) {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink_errors = Arc::clone(&errors);
    let on_error: ErrorSink = Arc::new(move |fatal, msg: &str| {
        sink_errors.lock().unwrap().push((fatal, msg.to_owned()));
    });
    let on_record: RecordSink = Arc::new(|_| {});
    (
        Session::with_capacity(on_error, on_record, TEST_CAPACITY),
        errors,
    )
}

#[test]
fn test_handshake_success_sends_expected_auth_line() {
    let (addr, gateway) = spawn_gateway(AfterAuth::Hangup);
    let (mut session, errors) = session();
    session
        .connect_gateway(addr, API_KEY, "OPRA.PILLAR", false)
        .unwrap();
    session.close();

    let received = gateway.join().unwrap();
    let digest = hex::encode(Sha256::digest(format!("XYZ|{API_KEY}")));
    assert_eq!(
        received[0],
        format!("auth={digest}-12345|dataset=OPRA.PILLAR|encoding=dbn|ts_out=0\n")
    );
    assert!(errors.lock().unwrap().is_empty());
}

#[test]
fn test_auth_failure_is_fatal() {
    let (addr, gateway) = spawn_gateway(AfterAuth::Deny);
    let (mut session, errors) = session();
    let res = session.connect_gateway(addr, API_KEY, "OPRA.PILLAR", true);
    assert!(matches!(res, Err(Error::Auth(reason)) if reason.contains("Authentication failed")));

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0, "auth failure must be reported as fatal");
    // Closing after a failed connect is safe.
    session.close();
    gateway.join().unwrap();
}

#[test]
fn test_subscription_chunking_on_the_wire() {
    // An invalid preamble stops `start` after the subscription requests went
    // out, which keeps the test entirely in the control phase.
    let (addr, gateway) = spawn_gateway(AfterAuth::Serve(b"XYZ\x01\x00\x00\x00\x00".to_vec()));
    let (mut session, errors) = session();
    session
        .connect_gateway(addr, API_KEY, "OPRA.PILLAR", false)
        .unwrap();

    let symbols: Vec<String> = (0..2001).map(|i| format!("S{i}")).collect();
    let res = session.start(Schema::Cmbp1, SType::Parent, &symbols, ".OPT", false);
    assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("signature")));
    assert_eq!(errors.lock().unwrap().len(), 1);

    let received = gateway.join().unwrap();
    // Auth line, three subscription requests, and the session start.
    assert_eq!(received.len(), 5);
    let counts: Vec<usize> = received[1..4]
        .iter()
        .map(|line| line.trim_end().rsplit_once('=').unwrap().1.split(',').count())
        .collect();
    assert_eq!(counts, [1000, 1000, 1]);
    assert!(received[1].contains("|is_last=0|"));
    assert!(received[2].contains("|is_last=0|"));
    assert!(received[3].contains("|is_last=1|"));
    assert!(received[1].contains("schema=cmbp-1|stype_in=parent|"));
    assert!(received[1].ends_with(",S999.OPT\n"));
    assert_eq!(received[4], "start_session=0\n");
}

#[test]
fn test_peer_close_during_preamble() {
    let (addr, gateway) = spawn_gateway(AfterAuth::Serve(b"DBN\x01".to_vec()));
    let (mut session, _) = session();
    session
        .connect_gateway(addr, API_KEY, "GLBX.MDP3", false)
        .unwrap();
    let res = session.start::<&str>(Schema::Trades, SType::RawSymbol, &[], "", true);
    assert!(matches!(res, Err(Error::PeerClosed)));

    let received = gateway.join().unwrap();
    assert_eq!(
        received[1],
        "schema=trades|stype_in=raw_symbol|start=0|symbols=ALL_SYMBOLS\n"
    );
}

#[test]
fn test_missing_greeting_field() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        write_line(&stream, "unexpected=1\n");
    });
    let (mut session, errors) = session();
    let res = session.connect_gateway(addr, API_KEY, "OPRA.PILLAR", false);
    assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("lsg_version")));
    assert_eq!(errors.lock().unwrap().len(), 1);
    gateway.join().unwrap();
}
