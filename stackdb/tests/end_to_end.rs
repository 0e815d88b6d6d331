use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::thread;

use stackdb_net::Listener;

fn start_server() -> std::net::SocketAddr {
    let listener = Listener::bind(("127.0.0.1", 0)).expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    thread::spawn(move || stackdb::serve_listener(listener));
    addr
}

fn roundtrip(stream: &mut TcpStream, reader: &mut BufReader<TcpStream>, request: &str) -> String {
    stream.write_all(format!("{request}\n").as_bytes()).unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line
}

#[test]
fn auto_commit_set_and_get_round_trip_over_a_real_socket() {
    let addr = start_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    assert_eq!(roundtrip(&mut stream, &mut reader, "LOGIN alice"), "OK\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "CREATE accounts"), "OK\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "PUSH 100"), "OK\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "SET accounts balance"), "OK\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "GET accounts balance"), "OK\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "TOP"), "DATA 100\n");
    assert_eq!(roundtrip(&mut stream, &mut reader, "BYE"), "OK\n");
}

#[test]
fn two_connections_see_each_others_committed_writes() {
    let addr = start_server();

    let mut first = TcpStream::connect(addr).unwrap();
    let mut first_reader = BufReader::new(first.try_clone().unwrap());
    assert_eq!(roundtrip(&mut first, &mut first_reader, "LOGIN alice"), "OK\n");
    assert_eq!(roundtrip(&mut first, &mut first_reader, "CREATE shared"), "OK\n");
    assert_eq!(roundtrip(&mut first, &mut first_reader, "PUSH 42"), "OK\n");
    assert_eq!(roundtrip(&mut first, &mut first_reader, "SET shared k"), "OK\n");

    let mut second = TcpStream::connect(addr).unwrap();
    let mut second_reader = BufReader::new(second.try_clone().unwrap());
    assert_eq!(roundtrip(&mut second, &mut second_reader, "LOGIN bob"), "OK\n");
    assert_eq!(roundtrip(&mut second, &mut second_reader, "GET shared k"), "OK\n");
    assert_eq!(roundtrip(&mut second, &mut second_reader, "TOP"), "DATA 42\n");
}

#[test]
fn a_malformed_first_message_closes_the_connection() {
    let addr = start_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let response = roundtrip(&mut stream, &mut reader, "PUSH 1");
    assert!(response.starts_with("ERROR"));

    // the server closed its side; a further read sees EOF
    let mut line = String::new();
    let n = reader.read_line(&mut line).unwrap();
    assert_eq!(n, 0);
}
