//! Scripted stand-in for a RoboDK server
//!
//! `serve` accepts one client, answers the handshake, then hands the socket
//! to a script that reads requests and writes replies field by field.
//! Assertions inside the script fail the test when the handle is joined.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use robolink_rust::LinkConfig;

/// Server side of one client connection
pub struct Peer {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let writer = stream.try_clone().unwrap();
        Peer {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub fn line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        assert!(line.ends_with('\n'), "line not terminated: {:?}", line);
        line.pop();
        line
    }

    pub fn bytes(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.reader.read_exact(&mut buf).unwrap();
        buf
    }

    pub fn int(&mut self) -> i32 {
        i32::from_be_bytes(self.bytes(4).try_into().unwrap())
    }

    pub fn double(&mut self) -> f64 {
        f64::from_be_bytes(self.bytes(8).try_into().unwrap())
    }

    pub fn array(&mut self) -> Vec<f64> {
        let n = self.int();
        (0..n).map(|_| self.double()).collect()
    }

    pub fn pose(&mut self) -> Vec<f64> {
        (0..16).map(|_| self.double()).collect()
    }

    pub fn item(&mut self) -> u64 {
        u64::from_be_bytes(self.bytes(8).try_into().unwrap())
    }

    /// True once the client has closed its end
    pub fn at_eof(&mut self) -> bool {
        let mut line = String::new();
        matches!(self.reader.read_line(&mut line), Ok(0))
    }

    /// Read a command line and check its token
    pub fn expect(&mut self, command: &str) {
        assert_eq!(self.line(), command);
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).unwrap();
    }

    pub fn send_int(&mut self, value: i32) {
        self.send(&value.to_be_bytes());
    }

    pub fn send_line(&mut self, text: &str) {
        self.send(format!("{}\n", text).as_bytes());
    }

    pub fn send_array(&mut self, values: &[f64]) {
        self.send_int(values.len() as i32);
        for v in values {
            self.send(&v.to_be_bytes());
        }
    }

    /// Column-major 4x4 pose
    pub fn send_pose(&mut self, values: &[f64]) {
        assert_eq!(values.len(), 16);
        for v in values {
            self.send(&v.to_be_bytes());
        }
    }

    pub fn send_item(&mut self, id: u64, item_type: i32) {
        self.send(&id.to_be_bytes());
        self.send_int(item_type);
    }

    pub fn ok(&mut self) {
        self.send_int(0);
    }

    pub fn warning(&mut self, message: &str) {
        self.send_int(2);
        self.send_line(message);
    }

    pub fn error(&mut self, message: &str) {
        self.send_int(3);
        self.send_line(message);
    }
}

/// Running scripted server
pub struct FakeRoboDk {
    pub port: u16,
    handle: JoinHandle<()>,
}

impl FakeRoboDk {
    /// Wait for the script to finish, propagating its assertion failures
    pub fn join(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }

    /// Client config pointing at this server only, without application launch
    pub fn config(&self) -> LinkConfig {
        config_for(self.port)
    }
}

/// Config for a single local port with one scan pass
pub fn config_for(port: u16) -> LinkConfig {
    LinkConfig {
        host: "127.0.0.1".to_string(),
        port_start: port,
        port_end: port,
        timeout: Duration::from_secs(5),
        connect_passes: 1,
        settle_delay: Duration::ZERO,
        ..LinkConfig::default()
    }
}

/// Accept one client, answer the handshake with `READY`, run `script`
pub fn serve<F>(script: F) -> FakeRoboDk
where
    F: FnOnce(&mut Peer) + Send + 'static,
{
    serve_with_reply("READY", script)
}

/// Like [`serve`] with a custom handshake answer
pub fn serve_with_reply<F>(reply: &'static str, script: F) -> FakeRoboDk
where
    F: FnOnce(&mut Peer) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    serve_sessions(listener, reply, vec![Box::new(script) as Script])
}

/// Script for one client session
pub type Script = Box<dyn FnOnce(&mut Peer) + Send>;

/// Accept one client per script, in order, on an already bound listener
pub fn serve_sessions(
    listener: TcpListener,
    reply: &'static str,
    scripts: Vec<Script>,
) -> FakeRoboDk {
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || {
        for script in scripts {
            let (stream, _) = listener.accept().unwrap();
            let mut peer = Peer::new(stream);
            peer.expect("CMD_START");
            assert_eq!(peer.line(), "1 0");
            peer.send_line(reply);
            script(&mut peer);
        }
    });
    FakeRoboDk { port, handle }
}

/// A local port with nothing listening on it
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
