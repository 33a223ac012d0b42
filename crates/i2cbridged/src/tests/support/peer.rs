//! In-memory peer: scripted request bytes in, reply lines out.

use std::io::{self, Cursor, Read, Write};

pub struct ScriptedPeer {
    input: Cursor<Vec<u8>>,
    output: Vec<u8>,
}

impl ScriptedPeer {
    pub fn new(input: &str) -> Self {
        Self {
            input: Cursor::new(input.as_bytes().to_vec()),
            output: Vec::new(),
        }
    }

    /// Reply lines written so far.
    pub fn replies(&self) -> Vec<String> {
        String::from_utf8(self.output.clone())
            .expect("utf8 output")
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Read for ScriptedPeer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for ScriptedPeer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
