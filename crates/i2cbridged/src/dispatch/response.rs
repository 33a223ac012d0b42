//! Reply serialization for the connection loop.

use std::io::{self, Write};

use super::term::Term;

/// Writes reply terms as JSON lines, flushing after each so the peer sees
/// every reply before its next request.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one reply line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, writing or flushing fails.
    pub fn write_reply(&mut self, reply: &Term) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, reply)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_line_per_reply() {
        let mut output = Vec::new();
        let mut writer = ResponseWriter::new(&mut output);
        writer
            .write_reply(&Term::tuple([
                Term::atom("i2cbridge"),
                Term::ok([Term::atom("exiting")]),
            ]))
            .expect("write reply");
        writer
            .write_reply(&Term::tuple([Term::atom("i2cbridge"), Term::ok([])]))
            .expect("write reply");

        let text = String::from_utf8(output).expect("utf8");
        assert_eq!(
            text,
            "[\"i2cbridge\",[\"ok\",\"exiting\"]]\n[\"i2cbridge\",[\"ok\"]]\n"
        );
    }
}
