use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Stderr, Stdout, Write};

///
/// Output sink for commands: regular output goes to `buffer`, diagnostics to
/// `err`. Tests use in-memory buffers and compare the ANSI stripped text.
///
pub struct Writer {
    buffer: WriteBuffer,
    err: WriteBuffer,
}

impl Writer {
    pub fn new(buffer: WriteBuffer, err: WriteBuffer) -> Self {
        Self { buffer, err }
    }

    pub fn write_err(&mut self, message: String) -> std::io::Result<()> {
        writeln!(self.err, "{}", message)
    }

    pub fn into_string(self) -> std::io::Result<String> {
        self.buffer.into_string()
    }

    pub fn stripped(self) -> std::io::Result<String> {
        strip(self.buffer.into_string()?)
    }

    pub fn err_to_stripped(self) -> std::io::Result<String> {
        strip(self.err.into_string()?)
    }
}

fn strip(text: String) -> std::io::Result<String> {
    let stripped = strip_ansi_escapes::strip(text)?;
    String::from_utf8(stripped).map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
}

impl Write for Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.buffer.flush()
    }
}

pub enum WriteBuffer {
    Stdout(Stdout),
    Stderr(Stderr),
    Vec(Vec<u8>),
    File(File),
}

impl WriteBuffer {
    fn into_string(self) -> std::io::Result<String> {
        match self {
            WriteBuffer::Stdout(..) | WriteBuffer::Stderr(..) => Err(std::io::Error::new(
                ErrorKind::Unsupported,
                "console output can not be read back",
            )),
            WriteBuffer::Vec(vec) => {
                String::from_utf8(vec).map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
            }
            WriteBuffer::File(mut file) => {
                let mut data = String::new();
                file.seek(SeekFrom::Start(0))?;
                file.read_to_string(&mut data)?;
                Ok(data)
            }
        }
    }
}

impl Write for WriteBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.write(buf),
            WriteBuffer::Stderr(stderr) => stderr.write(buf),
            WriteBuffer::Vec(vec) => vec.write(buf),
            WriteBuffer::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteBuffer::Stdout(stdout) => stdout.flush(),
            WriteBuffer::Stderr(stderr) => stderr.flush(),
            WriteBuffer::Vec(vec) => vec.flush(),
            WriteBuffer::File(file) => file.flush(),
        }
    }
}
