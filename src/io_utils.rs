use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::record::Record;

/// Opens a file or stdin ('-'), sniffing the gzip magic bytes so compressed
/// input works regardless of file extension.
pub fn open_input(path: &str) -> Result<Box<dyn BufRead>, Box<dyn Error>> {
    if path == "-" {
        let mut br = BufReader::new(io::stdin());
        let buf = br.fill_buf()?;
        let is_gz = buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b;
        if is_gz {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(br))))
        } else {
            Ok(Box::new(br))
        }
    } else {
        let f = File::open(path).map_err(|e| format!("error opening '{path}': {e}"))?;
        let mut br = BufReader::new(f);
        let buf = br.fill_buf()?;
        let is_gz = buf.len() >= 2 && buf[0] == 0x1f && buf[1] == 0x8b;
        if is_gz {
            Ok(Box::new(BufReader::new(MultiGzDecoder::new(br))))
        } else {
            Ok(Box::new(br))
        }
    }
}

/// Opens the output sink: stdout when no path (or '-') is given, otherwise a
/// file whose extension selects the compression ('.gz' or '.zst').
pub fn open_output(path: Option<&str>) -> Result<Box<dyn Write>, Box<dyn Error>> {
    match path {
        None | Some("-") => Ok(Box::new(io::BufWriter::new(io::stdout()))),
        Some(p) => {
            let f = File::create(p).map_err(|e| format!("error opening '{p}': {e}"))?;
            if p.ends_with(".gz") {
                Ok(Box::new(GzEncoder::new(f, Compression::default())))
            } else if p.ends_with(".zst") {
                Ok(Box::new(zstd::stream::write::Encoder::new(f, 0)?.auto_finish()))
            } else {
                Ok(Box::new(io::BufWriter::new(f)))
            }
        }
    }
}

/// Reads 4-line FASTQ records into a caller-owned reusable `Record`.
pub struct FastqReader {
    inner: Box<dyn BufRead>,
}

impl FastqReader {
    pub fn new(inner: Box<dyn BufRead>) -> Self {
        Self { inner }
    }

    /// Fills `rec` with the next record, reusing its buffers. Returns false
    /// at end of stream. Malformed records are fatal: a header not starting
    /// with '@', a separator not starting with '+', unequal sequence/quality
    /// lengths, or a record cut off mid-way.
    pub fn read_into(&mut self, rec: &mut Record) -> Result<bool, Box<dyn Error>> {
        let (header, seq, comment, qual) = rec.buffers_mut();
        header.clear();
        seq.clear();
        comment.clear();
        qual.clear();

        if read_trimmed_line(&mut self.inner, header)? == 0 {
            return Ok(false);
        }
        let got = read_trimmed_line(&mut self.inner, seq)?
            .min(read_trimmed_line(&mut self.inner, comment)?)
            .min(read_trimmed_line(&mut self.inner, qual)?);
        if got == 0 {
            return Err(format!(
                "truncated fastq record at end of input: {}",
                String::from_utf8_lossy(header)
            )
            .into());
        }

        if header.first() != Some(&b'@') {
            return Err(format!(
                "malformed fastq: header should start with '@': {}",
                String::from_utf8_lossy(header)
            )
            .into());
        }
        if comment.first() != Some(&b'+') {
            return Err(format!(
                "malformed fastq: comment should start with '+': {}",
                String::from_utf8_lossy(comment)
            )
            .into());
        }
        if seq.len() != qual.len() {
            return Err(format!(
                "malformed fastq: sequence and quality lengths differ for {}",
                String::from_utf8_lossy(header)
            )
            .into());
        }

        rec.reset_window();
        Ok(true)
    }
}

fn read_trimmed_line<R: BufRead>(input: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    let n = input.read_until(b'\n', buf)?;
    while let Some(&c) = buf.last() {
        if c == b'\n' || c == b'\r' {
            buf.pop();
        } else {
            break;
        }
    }
    Ok(n)
}

/// Serializes records back to 4-line FASTQ from their current trim window.
pub struct FastqWriter {
    inner: Box<dyn Write>,
}

impl FastqWriter {
    pub fn new(inner: Box<dyn Write>) -> Self {
        Self { inner }
    }

    pub fn write_record(&mut self, rec: &Record) -> io::Result<()> {
        self.inner.write_all(&rec.header)?;
        self.inner.write_all(b"\n")?;
        self.inner.write_all(rec.seq())?;
        self.inner.write_all(b"\n")?;
        self.inner.write_all(&rec.comment)?;
        self.inner.write_all(b"\n")?;
        self.inner.write_all(rec.qual())?;
        self.inner.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
