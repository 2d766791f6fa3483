//! Incremental byte-to-text decoding for parser sources
//!
//! Sources are read in bounded chunks, so a multi-byte sequence can be split
//! across two reads. [`CharDecoder`] keeps the incomplete tail and finishes it
//! on the next read. Undecodable input is reported as
//! [`std::io::ErrorKind::InvalidData`], never replaced.

use std::io::{self, Read};

/// Character encoding of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    /// ISO-8859-1, one byte per character
    Latin1,
}

impl TextEncoding {
    /// Byte order mark for this encoding (empty for Latin-1)
    pub fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            TextEncoding::Utf16Le => &[0xFF, 0xFE],
            TextEncoding::Utf16Be => &[0xFE, 0xFF],
            TextEncoding::Latin1 => &[],
        }
    }

    /// Detect an encoding from a leading byte order mark.
    ///
    /// Returns the encoding and the BOM length.
    pub fn detect(prefix: &[u8]) -> Option<(TextEncoding, usize)> {
        [
            TextEncoding::Utf8,
            TextEncoding::Utf16Le,
            TextEncoding::Utf16Be,
        ]
        .into_iter()
        .find(|enc| prefix.starts_with(enc.bom()))
        .map(|enc| (enc, enc.bom().len()))
    }

    /// Source bytes needed for roughly `chars` characters
    fn bytes_for(&self, chars: usize) -> usize {
        match self {
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => chars.saturating_mul(2),
            _ => chars,
        }
    }
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Streaming decoder from a byte reader to UTF-8 text
pub struct CharDecoder<R> {
    inner: R,
    encoding: TextEncoding,
    detect_encoding: bool,
    started: bool,
    eof: bool,
    pending: Vec<u8>,
    scratch: Vec<u8>,
}

impl<R: Read> CharDecoder<R> {
    /// Wrap `inner`.
    ///
    /// With `detect_encoding`, a leading BOM overrides `encoding`.
    pub fn new(inner: R, encoding: TextEncoding, detect_encoding: bool) -> Self {
        Self {
            inner,
            encoding,
            detect_encoding,
            started: false,
            eof: false,
            pending: Vec::with_capacity(4),
            scratch: Vec::new(),
        }
    }

    /// Encoding in effect (after BOM detection once reading started)
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Append up to about `max_chars` characters to `out`.
    ///
    /// Returns the number of bytes appended; `0` means the source is exhausted.
    pub fn read_chunk(&mut self, out: &mut String, max_chars: usize) -> io::Result<usize> {
        if !self.started {
            self.read_bom(self.encoding.bytes_for(max_chars.max(1)))?;
        }
        let want = self.encoding.bytes_for(max_chars.max(1));
        loop {
            let appended = self.decode_pending(out)?;
            if appended > 0 {
                return Ok(appended);
            }
            if self.fill(want)? == 0 {
                if !self.pending.is_empty() {
                    return Err(invalid_data(format!(
                        "source ends inside a {:?} sequence",
                        self.encoding
                    )));
                }
                return Ok(0);
            }
        }
    }

    /// Append everything left in the source to `out`
    pub fn read_to_end(&mut self, out: &mut String) -> io::Result<usize> {
        let mut total = 0;
        loop {
            let n = self.read_chunk(out, 64 * 1024)?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }

    /// Unwrap the underlying reader, dropping any undecoded bytes
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// First read: at least enough bytes to recognise a BOM
    fn read_bom(&mut self, want: usize) -> io::Result<()> {
        self.started = true;
        let want = want.max(3);
        while self.pending.len() < 3 && !self.eof {
            self.fill(want - self.pending.len())?;
        }
        if self.detect_encoding {
            if let Some((encoding, len)) = TextEncoding::detect(&self.pending) {
                log::debug!("Detected {:?} from byte order mark", encoding);
                self.encoding = encoding;
                self.pending.drain(..len);
                return Ok(());
            }
        }
        let bom = self.encoding.bom();
        if !bom.is_empty() && self.pending.starts_with(bom) {
            self.pending.drain(..bom.len());
        }
        Ok(())
    }

    /// Read up to `want` bytes onto `pending`; returns bytes read
    fn fill(&mut self, want: usize) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        self.scratch.resize(want, 0);
        let n = loop {
            match self.inner.read(&mut self.scratch[..want]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.eof = true;
        }
        self.pending.extend_from_slice(&self.scratch[..n]);
        Ok(n)
    }

    fn decode_pending(&mut self, out: &mut String) -> io::Result<usize> {
        let before = out.len();
        let consumed = match self.encoding {
            TextEncoding::Utf8 => decode_utf8(&self.pending, out)?,
            TextEncoding::Latin1 => {
                out.extend(self.pending.iter().map(|&b| b as char));
                self.pending.len()
            }
            TextEncoding::Utf16Le => decode_utf16(&self.pending, out, u16::from_le_bytes)?,
            TextEncoding::Utf16Be => decode_utf16(&self.pending, out, u16::from_be_bytes)?,
        };
        self.pending.drain(..consumed);
        Ok(out.len() - before)
    }
}

/// Decode the complete prefix of `bytes`; returns bytes consumed
fn decode_utf8(bytes: &[u8], out: &mut String) -> io::Result<usize> {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            out.push_str(text);
            Ok(bytes.len())
        }
        Err(e) if e.error_len().is_some() => Err(invalid_data(format!(
            "invalid UTF-8 sequence after {} valid bytes",
            e.valid_up_to()
        ))),
        Err(e) => {
            // Incomplete trailing sequence: keep it for the next read
            let valid = e.valid_up_to();
            let text = std::str::from_utf8(&bytes[..valid])
                .map_err(|e| invalid_data(e.to_string()))?;
            out.push_str(text);
            Ok(valid)
        }
    }
}

fn decode_utf16(
    bytes: &[u8],
    out: &mut String,
    unit: fn([u8; 2]) -> u16,
) -> io::Result<usize> {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    // A high surrogate at the end waits for its partner
    if matches!(units.last(), Some(0xD800..=0xDBFF)) {
        units.pop();
    }
    for ch in char::decode_utf16(units.iter().copied()) {
        let ch = ch.map_err(|e| {
            invalid_data(format!("unpaired surrogate 0x{:04X}", e.unpaired_surrogate()))
        })?;
        out.push(ch);
    }
    Ok(units.len() * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out at most `step` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn decode_all<R: Read>(mut decoder: CharDecoder<R>) -> io::Result<String> {
        let mut out = String::new();
        while decoder.read_chunk(&mut out, 2)? > 0 {}
        Ok(out)
    }

    #[test]
    fn test_utf8_split_sequences() -> io::Result<()> {
        let text = "añb€c😀";
        let decoder = CharDecoder::new(
            Trickle {
                data: text.as_bytes(),
                step: 1,
            },
            TextEncoding::Utf8,
            false,
        );
        assert_eq!(decode_all(decoder)?, text);
        Ok(())
    }

    #[test]
    fn test_utf8_bom_stripped() -> io::Result<()> {
        let data = b"\xEF\xBB\xBFa,b";
        let decoder = CharDecoder::new(Cursor::new(&data[..]), TextEncoding::Utf8, false);
        assert_eq!(decode_all(decoder)?, "a,b");
        Ok(())
    }

    #[test]
    fn test_detect_utf16le() -> io::Result<()> {
        let mut data = vec![0xFF, 0xFE];
        for unit in "x😀y".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let mut decoder = CharDecoder::new(
            Trickle {
                data: &data,
                step: 3,
            },
            TextEncoding::Utf8,
            true,
        );
        let mut out = String::new();
        while decoder.read_chunk(&mut out, 1)? > 0 {}
        assert_eq!(out, "x😀y");
        assert_eq!(decoder.encoding(), TextEncoding::Utf16Le);
        Ok(())
    }

    #[test]
    fn test_utf16be_without_detection() -> io::Result<()> {
        let data: Vec<u8> = "héllo".encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        let decoder = CharDecoder::new(Cursor::new(data), TextEncoding::Utf16Be, false);
        assert_eq!(decode_all(decoder)?, "héllo");
        Ok(())
    }

    #[test]
    fn test_latin1() -> io::Result<()> {
        let decoder = CharDecoder::new(Cursor::new(vec![b'c', 0xE9, b'!']), TextEncoding::Latin1, false);
        assert_eq!(decode_all(decoder)?, "cé!");
        Ok(())
    }

    #[test]
    fn test_invalid_utf8() {
        let decoder = CharDecoder::new(Cursor::new(vec![b'a', 0xFF, b'b']), TextEncoding::Utf8, false);
        let err = decode_all(decoder).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_utf8() {
        let decoder = CharDecoder::new(Cursor::new(vec![b'a', 0xE2, 0x82]), TextEncoding::Utf8, false);
        let err = decode_all(decoder).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_empty_source() -> io::Result<()> {
        let mut decoder = CharDecoder::new(Cursor::new(Vec::new()), TextEncoding::Utf8, true);
        let mut out = String::new();
        assert_eq!(decoder.read_chunk(&mut out, 16)?, 0);
        assert!(out.is_empty());
        Ok(())
    }
}
