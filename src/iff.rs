//! IFF (Interchange File Format) container used for save files

use crate::error::SaveError;
use std::io::{ErrorKind, Read, Write};

/// IFF file structure
pub struct IffFile {
    pub form_type: [u8; 4],
    /// Chunks in file order
    pub chunks: Vec<IffChunk>,
}

/// Individual chunk in an IFF file
pub struct IffChunk {
    /// 4-character chunk type identifier
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

impl IffChunk {
    pub fn type_name(&self) -> String {
        String::from_utf8_lossy(&self.chunk_type).into_owned()
    }
}

impl IffFile {
    pub fn new(form_type: [u8; 4]) -> Self {
        IffFile {
            form_type,
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.push(IffChunk { chunk_type, data });
    }

    pub fn write_to(&self, out: &mut dyn Write) -> Result<(), SaveError> {
        // Form type plus every chunk header, body and pad byte
        let total_size = 4 + self
            .chunks
            .iter()
            .map(|c| 8 + c.data.len() + c.data.len() % 2)
            .sum::<usize>();

        out.write_all(b"FORM")?;
        out.write_all(&(total_size as u32).to_be_bytes())?;
        out.write_all(&self.form_type)?;

        for chunk in &self.chunks {
            out.write_all(&chunk.chunk_type)?;
            out.write_all(&(chunk.data.len() as u32).to_be_bytes())?;
            out.write_all(&chunk.data)?;

            // Pad to even length
            if chunk.data.len() % 2 == 1 {
                out.write_all(&[0])?;
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn read_from(input: &mut dyn Read) -> Result<Self, SaveError> {
        let mut header = [0u8; 4];
        read_exact(input, &mut header, "FORM header")?;
        if &header != b"FORM" {
            return Err(SaveError::Format("missing FORM header".to_string()));
        }

        let mut size_bytes = [0u8; 4];
        read_exact(input, &mut size_bytes, "FORM size")?;
        let total_size = u32::from_be_bytes(size_bytes) as usize;
        if total_size < 4 {
            return Err(SaveError::Format(format!("FORM size {} too small", total_size)));
        }

        let mut form_type = [0u8; 4];
        read_exact(input, &mut form_type, "form type")?;

        let mut iff = IffFile::new(form_type);
        let mut remaining = total_size - 4;
        while remaining > 0 {
            let mut chunk_type = [0u8; 4];
            read_exact(input, &mut chunk_type, "chunk type")?;
            read_exact(input, &mut size_bytes, "chunk size")?;
            let chunk_size = u32::from_be_bytes(size_bytes) as usize;
            let padded = chunk_size + chunk_size % 2;
            if 8 + padded > remaining {
                return Err(SaveError::Format(format!(
                    "chunk '{}' runs past the end of the FORM",
                    String::from_utf8_lossy(&chunk_type)
                )));
            }

            let mut data = vec![0u8; chunk_size];
            read_exact(input, &mut data, "chunk data")?;
            if chunk_size % 2 == 1 {
                let mut padding = [0u8; 1];
                read_exact(input, &mut padding, "chunk padding")?;
            }
            iff.chunks.push(IffChunk { chunk_type, data });
            remaining -= 8 + padded;
        }

        Ok(iff)
    }
}

fn read_exact(input: &mut dyn Read, buf: &mut [u8], what: &'static str) -> Result<(), SaveError> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => SaveError::UnexpectedEof(what),
        _ => SaveError::Io(e),
    })
}

/// Big-endian word writer for chunk bodies
#[derive(Default)]
pub struct ChunkWriter {
    data: Vec<u8>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        ChunkWriter { data: Vec::new() }
    }

    pub fn word(&mut self, value: u32) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.word(value as u32)
    }

    /// Length-prefixed UTF-8 string
    pub fn text(&mut self, value: &str) -> &mut Self {
        self.word(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Big-endian word reader over a chunk body
pub struct ChunkReader<'a> {
    data: &'a [u8],
    position: usize,
    chunk: &'static str,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8], chunk: &'static str) -> Self {
        ChunkReader {
            data,
            position: 0,
            chunk,
        }
    }

    pub fn word(&mut self) -> Result<u32, SaveError> {
        let bytes = self
            .data
            .get(self.position..self.position + 4)
            .ok_or(SaveError::UnexpectedEof(self.chunk))?;
        self.position += 4;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn int(&mut self) -> Result<i32, SaveError> {
        Ok(self.word()? as i32)
    }

    pub fn count(&mut self) -> Result<usize, SaveError> {
        Ok(self.word()? as usize)
    }

    pub fn text(&mut self) -> Result<String, SaveError> {
        let len = self.count()?;
        let bytes = self
            .data
            .get(self.position..self.position + len)
            .ok_or(SaveError::UnexpectedEof(self.chunk))?;
        self.position += len;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SaveError::Format(format!("invalid text in {} chunk", self.chunk)))
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_log::test;

    #[test]
    fn test_odd_chunks_are_padded() {
        let mut iff = IffFile::new(*b"TEST");
        iff.add_chunk(*b"ODD ", vec![1, 2, 3]);
        iff.add_chunk(*b"EVEN", vec![4, 5]);
        let mut bytes = Vec::new();
        iff.write_to(&mut bytes).unwrap();

        // FORM + size + type + (8 + 3 + 1) + (8 + 2)
        assert_eq!(bytes.len(), 12 + 12 + 10);
        assert_eq!(&bytes[4..8], &(bytes.len() as u32 - 8).to_be_bytes());

        let back = IffFile::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(&back.form_type, b"TEST");
        assert_eq!(back.chunks.len(), 2);
        assert_eq!(&back.chunks[0].chunk_type, b"ODD ");
        assert_eq!(back.chunks[0].data, vec![1, 2, 3]);
        assert_eq!(back.chunks[1].type_name(), "EVEN");
    }

    #[test]
    fn test_truncated_file() {
        let mut iff = IffFile::new(*b"TEST");
        iff.add_chunk(*b"DATA", vec![0; 16]);
        let mut bytes = Vec::new();
        iff.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 4);

        let result = IffFile::read_from(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(SaveError::UnexpectedEof("chunk data"))));
    }

    #[test]
    fn test_not_an_iff_file() {
        let result = IffFile::read_from(&mut Cursor::new(b"JUNKJUNKJUNK".to_vec()));
        assert!(matches!(result, Err(SaveError::Format(_))));
    }

    #[test]
    fn test_chunk_words_and_text() {
        let mut writer = ChunkWriter::new();
        writer.int(-2).word(7).text("lamp");
        let data = writer.finish();
        let mut reader = ChunkReader::new(&data, "TEST");
        assert_eq!(reader.int().unwrap(), -2);
        assert_eq!(reader.word().unwrap(), 7);
        assert_eq!(reader.text().unwrap(), "lamp");
        assert!(reader.is_empty());
        assert!(matches!(reader.word(), Err(SaveError::UnexpectedEof("TEST"))));
    }
}
