use crate::read_bits::DemoParserError;

/// Byte aligned cursor over the outer demo stream.
pub struct ByteReader<'a> {
    pub bytes: &'a [u8],
    pub ptr: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteReader<'a> {
        ByteReader { bytes, ptr: 0 }
    }
    #[inline]
    pub fn bytes_left(&self) -> usize {
        self.bytes.len().saturating_sub(self.ptr)
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes_left() == 0
    }
    #[inline]
    pub fn read_n_bytes(&mut self, n: usize) -> Result<&'a [u8], DemoParserError> {
        let end = match self.ptr.checked_add(n) {
            Some(end) if end <= self.bytes.len() => end,
            _ => return Err(DemoParserError::OutOfBytesError),
        };
        let s = &self.bytes[self.ptr..end];
        self.ptr = end;
        Ok(s)
    }
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DemoParserError> {
        let mut arr = [0_u8; N];
        arr.copy_from_slice(self.read_n_bytes(N)?);
        Ok(arr)
    }
    pub fn read_u8(&mut self) -> Result<u8, DemoParserError> {
        Ok(self.read_array::<1>()?[0])
    }
    pub fn read_u16(&mut self) -> Result<u16, DemoParserError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }
    pub fn read_i32(&mut self) -> Result<i32, DemoParserError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }
    pub fn read_f32(&mut self) -> Result<f32, DemoParserError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }
    pub fn read_vector(&mut self) -> Result<[f32; 3], DemoParserError> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }
    #[inline]
    pub fn read_varint(&mut self) -> Result<u32, DemoParserError> {
        let mut result: u32 = 0;
        let mut count: u8 = 0;
        loop {
            if count >= 5 {
                return Ok(result);
            }
            let b = self.read_u8()? as u32;
            result |= (b & 127) << (7 * count);
            count += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
        Ok(result)
    }
    /// Fixed width field holding a NUL padded string.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String, DemoParserError> {
        let raw = self.read_n_bytes(len)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).to_string())
    }
    pub fn read_null_terminated_string(&mut self) -> Result<String, DemoParserError> {
        let rest = &self.bytes[self.ptr.min(self.bytes.len())..];
        let end = match rest.iter().position(|b| *b == 0) {
            Some(end) => end,
            None => return Err(DemoParserError::OutOfBytesError),
        };
        let s = String::from_utf8_lossy(&rest[..end]).to_string();
        self.ptr += end + 1;
        Ok(s)
    }
    /// Reads an i32 length and returns exactly that many bytes. The cursor always ends up
    /// right after the block, whatever the caller later does with the returned slice.
    pub fn read_packet(&mut self) -> Result<&'a [u8], DemoParserError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(DemoParserError::NegativePacketLength(len));
        }
        match self.read_n_bytes(len as usize) {
            Ok(block) => Ok(block),
            Err(_) => Err(DemoParserError::DemoEndsEarly(format!(
                "block of {} bytes at offset {} but only {} bytes left",
                len,
                self.ptr,
                self.bytes_left()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::scoped_block;

    #[test]
    fn test_fixed_width_reads() {
        let mut bytes = vec![];
        bytes.push(7_u8);
        bytes.extend_from_slice(&513_u16.to_le_bytes());
        bytes.extend_from_slice(&(-5_i32).to_le_bytes());
        bytes.extend_from_slice(&1.5_f32.to_le_bytes());
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u16().unwrap(), 513);
        assert_eq!(reader.read_i32().unwrap(), -5);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert!(reader.is_empty());
        assert_eq!(reader.read_u8(), Err(DemoParserError::OutOfBytesError));
    }
    #[test]
    fn test_strings() {
        let mut bytes = b"de_dust2\0\0\0\0".to_vec();
        bytes.extend_from_slice(b"CCSPlayer\0DT_CSPlayer\0");
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_fixed_string(12).unwrap(), "de_dust2");
        assert_eq!(reader.read_null_terminated_string().unwrap(), "CCSPlayer");
        assert_eq!(reader.read_null_terminated_string().unwrap(), "DT_CSPlayer");
        assert!(reader.read_null_terminated_string().is_err());
    }
    #[test]
    fn test_packet_alignment_ignores_inner_consumption() {
        // Whatever the inner parser does with the block, the outer cursor lands on start + 4 + len.
        for len in [0_usize, 1, 17, 300] {
            let mut bytes = vec![];
            scoped_block(&mut bytes, &vec![0xAB; len]);
            bytes.push(0x42);
            let mut reader = ByteReader::new(&bytes);
            let block = reader.read_packet().unwrap();
            assert_eq!(block.len(), len);
            assert_eq!(reader.ptr, 4 + len);
            let mut inner = ByteReader::new(block);
            let _ = inner.read_i32();
            assert_eq!(reader.read_u8().unwrap(), 0x42);
        }
    }
    #[test]
    fn test_packet_past_end() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&10_i32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(reader.read_packet(), Err(DemoParserError::DemoEndsEarly(_))));
        let mut bytes = vec![];
        bytes.extend_from_slice(&(-1_i32).to_le_bytes());
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_packet(), Err(DemoParserError::NegativePacketLength(-1)));
    }
}
