use bitter::BitReader;
use bitter::LittleEndianReader;
use std::fmt;

pub struct Bitreader<'a> {
    pub reader: LittleEndianReader<'a>,
}

impl<'a> Bitreader<'a> {
    pub fn new(bytes: &'a [u8]) -> Bitreader<'a> {
        Bitreader {
            reader: LittleEndianReader::new(bytes),
        }
    }
    #[inline(always)]
    pub fn bits_remaining(&self) -> usize {
        self.reader.bits_remaining().unwrap_or(0)
    }
    #[inline(always)]
    pub fn read_nbits(&mut self, n: u32) -> Result<u32, DemoParserError> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(DemoParserError::MalformedMessage);
        }
        match self.reader.read_bits(n) {
            Some(b) => Ok(b as u32),
            None => Err(DemoParserError::OutOfBitsError),
        }
    }
    /// Reads n bits and sign-extends the result from bit n-1.
    #[inline(always)]
    pub fn read_signed_nbits(&mut self, n: u32) -> Result<i32, DemoParserError> {
        if n == 0 {
            return Ok(0);
        }
        let raw = self.read_nbits(n)?;
        let shift = 32 - n;
        Ok(((raw << shift) as i32) >> shift)
    }
    #[inline(always)]
    pub fn read_boolean(&mut self) -> Result<bool, DemoParserError> {
        Ok(self.read_nbits(1)? != 0)
    }
    #[inline(always)]
    pub fn read_u_bit_var(&mut self) -> Result<u32, DemoParserError> {
        let bits = self.read_nbits(6)?;
        match bits & 0b110000 {
            0b10000 => Ok((bits & 0b1111) | (self.read_nbits(4)? << 4)),
            0b100000 => Ok((bits & 0b1111) | (self.read_nbits(8)? << 4)),
            0b110000 => Ok((bits & 0b1111) | (self.read_nbits(28)? << 4)),
            _ => Ok(bits),
        }
    }
    #[inline(always)]
    pub fn read_varint(&mut self) -> Result<u32, DemoParserError> {
        let mut result: u32 = 0;
        let mut count: i32 = 0;
        let mut b: u32;
        loop {
            if count >= 5 {
                return Ok(result);
            }
            b = self.read_nbits(8)?;
            result |= (b & 127) << (7 * count);
            count += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
        Ok(result)
    }
    #[inline(always)]
    pub fn read_varint32(&mut self) -> Result<i32, DemoParserError> {
        let x = self.read_varint()?;
        Ok(((x >> 1) as i32) ^ -((x & 1) as i32))
    }
    pub fn read_varint_u_64(&mut self) -> Result<u64, DemoParserError> {
        let mut result: u64 = 0;
        let mut count: i32 = 0;
        let mut b: u32;
        let mut s = 0;
        loop {
            b = self.read_nbits(8)?;
            if b < 0x80 {
                if count > 9 || count == 9 && b > 1 {
                    return Err(DemoParserError::MalformedMessage);
                }
                return Ok(result | (b as u64) << s);
            }
            result |= ((b as u64) & 127) << s;
            count += 1;
            s += 7;
        }
    }
    pub fn read_varint64(&mut self) -> Result<i64, DemoParserError> {
        let x = self.read_varint_u_64()?;
        Ok(((x >> 1) as i64) ^ -((x & 1) as i64))
    }
    pub fn read_n_bytes(&mut self, n: usize) -> Result<Vec<u8>, DemoParserError> {
        let mut bytes = vec![0_u8; n];
        match self.reader.read_bytes(&mut bytes) {
            true => Ok(bytes),
            false => Err(DemoParserError::FailedByteRead(format!(
                "bytes left in stream: {}, requested bytes: {}",
                self.bits_remaining() / 8,
                n,
            ))),
        }
    }
    /// Reads raw bits into a little endian byte buffer, used for fixed size string table data.
    pub fn read_bits_to_bytes(&mut self, n: u32) -> Result<Vec<u8>, DemoParserError> {
        let mut out = Vec::with_capacity(((n + 7) / 8) as usize);
        let mut left = n;
        while left > 0 {
            let take = left.min(8);
            out.push(self.read_nbits(take)? as u8);
            left -= take;
        }
        Ok(out)
    }
    pub fn read_string(&mut self) -> Result<String, DemoParserError> {
        let mut s: Vec<u8> = vec![];
        loop {
            let c = self.read_nbits(8)? as u8;
            if c == 0 {
                break;
            }
            s.push(c);
        }
        Ok(String::from_utf8_lossy(&s).to_string())
    }
    #[inline(always)]
    pub fn read_f32(&mut self) -> Result<f32, DemoParserError> {
        Ok(f32::from_bits(self.read_nbits(32)?))
    }
    pub fn read_bit_coord(&mut self) -> Result<f32, DemoParserError> {
        let mut int_val = 0;
        let mut frac_val = 0;
        let i2 = self.read_boolean()?;
        let f2 = self.read_boolean()?;
        if !i2 && !f2 {
            return Ok(0.0);
        }
        let sign = self.read_boolean()?;
        if i2 {
            int_val = self.read_nbits(14)? + 1;
        }
        if f2 {
            frac_val = self.read_nbits(5)?;
        }
        let resol: f64 = 1.0 / (1 << 5) as f64;
        let result: f32 = (int_val as f64 + (frac_val as f64 * resol)) as f32;
        if sign {
            Ok(-result)
        } else {
            Ok(result)
        }
    }
    pub fn read_bit_coord_mp(&mut self, integral: bool, low_precision: bool) -> Result<f32, DemoParserError> {
        let in_bounds = self.read_boolean()?;
        let int_bits = if in_bounds { 11 } else { 14 };
        if integral {
            if !self.read_boolean()? {
                return Ok(0.0);
            }
            let sign = self.read_boolean()?;
            let value = (self.read_nbits(int_bits)? + 1) as f32;
            return Ok(if sign { -value } else { value });
        }
        let has_int = self.read_boolean()?;
        let sign = self.read_boolean()?;
        let mut int_val = 0;
        if has_int {
            int_val = self.read_nbits(int_bits)? + 1;
        }
        let (frac_bits, resol) = match low_precision {
            true => (3, 1.0 / 8.0),
            false => (5, 1.0 / 32.0),
        };
        let frac_val = self.read_nbits(frac_bits)?;
        let value = (int_val as f64 + frac_val as f64 * resol) as f32;
        Ok(if sign { -value } else { value })
    }
    pub fn read_bit_normal(&mut self) -> Result<f32, DemoParserError> {
        let sign = self.read_boolean()?;
        let frac = self.read_nbits(11)?;
        let value = frac as f32 / ((1 << 11) - 1) as f32;
        Ok(if sign { -value } else { value })
    }
    pub fn read_bit_cell_coord(&mut self, bits: u32, integral: bool, low_precision: bool) -> Result<f32, DemoParserError> {
        let int_val = self.read_nbits(bits)?;
        if integral {
            return Ok(int_val as f32);
        }
        let (frac_bits, resol) = match low_precision {
            true => (3, 1.0 / 8.0),
            false => (5, 1.0 / 32.0),
        };
        let frac_val = self.read_nbits(frac_bits)?;
        Ok((int_val as f64 + frac_val as f64 * resol) as f32)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum DemoParserError {
    OutOfBitsError,
    OutOfBytesError,
    FailedByteRead(String),
    MalformedMessage,
    InvalidFileStamp(String),
    UnsupportedDemoProtocol(i32),
    UnknownDemoCmd(String),
    DemoEndsEarly(String),
    NegativePacketLength(i32),
    ExpectedSendTable(u32),
    SendTableNotFound(String),
    CyclicSendTable(String),
    UnknownPropType(i32),
    MissingArrayElement(String),
    ClsIdOutOfBounds(u32),
    ClassNotFound(String),
    UnknownPropName(String),
    PropIndexOutOfBounds(u32),
    EntityNotFound(i32),
    EntityIdOutOfBounds(i32),
    StringTableNotFound(i32),
    DictionaryEncodedStringTable(String),
    StringTableIndexOutOfBounds(i32),
}

impl std::error::Error for DemoParserError {}

impl fmt::Display for DemoParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
