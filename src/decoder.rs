use crate::read_bits::Bitreader;
use crate::read_bits::DemoParserError;
use crate::sendtables::*;
use crate::variants::Variant;

const STRING_LENGTH_BITS: u32 = 9;

impl<'a> Bitreader<'a> {
    pub fn decode(&mut self, prop: &FlattenedProp) -> Result<Variant, DemoParserError> {
        self.decode_prop(&prop.prop, prop.array_element_prop.as_ref())
    }
    fn decode_prop(&mut self, prop: &SendProp, element: Option<&SendProp>) -> Result<Variant, DemoParserError> {
        match prop.prop_type {
            SendPropType::Int => Ok(Variant::I32(self.decode_int(prop)?)),
            SendPropType::Int64 => Ok(Variant::I64(self.decode_int64(prop)?)),
            SendPropType::Float => Ok(Variant::F32(self.decode_float(prop)?)),
            SendPropType::Vector => Ok(Variant::VecXYZ(self.decode_vector(prop)?)),
            SendPropType::VectorXY => Ok(Variant::VecXY([self.decode_float(prop)?, self.decode_float(prop)?])),
            SendPropType::String => Ok(Variant::String(self.decode_string()?)),
            SendPropType::Array => self.decode_array(prop, element),
            // Flattening never emits sub table props.
            SendPropType::DataTable => Err(DemoParserError::UnknownPropType(6)),
        }
    }
    pub fn decode_int(&mut self, prop: &SendProp) -> Result<i32, DemoParserError> {
        if prop.has_flag(PROP_FLAG_VARINT) {
            if prop.has_flag(PROP_FLAG_UNSIGNED) {
                return Ok(self.read_varint()? as i32);
            }
            return self.read_varint32();
        }
        if prop.has_flag(PROP_FLAG_UNSIGNED) {
            return Ok(self.read_nbits(prop.num_bits)? as i32);
        }
        self.read_signed_nbits(prop.num_bits)
    }
    pub fn decode_int64(&mut self, prop: &SendProp) -> Result<i64, DemoParserError> {
        if prop.has_flag(PROP_FLAG_VARINT) {
            if prop.has_flag(PROP_FLAG_UNSIGNED) {
                return Ok(self.read_varint_u_64()? as i64);
            }
            return self.read_varint64();
        }
        let (negative, low, high) = match prop.has_flag(PROP_FLAG_UNSIGNED) {
            true => {
                let low = self.read_nbits(32)?;
                let high = self.read_nbits(prop.num_bits.saturating_sub(32))?;
                (false, low, high)
            }
            false => {
                let negative = self.read_boolean()?;
                let low = self.read_nbits(32)?;
                let high = self.read_nbits(prop.num_bits.saturating_sub(33))?;
                (negative, low, high)
            }
        };
        let value = ((high as i64) << 32) | low as i64;
        Ok(if negative { -value } else { value })
    }
    pub fn decode_float(&mut self, prop: &SendProp) -> Result<f32, DemoParserError> {
        if let Some(special) = self.decode_special_float(prop)? {
            return Ok(special);
        }
        if prop.num_bits == 0 {
            return Ok(prop.low_value);
        }
        let raw = self.read_nbits(prop.num_bits)? as f64;
        let max = ((1_u64 << prop.num_bits) - 1) as f64;
        let low = prop.low_value as f64;
        let high = prop.high_value as f64;
        let value = low + (high - low) * (raw / max);
        Ok(value.clamp(low.min(high), low.max(high)) as f32)
    }
    fn decode_special_float(&mut self, prop: &SendProp) -> Result<Option<f32>, DemoParserError> {
        let f = prop.flags;
        let value = if f & PROP_FLAG_COORD != 0 {
            self.read_bit_coord()?
        } else if f & PROP_FLAG_COORD_MP != 0 {
            self.read_bit_coord_mp(false, false)?
        } else if f & PROP_FLAG_COORD_MP_LOWPRECISION != 0 {
            self.read_bit_coord_mp(false, true)?
        } else if f & PROP_FLAG_COORD_MP_INTEGRAL != 0 {
            self.read_bit_coord_mp(true, false)?
        } else if f & PROP_FLAG_NOSCALE != 0 {
            self.read_f32()?
        } else if f & PROP_FLAG_NORMAL != 0 {
            self.read_bit_normal()?
        } else if f & PROP_FLAG_CELL_COORD != 0 {
            self.read_bit_cell_coord(prop.num_bits, false, false)?
        } else if f & PROP_FLAG_CELL_COORD_LOWPRECISION != 0 {
            self.read_bit_cell_coord(prop.num_bits, false, true)?
        } else if f & PROP_FLAG_CELL_COORD_INTEGRAL != 0 {
            self.read_bit_cell_coord(prop.num_bits, true, false)?
        } else {
            return Ok(None);
        };
        Ok(Some(value))
    }
    pub fn decode_vector(&mut self, prop: &SendProp) -> Result<[f32; 3], DemoParserError> {
        let x = self.decode_float(prop)?;
        let y = self.decode_float(prop)?;
        if !prop.has_flag(PROP_FLAG_NORMAL) {
            let z = self.decode_float(prop)?;
            return Ok([x, y, z]);
        }
        // z is rebuilt from the unit length, only its sign is sent
        let negative = self.read_boolean()?;
        let absolute = x * x + y * y;
        let mut z = match absolute < 1.0 {
            true => (1.0 - absolute).sqrt(),
            false => 0.0,
        };
        if negative {
            z = -z;
        }
        Ok([x, y, z])
    }
    pub fn decode_string(&mut self) -> Result<String, DemoParserError> {
        let len = self.read_nbits(STRING_LENGTH_BITS)?;
        let bytes = self.read_n_bytes(len as usize)?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
    fn decode_array(&mut self, prop: &SendProp, element: Option<&SendProp>) -> Result<Variant, DemoParserError> {
        let element = match element {
            Some(element) => element,
            None => return Err(DemoParserError::MissingArrayElement(prop.name.clone())),
        };
        let mut max = prop.num_elements.max(0);
        let mut bits = 1;
        loop {
            max >>= 1;
            if max == 0 {
                break;
            }
            bits += 1;
        }
        let n_elements = self.read_nbits(bits)?;
        let mut out = Vec::with_capacity(n_elements as usize);
        for _ in 0..n_elements {
            out.push(self.decode_prop(element, None)?);
        }
        Ok(Variant::Array(out))
    }
}
