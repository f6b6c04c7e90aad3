//! Marshal decoder.
//!
//! Decoding is all-or-nothing: truncated input, unknown type tags, classes
//! missing from the registry and trailing bytes all fail the whole call.

use quarry_core::{QuarryError, QuarryResult};

use super::registry::{ClassRegistry, WireForm};
use super::{Value, MAJOR_VERSION, MINOR_VERSION};

const MAX_DEPTH: usize = 512;

/// Decode one Marshal document
pub fn load(bytes: &[u8], registry: &ClassRegistry) -> QuarryResult<Value> {
    let mut reader = Reader::new(bytes, registry);
    reader.read_header()?;
    let value = reader.read_value()?;
    if reader.pos != bytes.len() {
        return Err(QuarryError::codec(format!(
            "{} trailing bytes after marshal document",
            bytes.len() - reader.pos
        )));
    }
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    registry: &'a ClassRegistry,
    symbols: Vec<String>,
    /// Back-reference table for `@` links, in Ruby's registration order
    objects: Vec<Value>,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], registry: &'a ClassRegistry) -> Self {
        Self {
            bytes,
            pos: 0,
            registry,
            symbols: Vec::new(),
            objects: Vec::new(),
            depth: 0,
        }
    }

    fn read_header(&mut self) -> QuarryResult<()> {
        let major = self.read_byte()?;
        let minor = self.read_byte()?;
        if major != MAJOR_VERSION || minor > MINOR_VERSION {
            return Err(QuarryError::codec(format!(
                "unsupported marshal format {}.{}",
                major, minor
            )));
        }
        Ok(())
    }

    fn read_byte(&mut self) -> QuarryResult<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| QuarryError::codec("unexpected end of marshal data"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> QuarryResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| QuarryError::codec("unexpected end of marshal data"))?;
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Compact integer encoding shared by fixnums and all length prefixes
    fn read_long(&mut self) -> QuarryResult<i64> {
        let head = self.read_byte()? as i8;
        match head {
            0 => Ok(0),
            5..=127 => Ok(i64::from(head) - 5),
            -128..=-5 => Ok(i64::from(head) + 5),
            1..=4 => {
                let mut value = 0i64;
                for idx in 0..head {
                    value |= i64::from(self.read_byte()?) << (8 * idx);
                }
                Ok(value)
            },
            _ => {
                let count = -head;
                let mut value = -1i64;
                for idx in 0..count {
                    value &= !(0xffi64 << (8 * idx));
                    value |= i64::from(self.read_byte()?) << (8 * idx);
                }
                Ok(value)
            },
        }
    }

    fn read_len(&mut self) -> QuarryResult<usize> {
        let len = self.read_long()?;
        usize::try_from(len).map_err(|_| QuarryError::codec(format!("negative length {}", len)))
    }

    fn read_bytes(&mut self) -> QuarryResult<&'a [u8]> {
        let len = self.read_len()?;
        self.read_slice(len)
    }

    fn read_symbol(&mut self) -> QuarryResult<String> {
        match self.read_byte()? {
            b':' => self.read_symbol_body(),
            b';' => self.read_symbol_link(),
            b'I' => {
                // Symbol with an encoding ivar
                let tag = self.read_byte()?;
                if tag != b':' {
                    return Err(QuarryError::codec(format!(
                        "expected symbol, found tag 0x{:02x}",
                        tag
                    )));
                }
                let symbol = self.read_symbol_body()?;
                self.skip_ivars()?;
                Ok(symbol)
            },
            tag => Err(QuarryError::codec(format!(
                "expected symbol, found tag 0x{:02x}",
                tag
            ))),
        }
    }

    fn read_symbol_body(&mut self) -> QuarryResult<String> {
        let bytes = self.read_bytes()?;
        let symbol = String::from_utf8(bytes.to_vec())
            .map_err(|_| QuarryError::codec("symbol is not valid UTF-8"))?;
        self.symbols.push(symbol.clone());
        Ok(symbol)
    }

    fn read_symbol_link(&mut self) -> QuarryResult<String> {
        let idx = self.read_len()?;
        self.symbols
            .get(idx)
            .cloned()
            .ok_or_else(|| QuarryError::codec(format!("dangling symbol link {}", idx)))
    }

    fn skip_ivars(&mut self) -> QuarryResult<()> {
        let count = self.read_len()?;
        for _ in 0..count {
            self.read_symbol()?;
            self.read_value()?;
        }
        Ok(())
    }

    /// Reserve a slot in the object table before reading children
    fn reserve(&mut self) -> usize {
        self.objects.push(Value::Nil);
        self.objects.len() - 1
    }

    fn register(&mut self, value: Value) -> Value {
        self.objects.push(value.clone());
        value
    }

    fn fill(&mut self, slot: usize, value: Value) -> Value {
        self.objects[slot] = value.clone();
        value
    }

    fn resolve_class(&mut self, form: WireForm) -> QuarryResult<String> {
        let class = self.read_symbol()?;
        self.registry.check(&class, form)?;
        Ok(class)
    }

    fn read_value(&mut self) -> QuarryResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(QuarryError::codec("marshal data nested too deeply"));
        }
        self.depth += 1;
        let value = self.read_tagged();
        self.depth -= 1;
        value
    }

    fn read_tagged(&mut self) -> QuarryResult<Value> {
        let tag = self.read_byte()?;
        match tag {
            b'0' => Ok(Value::Nil),
            b'T' => Ok(Value::Bool(true)),
            b'F' => Ok(Value::Bool(false)),
            b'i' => Ok(Value::Int(self.read_long()?)),
            b':' => Ok(Value::Symbol(self.read_symbol_body()?)),
            b';' => Ok(Value::Symbol(self.read_symbol_link()?)),
            b'@' => {
                let idx = self.read_len()?;
                self.objects
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| QuarryError::codec(format!("dangling object link {}", idx)))
            },
            b'"' => {
                let bytes = self.read_bytes()?.to_vec();
                Ok(self.register(Value::Bytes(bytes)))
            },
            b'l' => {
                let value = self.read_bignum()?;
                Ok(self.register(value))
            },
            b'f' => {
                let value = self.read_float()?;
                Ok(self.register(value))
            },
            b'I' => self.read_with_ivars(),
            b'[' => {
                let slot = self.reserve();
                let len = self.read_len()?;
                let mut items = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    items.push(self.read_value()?);
                }
                Ok(self.fill(slot, Value::Array(items)))
            },
            b'{' | b'}' => {
                let slot = self.reserve();
                let len = self.read_len()?;
                let mut pairs = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    let key = self.read_value()?;
                    let value = self.read_value()?;
                    pairs.push((key, value));
                }
                if tag == b'}' {
                    // Hash default value is not modelled
                    self.read_value()?;
                }
                Ok(self.fill(slot, Value::Hash(pairs)))
            },
            b'o' => {
                let slot = self.reserve();
                let class = self.resolve_class(WireForm::Object)?;
                let count = self.read_len()?;
                let mut ivars = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let name = self.read_symbol()?;
                    let value = self.read_value()?;
                    ivars.push((name, value));
                }
                Ok(self.fill(slot, Value::Object { class, ivars }))
            },
            b'U' => {
                let slot = self.reserve();
                let class = self.resolve_class(WireForm::UserMarshal)?;
                let data = self.read_value()?;
                Ok(self.fill(slot, Value::user_marshal(class, data)))
            },
            b'u' => {
                let class = self.resolve_class(WireForm::UserDefined)?;
                let data = self.read_bytes()?.to_vec();
                Ok(self.register(Value::UserDefined { class, data }))
            },
            other => Err(QuarryError::codec(format!(
                "unsupported marshal tag 0x{:02x} at offset {}",
                other,
                self.pos - 1
            ))),
        }
    }

    /// `I` prefix: the wrapped value followed by its instance variables.
    /// Only string encodings are interpreted; other ivars are dropped.
    fn read_with_ivars(&mut self) -> QuarryResult<Value> {
        let slot = self.objects.len();
        let inner = self.read_value()?;
        let count = self.read_len()?;
        let mut encoded = false;
        for _ in 0..count {
            let name = self.read_symbol()?;
            let value = self.read_value()?;
            if name == "E" || name == "encoding" {
                encoded = !matches!(value, Value::Nil);
            }
        }

        match inner {
            Value::Bytes(bytes) if encoded => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| QuarryError::codec("encoded string is not valid UTF-8"))?;
                let value = Value::Str(text);
                if slot < self.objects.len() {
                    self.objects[slot] = value.clone();
                }
                Ok(value)
            },
            other => Ok(other),
        }
    }

    fn read_bignum(&mut self) -> QuarryResult<Value> {
        let sign = self.read_byte()?;
        let shorts = self.read_len()?;
        let bytes = self.read_slice(shorts * 2)?;
        let significant = bytes.iter().rposition(|b| *b != 0).map_or(0, |idx| idx + 1);
        if significant > 8 {
            return Err(QuarryError::codec("bignum exceeds 64 bits"));
        }
        let mut magnitude = 0u64;
        for (idx, byte) in bytes[..significant].iter().enumerate() {
            magnitude |= u64::from(*byte) << (8 * idx);
        }
        let value = match sign {
            b'+' => i64::try_from(magnitude).ok(),
            b'-' => 0i64.checked_sub_unsigned(magnitude),
            _ => return Err(QuarryError::codec("invalid bignum sign")),
        };
        value
            .map(Value::Int)
            .ok_or_else(|| QuarryError::codec("bignum exceeds 64 bits"))
    }

    fn read_float(&mut self) -> QuarryResult<Value> {
        let raw = self.read_bytes()?;
        // Older writers append mantissa bytes after a NUL
        let text = raw.split(|b| *b == 0).next().unwrap_or_default();
        let text = std::str::from_utf8(text).map_err(|_| QuarryError::codec("invalid float"))?;
        let value = match text {
            "nan" => f64::NAN,
            "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            other => other
                .parse()
                .map_err(|_| QuarryError::codec(format!("invalid float '{}'", other)))?,
        };
        Ok(Value::Float(value))
    }
}
