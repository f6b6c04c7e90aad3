//! Marshal encoder.
//!
//! Output is accepted by Ruby's `Marshal.load`. Repeated symbols are written
//! as symbol links; object links are never emitted, so shared values are
//! simply written again.

use std::collections::HashMap;

use super::{Value, MAJOR_VERSION, MINOR_VERSION};

/// Largest magnitude Ruby stores as an `i` fixnum on the wire
const FIXNUM_MAX: i64 = (1 << 30) - 1;
const FIXNUM_MIN: i64 = -(1 << 30);

/// Encode a value as a complete Marshal document
pub fn dump(value: &Value) -> Vec<u8> {
    let mut writer = Writer::default();
    writer.out.push(MAJOR_VERSION);
    writer.out.push(MINOR_VERSION);
    writer.write_value(value);
    writer.out
}

#[derive(Default)]
struct Writer {
    out: Vec<u8>,
    symbols: HashMap<String, usize>,
}

impl Writer {
    fn write_long(&mut self, value: i64) {
        match value {
            0 => self.out.push(0),
            1..=122 => self.out.push((value + 5) as u8),
            -123..=-1 => self.out.push((value - 5) as u8),
            _ => {
                let mut buf = [0u8; 9];
                let mut rest = value;
                for idx in 1..buf.len() {
                    buf[idx] = (rest & 0xff) as u8;
                    rest >>= 8;
                    if rest == 0 {
                        buf[0] = idx as u8;
                        self.out.extend_from_slice(&buf[..=idx]);
                        return;
                    }
                    if rest == -1 {
                        buf[0] = (-(idx as i8)) as u8;
                        self.out.extend_from_slice(&buf[..=idx]);
                        return;
                    }
                }
                // Lengths and fixnums never reach 8 significant bytes
                buf[0] = 8;
                self.out.extend_from_slice(&buf);
            },
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_long(bytes.len() as i64);
        self.out.extend_from_slice(bytes);
    }

    fn write_symbol(&mut self, name: &str) {
        if let Some(idx) = self.symbols.get(name).copied() {
            self.out.push(b';');
            self.write_long(idx as i64);
            return;
        }
        let idx = self.symbols.len();
        self.symbols.insert(name.to_string(), idx);
        self.out.push(b':');
        self.write_bytes(name.as_bytes());
    }

    fn write_value(&mut self, value: &Value) {
        match value {
            Value::Nil => self.out.push(b'0'),
            Value::Bool(true) => self.out.push(b'T'),
            Value::Bool(false) => self.out.push(b'F'),
            Value::Int(number) => self.write_integer(*number),
            Value::Float(number) => {
                self.out.push(b'f');
                let text = if number.is_nan() {
                    "nan".to_string()
                } else if number.is_infinite() {
                    if *number > 0.0 { "inf" } else { "-inf" }.to_string()
                } else {
                    number.to_string()
                };
                self.write_bytes(text.as_bytes());
            },
            Value::Symbol(name) => self.write_symbol(name),
            Value::Str(text) => {
                self.out.push(b'I');
                self.out.push(b'"');
                self.write_bytes(text.as_bytes());
                self.write_long(1);
                self.write_symbol("E");
                self.out.push(b'T');
            },
            Value::Bytes(bytes) => {
                self.out.push(b'"');
                self.write_bytes(bytes);
            },
            Value::Array(items) => {
                self.out.push(b'[');
                self.write_long(items.len() as i64);
                for item in items {
                    self.write_value(item);
                }
            },
            Value::Hash(pairs) => {
                self.out.push(b'{');
                self.write_long(pairs.len() as i64);
                for (key, item) in pairs {
                    self.write_value(key);
                    self.write_value(item);
                }
            },
            Value::Object { class, ivars } => {
                self.out.push(b'o');
                self.write_symbol(class);
                self.write_long(ivars.len() as i64);
                for (name, item) in ivars {
                    self.write_symbol(name);
                    self.write_value(item);
                }
            },
            Value::UserMarshal { class, data } => {
                self.out.push(b'U');
                self.write_symbol(class);
                self.write_value(data);
            },
            Value::UserDefined { class, data } => {
                self.out.push(b'u');
                self.write_symbol(class);
                self.write_bytes(data);
            },
        }
    }

    fn write_integer(&mut self, number: i64) {
        if (FIXNUM_MIN..=FIXNUM_MAX).contains(&number) {
            self.out.push(b'i');
            self.write_long(number);
            return;
        }

        self.out.push(b'l');
        self.out.push(if number < 0 { b'-' } else { b'+' });
        let mut magnitude = number.unsigned_abs().to_le_bytes().to_vec();
        while magnitude.last() == Some(&0) {
            magnitude.pop();
        }
        if magnitude.len() % 2 == 1 {
            magnitude.push(0);
        }
        self.write_long((magnitude.len() / 2) as i64);
        self.out.extend_from_slice(&magnitude);
    }
}
