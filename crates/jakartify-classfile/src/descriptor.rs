use crate::error::{ClassFileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Base(BaseType),
    /// Internal (slash-separated) class name.
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Dotted class name when this is a plain object type. Arrays and
    /// primitives have none.
    pub fn class_name(&self) -> Option<String> {
        match self {
            FieldType::Object(internal) => Some(internal.replace('/', ".")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

impl MethodDescriptor {
    /// Parameter types followed by the return type, if any.
    pub fn types(&self) -> impl Iterator<Item = &FieldType> {
        let ret = match &self.return_type {
            ReturnType::Void => None,
            ReturnType::Type(ty) => Some(ty),
        };
        self.params.iter().chain(ret)
    }
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    let mut parser = Parser::new(desc);
    let ty = parser.field_type()?;
    parser.finish()?;
    Ok(ty)
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let mut parser = Parser::new(desc);
    parser.expect(b'(')?;
    let mut params = Vec::new();
    while !parser.eat(b')') {
        params.push(parser.field_type()?);
    }
    let return_type = if parser.eat(b'V') {
        ReturnType::Void
    } else {
        ReturnType::Type(parser.field_type()?)
    };
    parser.finish()?;
    Ok(MethodDescriptor {
        params,
        return_type,
    })
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self) -> ClassFileError {
        ClassFileError::InvalidDescriptor(self.input.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn field_type(&mut self) -> Result<FieldType> {
        let tag = self.peek().ok_or_else(|| self.error())?;
        self.pos += 1;
        let base = match tag {
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'D' => BaseType::Double,
            b'F' => BaseType::Float,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'S' => BaseType::Short,
            b'Z' => BaseType::Boolean,
            b'L' => {
                let input = self.input;
                let rest = &input[self.pos..];
                let end = rest.find(';').ok_or_else(|| self.error())?;
                if end == 0 {
                    return Err(self.error());
                }
                self.pos += end + 1;
                return Ok(FieldType::Object(rest[..end].to_string()));
            }
            b'[' => return Ok(FieldType::Array(Box::new(self.field_type()?))),
            _ => return Err(self.error()),
        };
        Ok(FieldType::Base(base))
    }
}
