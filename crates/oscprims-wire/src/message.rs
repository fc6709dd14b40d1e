use std::fmt;

/// Type tag for a 32-bit big-endian float.
pub const TAG_FLOAT: char = 'f';
/// Type tag for a 32-bit big-endian integer.
pub const TAG_INT: char = 'i';
/// Type tag for a NUL-terminated, padded string.
pub const TAG_STRING: char = 's';

/// A single OSC argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Float(f32),
    Int(i32),
    String(String),
}

impl Argument {
    /// The OSC type tag character for this argument.
    pub fn type_tag(&self) -> char {
        match self {
            Argument::Float(_) => TAG_FLOAT,
            Argument::Int(_) => TAG_INT,
            Argument::String(_) => TAG_STRING,
        }
    }

    /// Whether the value can be written on the wire.
    ///
    /// Strings must be ASCII without interior NUL bytes; numbers always encode.
    pub fn is_encodable(&self) -> bool {
        match self {
            Argument::String(value) => value.is_ascii() && !value.contains('\0'),
            Argument::Float(_) | Argument::Int(_) => true,
        }
    }

    /// The float value, if this is a `Float` argument.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Argument::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The integer value, if this is an `Int` argument.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Argument::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The string value, if this is a `String` argument.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<f32> for Argument {
    fn from(value: f32) -> Self {
        Argument::Float(value)
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(value)
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Float(value) => write!(f, "{value}"),
            Argument::Int(value) => write!(f, "{value}"),
            Argument::String(value) => write!(f, "{value:?}"),
        }
    }
}

/// An OSC message: an address plus an ordered list of arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The `/`-delimited address path.
    pub address: String,
    /// Arguments in wire order.
    pub args: Vec<Argument>,
}

impl Message {
    /// Create a message with no arguments.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    /// Create a message with the given arguments.
    pub fn with_args(address: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Create a message whose arguments are all floats.
    pub fn from_floats(address: impl Into<String>, values: &[f32]) -> Self {
        Self::with_args(address, values.iter().copied().map(Argument::Float).collect())
    }

    /// Append an argument (builder style).
    pub fn arg(mut self, arg: impl Into<Argument>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The type-tag string this message would carry on the wire.
    ///
    /// Arguments that cannot be encoded are omitted, matching the encoder.
    pub fn type_tags(&self) -> String {
        let mut tags = String::with_capacity(self.args.len() + 1);
        tags.push(crate::codec::TYPE_TAG_PREFIX);
        tags.extend(
            self.args
                .iter()
                .filter(|arg| arg.is_encodable())
                .map(Argument::type_tag),
        );
        tags
    }
}
