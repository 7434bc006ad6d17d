//! Enum definitions: opcode-tagged key/value tables
//!
//! An enum file is a sequence of one-byte opcodes, each followed by its
//! operands, optionally closed by [`EnumOpcode::End`]. Running out of input
//! between opcodes ends the definition just like `End` does; running out in
//! the middle of an operand is a decode error.
//!
//! ```rust
//! use rscache_formats::enum_file::{EnumFile, EnumValue, ScriptVarType};
//! use rscache_formats::CacheFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = [
//!     1, b'i', // key type: integer
//!     2, b's', // value type: string
//!     5, 0, 1, 0, 0, 0, 7, b'h', b'i', 0, // dictionary {7: "hi"}
//!     0, // end
//! ];
//! let file = EnumFile::decode(&data)?;
//! assert_eq!(file.key_type, ScriptVarType::Integer);
//! assert_eq!(file.get(7), Some(&EnumValue::String("hi".to_string())));
//! # Ok(())
//! # }
//! ```

use crate::buffer::ByteReader;
use crate::error::{FormatError, Result};
use crate::file::{CacheFile, CacheFileInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opcodes understood by the enum decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EnumOpcode {
    /// End of definition
    End = 0,
    /// Key type as a character tag
    CharKeyType = 1,
    /// Value type as a character tag
    CharValueType = 2,
    /// Default string value
    DefaultString = 3,
    /// Default integer value
    DefaultInteger = 4,
    /// Count-prefixed dictionary of integer keys to strings
    StringDataDictionary = 5,
    /// Count-prefixed dictionary of integer keys to integers
    IntegerDataDictionary = 6,
    /// Array-encoded table of strings
    StringDataArray = 7,
    /// Array-encoded table of integers
    IntegerDataArray = 8,
    /// Key type as a numeric tag
    ByteKeyType = 101,
    /// Value type as a numeric tag
    ByteValueType = 102,
}

impl TryFrom<u8> for EnumOpcode {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        Ok(match value {
            0 => Self::End,
            1 => Self::CharKeyType,
            2 => Self::CharValueType,
            3 => Self::DefaultString,
            4 => Self::DefaultInteger,
            5 => Self::StringDataDictionary,
            6 => Self::IntegerDataDictionary,
            7 => Self::StringDataArray,
            8 => Self::IntegerDataArray,
            101 => Self::ByteKeyType,
            102 => Self::ByteValueType,
            other => return Err(other),
        })
    }
}

/// Script variable type of enum keys and values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptVarType {
    /// `i`
    Integer,
    /// `s`
    String,
    /// `1`
    Boolean,
    /// `c`
    Coordinate,
    /// `I`
    Component,
    /// `o`
    Object,
    /// `l`
    Location,
    /// `d`
    Graphic,
    /// Any other character tag
    Char(char),
    /// Numeric tag from the byte-width opcodes
    Id(u16),
}

impl ScriptVarType {
    /// Map a character tag.
    pub const fn from_char(tag: char) -> Self {
        match tag {
            'i' => Self::Integer,
            's' => Self::String,
            '1' => Self::Boolean,
            'c' => Self::Coordinate,
            'I' => Self::Component,
            'o' => Self::Object,
            'l' => Self::Location,
            'd' => Self::Graphic,
            other => Self::Char(other),
        }
    }

    /// Map a numeric tag.
    pub const fn from_id(id: u16) -> Self {
        Self::Id(id)
    }

    /// True when values of this type are strings.
    pub const fn is_string(self) -> bool {
        matches!(self, Self::String)
    }
}

/// A value stored in an enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    /// Integer value
    Integer(i32),
    /// String value
    String(String),
}

impl EnumValue {
    /// The integer, if this is one.
    pub const fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::String(_) => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Integer(_) => None,
        }
    }
}

/// Decoded enum definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumFile {
    /// Type of the keys
    pub key_type: ScriptVarType,
    /// Type of the values
    pub value_type: ScriptVarType,
    /// Returned for missing keys of string enums
    pub default_string: String,
    /// Returned for missing keys of integer enums
    pub default_integer: i32,
    /// Key to value table
    pub values: BTreeMap<i32, EnumValue>,
    /// Provenance
    #[serde(skip)]
    pub info: CacheFileInfo,
}

impl EnumFile {
    /// Value stored under `key`.
    pub fn get(&self, key: i32) -> Option<&EnumValue> {
        self.values.get(&key)
    }

    /// Value stored under `key`, or the default matching the value type.
    pub fn get_or_default(&self, key: i32) -> EnumValue {
        self.values.get(&key).cloned().unwrap_or_else(|| {
            if self.value_type.is_string() {
                EnumValue::String(self.default_string.clone())
            } else {
                EnumValue::Integer(self.default_integer)
            }
        })
    }

    pub fn contains_key(&self, key: i32) -> bool {
        self.values.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&i32, &EnumValue)> {
        self.values.iter()
    }
}

impl<'a> IntoIterator for &'a EnumFile {
    type Item = (&'a i32, &'a EnumValue);
    type IntoIter = std::collections::btree_map::Iter<'a, i32, EnumValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

fn read_value(reader: &mut ByteReader<'_>, string: bool) -> Result<EnumValue> {
    if string {
        Ok(EnumValue::String(reader.read_string()?))
    } else {
        Ok(EnumValue::Integer(reader.read_i32()?))
    }
}

impl CacheFile for EnumFile {
    fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(data);
        let mut key_type = None;
        let mut value_type = None;
        let mut default_string = "null".to_string();
        let mut default_integer = 0;
        let mut values: Option<BTreeMap<i32, EnumValue>> = None;

        while !reader.is_empty() {
            let position = reader.position();
            let raw = reader.read_u8()?;
            let opcode = EnumOpcode::try_from(raw)
                .map_err(|opcode| FormatError::UnrecognizedOpcode { opcode, position })?;

            match opcode {
                EnumOpcode::End => break,
                EnumOpcode::CharKeyType => {
                    key_type = Some(ScriptVarType::from_char(reader.read_cp1252_char()?));
                }
                EnumOpcode::CharValueType => {
                    value_type = Some(ScriptVarType::from_char(reader.read_cp1252_char()?));
                }
                EnumOpcode::ByteKeyType => {
                    key_type = Some(ScriptVarType::from_id(reader.read_unsigned_smart()?));
                }
                EnumOpcode::ByteValueType => {
                    value_type = Some(ScriptVarType::from_id(reader.read_unsigned_smart()?));
                }
                EnumOpcode::DefaultString => default_string = reader.read_string()?,
                EnumOpcode::DefaultInteger => default_integer = reader.read_i32()?,
                EnumOpcode::StringDataDictionary | EnumOpcode::IntegerDataDictionary => {
                    let string = opcode == EnumOpcode::StringDataDictionary;
                    let count = reader.read_u16()?;
                    let mut table = BTreeMap::new();
                    for _ in 0..count {
                        let key = reader.read_i32()?;
                        table.insert(key, read_value(&mut reader, string)?);
                    }
                    values = Some(table);
                }
                EnumOpcode::StringDataArray | EnumOpcode::IntegerDataArray => {
                    let string = opcode == EnumOpcode::StringDataArray;
                    let _max = reader.read_u16()?;
                    let count = reader.read_u16()?;
                    let mut table = BTreeMap::new();
                    for _ in 0..count {
                        let key = i32::from(reader.read_u16()?);
                        table.insert(key, read_value(&mut reader, string)?);
                    }
                    values = Some(table);
                }
            }
        }

        Ok(Self {
            key_type: key_type.ok_or(FormatError::IncompleteDefinition("key type"))?,
            value_type: value_type.ok_or(FormatError::IncompleteDefinition("value type"))?,
            default_string,
            default_integer,
            values: values.ok_or(FormatError::IncompleteDefinition("values"))?,
            info: CacheFileInfo::default(),
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Err(FormatError::Unsupported("encoding of enum files".to_string()))
    }

    fn info(&self) -> &CacheFileInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut CacheFileInfo {
        &mut self.info
    }
}
