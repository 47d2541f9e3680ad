//! Backend-agnostic view of PDF objects.
//!
//! Backends hand out resolved copies of the parts of the object graph the
//! inspectors need (font subtrees, annotations, form fields, info dictionary).
//! Indirect references are followed up to a nesting limit; anything deeper is
//! left as a [`PdfObject::Reference`], and anything the backend failed to load
//! becomes [`PdfObject::Unreadable`] so a single broken object stays local.

use indexmap::IndexMap;

/// Indirect object identity: object number and generation.
pub type ObjectId = (u32, u32);

#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Name without the leading slash.
    Name(String),
    String(Vec<u8>),
    Array(Vec<PdfObject>),
    Dictionary(Dictionary),
    /// A stream, represented by its dictionary only.
    Stream(Dictionary),
    /// Indirect object that was not expanded (nesting limit).
    Reference(ObjectId),
    /// Object the backend could not load.
    Unreadable(String),
}

impl PdfObject {
    pub fn name(value: &str) -> Self {
        Self::Name(value.trim_start_matches('/').to_string())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) | Self::Stream(dict) => Some(dict),
            _ => None,
        }
    }

    /// Names and strings rendered as text, other scalars in PDF syntax.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.clone()),
            Self::String(bytes) => Some(decode_text_string(bytes)),
            Self::Integer(value) => Some(value.to_string()),
            Self::Real(value) => Some(value.to_string()),
            Self::Boolean(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Identity of the indirect object this value came from, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Reference(id) => Some(*id),
            Self::Dictionary(dict) | Self::Stream(dict) => dict.id,
            _ => None,
        }
    }

    /// Short type label used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Stream(_) => "stream",
            Self::Reference(_) => "reference",
            Self::Unreadable(_) => "unreadable object",
        }
    }
}

/// PDF dictionary with keys stored without the leading slash, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    pub id: Option<ObjectId>,
    entries: IndexMap<String, PdfObject>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: ObjectId) -> Self {
        Self {
            id: Some(id),
            entries: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, key: &str, value: PdfObject) {
        self.entries
            .insert(key.trim_start_matches('/').to_string(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: PdfObject) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.get(key.trim_start_matches('/'))
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfObject::as_name)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(PdfObject::as_dict)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key.trim_start_matches('/'))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PdfObject)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, otherwise PDFDocEncoding,
/// approximated as Latin-1.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
