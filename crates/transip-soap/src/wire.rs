//! SOAP array/struct encoding
//!
//! Converts between native [`Value`]s and the [`WireValue`] shape the SOAP
//! layer exchanges. Arrays travel as a struct holding an `item` key plus
//! attribute keys (prefixed with `@`) that carry the element type and the
//! element count:
//!
//! ```text
//! ["a", "b"]  ──▶  { item: { content!: ["a", "b"], @xsi:type: "tns:String" },
//!                    @xsi:type: "tns:ArrayOfString",
//!                    @enc:arrayType: "tns:String[2]" }
//! ```
//!
//! A one-element array arrives with `item` holding the bare element, which is
//! indistinguishable from a record with a single `item` field. The count in
//! the array-type attribute is the only thing that tells them apart, so
//! decoding consults it instead of guessing from shape.

use indexmap::IndexMap;

/// Key holding the elements of an array
pub const ITEM_KEY: &str = "item";

/// Key wrapping the payload of a response envelope
pub const RETURN_KEY: &str = "return";

/// Key under `item` holding the element list of an encoded array
pub const CONTENT_KEY: &str = "content!";

/// Prefix of keys that are wire metadata rather than data
pub const ATTRIBUTE_PREFIX: char = '@';

const TYPE_ATTRIBUTE: &str = "@xsi:type";
const ARRAY_TYPE_ATTRIBUTE: &str = "@enc:arrayType";
const TYPE_NAMESPACE: &str = "tns";

/// A native call parameter or decoded response value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// A typed record such as `DnsEntry`; the class names the wire type
    Object {
        class: String,
        fields: IndexMap<String, Value>,
    },
}

impl Value {
    pub fn map<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn object<K, I>(class: impl Into<String>, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object {
            class: class.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Wire type name used in array type attributes
    pub fn type_name(&self) -> &str {
        match self {
            Value::Scalar(_) => "String",
            Value::List(_) => "Array",
            Value::Map(_) => "Map",
            Value::Object { class, .. } => class,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Field lookup on maps and objects
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(fields) | Value::Object { fields, .. } => fields.get(key),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Scalar(n.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// The SOAP layer's view of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Scalar(String),
    Sequence(Vec<WireValue>),
    Struct(IndexMap<String, WireValue>),
}

impl WireValue {
    pub fn structure<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, WireValue)>,
    {
        WireValue::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn scalar(s: impl Into<String>) -> Self {
        WireValue::Scalar(s.into())
    }

    pub fn get(&self, key: &str) -> Option<&WireValue> {
        match self {
            WireValue::Struct(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Encode a native value for the wire
///
/// Maps and objects keep their field order. An empty list has no element
/// type to announce and encodes to an empty struct.
pub fn encode(value: &Value) -> WireValue {
    match value {
        Value::Scalar(s) => WireValue::Scalar(s.clone()),
        Value::List(items) => encode_list(items),
        Value::Map(fields) | Value::Object { fields, .. } => WireValue::Struct(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect(),
        ),
    }
}

fn encode_list(items: &[Value]) -> WireValue {
    let Some(first) = items.first() else {
        return WireValue::Struct(IndexMap::new());
    };
    let element_type = first.type_name();
    let elements = items.iter().map(encode).collect();

    WireValue::structure([
        (
            ITEM_KEY,
            WireValue::structure([
                (CONTENT_KEY, WireValue::Sequence(elements)),
                (
                    TYPE_ATTRIBUTE,
                    WireValue::Scalar(format!("{TYPE_NAMESPACE}:{element_type}")),
                ),
            ]),
        ),
        (
            TYPE_ATTRIBUTE,
            WireValue::Scalar(format!("{TYPE_NAMESPACE}:ArrayOf{element_type}")),
        ),
        (
            ARRAY_TYPE_ATTRIBUTE,
            WireValue::Scalar(format!("{TYPE_NAMESPACE}:{element_type}[{}]", items.len())),
        ),
    ])
}

/// Decode a wire value into a native value
///
/// Never fails: structures that match none of the array or envelope shapes
/// come back as plain maps, minus their attribute keys.
pub fn decode(wire: &WireValue) -> Value {
    match wire {
        WireValue::Scalar(s) => Value::Scalar(s.clone()),
        WireValue::Sequence(items) => Value::List(items.iter().map(decode).collect()),
        WireValue::Struct(fields) => decode_struct(fields),
    }
}

fn decode_struct(fields: &IndexMap<String, WireValue>) -> Value {
    let data_keys: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|k| !is_attribute(k))
        .collect();

    if data_keys == [RETURN_KEY] {
        if let Some(payload) = fields.get(RETURN_KEY) {
            return decode(payload);
        }
    }

    if let Some(count) = cardinality(fields) {
        match fields.get(ITEM_KEY) {
            Some(item) => return decode_sequence(item, count),
            None if data_keys.is_empty() && count == 0 => return Value::List(Vec::new()),
            None => {}
        }
    }

    Value::Map(
        fields
            .iter()
            .filter(|(k, _)| !is_attribute(k))
            .map(|(k, v)| (k.clone(), decode(v)))
            .collect(),
    )
}

fn decode_sequence(item: &WireValue, count: usize) -> Value {
    match item {
        WireValue::Sequence(_) => decode(item),
        WireValue::Struct(holder) if holder.contains_key(CONTENT_KEY) => {
            match holder.get(CONTENT_KEY).map(decode) {
                Some(Value::List(items)) => Value::List(items),
                Some(single) => Value::List(vec![single]),
                None => Value::List(Vec::new()),
            }
        }
        _ if count == 1 => Value::List(vec![decode(item)]),
        _ => decode(item),
    }
}

fn is_attribute(key: &str) -> bool {
    key.starts_with(ATTRIBUTE_PREFIX)
}

/// Element count from an array-type attribute such as `tns:String[2]`
fn cardinality(fields: &IndexMap<String, WireValue>) -> Option<usize> {
    fields
        .iter()
        .filter(|(k, _)| is_attribute(k) && (k.ends_with("arrayType") || k.ends_with("array_type")))
        .find_map(|(_, v)| v.as_str().and_then(parse_count))
}

fn parse_count(marker: &str) -> Option<usize> {
    let open = marker.rfind('[')?;
    let close = marker[open..].find(']')? + open;
    marker[open + 1..close].trim().parse().ok()
}
