use std::fmt;

/// A single scalar carried by a reading, an actuator or a configuration
/// option.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Wire representation: booleans lowercased, numbers as printed.
    pub(crate) fn write_wire(&self, out: &mut String) {
        match self {
            ScalarValue::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            ScalarValue::Int(value) => out.push_str(&value.to_string()),
            ScalarValue::Float(value) => out.push_str(&value.to_string()),
            ScalarValue::Text(value) => out.push_str(value),
        }
    }

    /// Display representation used by actuator status values: booleans are
    /// title-cased (`True`/`False`) for compatibility with the deployed
    /// gateway protocol.
    pub(crate) fn write_display(&self, out: &mut String) {
        match self {
            ScalarValue::Bool(value) => out.push_str(if *value { "True" } else { "False" }),
            other => other.write_wire(out),
        }
    }
}

/// Value of a sensor reading, actuator or configuration option: a scalar or
/// a homogeneous tuple of two or three scalars. The `From` conversions are
/// the only way to build tuples, which keeps heterogeneous combinations out
/// of the model.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadingValue {
    Scalar(ScalarValue),
    Pair(ScalarValue, ScalarValue),
    Triple(ScalarValue, ScalarValue, ScalarValue),
}

impl ReadingValue {
    /// Wire representation: tuple elements joined by `,`, booleans
    /// lowercased.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        match self {
            ReadingValue::Scalar(a) => a.write_wire(&mut out),
            ReadingValue::Pair(a, b) => {
                a.write_wire(&mut out);
                out.push(',');
                b.write_wire(&mut out);
            }
            ReadingValue::Triple(a, b, c) => {
                a.write_wire(&mut out);
                out.push(',');
                b.write_wire(&mut out);
                out.push(',');
                c.write_wire(&mut out);
            }
        }
        out
    }

    /// Representation for actuator status values (`True`/`False` booleans).
    pub fn to_display(&self) -> String {
        let mut out = String::new();
        match self {
            ReadingValue::Scalar(a) => a.write_display(&mut out),
            ReadingValue::Pair(a, b) => {
                a.write_display(&mut out);
                out.push(',');
                b.write_display(&mut out);
            }
            ReadingValue::Triple(a, b, c) => {
                a.write_display(&mut out);
                out.push(',');
                b.write_display(&mut out);
                out.push(',');
                c.write_display(&mut out);
            }
        }
        out
    }

    /// Converts a JSON scalar into a value. Arrays and objects have no
    /// place in the protocol and return `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(ScalarValue::Bool(*b).into()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ScalarValue::Int(i).into())
                } else {
                    n.as_f64().map(|f| ScalarValue::Float(f).into())
                }
            }
            serde_json::Value::String(s) => Some(ScalarValue::Text(s.clone()).into()),
            _ => None,
        }
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl From<ScalarValue> for ReadingValue {
    fn from(value: ScalarValue) -> Self {
        ReadingValue::Scalar(value)
    }
}

impl From<bool> for ReadingValue {
    fn from(value: bool) -> Self {
        ReadingValue::Scalar(ScalarValue::Bool(value))
    }
}

impl From<i64> for ReadingValue {
    fn from(value: i64) -> Self {
        ReadingValue::Scalar(ScalarValue::Int(value))
    }
}

impl From<i32> for ReadingValue {
    fn from(value: i32) -> Self {
        ReadingValue::Scalar(ScalarValue::Int(value.into()))
    }
}

impl From<f64> for ReadingValue {
    fn from(value: f64) -> Self {
        ReadingValue::Scalar(ScalarValue::Float(value))
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        ReadingValue::Scalar(ScalarValue::Text(value.to_owned()))
    }
}

impl From<String> for ReadingValue {
    fn from(value: String) -> Self {
        ReadingValue::Scalar(ScalarValue::Text(value))
    }
}

impl From<(i64, i64)> for ReadingValue {
    fn from((a, b): (i64, i64)) -> Self {
        ReadingValue::Pair(ScalarValue::Int(a), ScalarValue::Int(b))
    }
}

impl From<(i64, i64, i64)> for ReadingValue {
    fn from((a, b, c): (i64, i64, i64)) -> Self {
        ReadingValue::Triple(ScalarValue::Int(a), ScalarValue::Int(b), ScalarValue::Int(c))
    }
}

impl From<(f64, f64)> for ReadingValue {
    fn from((a, b): (f64, f64)) -> Self {
        ReadingValue::Pair(ScalarValue::Float(a), ScalarValue::Float(b))
    }
}

impl From<(f64, f64, f64)> for ReadingValue {
    fn from((a, b, c): (f64, f64, f64)) -> Self {
        ReadingValue::Triple(
            ScalarValue::Float(a),
            ScalarValue::Float(b),
            ScalarValue::Float(c),
        )
    }
}

impl From<(&str, &str)> for ReadingValue {
    fn from((a, b): (&str, &str)) -> Self {
        ReadingValue::Pair(ScalarValue::Text(a.to_owned()), ScalarValue::Text(b.to_owned()))
    }
}

impl From<(&str, &str, &str)> for ReadingValue {
    fn from((a, b, c): (&str, &str, &str)) -> Self {
        ReadingValue::Triple(
            ScalarValue::Text(a.to_owned()),
            ScalarValue::Text(b.to_owned()),
            ScalarValue::Text(c.to_owned()),
        )
    }
}

/// A sensor measurement waiting to be published.
///
/// Readings without a unix-milliseconds timestamp are treated as live by the
/// platform and stamped on reception.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub reference: String,
    pub value: ReadingValue,
    pub timestamp: Option<u64>,
}

impl SensorReading {
    pub fn new(
        reference: impl Into<String>,
        value: impl Into<ReadingValue>,
        timestamp: Option<u64>,
    ) -> Self {
        Self {
            reference: reference.into(),
            value: value.into(),
            timestamp,
        }
    }
}

/// An alarm event waiting to be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alarm {
    pub reference: String,
    pub active: bool,
    pub timestamp: Option<u64>,
}

impl Alarm {
    pub fn new(reference: impl Into<String>, active: bool, timestamp: Option<u64>) -> Self {
        Self {
            reference: reference.into(),
            active,
            timestamp,
        }
    }
}

/// Operational state reported alongside an actuator value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActuatorState {
    Ready,
    Busy,
    Error,
}

impl ActuatorState {
    pub fn as_str(self) -> &'static str {
        match self {
            ActuatorState::Ready => "READY",
            ActuatorState::Busy => "BUSY",
            ActuatorState::Error => "ERROR",
        }
    }
}

/// Current state and value of one actuator.
#[derive(Clone, Debug, PartialEq)]
pub struct ActuatorStatus {
    pub reference: String,
    pub state: ActuatorState,
    pub value: ReadingValue,
}

impl ActuatorStatus {
    pub fn new(
        reference: impl Into<String>,
        state: ActuatorState,
        value: impl Into<ReadingValue>,
    ) -> Self {
        Self {
            reference: reference.into(),
            state,
            value: value.into(),
        }
    }
}
