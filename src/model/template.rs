use crate::error::GatewayError;

/// Generic data type used when a sensor, actuator or configuration option
/// does not declare a named reading type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Numeric,
    Boolean,
    String,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Numeric => "NUMERIC",
            DataType::Boolean => "BOOLEAN",
            DataType::String => "STRING",
        }
    }
}

/// Named reading types defined on the platform. Reading types created
/// upfront on the platform but missing here can be used through
/// [`ReadingType::custom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadingTypeName {
    Temperature,
    Pressure,
    Humidity,
    Accelerometer,
    Count,
    Switch,
    String,
}

impl ReadingTypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingTypeName::Temperature => "TEMPERATURE",
            ReadingTypeName::Pressure => "PRESSURE",
            ReadingTypeName::Humidity => "HUMIDITY",
            ReadingTypeName::Accelerometer => "ACCELEROMETER",
            ReadingTypeName::Count => "COUNT",
            ReadingTypeName::Switch => "SWITCH",
            ReadingTypeName::String => "STRING",
        }
    }
}

/// Measurement unit symbols matching [`ReadingTypeName`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadingTypeMeasurementUnit {
    Celsius,
    Millibar,
    HumidityPercent,
    MetresPerSquareSecond,
    Count,
    Unitless,
}

impl ReadingTypeMeasurementUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            ReadingTypeMeasurementUnit::Celsius => "℃",
            ReadingTypeMeasurementUnit::Millibar => "mb",
            ReadingTypeMeasurementUnit::HumidityPercent => "%",
            ReadingTypeMeasurementUnit::MetresPerSquareSecond => "m/s²",
            ReadingTypeMeasurementUnit::Count => "count",
            ReadingTypeMeasurementUnit::Unitless => "",
        }
    }
}

/// The (reading type name, measurement unit symbol) pair registered for a
/// sensor or actuator. Only obtainable through the constructors, so a
/// reading type always carries a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadingType {
    name: String,
    symbol: String,
}

impl ReadingType {
    /// Generic sensor reading type derived from a data type.
    pub fn for_sensor(data_type: DataType) -> Self {
        let (name, symbol) = match data_type {
            DataType::Numeric => ("COUNT", "count"),
            DataType::Boolean => ("SWITCH", ""),
            DataType::String => ("STRING", ""),
        };
        Self {
            name: name.to_owned(),
            symbol: symbol.to_owned(),
        }
    }

    /// Generic actuator reading type derived from a data type.
    pub fn for_actuator(data_type: DataType) -> Self {
        let (name, symbol) = match data_type {
            DataType::Numeric => ("COUNT(ACTUATOR)", "count"),
            DataType::Boolean => ("SWITCH(ACTUATOR)", ""),
            DataType::String => ("STRING(ACTUATOR)", ""),
        };
        Self {
            name: name.to_owned(),
            symbol: symbol.to_owned(),
        }
    }

    pub fn named(name: ReadingTypeName, unit: ReadingTypeMeasurementUnit) -> Self {
        Self {
            name: name.as_str().to_owned(),
            symbol: unit.symbol().to_owned(),
        }
    }

    /// Reading type previously defined on the platform. Both the name and
    /// the unit symbol must be given.
    pub fn custom(name: &str, symbol: &str) -> Result<Self, GatewayError> {
        if name.is_empty() {
            return Err(GatewayError::Configuration(
                "custom reading type requires a name".into(),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            symbol: symbol.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

/// Sensor declaration used in a device registration request.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorTemplate {
    name: String,
    reference: String,
    reading_type: ReadingType,
    description: Option<String>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl SensorTemplate {
    /// Sensor with a generic reading type derived from a data type.
    pub fn with_data_type(
        name: impl Into<String>,
        reference: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self::new(name, reference, ReadingType::for_sensor(data_type))
    }

    /// Sensor with a reading type known to the platform.
    pub fn with_reading_type(
        name: impl Into<String>,
        reference: impl Into<String>,
        reading_type_name: ReadingTypeName,
        unit: ReadingTypeMeasurementUnit,
    ) -> Self {
        Self::new(name, reference, ReadingType::named(reading_type_name, unit))
    }

    /// Sensor with a reading type previously defined on the platform.
    /// Fails when the name or the unit is missing.
    pub fn with_custom_reading_type(
        name: impl Into<String>,
        reference: impl Into<String>,
        reading_type_name: &str,
        unit: &str,
    ) -> Result<Self, GatewayError> {
        if reading_type_name.is_empty() || unit.is_empty() {
            return Err(GatewayError::Configuration(
                "both reading type name and unit must be provided".into(),
            ));
        }
        Ok(Self::new(
            name,
            reference,
            ReadingType::custom(reading_type_name, unit)?,
        ))
    }

    fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        reading_type: ReadingType,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            reading_type,
            description: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn reading_type(&self) -> &ReadingType {
        &self.reading_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }
}

/// Actuator declaration used in a device registration request.
#[derive(Clone, Debug, PartialEq)]
pub struct ActuatorTemplate {
    name: String,
    reference: String,
    reading_type: ReadingType,
    description: Option<String>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl ActuatorTemplate {
    pub fn with_data_type(
        name: impl Into<String>,
        reference: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self::new(name, reference, ReadingType::for_actuator(data_type))
    }

    /// Fails when the name or the unit is missing.
    pub fn with_custom_reading_type(
        name: impl Into<String>,
        reference: impl Into<String>,
        reading_type_name: &str,
        unit: &str,
    ) -> Result<Self, GatewayError> {
        if reading_type_name.is_empty() || unit.is_empty() {
            return Err(GatewayError::Configuration(
                "both reading type name and unit must be provided".into(),
            ));
        }
        Ok(Self::new(
            name,
            reference,
            ReadingType::custom(reading_type_name, unit)?,
        ))
    }

    fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        reading_type: ReadingType,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            reading_type,
            description: None,
            minimum: None,
            maximum: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn reading_type(&self) -> &ReadingType {
        &self.reading_type
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }
}

/// Alarm declaration used in a device registration request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlarmTemplate {
    name: String,
    reference: String,
    description: Option<String>,
}

impl AlarmTemplate {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Configuration option declaration used in a device registration request.
///
/// The constructors are the only way to build one, which keeps the
/// size/labels rule an invariant of the type: labels exist exactly when
/// `size` is greater than 1.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigurationTemplate {
    name: String,
    reference: String,
    data_type: DataType,
    size: usize,
    labels: Option<String>,
    description: Option<String>,
    default_value: Option<String>,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl ConfigurationTemplate {
    /// Single-value configuration option.
    pub fn new(
        name: impl Into<String>,
        reference: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            data_type,
            size: 1,
            labels: None,
            description: None,
            default_value: None,
            minimum: None,
            maximum: None,
        }
    }

    /// Multi-value configuration option. `size` must be 2 or 3 and `labels`
    /// must hold a comma-separated label per field.
    pub fn multi_value(
        name: impl Into<String>,
        reference: impl Into<String>,
        data_type: DataType,
        size: usize,
        labels: &str,
    ) -> Result<Self, GatewayError> {
        if !(2..=3).contains(&size) {
            return Err(GatewayError::Configuration(
                "multi-value configuration size can only be 2 or 3".into(),
            ));
        }
        if labels.is_empty() {
            return Err(GatewayError::Configuration(
                "labels must be provided for configuration size greater than 1".into(),
            ));
        }
        let mut template = Self::new(name, reference, data_type);
        template.size = size;
        template.labels = Some(labels.to_owned());
        Ok(template)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn labels(&self) -> Option<&str> {
        self.labels.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }
}
