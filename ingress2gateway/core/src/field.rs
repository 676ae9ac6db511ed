use std::fmt;
use thiserror::Error;

pub type FieldErrors = Vec<FieldError>;

/// A path to a field within a resource, e.g. `spec.rules[0].http.paths[1]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<Segment>);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Segment {
    Child(String),
    Index(usize),
    Key(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// The value is syntactically valid but not acceptable.
    Invalid,
    /// The value could not be parsed as the expected type.
    TypeInvalid,
    Required,
}

/// A problem with a single field of an input resource.
///
/// Field errors are accumulated and reported alongside whatever output could
/// still be produced.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{}{field}: {kind}: {value:?}: {detail}", object_prefix(.object))]
pub struct FieldError {
    /// The `<namespace>/<name>` of the resource holding the field, when known.
    pub object: Option<String>,
    pub kind: ErrorType,
    pub field: FieldPath,
    pub value: String,
    pub detail: String,
}

// === impl FieldPath ===

impl FieldPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self(vec![Segment::Child(root.into())])
    }

    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.0.push(Segment::Child(name.into()));
        self
    }

    pub fn index(mut self, idx: usize) -> Self {
        self.0.push(Segment::Index(idx));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::Key(key.into()));
        self
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Child(name) if i == 0 => f.write_str(name)?,
                Segment::Child(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

// === impl ErrorType ===

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid | Self::TypeInvalid => f.write_str("Invalid value"),
            Self::Required => f.write_str("Required value"),
        }
    }
}

// === impl FieldError ===

impl FieldError {
    pub fn invalid(field: FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            object: None,
            kind: ErrorType::Invalid,
            field,
            value: value.to_string(),
            detail: detail.into(),
        }
    }

    pub fn type_invalid(
        field: FieldPath,
        value: impl fmt::Display,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            object: None,
            kind: ErrorType::TypeInvalid,
            field,
            value: value.to_string(),
            detail: detail.into(),
        }
    }

    pub fn required(field: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            object: None,
            kind: ErrorType::Required,
            field,
            value: String::new(),
            detail: detail.into(),
        }
    }

    /// Names the resource the field belongs to.
    pub fn in_object(mut self, object: impl fmt::Display) -> Self {
        self.object = Some(object.to_string());
        self
    }
}

fn object_prefix(object: &Option<String>) -> String {
    object
        .as_deref()
        .map(|object| format!("{object}: "))
        .unwrap_or_default()
}
