use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A coordinate label: one value in a dimension's ordered label sequence.
///
/// The set of label kinds is closed and chosen at axis construction time.
/// `Time` holds epoch seconds. All variants share one total order so axes
/// can be sorted, binary searched, and hashed consistently: values of the
/// same kind compare naturally (floats by IEEE total order), values of
/// different kinds compare by kind tag.
///
#[derive(Clone, Debug)]
pub enum Label {
    Int(i64),
    Float(f64),
    Time(i64),
    Text(String),
}

impl Label {
    fn tag(&self) -> u8 {
        match self {
            Label::Int(_) => 0,
            Label::Float(_) => 1,
            Label::Time(_) => 2,
            Label::Text(_) => 3,
        }
    }

    /// Absolute distance between two labels, for nearest-match lookups.
    ///
    /// Defined for numeric and time labels (int and float mix freely);
    /// text labels have no distance and can never be a nearest match.
    ///
    pub fn distance(&self, other: &Label) -> Option<f64> {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => Some((*a as f64 - *b as f64).abs()),
            (Label::Float(a), Label::Float(b)) => Some((a - b).abs()),
            (Label::Int(a), Label::Float(b)) | (Label::Float(b), Label::Int(a)) => {
                Some((*a as f64 - b).abs())
            }
            (Label::Time(a), Label::Time(b)) => Some((*a as f64 - *b as f64).abs()),
            _ => None,
        }
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Label::Int(a), Label::Int(b)) => a.cmp(b),
            (Label::Float(a), Label::Float(b)) => a.total_cmp(b),
            (Label::Time(a), Label::Time(b)) => a.cmp(b),
            (Label::Text(a), Label::Text(b)) => a.cmp(b),
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Floats hash by bit pattern, which agrees with total_cmp equality.
impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().hash(state);
        match self {
            Label::Int(v) => v.hash(state),
            Label::Float(v) => v.to_bits().hash(state),
            Label::Time(v) => v.hash(state),
            Label::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Float(v) => write!(f, "{v}"),
            Label::Time(v) => write!(f, "t{v}"),
            Label::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<f64> for Label {
    fn from(value: f64) -> Self {
        Label::Float(value)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Text(value)
    }
}
