mod align;
mod array;
mod axis;
mod broadcast;
mod dataset;
mod element;
mod errors;
mod label;
mod resolver;

pub use align::align;
pub use align::reindex;
pub use align::target_labels;
pub use align::Join;
pub use array::LabeledArray;
pub use axis::CoordinateAxis;
pub use broadcast::broadcast_dims;
pub use broadcast::BroadcastViews;
pub use dataset::Dataset;
pub use dataset::Variable;
pub use element::Element;
pub use element::FillValue;
pub use errors::Error;
pub use errors::Result;
pub use label::Label;
pub use resolver::group_positions;
pub use resolver::resolve;
pub use resolver::resolve_positional;
pub use resolver::IndexRequest;
pub use resolver::Method;
pub use resolver::Resolved;
