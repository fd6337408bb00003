mod data_type;
mod schema;
mod tuple;
mod value;

pub use data_type::DataType;
pub use schema::{Column, Schema};
pub use tuple::Tuple;
pub use value::Value;
