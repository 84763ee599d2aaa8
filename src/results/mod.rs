mod result_set;
mod row;

pub use result_set::{QueryOutput, ResultSet};
pub use row::CustomDbRow;
