pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod position;
pub mod sheet;
pub mod value;
