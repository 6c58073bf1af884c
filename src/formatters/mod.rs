pub mod edge_list;

pub use edge_list::EdgeListFormatter;
