pub mod ordered_set;
pub mod result_table;
