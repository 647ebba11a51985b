pub mod builder;
pub mod column_reader;
pub mod time_index;
pub mod yearly;
