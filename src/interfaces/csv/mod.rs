pub mod item_reader;
pub mod order_writer;
