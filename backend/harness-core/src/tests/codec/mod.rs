mod reader;
mod string_table;
mod worker;
mod writer;
