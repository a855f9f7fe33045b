pub mod once_map;
