pub mod kits_db;
