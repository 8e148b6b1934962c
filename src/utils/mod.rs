pub mod nvs_ext;
