pub mod quiz_zone;
