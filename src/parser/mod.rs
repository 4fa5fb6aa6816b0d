pub mod entity;
pub mod korean_date;
