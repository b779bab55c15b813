pub mod backup;
pub mod core;
pub mod courses;
pub mod gpa;
pub mod students;
pub mod transfer;
