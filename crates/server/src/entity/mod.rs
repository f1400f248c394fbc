pub mod conversation;
pub mod homework;
pub mod llm_config;
pub mod message;
pub mod section;
pub mod section_solution;
pub mod student;
pub mod submission;
pub mod teacher;
pub mod user;
