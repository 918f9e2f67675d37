pub mod agent;
pub mod llm;
pub mod pdf;
pub mod planner;
pub mod prompt;
pub mod tools;
