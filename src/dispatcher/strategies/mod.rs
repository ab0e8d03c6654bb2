pub mod clarification;
pub mod explicative;
pub mod guided;
pub mod metacognitive;
pub mod socratic;
